//! Deterministic virtual-time host for timer effects.
//!
//! The scheduler executes [`Effect`]s against a millisecond clock that only
//! moves when asked to. Timers fire in due order, ties broken by id (which
//! is issue order). Emitted events are collected for inspection. The same
//! machine code that runs under the tokio driver runs here tick by tick.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::trace;

use crate::events::EngineEvent;
use crate::timer::{Effect, TimerDriven, TimerId};

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    period_ms: u64,
    due_ms: u64,
}

/// Virtual clock plus the set of live timers.
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now_ms: u64,
    timers: BTreeMap<TimerId, Scheduled>,
    events: Vec<EngineEvent>,
}

impl VirtualScheduler {
    /// A scheduler at time zero with no timers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute effects in order.
    pub fn apply(&mut self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            match effect {
                Effect::StartTimer { id, period, .. } => {
                    let period_ms = u64::try_from(period.as_millis())
                        .unwrap_or(u64::MAX)
                        .max(1);
                    self.timers.insert(
                        id,
                        Scheduled {
                            period_ms,
                            due_ms: self.now_ms.saturating_add(period_ms),
                        },
                    );
                },
                Effect::CancelTimer(id) => {
                    self.timers.remove(&id);
                },
                Effect::Emit(event) => self.events.push(event),
            }
        }
    }

    fn next_due(&self) -> Option<(TimerId, u64)> {
        self.timers
            .iter()
            .min_by_key(|(id, t)| (t.due_ms, **id))
            .map(|(id, t)| (*id, t.due_ms))
    }

    /// Jump to the earliest due timer, deliver it and apply the resulting
    /// effects. Returns the fired id, or `None` when no timer is live.
    pub fn step<M: TimerDriven + ?Sized>(&mut self, machine: &mut M) -> Option<TimerId> {
        let (id, due_ms) = self.next_due()?;
        self.now_ms = self.now_ms.max(due_ms);
        if let Some(timer) = self.timers.get_mut(&id) {
            timer.due_ms = due_ms.saturating_add(timer.period_ms);
        }
        trace!(%id, now_ms = self.now_ms, "virtual timer fired");
        let effects = machine.on_timer(id);
        self.apply(effects);
        Some(id)
    }

    /// Deliver every tick due within the next `elapsed`, then park the clock
    /// at the end of the window. Returns the number of ticks delivered.
    pub fn advance<M: TimerDriven + ?Sized>(
        &mut self,
        machine: &mut M,
        elapsed: Duration,
    ) -> usize {
        let deadline = self
            .now_ms
            .saturating_add(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        let mut delivered: usize = 0;
        while let Some((_, due_ms)) = self.next_due() {
            if due_ms > deadline {
                break;
            }
            self.step(machine);
            delivered = delivered.saturating_add(1);
        }
        self.now_ms = self.now_ms.max(deadline);
        delivered
    }

    /// Step until no timer is live or `max_ticks` ticks were delivered.
    pub fn run_until_idle<M: TimerDriven + ?Sized>(
        &mut self,
        machine: &mut M,
        max_ticks: usize,
    ) -> usize {
        let mut delivered: usize = 0;
        while delivered < max_ticks && self.step(machine).is_some() {
            delivered = delivered.saturating_add(1);
        }
        delivered
    }

    /// Drain collected events.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Collected events not yet drained.
    #[must_use]
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms)
    }

    /// Whether no timer is live.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.timers.is_empty()
    }

    /// Number of live timers.
    #[must_use]
    pub fn live_timers(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{TimerLedger, TimerPurpose};

    /// Counts its own ticks and stops after `limit`.
    struct Counter {
        timers: TimerLedger,
        ticks: usize,
        limit: usize,
    }

    impl Counter {
        fn start(limit: usize, period: Duration) -> (Self, Vec<Effect>) {
            let mut timers = TimerLedger::new();
            let mut fx = Vec::new();
            timers.issue(TimerPurpose::Reveal, period, &mut fx);
            (
                Self {
                    timers,
                    ticks: 0,
                    limit,
                },
                fx,
            )
        }
    }

    impl TimerDriven for Counter {
        fn on_timer(&mut self, id: TimerId) -> Vec<Effect> {
            let mut fx = Vec::new();
            if self.timers.owns(id) {
                self.ticks = self.ticks.saturating_add(1);
                if self.ticks == self.limit {
                    self.timers.cancel_all(&mut fx);
                    fx.push(Effect::Emit(EngineEvent::ScenarioCompleted));
                }
            }
            fx
        }
    }

    #[test]
    fn test_advance_delivers_due_ticks_only() {
        let (mut counter, fx) = Counter::start(100, Duration::from_millis(30));
        let mut sched = VirtualScheduler::new();
        sched.apply(fx);

        assert_eq!(sched.advance(&mut counter, Duration::from_millis(100)), 3);
        assert_eq!(counter.ticks, 3);
        assert_eq!(sched.now(), Duration::from_millis(100));

        assert_eq!(sched.advance(&mut counter, Duration::from_millis(20)), 1);
        assert_eq!(counter.ticks, 4);
    }

    #[test]
    fn test_run_until_idle_stops_when_machine_cancels() {
        let (mut counter, fx) = Counter::start(5, Duration::from_millis(10));
        let mut sched = VirtualScheduler::new();
        sched.apply(fx);

        assert_eq!(sched.run_until_idle(&mut counter, 1_000), 5);
        assert!(sched.is_idle());
        assert_eq!(sched.take_events(), vec![EngineEvent::ScenarioCompleted]);
        assert!(sched.events().is_empty());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let (mut counter, fx) = Counter::start(5, Duration::from_millis(10));
        let mut sched = VirtualScheduler::new();
        sched.apply(fx);
        let mut cancel = Vec::new();
        counter.timers.cancel_all(&mut cancel);
        sched.apply(cancel);

        assert_eq!(sched.advance(&mut counter, Duration::from_secs(1)), 0);
        assert_eq!(counter.ticks, 0);
    }
}
