//! Real-time host for timer-driven machines.
//!
//! A [`Driver`] task owns one machine. It turns `StartTimer` effects into
//! `tokio::time::interval` tasks, aborts them on `CancelTimer`, and publishes
//! `Emit` effects on an [`EventBus`]. Callers reach the machine only through
//! a [`DriverHandle`], so every transition runs on the driver task and no
//! lock guards the machine.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::error::{EngineError, EngineResult};
use crate::events::{EventBus, EventReceiver};
use crate::timer::{Effect, TimerDriven, TimerId};

const COMMAND_CAPACITY: usize = 64;

/// Shortest timer period; `interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

type Call<M> = Box<dyn FnOnce(&mut M) -> Vec<Effect> + Send>;

enum Command<M> {
    Call(Call<M>),
    Shutdown,
}

/// Aborts a spawned timer task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Cloneable access to a running driver.
pub struct DriverHandle<M> {
    commands: mpsc::Sender<Command<M>>,
    bus: EventBus,
}

impl<M> Clone for DriverHandle<M> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            bus: self.bus.clone(),
        }
    }
}

impl<M: Send + 'static> DriverHandle<M> {
    /// Run `f` on the machine and execute the effects it returns. Resolves
    /// with the value `f` produced once the effects are applied.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DriverClosed`] once the driver has stopped.
    pub async fn call<R, F>(&self, f: F) -> EngineResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut M) -> (R, Vec<Effect>) + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let call: Call<M> = Box::new(move |machine| {
            let (value, effects) = f(machine);
            let _ = tx.send(value);
            effects
        });
        self.commands
            .send(Command::Call(call))
            .await
            .map_err(|_| EngineError::DriverClosed)?;
        rx.await.map_err(|_| EngineError::DriverClosed)
    }

    /// Run a transition that returns only effects.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DriverClosed`] once the driver has stopped.
    pub async fn apply<F>(&self, f: F) -> EngineResult<()>
    where
        F: FnOnce(&mut M) -> Vec<Effect> + Send + 'static,
    {
        self.call(move |machine| ((), f(machine))).await
    }

    /// Read from the machine without changing it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DriverClosed`] once the driver has stopped.
    pub async fn inspect<R, F>(&self, f: F) -> EngineResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&M) -> R + Send + 'static,
    {
        self.call(move |machine| (f(machine), Vec::new())).await
    }

    /// Ask the driver to stop. Live timers are aborted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DriverClosed`] if it already stopped.
    pub async fn shutdown(&self) -> EngineResult<()> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| EngineError::DriverClosed)
    }

    /// Subscribe to emitted events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.bus.subscribe()
    }
}

/// The task that owns a machine.
pub struct Driver<M> {
    machine: M,
    bus: EventBus,
    timers: HashMap<TimerId, AbortOnDrop>,
    ticks_tx: mpsc::UnboundedSender<TimerId>,
    ticks_rx: mpsc::UnboundedReceiver<TimerId>,
    commands: mpsc::Receiver<Command<M>>,
}

impl<M> Driver<M>
where
    M: TimerDriven + Send + 'static,
{
    /// Spawn a driver for `machine`. The join handle yields the machine back
    /// after shutdown, or once every handle is dropped.
    pub fn spawn(machine: M, bus: EventBus) -> (DriverHandle<M>, JoinHandle<M>) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        let driver = Self {
            machine,
            bus: bus.clone(),
            timers: HashMap::new(),
            ticks_tx,
            ticks_rx,
            commands,
        };
        let handle = DriverHandle {
            commands: commands_tx,
            bus,
        };
        (handle, tokio::spawn(driver.run()))
    }

    async fn run(mut self) -> M {
        debug!("engine driver started");
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Call(call)) => {
                        let effects = call(&mut self.machine);
                        self.execute(effects);
                    },
                    Some(Command::Shutdown) | None => break,
                },
                Some(id) = self.ticks_rx.recv() => {
                    if !self.timers.contains_key(&id) {
                        trace!(%id, "dropping tick of cancelled timer");
                        continue;
                    }
                    let effects = self.machine.on_timer(id);
                    self.execute(effects);
                },
            }
        }
        self.timers.clear();
        debug!("engine driver stopped");
        self.machine
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartTimer { id, purpose, period } => {
                    let period = period.max(MIN_PERIOD);
                    trace!(%id, ?purpose, period_ms = period.as_millis(), "timer started");
                    let ticks = self.ticks_tx.clone();
                    let task = tokio::spawn(async move {
                        let first = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
                        let mut interval = tokio::time::interval_at(first, period);
                        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        loop {
                            interval.tick().await;
                            if ticks.send(id).is_err() {
                                break;
                            }
                        }
                    });
                    self.timers.insert(id, AbortOnDrop(task));
                },
                Effect::CancelTimer(id) => {
                    if self.timers.remove(&id).is_some() {
                        trace!(%id, "timer cancelled");
                    }
                },
                Effect::Emit(event) => {
                    self.bus.publish(event);
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EngineEvent;
    use crate::streaming::StreamingText;

    /// A single reveal wired as a machine.
    struct Reveal(StreamingText);

    impl TimerDriven for Reveal {
        fn on_timer(&mut self, id: TimerId) -> Vec<Effect> {
            let mut fx = Vec::new();
            if self.0.on_timer(id, &mut fx) == crate::streaming::StreamTick::Completed {
                fx.push(Effect::Emit(EngineEvent::ScenarioCompleted));
            }
            fx
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_runs_timers_in_virtual_time() {
        let bus = EventBus::new();
        let mut events = bus.subscribe();
        let machine = Reveal(StreamingText::new("abc", Duration::from_millis(30)));
        let (handle, join) = Driver::spawn(machine, bus);

        handle
            .apply(|m| {
                let mut fx = Vec::new();
                m.0.start(&mut fx);
                fx
            })
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(*event, EngineEvent::ScenarioCompleted);

        let revealed = handle.inspect(|m| m.0.revealed().to_owned()).await.unwrap();
        assert_eq!(revealed, "abc");
        assert!(!handle.inspect(|m| m.0.cursor_visible()).await.unwrap());

        handle.shutdown().await.unwrap();
        let machine = join.await.unwrap();
        assert!(machine.0.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_runs_at_minimum_period() {
        let bus = EventBus::new();
        let mut events = bus.subscribe();
        let machine = Reveal(StreamingText::new("abc", Duration::ZERO));
        let (handle, join) = Driver::spawn(machine, bus);

        handle
            .apply(|m| {
                let mut fx = Vec::new();
                m.0.start(&mut fx);
                fx
            })
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_millis(50), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*event, EngineEvent::ScenarioCompleted);
        assert!(handle.inspect(|m| m.0.is_done()).await.unwrap());

        handle.shutdown().await.unwrap();
        assert_eq!(join.await.unwrap().0.revealed(), "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_delivery() {
        let bus = EventBus::new();
        let machine = Reveal(StreamingText::new("abcdefgh", Duration::from_millis(30)));
        let (handle, join) = Driver::spawn(machine, bus);

        handle
            .apply(|m| {
                let mut fx = Vec::new();
                m.0.start(&mut fx);
                fx
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(75)).await;
        handle
            .apply(|m| {
                let mut fx = Vec::new();
                m.0.cancel(&mut fx);
                fx
            })
            .await
            .unwrap();
        let at_cancel = handle.inspect(|m| m.0.revealed_len()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.inspect(|m| m.0.revealed_len()).await.unwrap(), at_cancel);
        assert!(at_cancel < 8);

        drop(handle);
        assert!(!join.await.unwrap().0.is_done());
    }

    #[tokio::test]
    async fn test_closed_driver_reports_error() {
        let machine = Reveal(StreamingText::new("", Duration::from_millis(1)));
        let (handle, join) = Driver::spawn(machine, EventBus::new());
        handle.shutdown().await.unwrap();
        join.await.unwrap();
        assert!(matches!(
            handle.inspect(|m| m.0.len()).await,
            Err(EngineError::DriverClosed)
        ));
    }
}
