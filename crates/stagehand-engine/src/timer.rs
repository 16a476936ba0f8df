//! Timer bookkeeping and the side effects machines hand back to their host.
//!
//! Machines never own a clock. Every transition returns a list of [`Effect`]s
//! ("start timer X", "cancel timer Y", "emit event"), and the host (the
//! [`VirtualScheduler`](crate::schedule::VirtualScheduler) or the tokio
//! [`Driver`](crate::driver::Driver)) executes them and later reports fired
//! timers back by id.
//!
//! [`TimerLedger`] holds at most one live timer per [`TimerPurpose`]. Issuing
//! a new timer for a purpose always cancels the old one first, so a superseded
//! timer can never write into state that now belongs to someone else.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::EngineEvent;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique timer identity.
///
/// Ids are never reused, so a tick carrying an id that is no longer in a
/// ledger is by definition stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(u64);

impl TimerId {
    fn next() -> Self {
        Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// What a timer paces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPurpose {
    /// One character of streamed text per tick.
    Reveal,
    /// Cursor visibility toggle.
    CursorBlink,
    /// One tool-call sub-task per tick.
    ToolProgress,
    /// One character of the generating slide per tick.
    SlideReveal,
}

/// A side effect requested by a machine transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Effect {
    /// Start a repeating timer that first fires one `period` from now.
    StartTimer {
        /// Identity reported back on every tick.
        id: TimerId,
        /// What the timer paces.
        purpose: TimerPurpose,
        /// Tick interval.
        period: Duration,
    },
    /// Stop a timer. Unknown ids are ignored by hosts.
    CancelTimer(TimerId),
    /// Notify the shell.
    Emit(EngineEvent),
}

impl Effect {
    /// The event carried by an `Emit` effect.
    #[must_use]
    pub fn as_event(&self) -> Option<&EngineEvent> {
        match self {
            Self::Emit(event) => Some(event),
            Self::StartTimer { .. } | Self::CancelTimer(_) => None,
        }
    }
}

/// Live timers of one machine, at most one per purpose.
#[derive(Debug, Default)]
pub struct TimerLedger {
    live: BTreeMap<TimerPurpose, TimerId>,
}

impl TimerLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a timer for `purpose`, cancelling the previous one first.
    pub fn issue(
        &mut self,
        purpose: TimerPurpose,
        period: Duration,
        fx: &mut Vec<Effect>,
    ) -> TimerId {
        if let Some(old) = self.live.remove(&purpose) {
            fx.push(Effect::CancelTimer(old));
        }
        let id = TimerId::next();
        self.live.insert(purpose, id);
        fx.push(Effect::StartTimer {
            id,
            purpose,
            period,
        });
        id
    }

    /// Cancel the timer for `purpose`, if any.
    pub fn retire(&mut self, purpose: TimerPurpose, fx: &mut Vec<Effect>) {
        if let Some(id) = self.live.remove(&purpose) {
            fx.push(Effect::CancelTimer(id));
        }
    }

    /// Cancel every live timer.
    pub fn cancel_all(&mut self, fx: &mut Vec<Effect>) {
        for (_, id) in std::mem::take(&mut self.live) {
            fx.push(Effect::CancelTimer(id));
        }
    }

    /// Purpose of a live timer, or `None` when `id` is stale or foreign.
    #[must_use]
    pub fn purpose_of(&self, id: TimerId) -> Option<TimerPurpose> {
        self.live
            .iter()
            .find_map(|(purpose, live)| (*live == id).then_some(*purpose))
    }

    /// Whether `id` belongs to this ledger.
    #[must_use]
    pub fn owns(&self, id: TimerId) -> bool {
        self.purpose_of(id).is_some()
    }

    /// Whether no timer is live.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.live.is_empty()
    }
}

/// Anything that reacts to fired timers.
pub trait TimerDriven {
    /// Handle a fired timer. Stale ids must be ignored without side effects.
    fn on_timer(&mut self, id: TimerId) -> Vec<Effect>;
}
