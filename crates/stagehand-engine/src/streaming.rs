//! Character-by-character reveal of a fixed string.
//!
//! A [`StreamingText`] is single-use: it can be started once and then either
//! runs to completion or is cancelled. Showing different text means building
//! a new instance. Reveal arithmetic works on the raw character stream,
//! markup included; callers that want bold spans run
//! [`parse_inline`](crate::markup::parse_inline) over
//! [`revealed`](StreamingText::revealed) on every tick.

use std::time::Duration;

use tracing::trace;

use crate::timer::{Effect, TimerId, TimerLedger, TimerPurpose};

/// Cursor blink interval.
pub const CURSOR_BLINK: Duration = Duration::from_millis(500);

/// Lifecycle of a reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Built but not started.
    Idle,
    /// Timers are running.
    Streaming,
    /// Every character is revealed.
    Done,
    /// Cancelled before completion.
    Cancelled,
}

/// What a delivered tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTick {
    /// The tick was stale or belongs to someone else.
    Ignored,
    /// One more character is visible.
    Advanced,
    /// The cursor toggled.
    CursorToggled,
    /// The final character is visible. Reported exactly once.
    Completed,
}

/// Reveal state for one text region.
#[derive(Debug)]
pub struct StreamingText {
    full_text: String,
    char_count: usize,
    revealed_chars: usize,
    revealed_bytes: usize,
    phase: StreamPhase,
    cursor_visible: bool,
    char_delay: Duration,
    timers: TimerLedger,
}

impl StreamingText {
    /// Prepare a reveal of `full_text` at one character per `char_delay`.
    #[must_use]
    pub fn new(full_text: impl Into<String>, char_delay: Duration) -> Self {
        let full_text = full_text.into();
        let char_count = full_text.chars().count();
        Self {
            full_text,
            char_count,
            revealed_chars: 0,
            revealed_bytes: 0,
            phase: StreamPhase::Idle,
            cursor_visible: false,
            char_delay,
            timers: TimerLedger::new(),
        }
    }

    /// Start the reveal and cursor timers. Does nothing unless idle.
    pub fn start(&mut self, fx: &mut Vec<Effect>) {
        if self.phase != StreamPhase::Idle {
            return;
        }
        self.phase = StreamPhase::Streaming;
        self.cursor_visible = true;
        self.timers.issue(TimerPurpose::Reveal, self.char_delay, fx);
        self.timers.issue(TimerPurpose::CursorBlink, CURSOR_BLINK, fx);
    }

    /// Stop both timers without completing.
    pub fn cancel(&mut self, fx: &mut Vec<Effect>) {
        self.timers.cancel_all(fx);
        if self.phase == StreamPhase::Streaming || self.phase == StreamPhase::Idle {
            self.phase = StreamPhase::Cancelled;
        }
        self.cursor_visible = false;
    }

    /// Whether this instance owns `id`.
    #[must_use]
    pub fn owns(&self, id: TimerId) -> bool {
        self.timers.owns(id)
    }

    /// Handle a fired timer.
    pub fn on_timer(&mut self, id: TimerId, fx: &mut Vec<Effect>) -> StreamTick {
        match self.timers.purpose_of(id) {
            Some(TimerPurpose::Reveal) => self.reveal_next(fx),
            Some(TimerPurpose::CursorBlink) => {
                self.cursor_visible = !self.cursor_visible;
                StreamTick::CursorToggled
            },
            _ => {
                trace!(%id, "discarding stale reveal tick");
                StreamTick::Ignored
            },
        }
    }

    fn reveal_next(&mut self, fx: &mut Vec<Effect>) -> StreamTick {
        if let Some(c) = self.full_text[self.revealed_bytes..].chars().next() {
            self.revealed_bytes = self.revealed_bytes.saturating_add(c.len_utf8());
            self.revealed_chars = self.revealed_chars.saturating_add(1);
        }
        if self.revealed_chars < self.char_count {
            return StreamTick::Advanced;
        }
        self.timers.cancel_all(fx);
        self.phase = StreamPhase::Done;
        self.cursor_visible = false;
        StreamTick::Completed
    }

    /// The target text.
    #[must_use]
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// The visible prefix.
    #[must_use]
    pub fn revealed(&self) -> &str {
        &self.full_text[..self.revealed_bytes]
    }

    /// Visible characters so far.
    #[must_use]
    pub fn revealed_len(&self) -> usize {
        self.revealed_chars
    }

    /// Total characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.char_count
    }

    /// Whether the target text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.char_count == 0
    }

    /// Whether timers are advancing.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.phase == StreamPhase::Streaming
    }

    /// Whether every character is visible.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.phase == StreamPhase::Done
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Cursor visibility. Always `false` outside of streaming.
    #[must_use]
    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible && self.is_streaming()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(30);

    fn timer_ids(fx: &[Effect]) -> Vec<(TimerId, TimerPurpose)> {
        fx.iter()
            .filter_map(|e| match e {
                Effect::StartTimer { id, purpose, .. } => Some((*id, *purpose)),
                _ => None,
            })
            .collect()
    }

    fn started(text: &str) -> (StreamingText, TimerId, TimerId) {
        let mut stream = StreamingText::new(text, DELAY);
        let mut fx = Vec::new();
        stream.start(&mut fx);
        let ids = timer_ids(&fx);
        assert_eq!(ids.len(), 2);
        (stream, ids[0].0, ids[1].0)
    }

    #[test]
    fn test_reveal_is_monotonic_and_completes_once() {
        let (mut stream, reveal, _) = started("Hello");
        let mut fx = Vec::new();
        let mut last = 0;
        let mut completions: usize = 0;
        for _ in 0..5 {
            let tick = stream.on_timer(reveal, &mut fx);
            assert!(stream.revealed_len() > last);
            last = stream.revealed_len();
            if tick == StreamTick::Completed {
                completions = completions.saturating_add(1);
            }
        }
        assert_eq!(stream.revealed(), "Hello");
        assert_eq!(completions, 1);
        assert!(stream.is_done());

        // The timer was cancelled on completion; further ticks are stale.
        assert_eq!(stream.on_timer(reveal, &mut fx), StreamTick::Ignored);
        assert_eq!(stream.revealed_len(), 5);
    }

    #[test]
    fn test_empty_text_completes_on_first_tick() {
        let (mut stream, reveal, _) = started("");
        let mut fx = Vec::new();
        assert_eq!(stream.on_timer(reveal, &mut fx), StreamTick::Completed);
        assert_eq!(fx.len(), 2, "both timers cancelled");
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut stream, _, _) = started("abc");
        let mut fx = Vec::new();
        stream.start(&mut fx);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_cancel_suppresses_completion() {
        let (mut stream, reveal, blink) = started("ab");
        let mut fx = Vec::new();
        stream.on_timer(reveal, &mut fx);
        stream.cancel(&mut fx);
        assert!(fx.contains(&Effect::CancelTimer(reveal)));
        assert!(fx.contains(&Effect::CancelTimer(blink)));

        assert_eq!(stream.on_timer(reveal, &mut fx), StreamTick::Ignored);
        assert_eq!(stream.revealed(), "a");
        assert_eq!(stream.phase(), StreamPhase::Cancelled);

        // A cancelled instance cannot be restarted.
        fx.clear();
        stream.start(&mut fx);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_cursor_hides_on_completion_tick() {
        let (mut stream, reveal, blink) = started("ab");
        let mut fx = Vec::new();
        assert!(stream.cursor_visible());
        assert_eq!(stream.on_timer(blink, &mut fx), StreamTick::CursorToggled);
        assert!(!stream.cursor_visible());
        stream.on_timer(blink, &mut fx);
        assert!(stream.cursor_visible());

        stream.on_timer(reveal, &mut fx);
        stream.on_timer(reveal, &mut fx);
        assert!(!stream.cursor_visible());
        assert_eq!(stream.on_timer(blink, &mut fx), StreamTick::Ignored);
    }

    #[test]
    fn test_multibyte_text_reveals_whole_chars() {
        let (mut stream, reveal, _) = started("销售额");
        let mut fx = Vec::new();
        stream.on_timer(reveal, &mut fx);
        assert_eq!(stream.revealed(), "销");
        stream.on_timer(reveal, &mut fx);
        assert_eq!(stream.revealed(), "销售");
        assert_eq!(stream.len(), 3);
    }
}
