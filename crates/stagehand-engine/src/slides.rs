//! Sequential slide generation.
//!
//! One slide generates at a time. The engine keeps a single authoritative
//! cursor (`current`, `char_index`) and derives every slide's status from it,
//! so "exactly one slide is generating" holds by construction. The reveal of
//! the generating slide is one counter over its concatenated fields (title,
//! subtitle, bullets in order); the counter alone decides which field is
//! active.
//!
//! Progress is completion-based: `round(100 * completed / N)`, updated only
//! at slide boundaries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::events::EngineEvent;
use crate::timer::{Effect, TimerDriven, TimerId, TimerLedger, TimerPurpose};

/// Labels of the legacy six-stage progress strip.
pub const GENERATION_STAGES: [&str; 6] = [
    "Understanding request",
    "Drafting outline",
    "Writing content",
    "Choosing layouts",
    "Polishing visuals",
    "Finalizing deck",
];

/// Legacy stage index for a progress percentage: `min(5, (p + 1) / 16)`.
///
/// Display only. The percentage itself comes from slide completion.
#[must_use]
pub fn stage_for_progress(percent: u8) -> usize {
    usize::from(percent).saturating_add(1).saturating_div(16).min(5)
}

/// Authored content of one slide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideContent {
    /// Slide title.
    pub title: String,
    /// Subtitle; empty when the slide has none.
    #[serde(default)]
    pub subtitle: String,
    /// Bullet points in display order.
    #[serde(default)]
    pub bullets: Vec<String>,
}

impl SlideContent {
    /// A slide with only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    fn field_lengths(&self) -> impl Iterator<Item = (ActiveField, usize)> + '_ {
        [
            (ActiveField::Title, self.title.chars().count()),
            (ActiveField::Subtitle, self.subtitle.chars().count()),
        ]
        .into_iter()
        .chain(
            self.bullets
                .iter()
                .enumerate()
                .map(|(i, b)| (ActiveField::Bullet(i), b.chars().count())),
        )
    }

    /// Characters across all fields.
    #[must_use]
    pub fn total_chars(&self) -> usize {
        self.field_lengths()
            .fold(0_usize, |acc, (_, len)| acc.saturating_add(len))
    }
}

/// Slide lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideStatus {
    /// Not started.
    Pending,
    /// Streaming now.
    Generating,
    /// Fully revealed.
    Completed,
}

/// A slide as the shell sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideItem {
    /// 1-based, contiguous.
    pub id: usize,
    /// Derived status.
    pub status: SlideStatus,
    /// Full authored content.
    pub content: SlideContent,
}

/// Field of the generating slide that receives the next character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveField {
    /// The title.
    Title,
    /// The subtitle.
    Subtitle,
    /// Bullet at the given index.
    Bullet(usize),
}

/// Visible part of a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedSlide<'a> {
    /// Revealed title prefix.
    pub title: &'a str,
    /// Revealed subtitle prefix.
    pub subtitle: &'a str,
    /// Bullets that have started, each possibly partial.
    pub bullets: Vec<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeckPhase {
    Ready,
    Generating { current: usize, char_index: usize },
    Complete,
}

/// Drives generation of a slide deck.
#[derive(Debug)]
pub struct SlideGenerationEngine {
    contents: Vec<SlideContent>,
    count: usize,
    phase: DeckPhase,
    char_delay: Duration,
    timers: TimerLedger,
}

impl SlideGenerationEngine {
    /// Create an engine for `contents`, one slide per entry.
    #[must_use]
    pub fn new(contents: Vec<SlideContent>, char_delay: Duration) -> Self {
        let count = contents.len();
        Self {
            contents,
            count,
            phase: DeckPhase::Ready,
            char_delay,
            timers: TimerLedger::new(),
        }
    }

    /// Generate only the first `count` slides. Allowed before `start` only;
    /// the count is clamped to the available content.
    pub fn set_slide_count(&mut self, count: usize) -> Vec<Effect> {
        if self.phase != DeckPhase::Ready {
            debug!(count, "slide count is fixed once generation starts");
            return Vec::new();
        }
        let clamped = count.max(1).min(self.contents.len());
        self.count = clamped;
        vec![Effect::Emit(EngineEvent::SlideCountChanged { count: clamped })]
    }

    /// Begin generating slide 1. Does nothing unless ready.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        if self.phase != DeckPhase::Ready {
            return fx;
        }
        info!(slides = self.count, "slide generation started");
        if self.count == 0 {
            self.finish(&mut fx);
            return fx;
        }
        self.phase = DeckPhase::Generating {
            current: 0,
            char_index: 0,
        };
        self.timers.issue(TimerPurpose::SlideReveal, self.char_delay, &mut fx);
        fx.push(Effect::Emit(EngineEvent::SlidesChanged {
            slides: self.slides(),
        }));
        fx.push(Effect::Emit(EngineEvent::SlideProgress { percent: 0 }));
        fx
    }

    /// Stop generation and return to the pre-start state.
    pub fn reset(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.timers.cancel_all(&mut fx);
        self.phase = DeckPhase::Ready;
        fx
    }

    fn advance(&mut self, fx: &mut Vec<Effect>) {
        let DeckPhase::Generating {
            current,
            char_index,
        } = self.phase
        else {
            return;
        };
        let total = self.contents[current].total_chars();
        let char_index = char_index.saturating_add(1).min(total);
        if char_index < total {
            self.phase = DeckPhase::Generating {
                current,
                char_index,
            };
            return;
        }

        let next = current.saturating_add(1);
        debug!(slide = next, "slide completed");
        if next < self.count {
            self.phase = DeckPhase::Generating {
                current: next,
                char_index: 0,
            };
            // The finished slide's timer stops before the next one is granted.
            self.timers.issue(TimerPurpose::SlideReveal, self.char_delay, fx);
            fx.push(Effect::Emit(EngineEvent::SlidesChanged {
                slides: self.slides(),
            }));
            fx.push(Effect::Emit(EngineEvent::SlideProgress {
                percent: self.progress(),
            }));
        } else {
            self.finish(fx);
        }
    }

    fn finish(&mut self, fx: &mut Vec<Effect>) {
        self.timers.cancel_all(fx);
        self.phase = DeckPhase::Complete;
        info!(slides = self.count, "slide generation complete");
        fx.push(Effect::Emit(EngineEvent::SlidesChanged {
            slides: self.slides(),
        }));
        fx.push(Effect::Emit(EngineEvent::SlideProgress { percent: 100 }));
        fx.push(Effect::Emit(EngineEvent::GenerationCompleted));
        fx.push(Effect::Emit(EngineEvent::VisualizationComplete {
            complete: true,
        }));
    }

    /// Target slide count.
    #[must_use]
    pub fn slide_count(&self) -> usize {
        self.count
    }

    /// Status of the slide at 0-based `index`.
    #[must_use]
    pub fn status_at(&self, index: usize) -> SlideStatus {
        match self.phase {
            DeckPhase::Ready => SlideStatus::Pending,
            DeckPhase::Complete => SlideStatus::Completed,
            DeckPhase::Generating { current, .. } => match index.cmp(&current) {
                std::cmp::Ordering::Less => SlideStatus::Completed,
                std::cmp::Ordering::Equal => SlideStatus::Generating,
                std::cmp::Ordering::Greater => SlideStatus::Pending,
            },
        }
    }

    /// All slides with derived statuses. Empty before `start`.
    #[must_use]
    pub fn slides(&self) -> Vec<SlideItem> {
        if self.phase == DeckPhase::Ready {
            return Vec::new();
        }
        self.contents
            .iter()
            .take(self.count)
            .enumerate()
            .map(|(index, content)| SlideItem {
                id: index.saturating_add(1),
                status: self.status_at(index),
                content: content.clone(),
            })
            .collect()
    }

    /// 1-based id of the generating slide.
    #[must_use]
    pub fn current_slide(&self) -> Option<usize> {
        match self.phase {
            DeckPhase::Generating { current, .. } => Some(current.saturating_add(1)),
            DeckPhase::Ready | DeckPhase::Complete => None,
        }
    }

    /// Characters revealed on the generating slide.
    #[must_use]
    pub fn char_index(&self) -> usize {
        match self.phase {
            DeckPhase::Generating { char_index, .. } => char_index,
            DeckPhase::Ready | DeckPhase::Complete => 0,
        }
    }

    /// Number of completed slides.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        match self.phase {
            DeckPhase::Ready => 0,
            DeckPhase::Generating { current, .. } => current,
            DeckPhase::Complete => self.count,
        }
    }

    /// Completion percentage.
    #[must_use]
    pub fn progress(&self) -> u8 {
        percent(self.completed_count(), self.count)
    }

    /// Legacy stage label for the current progress.
    #[must_use]
    pub fn stage_label(&self) -> &'static str {
        GENERATION_STAGES[stage_for_progress(self.progress())]
    }

    /// Whether the last slide has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == DeckPhase::Complete
    }

    /// Whether a slide is generating.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        matches!(self.phase, DeckPhase::Generating { .. })
    }

    /// Field receiving characters on the generating slide.
    #[must_use]
    pub fn active_field(&self) -> Option<ActiveField> {
        let DeckPhase::Generating {
            current,
            char_index,
        } = self.phase
        else {
            return None;
        };
        let mut consumed: usize = 0;
        let mut last = None;
        for (field, len) in self.contents[current].field_lengths() {
            if len == 0 {
                continue;
            }
            last = Some(field);
            let end = consumed.saturating_add(len);
            if char_index < end {
                return Some(field);
            }
            consumed = end;
        }
        last
    }

    /// Visible content of the slide with 1-based `id`.
    #[must_use]
    pub fn revealed(&self, id: usize) -> Option<RevealedSlide<'_>> {
        let index = id.checked_sub(1)?;
        let content = self.contents.get(index).filter(|_| index < self.count)?;
        let budget = match self.status_at(index) {
            SlideStatus::Pending => 0,
            SlideStatus::Completed => content.total_chars(),
            SlideStatus::Generating => self.char_index(),
        };
        let mut left = budget;
        let title = char_prefix(&content.title, left);
        left = left.saturating_sub(content.title.chars().count());
        let subtitle = char_prefix(&content.subtitle, left);
        left = left.saturating_sub(content.subtitle.chars().count());
        let mut bullets = Vec::new();
        for bullet in &content.bullets {
            if left == 0 {
                break;
            }
            bullets.push(char_prefix(bullet, left));
            left = left.saturating_sub(bullet.chars().count());
        }
        Some(RevealedSlide {
            title,
            subtitle,
            bullets,
        })
    }
}

impl TimerDriven for SlideGenerationEngine {
    fn on_timer(&mut self, id: TimerId) -> Vec<Effect> {
        let mut fx = Vec::new();
        if self.timers.purpose_of(id) == Some(TimerPurpose::SlideReveal) {
            self.advance(&mut fx);
        } else {
            trace!(%id, "discarding stale slide tick");
        }
        fx
    }
}

fn char_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    // round(100 * done / total), half up
    done.saturating_mul(200)
        .saturating_add(total)
        .checked_div(total.saturating_mul(2))
        .and_then(|p| u8::try_from(p).ok())
        .unwrap_or(100)
}
