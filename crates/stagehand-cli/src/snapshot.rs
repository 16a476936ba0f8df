//! Non-interactive snapshot mode: step the virtual clock and print frames.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::ui::{self, App};

/// How a snapshot run is paced and drawn.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotOptions {
    /// Frames to print at most.
    pub frames: usize,
    /// Timer ticks delivered between frames.
    pub ticks_per_frame: usize,
    /// Frame width in cells.
    pub width: u16,
    /// Frame height in cells.
    pub height: u16,
    /// Checkpoint answers in order; missing ones pick the first option.
    pub choices: Vec<String>,
    /// Keep ANSI colors in the output.
    pub color: bool,
}

/// What a snapshot run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SnapshotSummary {
    /// Frames printed.
    pub frames: usize,
    /// Checkpoints answered.
    pub answered: usize,
    /// Virtual time at the last frame.
    pub elapsed: Duration,
    /// Whether every started flow finished.
    pub finished: bool,
}

/// Print frames of `app` to `out` until it finishes or the frame budget is
/// spent. A frame is printed while paused so the checkpoint is visible; the
/// answer is given before the next frame.
pub(crate) fn run(app: &mut App, options: &SnapshotOptions, out: &mut impl Write) -> Result<SnapshotSummary> {
    let mut choices = options.choices.iter();
    let mut frames: usize = 0;
    let mut answered: usize = 0;

    while frames < options.frames {
        if app.awaiting_choice() {
            let choice = choices.next().map_or("", String::as_str);
            if app.answer_with(choice) {
                answered = answered.saturating_add(1);
            }
        }

        let mut delivered: usize = 0;
        while delivered < options.ticks_per_frame && !app.awaiting_choice() && app.step() {
            delivered = delivered.saturating_add(1);
        }
        debug!(frame = frames, delivered, "snapshot frame advanced");

        frames = frames.saturating_add(1);
        let frame = ui::render_snapshot(app, options.width, options.height, options.color)?;
        writeln!(
            out,
            "── Frame {frames} · t+{:.2}s ──",
            app.scheduler.now().as_secs_f64()
        )?;
        write!(out, "{frame}")?;

        let stalled = delivered == 0 && !app.awaiting_choice();
        if app.conversation.is_finished() || stalled {
            break;
        }
    }

    let summary = SnapshotSummary {
        frames,
        answered,
        elapsed: app.scheduler.now(),
        finished: app.conversation.is_finished(),
    };
    info!(
        frames = summary.frames,
        answered = summary.answered,
        elapsed_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
        finished = summary.finished,
        "snapshot run done"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::state::tests::fast_app;

    fn options(frames: usize, choices: &[&str]) -> SnapshotOptions {
        SnapshotOptions {
            frames,
            ticks_per_frame: 500,
            width: 100,
            height: 32,
            choices: choices.iter().map(|c| (*c).to_owned()).collect(),
            color: false,
        }
    }

    #[test]
    fn test_sales_run_to_completion() {
        let mut app = fast_app();
        app.submit("analyze Q3 sales");
        let mut out = Vec::new();

        let summary = run(&mut app, &options(200, &["full"]), &mut out).unwrap();
        assert!(summary.finished);
        assert_eq!(summary.answered, 1);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("── Frame 1 "));
        assert!(text.contains("· complete"));
        assert!(text.contains("Dashboard"));
        let engine = app.conversation.scenario().unwrap();
        assert_eq!(engine.selection("scope"), Some("full"));
    }

    #[test]
    fn test_presentation_records_artifact() {
        let mut app = fast_app();
        app.submit("make a slide deck");
        let mut out = Vec::new();

        let summary = run(&mut app, &options(500, &["4 slides"]), &mut out).unwrap();
        assert!(summary.finished);
        assert_eq!(app.conversation.artifacts().len(), 1);
        assert_eq!(app.conversation.artifacts()[0].slide_count, 4);
        assert!(String::from_utf8(out).unwrap().contains("Artifacts"));
    }

    #[test]
    fn test_frame_budget_is_respected() {
        let mut app = fast_app();
        app.submit("analyze Q3 sales");
        let mut out = Vec::new();
        let opts = SnapshotOptions {
            ticks_per_frame: 1,
            ..options(3, &[])
        };

        let summary = run(&mut app, &opts, &mut out).unwrap();
        assert_eq!(summary.frames, 3);
        assert!(!summary.finished);
    }

    #[test]
    fn test_idle_app_stops_after_one_frame() {
        let mut app = fast_app();
        let mut out = Vec::new();
        let summary = run(&mut app, &options(10, &[]), &mut out).unwrap();
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.answered, 0);
    }
}
