//! Stagehand Engine - scripted agent demo playback.
//!
//! This crate provides:
//! - Character-by-character text streaming with a blinking cursor
//! - Sequential slide deck generation with completion-based progress
//! - Chart drill-down navigation over static lookup tables
//! - A step engine that walks a branching script, pausing at
//!   human-in-the-loop checkpoints
//!
//! # Architecture
//!
//! Every engine is a plain state machine. Transitions return a list of
//! [`Effect`]s instead of touching a clock: start a timer, cancel a timer,
//! emit an [`EngineEvent`]. A host executes the effects and reports fired
//! timers back through [`TimerDriven::on_timer`]. Two hosts exist:
//!
//! 1. [`VirtualScheduler`] advances a virtual millisecond clock on demand.
//!    Tests and the snapshot renderer use it.
//! 2. [`Driver`] runs the machine on a tokio task with real intervals and
//!    publishes events on an [`EventBus`].
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use stagehand_engine::{Effect, StreamingText, TimerDriven, TimerId, VirtualScheduler};
//!
//! struct Typewriter(StreamingText);
//!
//! impl TimerDriven for Typewriter {
//!     fn on_timer(&mut self, id: TimerId) -> Vec<Effect> {
//!         let mut fx = Vec::new();
//!         self.0.on_timer(id, &mut fx);
//!         fx
//!     }
//! }
//!
//! let mut machine = Typewriter(StreamingText::new("Hi **there**", Duration::from_millis(30)));
//! let mut fx = Vec::new();
//! machine.0.start(&mut fx);
//!
//! let mut scheduler = VirtualScheduler::new();
//! scheduler.apply(fx);
//! scheduler.advance(&mut machine, Duration::from_millis(90));
//! assert_eq!(machine.0.revealed(), "Hi ");
//!
//! scheduler.run_until_idle(&mut machine, 1_000);
//! assert!(machine.0.is_done());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod conversation;
pub mod drill;
pub mod driver;
pub mod error;
pub mod events;
pub mod fixtures;
pub mod markup;
pub mod prelude;
pub mod scenario;
pub mod schedule;
pub mod script;
pub mod slides;
pub mod streaming;
pub mod timer;

pub use conversation::{
    Artifact, ArtifactKind, Conversation, ConversationSettings, ScenarioKind, route_query,
};
pub use drill::{
    ContextMenu, Crumb, DataPoint, Dimension, DrillDownNavigator, DrillState, DrillTable,
    MenuItem, MenuPosition,
};
pub use driver::{Driver, DriverHandle};
pub use error::{EngineError, EngineResult, ResumeError, ScriptError};
pub use events::{DEFAULT_CHANNEL_CAPACITY, EngineEvent, EventBus, EventReceiver, Panel};
pub use markup::{Segment, parse_inline, plain_text};
pub use scenario::{
    HitlCheckpoint, ProgressTask, RunPhase, ScenarioRunState, ScenarioStepEngine,
    ScenarioTiming, TaskStatus, ToolGroupView, ToolProgress, project_progress,
};
pub use schedule::VirtualScheduler;
pub use script::{Checkpoint, ChoiceOption, Script, Step, StepKind, ToolCall};
pub use slides::{
    ActiveField, GENERATION_STAGES, RevealedSlide, SlideContent, SlideGenerationEngine,
    SlideItem, SlideStatus, stage_for_progress,
};
pub use streaming::{CURSOR_BLINK, StreamPhase, StreamTick, StreamingText};
pub use timer::{Effect, TimerDriven, TimerId, TimerLedger, TimerPurpose};
