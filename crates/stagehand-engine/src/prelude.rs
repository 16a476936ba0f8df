//! Prelude module - commonly used types for convenient import.
//!
//! Use `use stagehand_engine::prelude::*;` to import all essential types.

// Hosts and effects
pub use crate::{Driver, DriverHandle, Effect, TimerDriven, TimerId, VirtualScheduler};

// Events
pub use crate::{EngineEvent, EventBus, EventReceiver, Panel};

// Engines
pub use crate::{
    Conversation, ConversationSettings, DrillDownNavigator, ScenarioStepEngine, ScenarioTiming,
    SlideGenerationEngine, StreamingText,
};

// Scripts
pub use crate::{Script, Step, StepKind};

// Errors
pub use crate::{EngineError, EngineResult, ResumeError, ScriptError};
