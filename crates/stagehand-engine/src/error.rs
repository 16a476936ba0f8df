//! Engine error types.

use thiserror::Error;

/// Errors raised while building scripts or routing scenarios.
///
/// Runtime mistakes made by the shell (a resume for the wrong checkpoint, a
/// click on a non-drillable element) are not errors of this kind: they are
/// rejected locally and the engine stays interactive.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The script failed validation.
    #[error("invalid script: {0}")]
    Script(#[from] ScriptError),

    /// No built-in scenario is registered under the given name.
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    /// The driver task has stopped and no longer accepts commands.
    #[error("engine driver is not running")]
    DriverClosed,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Script validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// Two steps share the same id.
    #[error("duplicate step id '{0}'")]
    DuplicateStep(String),

    /// A `next` pointer names a step that does not exist.
    #[error("step '{step}' points to unknown successor '{target}'")]
    UnknownSuccessor {
        /// Step carrying the pointer.
        step: String,
        /// Missing target id.
        target: String,
    },

    /// A checkpoint branch names a step that does not exist.
    #[error("checkpoint '{step}' branches option '{option}' to unknown step '{target}'")]
    UnknownBranchTarget {
        /// Checkpoint step id.
        step: String,
        /// Option value owning the branch.
        option: String,
        /// Missing target id.
        target: String,
    },

    /// A checkpoint branch is keyed by a value that is not one of its options.
    #[error("checkpoint '{step}' has a branch for undeclared option '{option}'")]
    UndeclaredBranchOption {
        /// Checkpoint step id.
        step: String,
        /// Offending option value.
        option: String,
    },

    /// A checkpoint offers no options, so it could never be resumed.
    #[error("checkpoint '{0}' has no options")]
    EmptyCheckpoint(String),

    /// Two options of one checkpoint share a value.
    #[error("checkpoint '{step}' declares option '{option}' twice")]
    DuplicateOption {
        /// Checkpoint step id.
        step: String,
        /// Repeated option value.
        option: String,
    },

    /// A group id was attached to a step that is not a tool call.
    #[error("step '{step}' is not a tool call but carries group '{group}'")]
    GroupOnNonTool {
        /// Step id.
        step: String,
        /// Group id.
        group: String,
    },

    /// A group id reappears after a different step interrupted the run.
    #[error("group '{group}' is not contiguous (reused at step '{step}')")]
    SplitGroup {
        /// Group id.
        group: String,
        /// First step that reopened the group.
        step: String,
    },
}

/// Reasons a `resume` call is rejected.
///
/// A rejected resume leaves the engine exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResumeError {
    /// The engine is not sitting at a checkpoint.
    #[error("scenario is not paused at a checkpoint")]
    NotPaused,

    /// The caller answered a checkpoint other than the live one.
    #[error("resume for step '{requested}' but the live checkpoint is '{expected}'")]
    StepMismatch {
        /// The paused checkpoint.
        expected: String,
        /// The step id supplied by the caller.
        requested: String,
    },

    /// The selected value is not one of the checkpoint's options.
    #[error("checkpoint '{step}' has no option '{value}'")]
    UnknownOption {
        /// Checkpoint step id.
        step: String,
        /// Rejected value.
        value: String,
    },
}
