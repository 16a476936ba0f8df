//! Scripted scenario execution.
//!
//! [`ScenarioStepEngine`] walks a [`Script`] one step at a time:
//!
//! ```text
//! Idle ──start──▶ Running ──checkpoint──▶ Paused ──resume──▶ Running ──▶ Complete
//! ```
//!
//! Agent-text steps finish when their [`StreamingText`] completes, tool calls
//! when their last sub-task is ticked, and checkpoints only through
//! [`resume`](ScenarioStepEngine::resume). Progress chips are never stored;
//! [`project_progress`] recomputes them from the completion log and the
//! current pointer. Group expansion lives in its own override map so that UI
//! toggles never touch run state.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::ResumeError;
use crate::events::EngineEvent;
use crate::script::{ChoiceOption, Script, Step, StepKind};
use crate::streaming::{StreamTick, StreamingText};
use crate::timer::{Effect, TimerDriven, TimerId, TimerLedger, TimerPurpose};

/// Default per-character delay for agent text.
pub const DEFAULT_TEXT_CHAR_DELAY: Duration = Duration::from_millis(30);

/// Default delay between tool-call sub-tasks.
pub const DEFAULT_TOOL_SUBTASK_DELAY: Duration = Duration::from_millis(600);

/// Pacing of scenario steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioTiming {
    /// Per-character reveal delay for agent text.
    pub text_char_delay: Duration,
    /// Delay between tool-call sub-tasks.
    pub tool_subtask_delay: Duration,
}

impl Default for ScenarioTiming {
    fn default() -> Self {
        Self {
            text_char_delay: DEFAULT_TEXT_CHAR_DELAY,
            tool_subtask_delay: DEFAULT_TOOL_SUBTASK_DELAY,
        }
    }
}

impl ScenarioTiming {
    /// Override the agent-text delay.
    #[must_use]
    pub fn with_text_char_delay(mut self, delay: Duration) -> Self {
        self.text_char_delay = delay;
        self
    }

    /// Override the tool sub-task delay.
    #[must_use]
    pub fn with_tool_subtask_delay(mut self, delay: Duration) -> Self {
        self.tool_subtask_delay = delay;
        self
    }
}

/// Run phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Not started.
    Idle,
    /// Rendering steps.
    Running,
    /// Waiting at a checkpoint.
    Paused,
    /// Terminal.
    Complete,
}

/// Observable run state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioRunState {
    /// Step being rendered or awaiting input.
    pub current_step_id: Option<String>,
    /// Finished steps in completion order.
    pub completed_step_ids: Vec<String>,
    /// Whether a run is in progress. Stays set while paused; only
    /// rendering steps hold live timers.
    pub is_running: bool,
    /// Whether the run waits at a checkpoint.
    pub is_paused: bool,
    /// Whether the terminal step finished.
    pub is_complete: bool,
}

/// The checkpoint a paused run is waiting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitlCheckpoint {
    /// Checkpoint step id, echoed back to `resume`.
    pub step_id: String,
    /// Question put to the user.
    pub question: String,
    /// Options in display order.
    pub options: Vec<ChoiceOption>,
    /// Candidate analysis scopes.
    pub scopes: Vec<String>,
}

/// Status of a progress chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not reached yet.
    Pending,
    /// Current step.
    Active,
    /// Finished.
    Done,
}

/// A progress chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressTask {
    /// Step the chip stands for.
    pub step_id: String,
    /// Display label.
    pub label: String,
    /// Status.
    pub status: TaskStatus,
}

/// A collapsible run of tool calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolGroupView {
    /// Group id.
    pub group_id: String,
    /// Member steps in script order.
    pub step_ids: Vec<String>,
    /// Whether the group renders expanded.
    pub is_expanded: bool,
    /// Whether a member step is current.
    pub is_active: bool,
    /// Whether every member finished.
    pub is_complete: bool,
}

/// Sub-task progress of the running tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolProgress {
    /// Sub-tasks ticked off.
    pub done: usize,
    /// Sub-tasks declared.
    pub total: usize,
}

#[derive(Debug)]
enum ActiveStep {
    Text(StreamingText),
    Tool { done: usize, total: usize },
    Checkpoint,
}

fn is_tracked(step: &Step) -> bool {
    matches!(step.kind, StepKind::ToolCall(_) | StepKind::HitlCheckpoint(_))
}

fn task(step: &Step, status: TaskStatus) -> ProgressTask {
    ProgressTask {
        step_id: step.id.clone(),
        label: step.title.clone(),
        status,
    }
}

/// Project progress chips from the completion log and the current pointer.
///
/// Tool calls and checkpoints are tracked. Completed ones are listed first in
/// completion order, then the current step, then the steps reachable from it
/// up to and including the next checkpoint. The result depends on nothing
/// but the three arguments.
#[must_use]
pub fn project_progress(
    script: &Script,
    completed: &[String],
    current: Option<&str>,
) -> Vec<ProgressTask> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut tasks = Vec::new();

    for id in completed {
        let Some(step) = script.find(id) else {
            continue;
        };
        if is_tracked(step) && seen.insert(step.id.as_str()) {
            tasks.push(task(step, TaskStatus::Done));
        }
    }

    let Some(current_idx) = current.and_then(|id| script.position(id)) else {
        return tasks;
    };
    if let Some(step) = script.get(current_idx) {
        if is_tracked(step) {
            if seen.insert(step.id.as_str()) {
                tasks.push(task(step, TaskStatus::Active));
            } else if let Some(existing) = tasks.iter_mut().find(|t| t.step_id == step.id) {
                existing.status = TaskStatus::Active;
            }
        }
        if step.as_checkpoint().is_some() {
            return tasks;
        }
    }

    let mut visited: HashSet<usize> = HashSet::from([current_idx]);
    let mut cursor = script.successor(current_idx);
    while let Some(idx) = cursor {
        if !visited.insert(idx) {
            break;
        }
        let Some(step) = script.get(idx) else {
            break;
        };
        if is_tracked(step) && seen.insert(step.id.as_str()) {
            tasks.push(task(step, TaskStatus::Pending));
        }
        if step.as_checkpoint().is_some() {
            break;
        }
        cursor = script.successor(idx);
    }
    tasks
}

/// Runs one script.
#[derive(Debug)]
pub struct ScenarioStepEngine {
    script: Arc<Script>,
    timing: ScenarioTiming,
    phase: RunPhase,
    current: Option<usize>,
    completed: Vec<String>,
    selections: Vec<(String, String)>,
    active: Option<ActiveStep>,
    expansion: BTreeMap<String, bool>,
    timers: TimerLedger,
}

impl ScenarioStepEngine {
    /// Create an idle engine.
    #[must_use]
    pub fn new(script: Arc<Script>, timing: ScenarioTiming) -> Self {
        Self {
            script,
            timing,
            phase: RunPhase::Idle,
            current: None,
            completed: Vec::new(),
            selections: Vec::new(),
            active: None,
            expansion: BTreeMap::new(),
            timers: TimerLedger::new(),
        }
    }

    /// Begin the run. No-op unless idle; an empty script completes at once.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        if self.phase != RunPhase::Idle {
            debug!(script = self.script.name(), phase = ?self.phase, "start ignored");
            return fx;
        }
        info!(
            script = self.script.name(),
            version = self.script.version(),
            steps = self.script.len(),
            "scenario started"
        );
        if self.script.is_empty() {
            self.complete(&mut fx);
            return fx;
        }
        self.phase = RunPhase::Running;
        self.enter(0, &mut fx);
        fx
    }

    /// Answer the live checkpoint and continue along the branch chosen by
    /// `value`.
    ///
    /// # Errors
    ///
    /// Rejects the call, leaving the engine untouched, when the run is not
    /// paused, `step_id` is not the live checkpoint, or `value` is not one of
    /// its options.
    pub fn resume(&mut self, step_id: &str, value: &str) -> Result<Vec<Effect>, ResumeError> {
        let checked = self.check_resume(step_id, value);
        let idx = match checked {
            Ok(idx) => idx,
            Err(e) => {
                warn!(step_id, value, error = %e, "resume rejected");
                return Err(e);
            },
        };

        info!(step_id, value, "checkpoint resumed");
        let mut fx = Vec::new();
        self.completed.push(step_id.to_owned());
        self.selections.push((step_id.to_owned(), value.to_owned()));
        self.active = None;
        self.phase = RunPhase::Running;
        match self.script.branch_target(idx, value) {
            Some(target) => self.enter(target, &mut fx),
            None => self.complete(&mut fx),
        }
        Ok(fx)
    }

    fn check_resume(&self, step_id: &str, value: &str) -> Result<usize, ResumeError> {
        let (RunPhase::Paused, Some(idx)) = (self.phase, self.current) else {
            return Err(ResumeError::NotPaused);
        };
        let Some(step) = self.script.get(idx) else {
            return Err(ResumeError::NotPaused);
        };
        if step.id != step_id {
            return Err(ResumeError::StepMismatch {
                expected: step.id.clone(),
                requested: step_id.to_owned(),
            });
        }
        let offered = step
            .as_checkpoint()
            .is_some_and(|cp| cp.options.iter().any(|o| o.value == value));
        if !offered {
            return Err(ResumeError::UnknownOption {
                step: step_id.to_owned(),
                value: value.to_owned(),
            });
        }
        Ok(idx)
    }

    /// Cancel every timer and return to the never-started state.
    pub fn reset(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        if let Some(ActiveStep::Text(stream)) = &mut self.active {
            stream.cancel(&mut fx);
        }
        self.timers.cancel_all(&mut fx);
        self.phase = RunPhase::Idle;
        self.current = None;
        self.completed.clear();
        self.selections.clear();
        self.active = None;
        self.expansion.clear();
        info!(script = self.script.name(), "scenario reset");
        fx
    }

    /// Flip a group's expansion. Returns `false` for unknown groups.
    pub fn toggle_group(&mut self, group_id: &str) -> bool {
        let Some(view) = self.groups().into_iter().find(|g| g.group_id == group_id) else {
            return false;
        };
        self.expansion
            .insert(group_id.to_owned(), !view.is_expanded);
        debug!(group_id, expanded = !view.is_expanded, "group toggled");
        true
    }

    fn enter(&mut self, idx: usize, fx: &mut Vec<Effect>) {
        let Some(step) = self.script.get(idx).cloned() else {
            self.complete(fx);
            return;
        };
        self.current = Some(idx);
        debug!(step_id = %step.id, "step started");
        fx.push(Effect::Emit(EngineEvent::StepStarted {
            step_id: step.id.clone(),
        }));

        match step.kind {
            StepKind::AgentText { text } => {
                let mut stream = StreamingText::new(text, self.timing.text_char_delay);
                stream.start(fx);
                self.active = Some(ActiveStep::Text(stream));
            },
            StepKind::ToolCall(call) => {
                if let Some(panel) = call.panel {
                    fx.push(Effect::Emit(EngineEvent::PanelChanged { panel }));
                }
                self.timers.issue(
                    TimerPurpose::ToolProgress,
                    self.timing.tool_subtask_delay,
                    fx,
                );
                self.active = Some(ActiveStep::Tool {
                    done: 0,
                    total: call.subtasks.len(),
                });
            },
            StepKind::HitlCheckpoint(cp) => {
                self.timers.cancel_all(fx);
                self.phase = RunPhase::Paused;
                self.active = Some(ActiveStep::Checkpoint);
                info!(step_id = %step.id, options = cp.options.len(), "paused at checkpoint");
                fx.push(Effect::Emit(EngineEvent::CheckpointReached {
                    checkpoint: HitlCheckpoint {
                        step_id: step.id.clone(),
                        question: cp.question,
                        options: cp.options,
                        scopes: cp.scopes,
                    },
                }));
            },
        }
        self.emit_progress(fx);
    }

    fn finish_current(&mut self, fx: &mut Vec<Effect>) {
        let Some(idx) = self.current else {
            return;
        };
        let Some(step) = self.script.get(idx) else {
            return;
        };
        debug!(step_id = %step.id, "step finished");
        self.completed.push(step.id.clone());
        if let StepKind::ToolCall(call) = &step.kind {
            self.timers.retire(TimerPurpose::ToolProgress, fx);
            if call.panel.is_some() {
                fx.push(Effect::Emit(EngineEvent::VisualizationComplete {
                    complete: true,
                }));
            }
        }
        self.active = None;
        match self.script.successor(idx) {
            Some(next) => self.enter(next, fx),
            None => self.complete(fx),
        }
    }

    fn complete(&mut self, fx: &mut Vec<Effect>) {
        self.timers.cancel_all(fx);
        self.phase = RunPhase::Complete;
        self.current = None;
        self.active = None;
        info!(
            script = self.script.name(),
            steps = self.completed.len(),
            "scenario complete"
        );
        self.emit_progress(fx);
        fx.push(Effect::Emit(EngineEvent::ScenarioCompleted));
    }

    fn emit_progress(&self, fx: &mut Vec<Effect>) {
        fx.push(Effect::Emit(EngineEvent::ProgressUpdated {
            tasks: self.progress_tasks(),
        }));
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// The script being run.
    #[must_use]
    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    /// Step being rendered or awaiting input.
    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        self.current.and_then(|i| self.script.get(i))
    }

    /// Snapshot of the run state.
    #[must_use]
    pub fn run_state(&self) -> ScenarioRunState {
        ScenarioRunState {
            current_step_id: self.current_step().map(|s| s.id.clone()),
            completed_step_ids: self.completed.clone(),
            is_running: matches!(self.phase, RunPhase::Running | RunPhase::Paused),
            is_paused: self.phase == RunPhase::Paused,
            is_complete: self.phase == RunPhase::Complete,
        }
    }

    /// Finished step ids in completion order.
    #[must_use]
    pub fn completed_step_ids(&self) -> &[String] {
        &self.completed
    }

    /// Finished steps in completion order.
    pub fn completed_steps(&self) -> impl Iterator<Item = &Step> {
        self.completed.iter().filter_map(|id| self.script.find(id))
    }

    /// Accepted `(checkpoint, value)` pairs in order.
    #[must_use]
    pub fn selections(&self) -> &[(String, String)] {
        &self.selections
    }

    /// Value chosen at `step_id`, if it was answered.
    #[must_use]
    pub fn selection(&self, step_id: &str) -> Option<&str> {
        self.selections
            .iter()
            .rev()
            .find_map(|(step, value)| (step == step_id).then_some(value.as_str()))
    }

    /// The live checkpoint while paused.
    #[must_use]
    pub fn checkpoint(&self) -> Option<HitlCheckpoint> {
        if self.phase != RunPhase::Paused {
            return None;
        }
        let step = self.current_step()?;
        let cp = step.as_checkpoint()?;
        Some(HitlCheckpoint {
            step_id: step.id.clone(),
            question: cp.question.clone(),
            options: cp.options.clone(),
            scopes: cp.scopes.clone(),
        })
    }

    /// The streaming agent text, while one is rendering.
    #[must_use]
    pub fn active_text(&self) -> Option<&StreamingText> {
        match &self.active {
            Some(ActiveStep::Text(stream)) => Some(stream),
            Some(ActiveStep::Tool { .. } | ActiveStep::Checkpoint) | None => None,
        }
    }

    /// Sub-task progress of the running tool call.
    #[must_use]
    pub fn tool_progress(&self) -> Option<ToolProgress> {
        match self.active {
            Some(ActiveStep::Tool { done, total }) => Some(ToolProgress { done, total }),
            Some(ActiveStep::Text(_) | ActiveStep::Checkpoint) | None => None,
        }
    }

    /// Progress chips for the current state.
    #[must_use]
    pub fn progress_tasks(&self) -> Vec<ProgressTask> {
        let current = self.current_step().map(|s| s.id.as_str());
        project_progress(&self.script, &self.completed, current)
    }

    /// Tool-call groups with their expansion state.
    #[must_use]
    pub fn groups(&self) -> Vec<ToolGroupView> {
        let done: HashSet<&str> = self.completed.iter().map(String::as_str).collect();
        self.script
            .groups()
            .into_iter()
            .map(|(group_id, members)| {
                let is_active = self.current.is_some_and(|c| members.contains(&c));
                let step_ids: Vec<String> = members
                    .iter()
                    .filter_map(|i| self.script.get(*i))
                    .map(|s| s.id.clone())
                    .collect();
                let is_complete = step_ids.iter().all(|id| done.contains(id.as_str()));
                let is_expanded = self.expansion.get(group_id).copied().unwrap_or(is_active);
                ToolGroupView {
                    group_id: group_id.to_owned(),
                    step_ids,
                    is_expanded,
                    is_active,
                    is_complete,
                }
            })
            .collect()
    }

    /// Whether any timer is live.
    #[must_use]
    pub fn has_live_timers(&self) -> bool {
        let streaming = self.active_text().is_some_and(StreamingText::is_streaming);
        streaming || !self.timers.is_idle()
    }
}

impl TimerDriven for ScenarioStepEngine {
    fn on_timer(&mut self, id: TimerId) -> Vec<Effect> {
        let mut fx = Vec::new();
        if self.phase != RunPhase::Running {
            trace!(%id, phase = ?self.phase, "discarding tick outside a run");
            return fx;
        }
        let finished = match &mut self.active {
            Some(ActiveStep::Text(stream)) => stream.on_timer(id, &mut fx) == StreamTick::Completed,
            Some(ActiveStep::Tool { done, total })
                if self.timers.purpose_of(id) == Some(TimerPurpose::ToolProgress) =>
            {
                *done = done.saturating_add(1).min(*total);
                *done >= *total
            },
            _ => {
                trace!(%id, "discarding stale scenario tick");
                false
            },
        };
        if finished {
            self.finish_current(&mut fx);
        }
        fx
    }
}
