//! Scenario scripts.
//!
//! A [`Script`] is immutable once built. Validation happens up front so the
//! step engine can follow `next` pointers and branch tables without checking
//! them again.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::events::Panel;

/// A selectable answer at a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Button label.
    pub label: String,
    /// Value reported to `resume`.
    pub value: String,
}

impl ChoiceOption {
    /// Build an option.
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A scripted tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name shown in the transcript.
    pub tool: String,
    /// One-line description.
    pub description: String,
    /// Progress rows ticked off one per interval.
    #[serde(default)]
    pub subtasks: Vec<String>,
    /// Panel opened while the tool runs.
    #[serde(default)]
    pub panel: Option<Panel>,
}

/// A human-in-the-loop pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Question put to the user.
    pub question: String,
    /// Options in display order.
    pub options: Vec<ChoiceOption>,
    /// Option value to target step id. Unlisted options fall through to
    /// the checkpoint's successor.
    #[serde(default)]
    pub branches: HashMap<String, String>,
    /// Candidate analysis scopes, when the checkpoint is a scope selector.
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Streamed agent prose.
    AgentText {
        /// Full text, may contain `**bold**`.
        text: String,
    },
    /// A tool invocation with sub-task progress.
    ToolCall(ToolCall),
    /// A pause for a human decision.
    HitlCheckpoint(Checkpoint),
}

/// One scripted unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Stable id.
    pub id: String,
    /// Label for progress chips.
    pub title: String,
    /// Behaviour.
    #[serde(flatten)]
    pub kind: StepKind,
    /// Collapsible group shared with adjacent tool calls.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Explicit successor; defaults to the next step in script order.
    #[serde(default)]
    pub next: Option<String>,
}

impl Step {
    /// Agent text step.
    #[must_use]
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            kind: StepKind::AgentText { text: text.into() },
            group_id: None,
            next: None,
        }
    }

    /// Tool call step.
    #[must_use]
    pub fn tool(id: impl Into<String>, title: impl Into<String>, call: ToolCall) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: StepKind::ToolCall(call),
            group_id: None,
            next: None,
        }
    }

    /// Checkpoint step.
    #[must_use]
    pub fn checkpoint(
        id: impl Into<String>,
        title: impl Into<String>,
        checkpoint: Checkpoint,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: StepKind::HitlCheckpoint(checkpoint),
            group_id: None,
            next: None,
        }
    }

    /// Put the step in a tool-call group.
    #[must_use]
    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Set an explicit successor.
    #[must_use]
    pub fn then(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Whether the step is a tool call.
    #[must_use]
    pub fn is_tool_call(&self) -> bool {
        matches!(self.kind, StepKind::ToolCall(_))
    }

    /// The checkpoint payload, for checkpoint steps.
    #[must_use]
    pub fn as_checkpoint(&self) -> Option<&Checkpoint> {
        match &self.kind {
            StepKind::HitlCheckpoint(cp) => Some(cp),
            StepKind::AgentText { .. } | StepKind::ToolCall(_) => None,
        }
    }
}

/// A validated, versioned list of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    name: String,
    version: u32,
    steps: Vec<Step>,
    index: HashMap<String, usize>,
}

impl Script {
    /// Validate and index `steps`.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] for duplicate ids, dangling `next` or branch
    /// targets, checkpoints without options, branches for undeclared options,
    /// group ids on non-tool steps, or groups split by another step.
    pub fn new(name: impl Into<String>, version: u32, steps: Vec<Step>) -> Result<Self, ScriptError> {
        let mut index = HashMap::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            if index.insert(step.id.clone(), i).is_some() {
                return Err(ScriptError::DuplicateStep(step.id.clone()));
            }
        }

        let mut closed_groups: HashSet<&str> = HashSet::new();
        let mut open_group: Option<&str> = None;
        for step in &steps {
            if let Some(target) = &step.next {
                if !index.contains_key(target) {
                    return Err(ScriptError::UnknownSuccessor {
                        step: step.id.clone(),
                        target: target.clone(),
                    });
                }
            }
            if let Some(cp) = step.as_checkpoint() {
                validate_checkpoint(&step.id, cp, &index)?;
            }

            let group = step.group_id.as_deref();
            if let Some(group) = group {
                if !step.is_tool_call() {
                    return Err(ScriptError::GroupOnNonTool {
                        step: step.id.clone(),
                        group: group.to_owned(),
                    });
                }
                if closed_groups.contains(group) {
                    return Err(ScriptError::SplitGroup {
                        group: group.to_owned(),
                        step: step.id.clone(),
                    });
                }
            }
            if open_group != group {
                if let Some(done) = open_group {
                    closed_groups.insert(done);
                }
                open_group = group;
            }
        }

        Ok(Self {
            name: name.into(),
            version,
            steps,
            index,
        })
    }

    /// An empty script.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            steps: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Script name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Script version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Steps in script order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the script has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Position of the step with `id`.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Step with `id`.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Step> {
        self.position(id).and_then(|i| self.steps.get(i))
    }

    /// Successor of the step at `index`: its `next` pointer, else the
    /// following step. `None` marks the terminal step.
    #[must_use]
    pub fn successor(&self, index: usize) -> Option<usize> {
        let step = self.steps.get(index)?;
        match &step.next {
            Some(next) => self.position(next),
            None => {
                let following = index.checked_add(1)?;
                (following < self.steps.len()).then_some(following)
            },
        }
    }

    /// Where a checkpoint goes for `value`. Unlisted options fall through to
    /// the successor.
    #[must_use]
    pub fn branch_target(&self, index: usize, value: &str) -> Option<usize> {
        let cp = self.steps.get(index)?.as_checkpoint()?;
        match cp.branches.get(value) {
            Some(target) => self.position(target),
            None => self.successor(index),
        }
    }

    /// Contiguous runs of steps sharing a group id, as `(group_id, indices)`.
    #[must_use]
    pub fn groups(&self) -> Vec<(&str, Vec<usize>)> {
        let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
        for (i, step) in self.steps.iter().enumerate() {
            let Some(group) = step.group_id.as_deref() else {
                continue;
            };
            match groups.last_mut() {
                Some((last, members)) if *last == group => members.push(i),
                _ => groups.push((group, vec![i])),
            }
        }
        groups
    }
}

fn validate_checkpoint(
    step_id: &str,
    cp: &Checkpoint,
    index: &HashMap<String, usize>,
) -> Result<(), ScriptError> {
    if cp.options.is_empty() {
        return Err(ScriptError::EmptyCheckpoint(step_id.to_owned()));
    }
    let mut values = HashSet::new();
    for option in &cp.options {
        if !values.insert(option.value.as_str()) {
            return Err(ScriptError::DuplicateOption {
                step: step_id.to_owned(),
                option: option.value.clone(),
            });
        }
    }
    for (option, target) in &cp.branches {
        if !values.contains(option.as_str()) {
            return Err(ScriptError::UndeclaredBranchOption {
                step: step_id.to_owned(),
                option: option.clone(),
            });
        }
        if !index.contains_key(target) {
            return Err(ScriptError::UnknownBranchTarget {
                step: step_id.to_owned(),
                option: option.clone(),
                target: target.clone(),
            });
        }
    }
    Ok(())
}
