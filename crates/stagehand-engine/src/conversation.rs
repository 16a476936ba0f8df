//! One demo conversation: a routed query, its scenario, the slide deck it may
//! produce, the dashboard drill-down and the resulting artifacts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::drill::DrillDownNavigator;
use crate::error::{EngineResult, ResumeError};
use crate::events::{EngineEvent, Panel};
use crate::fixtures;
use crate::scenario::{ScenarioStepEngine, ScenarioTiming};
use crate::slides::{SlideContent, SlideGenerationEngine};
use crate::timer::{Effect, TimerDriven, TimerId};

/// Default per-character delay for slide content.
pub const DEFAULT_SLIDE_CHAR_DELAY: Duration = Duration::from_millis(20);

const PRESENTATION_KEYWORDS: &[&str] = &["ppt", "slide", "deck", "presentation", "演示", "幻灯片"];

/// Which scripted flow a query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Sales analysis with a dashboard.
    SalesAnalysis,
    /// Slide deck generation.
    Presentation,
}

impl ScenarioKind {
    /// Name of the built-in script for this kind.
    #[must_use]
    pub fn script_name(self) -> &'static str {
        match self {
            Self::SalesAnalysis => fixtures::SALES_SCRIPT,
            Self::Presentation => fixtures::PPT_SCRIPT,
        }
    }

    /// Kind registered under a script name.
    #[must_use]
    pub fn from_script_name(name: &str) -> Option<Self> {
        match name {
            fixtures::SALES_SCRIPT => Some(Self::SalesAnalysis),
            fixtures::PPT_SCRIPT => Some(Self::Presentation),
            _ => None,
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SalesAnalysis => write!(f, "sales analysis"),
            Self::Presentation => write!(f, "presentation"),
        }
    }
}

/// Pick the scenario for a free-text query.
#[must_use]
pub fn route_query(query: &str) -> ScenarioKind {
    let lowered = query.to_lowercase();
    if PRESENTATION_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        ScenarioKind::Presentation
    } else {
        ScenarioKind::SalesAnalysis
    }
}

/// Kind of generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A generated slide deck.
    SlideDeck,
}

/// Something the conversation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique id.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Kind.
    pub kind: ArtifactKind,
    /// Number of slides, for decks.
    pub slide_count: usize,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Pacing and limits for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationSettings {
    /// Scenario pacing.
    pub timing: ScenarioTiming,
    /// Per-character slide delay.
    pub slide_char_delay: Duration,
    /// Slide count used when the user picks nothing usable.
    pub default_slide_count: usize,
    /// Upper bound on the slide count.
    pub max_slide_count: usize,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            timing: ScenarioTiming::default(),
            slide_char_delay: DEFAULT_SLIDE_CHAR_DELAY,
            default_slide_count: 6,
            max_slide_count: 20,
        }
    }
}

impl ConversationSettings {
    fn clamp_slide_count(&self, count: usize) -> usize {
        count.clamp(1, self.max_slide_count.max(1))
    }
}

/// Owns every engine a single conversation needs.
#[derive(Debug)]
pub struct Conversation {
    settings: ConversationSettings,
    query: Option<String>,
    kind: Option<ScenarioKind>,
    scenario: Option<ScenarioStepEngine>,
    slides: Option<SlideGenerationEngine>,
    drill: DrillDownNavigator,
    artifacts: Vec<Artifact>,
    panel: Option<Panel>,
}

impl Conversation {
    /// An empty conversation.
    #[must_use]
    pub fn new(settings: ConversationSettings) -> Self {
        Self {
            settings,
            query: None,
            kind: None,
            scenario: None,
            slides: None,
            drill: DrillDownNavigator::new(fixtures::sales_drill_table()),
            artifacts: Vec::new(),
            panel: None,
        }
    }

    /// Route `query` and start its scenario. A query submitted while one is
    /// already active is ignored until [`reset`](Self::reset).
    ///
    /// # Errors
    ///
    /// Fails if the built-in script for the routed scenario is invalid.
    pub fn submit(&mut self, query: &str) -> EngineResult<Vec<Effect>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        if self.query.is_some() {
            debug!(query, "conversation already active, query ignored");
            return Ok(Vec::new());
        }
        let kind = route_query(query);
        self.start_kind(kind, query)
    }

    /// Start a specific scenario, bypassing routing.
    ///
    /// # Errors
    ///
    /// Fails if the built-in script for `kind` is invalid.
    pub fn start_kind(&mut self, kind: ScenarioKind, query: &str) -> EngineResult<Vec<Effect>> {
        if self.query.is_some() {
            return Ok(Vec::new());
        }
        let script = fixtures::script(kind.script_name())?;
        info!(%kind, query, "conversation started");

        let mut fx = Vec::new();
        if kind == ScenarioKind::Presentation {
            let mut deck = SlideGenerationEngine::new(
                fixtures::deck_contents(),
                self.settings.slide_char_delay,
            );
            let count = self.settings.clamp_slide_count(self.settings.default_slide_count);
            fx.extend(deck.set_slide_count(count));
            self.slides = Some(deck);
        }
        let mut engine = ScenarioStepEngine::new(Arc::new(script), self.settings.timing);
        fx.extend(engine.start());

        self.query = Some(query.to_owned());
        self.kind = Some(kind);
        self.scenario = Some(engine);
        Ok(self.follow_up(fx))
    }

    /// Answer the live checkpoint.
    ///
    /// # Errors
    ///
    /// Passes on the scenario's rejection; no scenario means
    /// [`ResumeError::NotPaused`].
    pub fn resume(&mut self, step_id: &str, value: &str) -> Result<Vec<Effect>, ResumeError> {
        let engine = self.scenario.as_mut().ok_or(ResumeError::NotPaused)?;
        let mut fx = engine.resume(step_id, value)?;
        if step_id == fixtures::SLIDE_COUNT_CHECKPOINT {
            if let (Some(deck), Ok(count)) = (self.slides.as_mut(), value.parse::<usize>()) {
                fx.extend(deck.set_slide_count(self.settings.clamp_slide_count(count)));
            }
        }
        Ok(self.follow_up(fx))
    }

    /// Drop the conversation and cancel every timer it owns. Artifacts
    /// outlive the conversation that produced them.
    pub fn reset(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        if let Some(mut engine) = self.scenario.take() {
            fx.extend(engine.reset());
        }
        if let Some(mut deck) = self.slides.take() {
            fx.extend(deck.reset());
        }
        self.drill.reset();
        self.query = None;
        self.kind = None;
        self.panel = None;
        info!(artifacts = self.artifacts.len(), "conversation reset");
        fx
    }

    /// Apply reactions to emitted events, appending their effects in order.
    fn follow_up(&mut self, mut fx: Vec<Effect>) -> Vec<Effect> {
        let mut i: usize = 0;
        while let Some(effect) = fx.get(i) {
            let extra = match effect.as_event() {
                Some(event) => self.react(event),
                None => Vec::new(),
            };
            fx.extend(extra);
            i = i.saturating_add(1);
        }
        fx
    }

    fn react(&mut self, event: &EngineEvent) -> Vec<Effect> {
        match event {
            EngineEvent::PanelChanged { panel } => {
                self.panel = Some(*panel);
                Vec::new()
            },
            EngineEvent::ScenarioCompleted => match self.slides.as_mut() {
                Some(deck) => deck.start(),
                None => Vec::new(),
            },
            EngineEvent::GenerationCompleted => {
                self.record_deck();
                vec![Effect::Emit(EngineEvent::PanelChanged {
                    panel: Panel::Artifacts,
                })]
            },
            _ => Vec::new(),
        }
    }

    fn record_deck(&mut self) {
        let Some(deck) = self.slides.as_ref() else {
            return;
        };
        let title = fixtures::deck_contents()
            .into_iter()
            .next()
            .map_or_else(|| "Slide deck".to_owned(), |s: SlideContent| s.title);
        let artifact = Artifact {
            id: Uuid::new_v4(),
            title,
            kind: ArtifactKind::SlideDeck,
            slide_count: deck.slide_count(),
            created_at: Utc::now(),
        };
        info!(artifact_id = %artifact.id, slides = artifact.slide_count, "artifact recorded");
        self.artifacts.push(artifact);
    }

    /// The submitted query.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Routed scenario kind.
    #[must_use]
    pub fn kind(&self) -> Option<ScenarioKind> {
        self.kind
    }

    /// The running scenario.
    #[must_use]
    pub fn scenario(&self) -> Option<&ScenarioStepEngine> {
        self.scenario.as_ref()
    }

    /// Scenario engine, mutably, for UI-only operations such as group toggles.
    pub fn scenario_mut(&mut self) -> Option<&mut ScenarioStepEngine> {
        self.scenario.as_mut()
    }

    /// The slide deck, on the presentation path.
    #[must_use]
    pub fn slides(&self) -> Option<&SlideGenerationEngine> {
        self.slides.as_ref()
    }

    /// Dashboard drill-down.
    #[must_use]
    pub fn drill(&self) -> &DrillDownNavigator {
        &self.drill
    }

    /// Dashboard drill-down, mutably.
    pub fn drill_mut(&mut self) -> &mut DrillDownNavigator {
        &mut self.drill
    }

    /// Generated artifacts.
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Side panel last requested by the engines.
    #[must_use]
    pub fn panel(&self) -> Option<Panel> {
        self.panel
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    /// Whether every flow this conversation started has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        let scenario_done = self
            .scenario
            .as_ref()
            .is_some_and(|s| s.run_state().is_complete);
        let deck_done = self.slides.as_ref().is_none_or(SlideGenerationEngine::is_complete);
        scenario_done && deck_done
    }
}

impl TimerDriven for Conversation {
    fn on_timer(&mut self, id: TimerId) -> Vec<Effect> {
        let mut fx = Vec::new();
        if let Some(engine) = self.scenario.as_mut() {
            fx.extend(engine.on_timer(id));
        }
        if let Some(deck) = self.slides.as_mut() {
            fx.extend(deck.on_timer(id));
        }
        self.follow_up(fx)
    }
}
