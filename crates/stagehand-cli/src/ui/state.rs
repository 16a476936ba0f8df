//! UI state: the conversation, its clock and shell-only selections.

use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use stagehand_engine::{
    Conversation, ConversationSettings, Effect, EngineEvent, MenuPosition, Panel, ScenarioKind,
    ScenarioStepEngine, VirtualScheduler, fixtures,
};
use tracing::{debug, info, warn};

use super::Term;

/// Dashboard charts in display order.
pub(crate) const CHARTS: [&str; 2] = [fixtures::REGION_CHART, fixtures::QUARTER_CHART];

/// Event types kept for the activity line.
const RECENT_EVENTS: usize = 6;

/// Pane that receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Focus {
    /// Query line.
    #[default]
    Input,
    /// Tool-call groups in the transcript.
    Groups,
    /// Dashboard charts.
    Dashboard,
}

impl Focus {
    /// Next pane in Tab order.
    pub(crate) fn next(self) -> Self {
        match self {
            Self::Input => Self::Groups,
            Self::Groups => Self::Dashboard,
            Self::Dashboard => Self::Input,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Groups => "groups",
            Self::Dashboard => "dashboard",
        }
    }
}

/// Shell state around one [`Conversation`].
#[derive(Debug)]
pub(crate) struct App {
    pub conversation: Conversation,
    pub scheduler: VirtualScheduler,
    pub input: String,
    pub focus: Focus,
    pub focused_group: usize,
    pub chart: usize,
    pub selected_point: usize,
    pub recent_events: VecDeque<&'static str>,
    pub notice: Option<String>,
    pub should_quit: bool,
    pub quit_pending: bool,
}

impl App {
    pub(crate) fn new(settings: ConversationSettings) -> Self {
        Self {
            conversation: Conversation::new(settings),
            scheduler: VirtualScheduler::new(),
            input: String::new(),
            focus: Focus::default(),
            focused_group: 0,
            chart: 0,
            selected_point: 0,
            recent_events: VecDeque::with_capacity(RECENT_EVENTS),
            notice: None,
            should_quit: false,
            quit_pending: false,
        }
    }

    /// Hand effects to the scheduler and absorb the events they carry.
    pub(crate) fn apply(&mut self, fx: Vec<Effect>) {
        self.scheduler.apply(fx);
        self.drain_events();
    }

    fn drain_events(&mut self) {
        for event in self.scheduler.take_events() {
            debug!(event_type = event.event_type(), "engine event");
            if matches!(event, EngineEvent::PanelChanged {
                panel: Panel::Dashboard
            }) {
                self.chart = 0;
                self.selected_point = 0;
            }
            if self.recent_events.len() >= RECENT_EVENTS {
                self.recent_events.pop_front();
            }
            self.recent_events.push_back(event.event_type());
        }
    }

    /// Advance the virtual clock by `elapsed`. Returns delivered ticks.
    pub(crate) fn tick(&mut self, elapsed: Duration) -> usize {
        let delivered = self.scheduler.advance(&mut self.conversation, elapsed);
        self.drain_events();
        delivered
    }

    /// Deliver the next due tick. Returns `false` when no timer is live.
    pub(crate) fn step(&mut self) -> bool {
        let fired = self.scheduler.step(&mut self.conversation).is_some();
        self.drain_events();
        fired
    }

    /// Whether a scenario has been started.
    pub(crate) fn is_active(&self) -> bool {
        self.conversation.query().is_some()
    }

    /// Handle Enter on the query line.
    pub(crate) fn submit_input(&mut self) {
        let line = std::mem::take(&mut self.input);
        match line.trim() {
            "" => {},
            "/reset" => self.reset(),
            "/quit" => self.should_quit = true,
            query => self.submit(query),
        }
    }

    /// Route and start `query`.
    pub(crate) fn submit(&mut self, query: &str) {
        if self.is_active() {
            self.notice = Some("A scenario is running; /reset to start over".to_owned());
            return;
        }
        match self.conversation.submit(query) {
            Ok(fx) => {
                self.notice = None;
                self.apply(fx);
            },
            Err(e) => {
                warn!(error = %e, "failed to start scenario");
                self.notice = Some(e.to_string());
            },
        }
    }

    /// Start `kind` directly, bypassing routing.
    pub(crate) fn start_kind(&mut self, kind: ScenarioKind, query: &str) {
        match self.conversation.start_kind(kind, query) {
            Ok(fx) => self.apply(fx),
            Err(e) => {
                warn!(error = %e, %kind, "failed to start scenario");
                self.notice = Some(e.to_string());
            },
        }
    }

    /// Options of the live checkpoint, if the run is paused on one.
    fn live_checkpoint(&self) -> Option<stagehand_engine::HitlCheckpoint> {
        self.conversation
            .scenario()
            .and_then(ScenarioStepEngine::checkpoint)
    }

    /// Whether the run waits at a checkpoint.
    pub(crate) fn awaiting_choice(&self) -> bool {
        self.live_checkpoint().is_some()
    }

    /// Answer the live checkpoint with its `index`-th option.
    pub(crate) fn answer(&mut self, index: usize) -> bool {
        let Some(checkpoint) = self.live_checkpoint() else {
            return false;
        };
        let Some(option) = checkpoint.options.get(index) else {
            self.notice = Some(format!("No option {}", index.saturating_add(1)));
            return false;
        };
        match self.conversation.resume(&checkpoint.step_id, &option.value) {
            Ok(fx) => {
                info!(step_id = %checkpoint.step_id, value = %option.value, "checkpoint answered");
                self.notice = None;
                self.apply(fx);
                true
            },
            Err(e) => {
                self.notice = Some(e.to_string());
                false
            },
        }
    }

    /// Answer the live checkpoint by option value or label. Unknown choices
    /// fall back to the first option.
    pub(crate) fn answer_with(&mut self, choice: &str) -> bool {
        let Some(checkpoint) = self.live_checkpoint() else {
            return false;
        };
        let index = checkpoint
            .options
            .iter()
            .position(|o| o.value == choice || o.label.eq_ignore_ascii_case(choice))
            .unwrap_or_else(|| {
                debug!(choice, step_id = %checkpoint.step_id, "choice not offered, using first option");
                0
            });
        self.answer(index)
    }

    /// Move group focus to the next tool-call group.
    pub(crate) fn cycle_group(&mut self, forward: bool) {
        let count = self
            .conversation
            .scenario()
            .map_or(0, |s| s.groups().len());
        self.focused_group = step_index(self.focused_group, count, forward);
    }

    /// Expand or collapse the focused group.
    pub(crate) fn toggle_focused_group(&mut self) -> bool {
        let focused = self.focused_group;
        let Some(engine) = self.conversation.scenario_mut() else {
            return false;
        };
        let Some(group_id) = engine.groups().get(focused).map(|g| g.group_id.clone()) else {
            return false;
        };
        engine.toggle_group(&group_id)
    }

    /// Chart shown on the dashboard.
    pub(crate) fn chart_id(&self) -> &'static str {
        CHARTS.get(self.chart).copied().unwrap_or(fixtures::REGION_CHART)
    }

    /// Show the next chart.
    pub(crate) fn next_chart(&mut self) {
        self.chart = step_index(self.chart, CHARTS.len(), true);
        self.selected_point = 0;
        self.conversation.drill_mut().close_menu();
    }

    /// Move the element selection within the visible series.
    pub(crate) fn move_selection(&mut self, forward: bool) {
        let len = self
            .conversation
            .drill()
            .series(self.chart_id())
            .map_or(0, <[_]>::len);
        self.selected_point = step_index(self.selected_point, len, forward);
    }

    /// Open the drill menu on the selected element.
    pub(crate) fn open_menu(&mut self) -> bool {
        let chart_id = self.chart_id();
        let Some(point) = self
            .conversation
            .drill()
            .series(chart_id)
            .and_then(|s| s.get(self.selected_point))
            .cloned()
        else {
            return false;
        };
        let position = MenuPosition {
            x: 2,
            y: u16::try_from(self.selected_point)
                .unwrap_or(u16::MAX)
                .saturating_add(3),
        };
        let opened =
            self.conversation
                .drill_mut()
                .open_context_menu(chart_id, &point.label, point.value, position);
        if !opened {
            self.notice = Some(format!("{} has no further breakdown", point.label));
        }
        opened
    }

    /// Drill into the `index`-th dimension of the open menu.
    pub(crate) fn pick_dimension(&mut self, index: usize) -> bool {
        let Some(dimension_id) = self
            .conversation
            .drill()
            .menu()
            .and_then(|m| m.items.get(index))
            .map(|item| item.dimension_id.clone())
        else {
            return false;
        };
        let drilled = self.conversation.drill_mut().select_dimension(&dimension_id);
        if drilled {
            self.selected_point = 0;
            self.notice = None;
        }
        drilled
    }

    /// Go back one breadcrumb.
    pub(crate) fn drill_back(&mut self) -> bool {
        let Some(depth) = self.conversation.drill().state().map(|s| s.path.len()) else {
            return false;
        };
        let moved = self.conversation.drill_mut().go_back(depth.saturating_sub(2));
        if moved {
            self.selected_point = 0;
        }
        moved
    }

    /// Drop the conversation and every shell selection.
    pub(crate) fn reset(&mut self) {
        let fx = self.conversation.reset();
        self.apply(fx);
        self.input.clear();
        self.focus = Focus::Input;
        self.focused_group = 0;
        self.chart = 0;
        self.selected_point = 0;
        self.recent_events.clear();
        self.notice = None;
        info!("shell reset");
    }

    /// Interactive loop: the virtual clock follows the wall clock.
    pub(crate) fn run(&mut self, terminal: &mut Term) -> io::Result<()> {
        // Render interval (60fps max, but we debounce)
        let render_interval = Duration::from_millis(16);
        let started = Instant::now();
        let mut last_render: Option<Instant> = None;

        loop {
            let behind = started.elapsed().saturating_sub(self.scheduler.now());
            if behind >= Duration::from_millis(1) {
                self.tick(behind);
            }

            if last_render.is_none_or(|t| t.elapsed() >= render_interval) {
                terminal.draw(|frame| super::render_frame(frame, self))?;
                last_render = Some(Instant::now());
            }

            // Handle input with a small timeout to allow responsive rendering
            if crossterm::event::poll(Duration::from_millis(10))? {
                super::handle_input(self)?;
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }
}

/// Wrap-around step through `0..len`.
fn step_index(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    let current = current.min(len.saturating_sub(1));
    if forward {
        current.saturating_add(1).checked_rem(len).unwrap_or(0)
    } else if current == 0 {
        len.saturating_sub(1)
    } else {
        current.saturating_sub(1)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use stagehand_engine::ScenarioTiming;

    use super::*;

    pub(crate) fn fast_app() -> App {
        App::new(ConversationSettings {
            timing: ScenarioTiming::default()
                .with_text_char_delay(Duration::from_millis(1))
                .with_tool_subtask_delay(Duration::from_millis(2)),
            slide_char_delay: Duration::from_millis(1),
            ..ConversationSettings::default()
        })
    }

    pub(crate) fn run_to_pause_or_end(app: &mut App) {
        let mut guard: usize = 0;
        while !app.awaiting_choice() && guard < 100_000 && app.step() {
            guard = guard.saturating_add(1);
        }
    }

    #[test]
    fn test_step_index_wraps() {
        assert_eq!(step_index(0, 3, true), 1);
        assert_eq!(step_index(2, 3, true), 0);
        assert_eq!(step_index(0, 3, false), 2);
        assert_eq!(step_index(5, 3, false), 1);
        assert_eq!(step_index(4, 0, true), 0);
    }

    #[test]
    fn test_second_query_is_refused() {
        let mut app = fast_app();
        app.submit("analyze Q3 sales");
        assert!(app.is_active());
        app.submit("make a deck");
        assert!(app.notice.is_some());
        assert_eq!(app.conversation.query(), Some("analyze Q3 sales"));
    }

    #[test]
    fn test_submit_input_commands() {
        let mut app = fast_app();
        app.input = "analyze sales".to_owned();
        app.submit_input();
        assert!(app.is_active());
        assert!(app.input.is_empty());

        app.input = "/reset".to_owned();
        app.submit_input();
        assert!(!app.is_active());
        assert!(app.scheduler.is_idle());

        app.input = "/quit".to_owned();
        app.submit_input();
        assert!(app.should_quit);
    }

    #[test]
    fn test_answer_resumes_checkpoint() {
        let mut app = fast_app();
        app.submit("analyze sales");
        run_to_pause_or_end(&mut app);
        assert!(app.awaiting_choice());

        assert!(!app.answer(9));
        assert!(app.notice.is_some());
        assert!(app.awaiting_choice());

        assert!(app.answer_with("quick"));
        assert!(!app.awaiting_choice());
        let engine = app.conversation.scenario().unwrap();
        assert_eq!(engine.selection("scope"), Some("quick"));
    }

    #[test]
    fn test_unknown_choice_uses_first_option() {
        let mut app = fast_app();
        app.submit("make a slide deck");
        run_to_pause_or_end(&mut app);
        assert!(app.answer_with("forty"));
        let engine = app.conversation.scenario().unwrap();
        assert_eq!(
            engine.selection(fixtures::SLIDE_COUNT_CHECKPOINT),
            Some("4")
        );
    }

    #[test]
    fn test_dashboard_drill_and_back() {
        let mut app = fast_app();
        assert_eq!(app.chart_id(), fixtures::REGION_CHART);

        // East is drillable, West is not.
        assert!(app.open_menu());
        assert!(app.pick_dimension(0));
        let depth = app.conversation.drill().state().unwrap().path.len();
        assert_eq!(depth, 2);

        assert!(app.drill_back());
        assert!(app.conversation.drill().state().is_none());
        assert!(!app.drill_back());

        app.move_selection(true);
        assert!(!app.open_menu());
        assert!(app.notice.as_deref().unwrap().contains("West"));
    }

    #[test]
    fn test_next_chart_closes_menu() {
        let mut app = fast_app();
        assert!(app.open_menu());
        app.next_chart();
        assert_eq!(app.chart_id(), fixtures::QUARTER_CHART);
        assert!(app.conversation.drill().menu().is_none());
        app.next_chart();
        assert_eq!(app.chart_id(), fixtures::REGION_CHART);
    }

    #[test]
    fn test_recent_events_are_bounded() {
        let mut app = fast_app();
        app.submit("analyze sales");
        run_to_pause_or_end(&mut app);
        assert!(!app.recent_events.is_empty());
        assert!(app.recent_events.len() <= RECENT_EVENTS);
    }
}
