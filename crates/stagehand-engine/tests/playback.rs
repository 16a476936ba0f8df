//! End-to-end playback checks driven through the virtual scheduler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use stagehand_engine::fixtures::{self, REGION_CHART};
use stagehand_engine::prelude::*;
use stagehand_engine::{
    Checkpoint, ChoiceOption, MenuPosition, SlideContent, SlideStatus, StreamTick, TaskStatus,
    ToolCall,
};

struct Reveal {
    text: StreamingText,
    completions: usize,
}

impl TimerDriven for Reveal {
    fn on_timer(&mut self, id: TimerId) -> Vec<Effect> {
        let mut fx = Vec::new();
        if self.text.on_timer(id, &mut fx) == StreamTick::Completed {
            self.completions = self.completions.saturating_add(1);
        }
        fx
    }
}

fn tool(subtasks: &[&str]) -> ToolCall {
    ToolCall {
        tool: "query".to_owned(),
        description: "query".to_owned(),
        subtasks: subtasks.iter().map(|s| (*s).to_owned()).collect(),
        panel: None,
    }
}

fn concrete_script() -> Script {
    let checkpoint = Checkpoint {
        question: "A or B?".to_owned(),
        options: vec![ChoiceOption::new("A", "A"), ChoiceOption::new("B", "B")],
        branches: HashMap::new(),
        scopes: Vec::new(),
    };
    Script::new("concrete", 1, vec![
        Step::text("hello", "Hello"),
        Step::checkpoint("choose", "Choose", checkpoint),
        Step::tool("fetch", "Fetch", tool(&["rows"])).in_group("g1"),
        Step::tool("chart", "Chart", tool(&["bars", "labels"])).in_group("g1"),
        Step::text("done", "Done"),
    ])
    .unwrap()
}

fn count(events: &[EngineEvent], wanted: &EngineEvent) -> usize {
    events.iter().filter(|e| *e == wanted).count()
}

#[test]
fn test_reveal_is_monotonic_and_completes_once() {
    for text in ["", "a", "plain text", "**bold** and 中文 mixed"] {
        let mut machine = Reveal {
            text: StreamingText::new(text, Duration::from_millis(30)),
            completions: 0,
        };
        let mut fx = Vec::new();
        machine.text.start(&mut fx);
        let mut sched = VirtualScheduler::new();
        sched.apply(fx);

        let mut last = 0;
        while sched.step(&mut machine).is_some() {
            let now = machine.text.revealed_len();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, text.chars().count());
        assert_eq!(machine.text.revealed(), text);
        assert_eq!(machine.completions, 1);
        assert!(!machine.text.cursor_visible());
    }
}

#[test]
fn test_exactly_one_slide_generates_at_a_time() {
    let contents = vec![
        SlideContent {
            title: "Intro".to_owned(),
            subtitle: "Sub".to_owned(),
            bullets: vec!["one".to_owned(), "two".to_owned()],
        },
        SlideContent::titled("Middle"),
        SlideContent::titled("End"),
    ];
    let mut deck = SlideGenerationEngine::new(contents, Duration::from_millis(20));
    let mut sched = VirtualScheduler::new();
    sched.apply(deck.start());

    let mut last_progress = 0;
    while !deck.is_complete() {
        let slides = deck.slides();
        let generating: Vec<usize> = slides
            .iter()
            .filter(|s| s.status == SlideStatus::Generating)
            .map(|s| s.id)
            .collect();
        assert_eq!(generating.len(), 1);
        let k = generating[0];
        for slide in &slides {
            let expected = match slide.id.cmp(&k) {
                std::cmp::Ordering::Less => SlideStatus::Completed,
                std::cmp::Ordering::Equal => SlideStatus::Generating,
                std::cmp::Ordering::Greater => SlideStatus::Pending,
            };
            assert_eq!(slide.status, expected);
        }
        assert!(deck.progress() >= last_progress);
        last_progress = deck.progress();
        assert!(sched.step(&mut deck).is_some());
    }
    assert_eq!(deck.progress(), 100);
    assert!(sched.is_idle());
    assert_eq!(count(sched.events(), &EngineEvent::GenerationCompleted), 1);
}

#[test]
fn test_three_ten_char_slides_finish_after_thirty_ticks() {
    let contents = vec![
        SlideContent::titled("Slide One!"),
        SlideContent::titled("Slide Two!"),
        SlideContent::titled("Slide 3!!!"),
    ];
    let delay = Duration::from_millis(20);
    let mut deck = SlideGenerationEngine::new(contents, delay);
    let mut sched = VirtualScheduler::new();
    sched.apply(deck.start());

    assert_eq!(sched.advance(&mut deck, delay.saturating_mul(29)), 29);
    assert!(!deck.is_complete());
    assert_eq!(sched.advance(&mut deck, delay), 1);
    assert!(deck.is_complete());
    assert!(deck.slides().iter().all(|s| s.status == SlideStatus::Completed));
    assert_eq!(deck.progress(), 100);
}

#[test]
fn test_scenario_progress_never_regresses() {
    let script = Arc::new(fixtures::sales_script().unwrap());
    let mut engine = ScenarioStepEngine::new(script, ScenarioTiming::default());
    let mut sched = VirtualScheduler::new();
    sched.apply(engine.start());

    let done = |e: &ScenarioStepEngine| {
        e.progress_tasks()
            .iter()
            .filter(|t| t.status == TaskStatus::Done)
            .count()
    };
    let mut last = 0;
    let mut resumed = false;
    loop {
        if sched.step(&mut engine).is_none() {
            if resumed {
                break;
            }
            sched.apply(engine.resume("scope", "full").unwrap());
            resumed = true;
        }
        let now = done(&engine);
        assert!(now >= last);
        last = now;
    }
    assert!(engine.run_state().is_complete);
    assert!(
        engine
            .progress_tasks()
            .iter()
            .all(|t| t.status == TaskStatus::Done)
    );
    assert_eq!(count(sched.events(), &EngineEvent::ScenarioCompleted), 1);
}

fn run_sales(choice: &str) -> Vec<String> {
    let script = Arc::new(fixtures::sales_script().unwrap());
    let mut engine = ScenarioStepEngine::new(script, ScenarioTiming::default());
    let mut sched = VirtualScheduler::new();
    sched.apply(engine.start());
    sched.run_until_idle(&mut engine, 100_000);
    sched.apply(engine.resume("scope", choice).unwrap());
    sched.run_until_idle(&mut engine, 100_000);
    engine.completed_step_ids().to_vec()
}

#[test]
fn test_same_selections_give_same_completion_order() {
    for choice in ["full", "quick"] {
        let first = run_sales(choice);
        assert_eq!(first, run_sales(choice));
        assert_eq!(first.last().map(String::as_str), Some("summary"));
    }
    assert!(!run_sales("quick").contains(&"aggregate".to_owned()));
    assert!(run_sales("full").contains(&"aggregate".to_owned()));
}

#[test]
fn test_reset_at_any_tick_matches_a_fresh_engine() {
    let script = Arc::new(concrete_script());
    let fresh = ScenarioStepEngine::new(Arc::clone(&script), ScenarioTiming::default());

    for ticks in [0_usize, 1, 3, 5, 8, 12] {
        let mut engine = ScenarioStepEngine::new(Arc::clone(&script), ScenarioTiming::default());
        let mut sched = VirtualScheduler::new();
        sched.apply(engine.start());
        for _ in 0..ticks {
            if sched.step(&mut engine).is_none() {
                let effects = engine.resume("choose", "B").unwrap_or_default();
                sched.apply(effects);
            }
        }

        sched.apply(engine.reset());
        assert!(sched.is_idle(), "timers left after reset at tick {ticks}");
        assert_eq!(engine.run_state(), fresh.run_state());
        assert_eq!(engine.progress_tasks(), fresh.progress_tasks());
        assert_eq!(engine.groups(), fresh.groups());
        assert!(engine.selections().is_empty());
        assert!(!engine.has_live_timers());

        sched.take_events();
        assert_eq!(sched.advance(&mut engine, Duration::from_secs(10)), 0);
        assert!(sched.events().is_empty());
    }
}

#[test]
fn test_breadcrumb_laws() {
    let mut nav = DrillDownNavigator::new(fixtures::sales_drill_table());
    let at = MenuPosition { x: 4, y: 2 };
    let mut drills = 0_usize;

    for (element, dimension) in [("East", "product"), ("East", "channel"), ("East", "month")] {
        assert!(nav.open_context_menu(REGION_CHART, element, 15.8, at));
        assert!(nav.select_dimension(dimension));
        drills = drills.saturating_add(1);
        assert_eq!(nav.state().unwrap().path.len(), drills.saturating_add(1));
    }

    assert!(!nav.open_context_menu(REGION_CHART, "West", 11.2, at));
    assert!(!nav.select_dimension("product"));
    assert_eq!(nav.state().unwrap().path.len(), drills.saturating_add(1));

    assert!(!nav.go_back(99));
    assert_eq!(nav.state().unwrap().path.len(), 4);
    assert!(nav.go_back(1));
    assert_eq!(nav.state().unwrap().path.len(), 2);
    assert_eq!(nav.state().unwrap().dimension_id, "product");

    assert!(nav.go_back(0));
    assert!(nav.state().is_none());
    assert!(nav.menu().is_none());
}

#[test]
fn test_concrete_checkpoint_scenario() {
    let mut engine = ScenarioStepEngine::new(Arc::new(concrete_script()), ScenarioTiming::default());
    let mut sched = VirtualScheduler::new();
    sched.apply(engine.start());

    sched.run_until_idle(&mut engine, 1_000);
    assert_eq!(engine.completed_step_ids(), ["hello".to_owned()]);
    assert!(engine.run_state().is_paused);
    assert_eq!(engine.checkpoint().unwrap().step_id, "choose");

    sched.apply(engine.resume("choose", "A").unwrap());
    assert_eq!(engine.run_state().current_step_id.as_deref(), Some("fetch"));
    let group = &engine.groups()[0];
    assert_eq!(group.step_ids, ["fetch".to_owned(), "chart".to_owned()]);
    assert!(group.is_active && group.is_expanded);

    sched.step(&mut engine);
    assert_eq!(engine.run_state().current_step_id.as_deref(), Some("chart"));
    assert!(engine.groups()[0].is_expanded);

    sched.run_until_idle(&mut engine, 1_000);
    let state = engine.run_state();
    assert!(state.is_complete);
    assert_eq!(state.completed_step_ids, [
        "hello".to_owned(),
        "choose".to_owned(),
        "fetch".to_owned(),
        "chart".to_owned(),
        "done".to_owned(),
    ]);
    assert!(!engine.groups()[0].is_expanded);
    assert_eq!(count(sched.events(), &EngineEvent::ScenarioCompleted), 1);
    assert!(engine.start().is_empty());
}
