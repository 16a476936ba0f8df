//! Built-in scripts, slide deck and dashboard tables.
//!
//! Every figure here is made up. The data exists so the demo has something
//! plausible to reveal.

use std::collections::HashMap;

use crate::drill::{DataPoint, Dimension, DrillTable};
use crate::error::{EngineError, EngineResult};
use crate::events::Panel;
use crate::script::{Checkpoint, ChoiceOption, Script, Step, ToolCall};
use crate::slides::SlideContent;

/// Version stamped on every built-in script.
pub const SCRIPT_VERSION: u32 = 1;

/// Name of the sales analysis script.
pub const SALES_SCRIPT: &str = "sales";

/// Name of the presentation script.
pub const PPT_SCRIPT: &str = "ppt";

/// Checkpoint id whose answer is the slide count.
pub const SLIDE_COUNT_CHECKPOINT: &str = "slide_count";

/// Chart showing revenue per region.
pub const REGION_CHART: &str = "revenue_by_region";

/// Chart showing revenue per quarter.
pub const QUARTER_CHART: &str = "revenue_by_quarter";

/// Look up a built-in script by name.
///
/// # Errors
///
/// Returns [`EngineError::UnknownScenario`] for unregistered names.
pub fn script(name: &str) -> EngineResult<Script> {
    match name {
        SALES_SCRIPT => sales_script(),
        PPT_SCRIPT => ppt_script(),
        other => Err(EngineError::UnknownScenario(other.to_owned())),
    }
}

fn call(tool: &str, description: &str, subtasks: &[&str], panel: Option<Panel>) -> ToolCall {
    ToolCall {
        tool: tool.to_owned(),
        description: description.to_owned(),
        subtasks: subtasks.iter().map(|s| (*s).to_owned()).collect(),
        panel,
    }
}

/// Quarterly sales review with a scope checkpoint and a dashboard.
///
/// # Errors
///
/// Fails only if the script definition itself is inconsistent.
pub fn sales_script() -> EngineResult<Script> {
    let scope = Checkpoint {
        question: "Which scope should the analysis cover?".to_owned(),
        options: vec![
            ChoiceOption::new("All regions, full breakdown", "full"),
            ChoiceOption::new("Headline numbers only", "quick"),
        ],
        branches: HashMap::from([("quick".to_owned(), "summary".to_owned())]),
        scopes: vec![
            "East".to_owned(),
            "West".to_owned(),
            "North".to_owned(),
            "South".to_owned(),
        ],
    };

    let steps = vec![
        Step::text(
            "intro",
            "I'll review **Q3 sales** across all regions. First, let me pull the raw orders.",
        ),
        Step::tool(
            "load_orders",
            "Load orders",
            call(
                "sql_query",
                "SELECT * FROM orders WHERE quarter = 'Q3'",
                &["Connecting to warehouse", "Scanning 48,210 rows", "Validating totals"],
                None,
            ),
        )
        .in_group("data"),
        Step::tool(
            "clean_orders",
            "Clean data",
            call(
                "dataframe",
                "Drop refunds and test accounts",
                &["Removing 312 refunds", "Removing 17 test accounts"],
                None,
            ),
        )
        .in_group("data"),
        Step::checkpoint("scope", "Confirm scope", scope),
        Step::tool(
            "aggregate",
            "Aggregate by region",
            call(
                "dataframe",
                "Group revenue by region and quarter",
                &["Grouping by region", "Computing quarter-over-quarter deltas"],
                None,
            ),
        )
        .in_group("analysis"),
        Step::tool(
            "dashboard",
            "Build dashboard",
            call(
                "chart_builder",
                "Render revenue charts",
                &["Revenue by region", "Revenue by quarter", "Linking drill-down tables"],
                Some(Panel::Dashboard),
            ),
        )
        .in_group("analysis"),
        Step::text(
            "summary",
            "Q3 revenue closed at **¥42.6M**, up **12.4%** on Q2. East leads with \
             **¥15.8M**; South is the only region below plan. Right-click a bar on the \
             dashboard to drill into products, channels or months.",
        ),
    ];
    Ok(Script::new(SALES_SCRIPT, SCRIPT_VERSION, steps)?)
}

/// Presentation request: outline, slide count checkpoint, hand-off to the
/// slide generator.
///
/// # Errors
///
/// Fails only if the script definition itself is inconsistent.
pub fn ppt_script() -> EngineResult<Script> {
    let count = Checkpoint {
        question: "How many slides should the deck have?".to_owned(),
        options: vec![
            ChoiceOption::new("4 slides", "4"),
            ChoiceOption::new("6 slides", "6"),
            ChoiceOption::new("8 slides", "8"),
        ],
        branches: HashMap::new(),
        scopes: Vec::new(),
    };

    let steps = vec![
        Step::text(
            "intro",
            "I'll turn the **Q3 sales review** into a presentation. Let me draft an outline.",
        ),
        Step::tool(
            "outline",
            "Draft outline",
            call(
                "outline_writer",
                "Structure the story",
                &["Collecting key figures", "Ordering sections"],
                None,
            ),
        ),
        Step::checkpoint(SLIDE_COUNT_CHECKPOINT, "Choose length", count),
        Step::tool(
            "layout",
            "Pick layout",
            call(
                "deck_designer",
                "Apply the corporate template",
                &["Loading template", "Setting typography"],
                Some(Panel::SlidePreview),
            ),
        ),
        Step::text("handoff", "Outline ready. Generating slides now."),
    ];
    Ok(Script::new(PPT_SCRIPT, SCRIPT_VERSION, steps)?)
}

fn slide(title: &str, subtitle: &str, bullets: &[&str]) -> SlideContent {
    SlideContent {
        title: title.to_owned(),
        subtitle: subtitle.to_owned(),
        bullets: bullets.iter().map(|b| (*b).to_owned()).collect(),
    }
}

/// Content of the Q3 review deck.
#[must_use]
pub fn deck_contents() -> Vec<SlideContent> {
    vec![
        slide("Q3 Sales Review", "Quarterly business update", &[]),
        slide("Headline", "Revenue ¥42.6M, +12.4% QoQ", &[
            "Best quarter this year",
            "Gross margin steady at 38%",
        ]),
        slide("Regional Performance", "", &[
            "East ¥15.8M (+18%)",
            "West ¥11.2M (+9%)",
            "North ¥9.1M (+14%)",
            "South ¥6.5M (-3%)",
        ]),
        slide("Product Mix", "Enterprise carries growth", &[
            "Enterprise 46% of revenue",
            "SMB flat",
            "Consumer down 4%",
        ]),
        slide("Channels", "", &["Direct sales 58%", "Partners 31%", "Online 11%"]),
        slide("Risks", "South region below plan", &[
            "Two key accounts churned",
            "Pipeline coverage 2.1x",
        ]),
        slide("Q4 Priorities", "", &[
            "Recover South pipeline",
            "Expand partner program",
            "Launch online bundle",
        ]),
        slide("Thank You", "Questions welcome", &[]),
    ]
}

fn points(data: &[(&str, f64)]) -> Vec<DataPoint> {
    data.iter()
        .map(|(label, value)| DataPoint::new(*label, *value))
        .collect()
}

fn dim(id: &str, label: &str, data: &[(&str, f64)]) -> Dimension {
    Dimension {
        id: id.to_owned(),
        label: label.to_owned(),
        series: points(data),
    }
}

/// Drill-down tables behind the sales dashboard. West is intentionally not
/// drillable.
#[must_use]
pub fn sales_drill_table() -> DrillTable {
    DrillTable::new()
        .chart(
            REGION_CHART,
            "All regions",
            points(&[("East", 15.8), ("West", 11.2), ("North", 9.1), ("South", 6.5)]),
        )
        .chart(
            QUARTER_CHART,
            "All quarters",
            points(&[("Q1", 35.2), ("Q2", 37.9), ("Q3", 42.6)]),
        )
        .entry(REGION_CHART, "East", vec![
            dim("product", "Product", &[
                ("Enterprise", 8.1),
                ("SMB", 4.6),
                ("Consumer", 3.1),
            ]),
            dim("channel", "Channel", &[
                ("Direct", 9.9),
                ("Partner", 4.4),
                ("Online", 1.5),
            ]),
            dim("month", "Month", &[("Jul", 4.9), ("Aug", 5.2), ("Sep", 5.7)]),
        ])
        .entry(REGION_CHART, "North", vec![
            dim("product", "Product", &[
                ("Enterprise", 3.9),
                ("SMB", 3.0),
                ("Consumer", 2.2),
            ]),
            dim("month", "Month", &[("Jul", 2.8), ("Aug", 3.0), ("Sep", 3.3)]),
        ])
        .entry(REGION_CHART, "South", vec![
            dim("channel", "Channel", &[
                ("Direct", 3.6),
                ("Partner", 2.2),
                ("Online", 0.7),
            ]),
            dim("account", "Key account", &[
                ("Retained", 5.4),
                ("Churned", 1.1),
            ]),
        ])
        .entry(QUARTER_CHART, "Q3", vec![
            dim("region", "Region", &[
                ("East", 15.8),
                ("West", 11.2),
                ("North", 9.1),
                ("South", 6.5),
            ]),
            dim("month", "Month", &[("Jul", 13.4), ("Aug", 14.1), ("Sep", 15.1)]),
        ])
}
