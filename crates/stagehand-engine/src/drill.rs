//! Drill-down navigation over precomputed chart breakdowns.
//!
//! Every operation is a synchronous transition. A drill is a table lookup:
//! the data series for each `(chart, element, dimension)` is authored ahead
//! of time in a [`DrillTable`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One labelled value of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Category label.
    pub label: String,
    /// Value.
    pub value: f64,
}

impl DataPoint {
    /// Build a point.
    #[must_use]
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// A breakdown axis offered for an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Stable id.
    pub id: String,
    /// Human-readable label.
    pub label: String,
    /// Precomputed series shown after drilling.
    pub series: Vec<DataPoint>,
}

/// A chart's root view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDef {
    /// Breadcrumb label of the root view.
    pub root_label: String,
    /// Root series.
    pub series: Vec<DataPoint>,
}

/// Static drill-down lookup tables.
#[derive(Debug, Clone, Default)]
pub struct DrillTable {
    charts: HashMap<String, ChartDef>,
    entries: HashMap<(String, String), Vec<Dimension>>,
}

impl DrillTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chart's root view.
    #[must_use]
    pub fn chart(
        mut self,
        chart_id: impl Into<String>,
        root_label: impl Into<String>,
        series: Vec<DataPoint>,
    ) -> Self {
        self.charts.insert(
            chart_id.into(),
            ChartDef {
                root_label: root_label.into(),
                series,
            },
        );
        self
    }

    /// Declare the dimensions an element can be drilled into.
    #[must_use]
    pub fn entry(
        mut self,
        chart_id: impl Into<String>,
        element: impl Into<String>,
        dimensions: Vec<Dimension>,
    ) -> Self {
        self.entries
            .insert((chart_id.into(), element.into()), dimensions);
        self
    }

    /// Root definition of a chart.
    #[must_use]
    pub fn chart_def(&self, chart_id: &str) -> Option<&ChartDef> {
        self.charts.get(chart_id)
    }

    /// Dimensions for an element, if it is drillable.
    #[must_use]
    pub fn dimensions(&self, chart_id: &str, element: &str) -> Option<&[Dimension]> {
        self.entries
            .get(&(chart_id.to_owned(), element.to_owned()))
            .map(Vec::as_slice)
            .filter(|dims| !dims.is_empty())
    }

    fn dimension(&self, chart_id: &str, element: &str, dimension_id: &str) -> Option<&Dimension> {
        self.dimensions(chart_id, element)?
            .iter()
            .find(|d| d.id == dimension_id)
    }
}

/// Screen position of a context menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuPosition {
    /// Column.
    pub x: u16,
    /// Row.
    pub y: u16,
}

/// An entry in the context menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Dimension id.
    pub dimension_id: String,
    /// Dimension label.
    pub label: String,
}

/// The open "drill into…" menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMenu {
    /// Chart that was clicked.
    pub chart_id: String,
    /// Data point that was clicked.
    pub element_name: String,
    /// Value of the clicked point.
    pub value: f64,
    /// Where to draw the menu.
    pub position: MenuPosition,
    /// Offered dimensions.
    pub items: Vec<MenuItem>,
}

/// One breadcrumb. The root crumb has no element or dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crumb {
    /// Display label.
    pub label: String,
    /// Element drilled into.
    pub element_name: Option<String>,
    /// Dimension shown after the drill.
    pub dimension_id: Option<String>,
}

/// Where the user currently is inside a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillState {
    /// Chart being explored.
    pub active_chart_id: String,
    /// Breadcrumb trail; `path[0]` is the chart's root.
    pub path: Vec<Crumb>,
    /// Element of the last drill.
    pub element_name: String,
    /// Dimension of the last drill.
    pub dimension_id: String,
}

impl DrillState {
    /// Breadcrumb labels.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.path.iter().map(|c| c.label.as_str()).collect()
    }
}

/// Holds at most one open menu and at most one drill state.
#[derive(Debug, Clone)]
pub struct DrillDownNavigator {
    table: DrillTable,
    menu: Option<ContextMenu>,
    state: Option<DrillState>,
}

impl DrillDownNavigator {
    /// Navigator over `table`, at the root of every chart.
    #[must_use]
    pub fn new(table: DrillTable) -> Self {
        Self {
            table,
            menu: None,
            state: None,
        }
    }

    /// Open the drill menu for a clicked element.
    ///
    /// Non-drillable elements are a no-op and return `false`. A successful
    /// open replaces any menu that was already open.
    pub fn open_context_menu(
        &mut self,
        chart_id: &str,
        element_name: &str,
        value: f64,
        position: MenuPosition,
    ) -> bool {
        let Some(dimensions) = self.table.dimensions(chart_id, element_name) else {
            debug!(chart_id, element_name, "element is not drillable");
            return false;
        };
        let items = dimensions
            .iter()
            .map(|d| MenuItem {
                dimension_id: d.id.clone(),
                label: d.label.clone(),
            })
            .collect();
        self.menu = Some(ContextMenu {
            chart_id: chart_id.to_owned(),
            element_name: element_name.to_owned(),
            value,
            position,
            items,
        });
        true
    }

    /// Close the menu without drilling.
    pub fn close_menu(&mut self) {
        self.menu = None;
    }

    /// Drill into `dimension_id` of the element under the open menu.
    ///
    /// Returns `false` (state unchanged) when no menu is open or the menu
    /// does not offer the dimension.
    pub fn select_dimension(&mut self, dimension_id: &str) -> bool {
        let Some(menu) = self.menu.as_ref() else {
            debug!(dimension_id, "select_dimension without an open menu");
            return false;
        };
        let Some(dimension) =
            self.table
                .dimension(&menu.chart_id, &menu.element_name, dimension_id)
        else {
            debug!(dimension_id, "dimension not offered by the open menu");
            return false;
        };
        let crumb = Crumb {
            label: format!("{} · {}", menu.element_name, dimension.label),
            element_name: Some(menu.element_name.clone()),
            dimension_id: Some(dimension.id.clone()),
        };

        let mut path = match self.state.take() {
            Some(state) if state.active_chart_id == menu.chart_id => state.path,
            _ => vec![self.root_crumb(&menu.chart_id)],
        };
        path.push(crumb);
        debug!(
            chart_id = %menu.chart_id,
            element = %menu.element_name,
            dimension_id,
            depth = path.len(),
            "drilled down"
        );
        self.state = Some(DrillState {
            active_chart_id: menu.chart_id.clone(),
            path,
            element_name: menu.element_name.clone(),
            dimension_id: dimension.id.clone(),
        });
        self.menu = None;
        true
    }

    fn root_crumb(&self, chart_id: &str) -> Crumb {
        let label = self
            .table
            .chart_def(chart_id)
            .map_or_else(|| chart_id.to_owned(), |c| c.root_label.clone());
        Crumb {
            label,
            element_name: None,
            dimension_id: None,
        }
    }

    /// Return to breadcrumb `index`.
    ///
    /// `0` clears the drill state entirely. Indices past the end of the path
    /// are rejected and return `false`.
    pub fn go_back(&mut self, index: usize) -> bool {
        let Some(state) = self.state.as_mut() else {
            warn!(index, "breadcrumb click with no active drill");
            return false;
        };
        if index >= state.path.len() {
            warn!(index, depth = state.path.len(), "breadcrumb index out of range");
            return false;
        }
        self.menu = None;
        if index == 0 {
            self.state = None;
            debug!("returned to chart root");
            return true;
        }
        state.path.truncate(index.saturating_add(1));
        if let Some(Crumb {
            element_name: Some(element),
            dimension_id: Some(dimension),
            ..
        }) = state.path.last()
        {
            state.element_name.clone_from(element);
            state.dimension_id.clone_from(dimension);
        }
        true
    }

    /// The open menu.
    #[must_use]
    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    /// The active drill.
    #[must_use]
    pub fn state(&self) -> Option<&DrillState> {
        self.state.as_ref()
    }

    /// Series to display for `chart_id`: the drilled series when the chart is
    /// being explored, its root series otherwise.
    #[must_use]
    pub fn series(&self, chart_id: &str) -> Option<&[DataPoint]> {
        match &self.state {
            Some(state) if state.active_chart_id == chart_id => self
                .table
                .dimension(chart_id, &state.element_name, &state.dimension_id)
                .map(|d| d.series.as_slice()),
            _ => self.table.chart_def(chart_id).map(|c| c.series.as_slice()),
        }
    }

    /// Breadcrumb labels for `chart_id` (just the root when not drilled).
    #[must_use]
    pub fn breadcrumbs(&self, chart_id: &str) -> Vec<String> {
        match &self.state {
            Some(state) if state.active_chart_id == chart_id => {
                state.path.iter().map(|c| c.label.clone()).collect()
            },
            _ => vec![self.root_crumb(chart_id).label],
        }
    }

    /// Drop menu and drill state.
    pub fn reset(&mut self) {
        self.menu = None;
        self.state = None;
    }

    /// The lookup table.
    #[must_use]
    pub fn table(&self) -> &DrillTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(id: &str, label: &str, points: &[(&str, f64)]) -> Dimension {
        Dimension {
            id: id.to_owned(),
            label: label.to_owned(),
            series: points.iter().map(|(l, v)| DataPoint::new(*l, *v)).collect(),
        }
    }

    fn navigator() -> DrillDownNavigator {
        let table = DrillTable::new()
            .chart(
                "sales",
                "Sales by region",
                vec![DataPoint::new("East", 42.0), DataPoint::new("West", 17.0)],
            )
            .chart("trend", "Monthly trend", vec![DataPoint::new("Jan", 3.0)])
            .entry(
                "sales",
                "East",
                vec![
                    dim("product", "By product", &[("Phones", 20.0), ("Laptops", 22.0)]),
                    dim("channel", "By channel", &[("Online", 30.0), ("Retail", 12.0)]),
                ],
            )
            .entry(
                "sales",
                "Phones",
                vec![dim("city", "By city", &[("Shanghai", 12.0), ("Hangzhou", 8.0)])],
            )
            .entry(
                "trend",
                "Jan",
                vec![dim("week", "By week", &[("W1", 1.0), ("W2", 2.0)])],
            );
        DrillDownNavigator::new(table)
    }

    fn drill(nav: &mut DrillDownNavigator, chart: &str, element: &str, dimension: &str) -> bool {
        nav.open_context_menu(chart, element, 1.0, MenuPosition::default())
            && nav.select_dimension(dimension)
    }

    #[test]
    fn test_non_drillable_element_is_noop() {
        let mut nav = navigator();
        assert!(!nav.open_context_menu("sales", "West", 17.0, MenuPosition::default()));
        assert!(nav.menu().is_none());
        assert!(nav.state().is_none());
        assert!(!nav.open_context_menu("nope", "East", 1.0, MenuPosition::default()));
    }

    #[test]
    fn test_select_dimension_builds_path() {
        let mut nav = navigator();
        assert!(nav.open_context_menu("sales", "East", 42.0, MenuPosition { x: 3, y: 4 }));
        let menu = nav.menu().unwrap();
        assert_eq!(menu.items.len(), 2);
        assert_eq!(menu.position, MenuPosition { x: 3, y: 4 });

        assert!(nav.select_dimension("product"));
        assert!(nav.menu().is_none());
        let state = nav.state().unwrap();
        assert_eq!(state.active_chart_id, "sales");
        assert_eq!(state.labels(), vec!["Sales by region", "East · By product"]);
        assert_eq!(state.element_name, "East");
        assert_eq!(state.dimension_id, "product");
        assert_eq!(nav.series("sales").unwrap()[0].label, "Phones");
    }

    #[test]
    fn test_select_requires_open_menu_and_known_dimension() {
        let mut nav = navigator();
        assert!(!nav.select_dimension("product"));

        nav.open_context_menu("sales", "East", 42.0, MenuPosition::default());
        assert!(!nav.select_dimension("city"));
        assert!(nav.menu().is_some());
        assert!(nav.state().is_none());
    }

    #[test]
    fn test_path_length_is_drills_plus_one() {
        let mut nav = navigator();
        assert!(drill(&mut nav, "sales", "East", "product"));
        assert!(drill(&mut nav, "sales", "Phones", "city"));
        assert_eq!(nav.state().unwrap().path.len(), 3);

        // A failed drill changes nothing.
        assert!(!drill(&mut nav, "sales", "Shanghai", "store"));
        assert_eq!(nav.state().unwrap().path.len(), 3);
    }

    #[test]
    fn test_go_back_truncates_and_restores_crumb() {
        let mut nav = navigator();
        drill(&mut nav, "sales", "East", "product");
        drill(&mut nav, "sales", "Phones", "city");

        assert!(nav.go_back(1));
        let state = nav.state().unwrap();
        assert_eq!(state.path.len(), 2);
        assert_eq!(state.element_name, "East");
        assert_eq!(state.dimension_id, "product");
    }

    #[test]
    fn test_go_back_zero_clears_state() {
        let mut nav = navigator();
        drill(&mut nav, "sales", "East", "channel");
        assert!(nav.go_back(0));
        assert!(nav.state().is_none());
        assert_eq!(nav.breadcrumbs("sales"), vec!["Sales by region"]);
        assert_eq!(nav.series("sales").unwrap().len(), 2);
    }

    #[test]
    fn test_go_back_out_of_range_is_rejected() {
        let mut nav = navigator();
        assert!(!nav.go_back(0));
        drill(&mut nav, "sales", "East", "channel");
        assert!(!nav.go_back(2));
        assert!(!nav.go_back(usize::MAX));
        assert_eq!(nav.state().unwrap().path.len(), 2);
    }

    #[test]
    fn test_new_menu_replaces_open_menu() {
        let mut nav = navigator();
        nav.open_context_menu("sales", "East", 42.0, MenuPosition::default());
        nav.open_context_menu("trend", "Jan", 3.0, MenuPosition::default());
        assert_eq!(nav.menu().unwrap().chart_id, "trend");
    }

    #[test]
    fn test_drilling_another_chart_restarts_path() {
        let mut nav = navigator();
        drill(&mut nav, "sales", "East", "product");
        drill(&mut nav, "trend", "Jan", "week");
        let state = nav.state().unwrap();
        assert_eq!(state.active_chart_id, "trend");
        assert_eq!(state.labels(), vec!["Monthly trend", "Jan · By week"]);
        assert_eq!(nav.breadcrumbs("sales"), vec!["Sales by region"]);
    }
}
