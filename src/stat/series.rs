use super::{label_unit, preferred_unit, sample};
use crate::{
    columns::{aggregate_column, column_header, rounding_suffix, UnitStyle},
    node::Node,
    timeline::ResponseWindow,
    value::{format_float, format_integer, format_opt, format_sample, parse_int, parse_samples, parse_times, Factor, Sample},
};

/// A named value destined for one column of a summary row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub column: String,
    pub value: String,
}

impl Cell {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// One time-series column: a rendered value per reported bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesColumn {
    pub column: String,
    pub values: Vec<String>,
}

/// Implemented by every statistic whose values are reported per time bucket.
pub trait Series {
    fn base(&self) -> &SeriesBase;

    fn summary_cells(&self, window: ResponseWindow) -> Vec<Cell>;

    fn series_columns(&self) -> Vec<SeriesColumn>;
}

/// Bucket boundaries and bookkeeping shared by all series statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesBase {
    pub start_times: Vec<i64>,
    pub end_times: Vec<i64>,
    pub factor: Factor,
    pub availability: Option<i64>,
    pub config_changes: Option<String>,
}

impl SeriesBase {
    pub fn from_node(node: &Node) -> Self {
        Self {
            start_times: parse_times(node.field("startTimes")),
            end_times: parse_times(node.field("endTimes")),
            factor: Factor::parse(node.field("factor")),
            availability: parse_int(node.field("availability")),
            config_changes: node.field("configChanges").map(str::to_string),
        }
    }

    fn availability_cell(&self, kind: &str) -> Cell {
        Cell::new(
            format!("{} availability (%)", kind),
            format_opt(self.availability),
        )
    }

    fn config_changes(&self) -> String {
        self.config_changes.clone().unwrap_or_default()
    }
}

/// Per-bucket values. Over long reporting periods the appliance stops
/// sending exact values and reports per-bucket aggregates instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesValues {
    Exact(Vec<Sample>),
    Aggregated {
        mins: Vec<Sample>,
        means: Vec<Sample>,
        maxs: Vec<Sample>,
        counts: Vec<Sample>,
    },
}

impl SeriesValues {
    pub fn from_node(node: &Node) -> Self {
        if node.has("values") {
            return SeriesValues::Exact(parse_samples(node.field("values")));
        }
        SeriesValues::Aggregated {
            mins: parse_samples(node.field("mins")),
            means: parse_samples(node.field("means")),
            maxs: parse_samples(node.field("maxs")),
            counts: parse_samples(node.field("counts")),
        }
    }

    /// Values divided by `factor`. Aggregated buckets are rebuilt as
    /// `count * mean`.
    pub fn render(&self, factor: &Factor) -> Vec<String> {
        match self {
            SeriesValues::Exact(values) => values.iter().map(|v| factor.scale(*v)).collect(),
            SeriesValues::Aggregated { means, counts, .. } => counts
                .iter()
                .zip(means)
                .map(|(count, mean)| match (count, mean) {
                    (Some(count), Some(mean)) => factor.scale(count.checked_mul(*mean)),
                    _ => String::new(),
                })
                .collect(),
        }
    }

    pub fn suffix(&self) -> String {
        match self {
            SeriesValues::Exact(_) => String::new(),
            SeriesValues::Aggregated { counts, .. } => rounding_suffix(counts),
        }
    }
}

/// A plain time series, or a configurable statistic reported as one. For
/// configurable statistics `kind` is the statistic's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeries {
    pub kind: String,
    pub unit: Option<String>,
    pub base: SeriesBase,
    pub values: SeriesValues,
    pub min: Option<String>,
    pub mean: Option<String>,
    pub max: Option<String>,
    pub total: Option<String>,
}

impl TimeSeries {
    pub fn from_node(node: &Node, style: UnitStyle) -> Self {
        Self::build(node, node.field("type"), label_unit(node, "unit", style))
    }

    pub fn configurable_from_node(node: &Node, style: UnitStyle) -> Self {
        Self::build(node, node.field("name"), preferred_unit(node, style))
    }

    fn build(node: &Node, kind: Option<&str>, unit: Option<String>) -> Self {
        Self {
            kind: kind.unwrap_or_default().to_string(),
            unit,
            base: SeriesBase::from_node(node),
            values: SeriesValues::from_node(node),
            min: node.field("min").map(str::to_string),
            mean: node.field("mean").map(str::to_string),
            max: node.field("max").map(str::to_string),
            total: node.field("total").map(str::to_string),
        }
    }

    fn column(&self, aggregate: &str) -> String {
        aggregate_column(&self.kind, aggregate, self.unit.as_deref())
    }
}

impl Series for TimeSeries {
    fn base(&self) -> &SeriesBase {
        &self.base
    }

    fn summary_cells(&self, _window: ResponseWindow) -> Vec<Cell> {
        let factor = &self.base.factor;
        vec![
            Cell::new(self.column("min"), factor.scale_str(self.min.as_deref())),
            Cell::new(self.column("mean"), factor.scale_str(self.mean.as_deref())),
            Cell::new(self.column("max"), factor.scale_str(self.max.as_deref())),
            Cell::new(self.column("total"), factor.scale_str(self.total.as_deref())),
            self.base.availability_cell(&self.kind),
            Cell::new(
                format!("{} config changes (ms)", self.kind),
                self.base.config_changes(),
            ),
        ]
    }

    fn series_columns(&self) -> Vec<SeriesColumn> {
        vec![SeriesColumn {
            column: self.column("value") + &self.values.suffix(),
            values: self.values.render(&self.base.factor),
        }]
    }
}

/// Per-quantile data of a time-series distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantileSeries {
    pub quantile: String,
    pub values: Vec<Sample>,
    pub min: Option<String>,
    pub mean: Option<String>,
    pub max: Option<String>,
    pub summary_value: Option<String>,
    pub count: Option<String>,
}

impl QuantileSeries {
    pub fn from_node(node: &Node) -> Self {
        Self {
            quantile: node.field("quantile").unwrap_or_default().to_string(),
            values: parse_samples(node.field("values")),
            min: node.field("min").map(str::to_string),
            mean: node.field("mean").map(str::to_string),
            max: node.field("max").map(str::to_string),
            summary_value: node.field("summaryValue").map(str::to_string),
            count: node.field("count").map(str::to_string),
        }
    }

    fn aggregate(&self, name: &str) -> Option<&str> {
        match name {
            "min" => self.min.as_deref(),
            "mean" => self.mean.as_deref(),
            "max" => self.max.as_deref(),
            _ => None,
        }
    }
}

const AGGREGATES: [&str; 3] = ["min", "mean", "max"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionSeries {
    pub kind: String,
    pub unit: Option<String>,
    pub base: SeriesBase,
    pub quantiles: Vec<QuantileSeries>,
    // min, mean, max and then any requested percentiles.
    pub requested: Vec<String>,
}

impl DistributionSeries {
    pub fn from_node(node: &Node, percentiles: &[String], style: UnitStyle) -> Self {
        let mut requested: Vec<String> = AGGREGATES.iter().map(|a| a.to_string()).collect();
        requested.extend(percentiles.iter().cloned());
        Self::build(node, node.field("type"), label_unit(node, "unit", style), requested)
    }

    pub fn configurable_from_node(node: &Node, style: UnitStyle) -> Self {
        let requested = AGGREGATES.iter().map(|a| a.to_string()).collect();
        Self::build(node, node.field("name"), preferred_unit(node, style), requested)
    }

    fn build(node: &Node, kind: Option<&str>, unit: Option<String>, requested: Vec<String>) -> Self {
        Self {
            kind: kind.unwrap_or_default().to_string(),
            unit,
            base: SeriesBase::from_node(node),
            quantiles: node.children_named("data").map(QuantileSeries::from_node).collect(),
            requested,
        }
    }

    fn column(&self, aggregate: &str) -> String {
        aggregate_column(&self.kind, aggregate, self.unit.as_deref())
    }

    fn quantiles_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a QuantileSeries> + 'a {
        self.quantiles.iter().filter(move |q| q.quantile == name)
    }

    // Count reported alongside the first requested quantile present.
    fn count<'a, I: IntoIterator<Item = &'a str>>(&self, names: I) -> String {
        names
            .into_iter()
            .find_map(|name| self.quantiles_named(name).next())
            .map(|q| format_integer(q.count.as_deref()))
            .unwrap_or_default()
    }

    /// Summary cells of a configurable distribution. Unlike a plain
    /// distribution the columns are always present and the values come from
    /// each quantile's own min, mean and max.
    pub fn configurable_summary_cells(&self) -> Vec<Cell> {
        let factor = &self.base.factor;
        let mut cells = Vec::with_capacity(AGGREGATES.len() + 1);
        for name in AGGREGATES {
            let value = self
                .quantiles_named(name)
                .next()
                .map(|q| factor.scale_str(q.aggregate(name)))
                .unwrap_or_default();
            cells.push(Cell::new(self.column(name), value));
            if name == "min" {
                cells.push(Cell::new(
                    format!("{} count", self.kind),
                    self.count(AGGREGATES),
                ));
            }
        }
        cells
    }

    pub fn configurable_series_columns(&self) -> Vec<SeriesColumn> {
        let factor = &self.base.factor;
        AGGREGATES
            .iter()
            .map(|name| SeriesColumn {
                column: self.column(name),
                values: self
                    .quantiles_named(name)
                    .next()
                    .map(|q| q.values.iter().map(|v| factor.scale(*v)).collect())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

impl Series for DistributionSeries {
    fn base(&self) -> &SeriesBase {
        &self.base
    }

    fn summary_cells(&self, _window: ResponseWindow) -> Vec<Cell> {
        let factor = &self.base.factor;
        let mut cells = vec![Cell::new(
            format!("{} count", self.kind),
            self.count(self.requested.iter().map(String::as_str)),
        )];
        for name in &self.requested {
            for quantile in self.quantiles_named(name) {
                cells.push(Cell::new(
                    self.column(name),
                    factor.scale_str(quantile.summary_value.as_deref()),
                ));
            }
        }
        cells
    }

    fn series_columns(&self) -> Vec<SeriesColumn> {
        let factor = &self.base.factor;
        let mut columns = Vec::new();
        for name in &self.requested {
            for quantile in self.quantiles_named(name) {
                columns.push(SeriesColumn {
                    column: self.column(name),
                    values: quantile.values.iter().map(|v| factor.scale(*v)).collect(),
                });
            }
        }
        columns
    }
}

/// Configurable statistics are reported either as a time series or as a
/// time-series distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Configurable {
    Series(TimeSeries),
    Distribution(DistributionSeries),
}

impl Configurable {
    pub fn name(&self) -> &str {
        match self {
            Configurable::Series(s) => &s.kind,
            Configurable::Distribution(d) => &d.kind,
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            Configurable::Series(s) => s.unit.as_deref(),
            Configurable::Distribution(d) => d.unit.as_deref(),
        }
    }
}

impl Series for Configurable {
    fn base(&self) -> &SeriesBase {
        match self {
            Configurable::Series(s) => &s.base,
            Configurable::Distribution(d) => &d.base,
        }
    }

    fn summary_cells(&self, window: ResponseWindow) -> Vec<Cell> {
        match self {
            Configurable::Series(s) => s.summary_cells(window),
            Configurable::Distribution(d) => d.configurable_summary_cells(),
        }
    }

    fn series_columns(&self) -> Vec<SeriesColumn> {
        match self {
            Configurable::Series(s) => s.series_columns(),
            Configurable::Distribution(d) => d.configurable_series_columns(),
        }
    }
}

/// Time spent in threshold violation events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    pub name: String,
    pub unit: Option<String>,
    pub base: SeriesBase,
    pub values: SeriesValues,
    pub min: Sample,
    pub mean: Sample,
    pub max: Sample,
    pub total: Sample,
    pub last_violation_time: Sample,
    pub last_violation_value: Sample,
}

impl EventData {
    pub fn from_node(node: &Node, style: UnitStyle) -> Self {
        Self {
            name: node.field("name").unwrap_or_default().to_string(),
            unit: label_unit(node, "unit", style),
            base: SeriesBase::from_node(node),
            values: SeriesValues::from_node(node),
            min: sample(node, "min"),
            mean: sample(node, "mean"),
            max: sample(node, "max"),
            total: sample(node, "total"),
            last_violation_time: sample(node, "lastViolationTime"),
            last_violation_value: sample(node, "lastViolationValue"),
        }
    }

    // Share of the response window spent in events.
    fn time_in_events(&self, window: ResponseWindow) -> String {
        match (self.total, window.duration()) {
            (Some(total), Some(duration)) if duration > 0 => {
                format_float(total as f64 / duration as f64 * 100.0)
            }
            _ => String::new(),
        }
    }
}

impl Series for EventData {
    fn base(&self) -> &SeriesBase {
        &self.base
    }

    fn summary_cells(&self, window: ResponseWindow) -> Vec<Cell> {
        let name = &self.name;
        vec![
            Cell::new(
                column_header(&format!("{} time-in-events", name), self.unit.as_deref()),
                format_sample(self.total),
            ),
            Cell::new(
                format!("{} time-in-events (%)", name),
                self.time_in_events(window),
            ),
            self.base.availability_cell(name),
            Cell::new(format!("{} config changes", name), self.base.config_changes()),
            Cell::new(
                format!("{} last violation time (ms)", name),
                format_sample(self.last_violation_time),
            ),
            Cell::new(
                format!("{} last violation value", name),
                format_sample(self.last_violation_value),
            ),
        ]
    }

    fn series_columns(&self) -> Vec<SeriesColumn> {
        let column = column_header(&format!("{} value", self.name), self.unit.as_deref());
        vec![SeriesColumn {
            column: column + &self.values.suffix(),
            values: self.values.render(&self.base.factor),
        }]
    }
}
