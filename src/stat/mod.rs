pub mod scalar;
pub mod series;
pub mod summary;
pub mod topn;

use crate::{
    columns::{column_header, UnitStyle},
    config::ShapeConfig,
    node::Node,
    timeline::ResponseWindow,
    value::{parse_int, parse_sample, Sample},
};
use log::{debug, warn};
use scalar::{Distribution, Scalar};
use series::{Configurable, DistributionSeries, EventData, Series, TimeSeries};
use std::{collections::HashMap, fmt};
use summary::Summary;
use thiserror::Error;
use topn::{TimeSeriesTopN, TopN};

const EVENT_DATA_FIELD: &str = "statEventData";
const CONFIGURABLE_FIELDS: [&str; 4] = [
    "configurableStatCount",
    "configurableStatMinMeanMax",
    "configurableStatTotal",
    "configurableStatRatio",
];

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("no stats response with a startTime in document")]
    MissingResponse,
    #[error("invalid {field}: {value:?}")]
    InvalidWindow { field: &'static str, value: String },
}

/// A statistic decoded from one field of a measurement point.
#[derive(Debug, Clone, PartialEq)]
pub enum Statistic {
    Scalar(Scalar),
    Distribution(Distribution),
    TimeSeries(TimeSeries),
    TimeSeriesDistribution(DistributionSeries),
    TopN(TopN),
    TimeSeriesTopN(TimeSeriesTopN),
    Summary(Summary),
    Configurable(Configurable),
    EventData(EventData),
    // A field this crate does not know how to shape.
    Unknown { field: String, class: Option<String> },
}

impl Statistic {
    /// Key under which the statistic is indexed in its measurement point.
    pub fn header(&self) -> Option<String> {
        let header = match self {
            Statistic::Scalar(s) => s.header(),
            Statistic::Distribution(d) => d.header(),
            Statistic::TimeSeries(s) => column_header(&s.kind, s.unit.as_deref()),
            Statistic::TimeSeriesDistribution(d) => column_header(&d.kind, d.unit.as_deref()),
            Statistic::TopN(t) => t.kind.clone(),
            Statistic::TimeSeriesTopN(t) => t.kind.clone(),
            Statistic::Summary(s) => s.kind.clone(),
            Statistic::Configurable(c) => column_header(c.name(), c.unit()),
            Statistic::EventData(e) => column_header(&e.name, e.unit.as_deref()),
            Statistic::Unknown { .. } => return None,
        };
        Some(header)
    }

    /// Statistics shaped into the time-series block.
    pub fn as_time_series(&self) -> Option<&dyn Series> {
        match self {
            Statistic::TimeSeries(s) => Some(s),
            Statistic::TimeSeriesDistribution(d) => Some(d),
            Statistic::Configurable(c) => Some(c),
            _ => None,
        }
    }

    /// Every statistic reported per bucket on the shared grid.
    pub fn as_series(&self) -> Option<&dyn Series> {
        match self {
            Statistic::EventData(e) => Some(e),
            _ => self.as_time_series(),
        }
    }
}

/// Non-fatal finding raised while decoding a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    UnknownStatistic {
        point: String,
        field: String,
        class: Option<String>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownStatistic { point, field, class } => write!(
                f,
                "measurement point {:?}: field {:?} of type {} is not a known statistic",
                point,
                field,
                class.as_deref().unwrap_or("<none>")
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementPoint {
    pub name: String,
    pub stats: Vec<Statistic>,
    index: HashMap<String, usize>,
}

impl MeasurementPoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Decodes every statistic field of a `measurementPoint` element. Fields
    /// are visited in name order so the result does not depend on the order
    /// the appliance serialised them in.
    pub fn from_node(node: &Node, config: &ShapeConfig) -> (Self, Vec<Diagnostic>) {
        let mut point = Self::new(node.field("name").unwrap_or_default());
        let mut diagnostics = Vec::new();

        let mut fields: Vec<&Node> = node
            .children
            .iter()
            .filter(|c| !c.name.starts_with('_') && c.name != "name")
            .collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));

        for field in fields {
            for stat in decode_field(field, config) {
                if let Statistic::Unknown { field, class } = &stat {
                    let diagnostic = Diagnostic::UnknownStatistic {
                        point: point.name.clone(),
                        field: field.clone(),
                        class: class.clone(),
                    };
                    warn!("{}", diagnostic);
                    diagnostics.push(diagnostic);
                }
                point.push(stat);
            }
        }
        (point, diagnostics)
    }

    pub fn push(&mut self, stat: Statistic) {
        if let Some(header) = stat.header() {
            self.index.insert(header, self.stats.len());
        }
        self.stats.push(stat);
    }

    pub fn stat_by_header(&self, header: &str) -> Option<&Statistic> {
        self.index.get(header).map(|i| &self.stats[*i])
    }

    pub fn configurable(&self) -> impl Iterator<Item = &Configurable> {
        self.stats.iter().filter_map(|s| match s {
            Statistic::Configurable(c) => Some(c),
            _ => None,
        })
    }
}

fn decode_field(field: &Node, config: &ShapeConfig) -> Vec<Statistic> {
    let style = config.unit_style;
    if field.name == EVENT_DATA_FIELD {
        return entries(field)
            .map(|entry| match entry.class.as_deref() {
                Some("TimeSeriesEventData") => Statistic::EventData(EventData::from_node(entry, style)),
                _ => unknown(field, entry),
            })
            .collect();
    }
    if CONFIGURABLE_FIELDS.contains(&field.name.as_str()) {
        return entries(field)
            .map(|entry| match entry.class.as_deref() {
                Some("TimeSeries") => Statistic::Configurable(Configurable::Series(
                    TimeSeries::configurable_from_node(entry, style),
                )),
                Some("TimeSeriesDistribution") => Statistic::Configurable(
                    Configurable::Distribution(DistributionSeries::configurable_from_node(entry, style)),
                ),
                _ => unknown(field, entry),
            })
            .collect();
    }

    let stat = match field.class.as_deref() {
        Some("TimeSeries") => Statistic::TimeSeries(TimeSeries::from_node(field, style)),
        Some("TimeSeriesTopN") => Statistic::TimeSeriesTopN(TimeSeriesTopN::from_node(field)),
        Some("TimeSeriesDistribution") => Statistic::TimeSeriesDistribution(
            DistributionSeries::from_node(field, &config.percentiles, style),
        ),
        Some("ScalarValue") => Statistic::Scalar(Scalar::from_node(field, style)),
        Some("Distribution") => Statistic::Distribution(Distribution::from_node(field, style)),
        Some("TopN") => Statistic::TopN(TopN::from_node(field)),
        Some("Summary") => Statistic::Summary(Summary::from_node(field, style)),
        _ => unknown(field, field),
    };
    vec![stat]
}

// List fields arrive either as repeated typed elements or as one container
// element wrapping them.
fn entries(field: &Node) -> Box<dyn Iterator<Item = &Node> + '_> {
    match field.class {
        Some(_) => Box::new(std::iter::once(field)),
        None => Box::new(field.children.iter()),
    }
}

fn unknown(field: &Node, entry: &Node) -> Statistic {
    Statistic::Unknown {
        field: field.name.clone(),
        class: entry.class.clone(),
    }
}

pub(crate) fn label_unit(node: &Node, field: &str, style: UnitStyle) -> Option<String> {
    node.field(field)
        .filter(|u| !u.trim().is_empty())
        .map(|u| style.label(u))
}

// Configurable statistics may carry a user-defined unit over the built-in one.
pub(crate) fn preferred_unit(node: &Node, style: UnitStyle) -> Option<String> {
    label_unit(node, "customUnit", style).or_else(|| label_unit(node, "unit", style))
}

pub(crate) fn sample(node: &Node, field: &str) -> Sample {
    node.field(field).and_then(|s| parse_sample(s.trim()))
}

/// A decoded `stats` response: the requested window and every measurement
/// point in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsResponse {
    pub window: ResponseWindow,
    pub points: Vec<MeasurementPoint>,
    pub diagnostics: Vec<Diagnostic>,
}

impl StatsResponse {
    /// Reads the response from a decoded document. `node` may be the
    /// response element itself or any ancestor, such as a SOAP envelope.
    pub fn from_node(node: &Node, config: &ShapeConfig) -> Result<Self, Error> {
        let response = find_response(node).ok_or(Error::MissingResponse)?;
        let window = ResponseWindow::new(
            window_field(response, "startTime")?,
            window_field(response, "endTime")?,
        );

        let mut points = Vec::new();
        let mut diagnostics = Vec::new();
        for child in response.children_named("measurementPoint") {
            let (point, mut found) = MeasurementPoint::from_node(child, config);
            diagnostics.append(&mut found);
            points.push(point);
        }
        debug!(
            "decoded {} measurement points over [{}, {})",
            points.len(),
            window.start,
            window.end
        );

        Ok(Self {
            window,
            points,
            diagnostics,
        })
    }
}

fn find_response(node: &Node) -> Option<&Node> {
    if node.field("startTime").is_some() {
        return Some(node);
    }
    node.children.iter().find_map(find_response)
}

fn window_field(response: &Node, field: &'static str) -> Result<i64, Error> {
    let raw = response.field(field).unwrap_or_default();
    parse_int(Some(raw)).ok_or_else(|| Error::InvalidWindow {
        field,
        value: raw.to_string(),
    })
}
