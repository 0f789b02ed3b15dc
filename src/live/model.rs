use crate::{
    columns::{column_header, UnitStyle},
    node::Node,
    stat::label_unit,
    value::{format_sample, parse_int, parse_samples, Factor, Sample},
};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("no live stats response with an updatePeriod in document")]
    MissingResponse,
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// One series of a data set, e.g. the 99th percentile of a latency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set {
    pub kind: String,
    pub percentile: Option<String>,
    pub values: Vec<Sample>,
}

impl Set {
    pub fn from_node(node: &Node) -> Self {
        Self {
            kind: node.field("type").unwrap_or_default().to_string(),
            percentile: node
                .field("percentile")
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            values: parse_samples(node.value()),
        }
    }

    /// `"latency max 99 (us)"`. The `value` set contributes no suffix.
    pub fn header(&self, name: &str, unit: Option<&str>) -> String {
        let mut header = name.to_string();
        if self.kind != "value" {
            header.push(' ');
            header.push_str(&self.kind);
        }
        if let Some(percentile) = &self.percentile {
            header.push(' ');
            header.push_str(percentile);
        }
        column_header(&header, unit)
    }

    /// Value of history slot `index`. Counts are never scaled.
    pub fn value(&self, index: Option<usize>, factor: &Factor) -> String {
        let sample = index.and_then(|i| self.values.get(i)).copied().flatten();
        if self.kind == "count" && *factor != Factor::Scale(1) {
            return format_sample(sample);
        }
        factor.scale(sample)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSet {
    pub kind: Option<String>,
    pub unit: Option<String>,
    pub custom_unit: Option<String>,
    pub configurable_stat: Option<String>,
    pub numerator: Option<String>,
    pub denominator: Option<String>,
    pub factor: Factor,
    pub sets: Vec<Set>,
    pub summary_min: Option<String>,
    pub summary_max: Option<String>,
    // Set instead of values when the appliance could not compute the statistic.
    pub error: Option<String>,
}

impl DataSet {
    pub fn from_node(node: &Node, style: UnitStyle) -> Self {
        let text = |name: &str| {
            node.field(name)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let summary = node.child("summary");
        Self {
            kind: text("type"),
            unit: label_unit(node, "unit", style),
            custom_unit: label_unit(node, "customUnit", style),
            configurable_stat: text("configurableStat"),
            numerator: text("numerator"),
            denominator: text("denominator"),
            factor: Factor::parse(node.field("factor")),
            sets: node.children_named("set").map(Set::from_node).collect(),
            summary_min: summary.and_then(|s| s.field("min")).map(str::to_string),
            summary_max: summary.and_then(|s| s.field("max")).map(str::to_string),
            error: text("error"),
        }
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref().or(self.custom_unit.as_deref())
    }

    fn headers_for(&self, name: &str) -> Vec<String> {
        if self.sets.is_empty() {
            return vec![column_header(name, self.unit())];
        }
        self.sets.iter().map(|s| s.header(name, self.unit())).collect()
    }

    /// Column headers of a regular data set. Empty for configurable ones.
    pub fn headers(&self) -> Vec<String> {
        match &self.kind {
            Some(kind) => self.headers_for(kind),
            None => Vec::new(),
        }
    }

    pub fn configurable_headers(&self) -> Vec<String> {
        match &self.configurable_stat {
            Some(name) => self.headers_for(name),
            None => Vec::new(),
        }
    }

    /// One value per set for history slot `index`. A data set in error
    /// reports the error in its first column.
    pub fn row(&self, index: Option<usize>) -> Vec<String> {
        if let Some(error) = &self.error {
            let mut row = vec![error.clone()];
            row.resize(self.sets.len().max(1), String::new());
            return row;
        }
        self.sets.iter().map(|s| s.value(index, &self.factor)).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivePoint {
    pub name: String,
    pub data_sets: Vec<DataSet>,
}

impl LivePoint {
    pub fn from_node(node: &Node, style: UnitStyle) -> Self {
        Self {
            name: node.field("name").unwrap_or_default().to_string(),
            data_sets: node
                .children_named("dataset")
                .map(|d| DataSet::from_node(d, style))
                .collect(),
        }
    }

    pub fn headers(&self) -> Vec<String> {
        self.data_sets.iter().flat_map(DataSet::headers).collect()
    }

    pub fn configurable(&self, name: &str) -> Option<&DataSet> {
        self.data_sets
            .iter()
            .find(|d| d.configurable_stat.as_deref() == Some(name))
    }
}

/// Measurement points polled together, with up to `points` buckets of
/// history ending at `timestamp`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsGroup {
    pub name: String,
    // Seconds.
    pub timestamp: i64,
    pub points: i64,
    pub lag_offset_ms: Option<i64>,
    pub measurement_points: Vec<LivePoint>,
}

impl StatsGroup {
    pub fn from_node(node: &Node, style: UnitStyle) -> Result<Self, DecodeError> {
        // Points are either wrapped in a measurementPoints element or listed
        // directly under the group.
        let container = node.child("measurementPoints").unwrap_or(node);
        Ok(Self {
            name: node.field("name").unwrap_or_default().to_string(),
            timestamp: int_field(node, "timestamp")?,
            points: int_field(node, "points")?,
            lag_offset_ms: parse_int(node.field("lagOffsetMs")),
            measurement_points: container
                .children_named("measurementPoint")
                .map(|p| LivePoint::from_node(p, style))
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveStatsResponse {
    // Seconds between buckets.
    pub update_period: i64,
    pub groups: Vec<StatsGroup>,
}

impl LiveStatsResponse {
    pub fn from_node(node: &Node, style: UnitStyle) -> Result<Self, DecodeError> {
        let response = find_response(node).ok_or(DecodeError::MissingResponse)?;
        let groups = response
            .children_named("statsGroup")
            .map(|g| StatsGroup::from_node(g, style))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            update_period: int_field(response, "updatePeriod")?,
            groups,
        })
    }

    /// Timestamp of the first group, which the poller uses to detect new
    /// data.
    pub fn timestamp(&self) -> Option<i64> {
        self.groups.first().map(|g| g.timestamp)
    }
}

fn find_response(node: &Node) -> Option<&Node> {
    if node.field("updatePeriod").is_some() {
        return Some(node);
    }
    node.children.iter().find_map(find_response)
}

fn int_field(node: &Node, field: &'static str) -> Result<i64, DecodeError> {
    let raw = node.field(field).unwrap_or_default();
    parse_int(Some(raw)).ok_or_else(|| DecodeError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
pub mod tests {
    use super::{DataSet, DecodeError, LiveStatsResponse, Set};
    use crate::{columns::UnitStyle, node::Node, value::Factor};

    fn set(kind: &str, percentile: Option<&str>, values: &str) -> Node {
        let node = Node::new("set").with_attr("type", kind).with_text(values);
        match percentile {
            Some(p) => node.with_attr("percentile", p),
            None => node,
        }
    }

    #[test]
    fn test_set_header() {
        let value = Set::from_node(&set("value", None, "1 2"));
        assert_eq!(value.header("bytes", Some("bytes")), "bytes (bytes)");
        let quantile = Set::from_node(&set("max", Some("99"), "1 2"));
        assert_eq!(quantile.header("latency", Some("us")), "latency max 99 (us)");
        assert_eq!(quantile.header("latency", None), "latency max 99");
    }

    #[test]
    fn test_set_values() {
        let factor = Factor::Scale(1000);
        let mean = Set::from_node(&set("mean", None, "2500 -"));
        assert_eq!(mean.value(Some(0), &factor), "2.5");
        assert_eq!(mean.value(Some(1), &factor), "");
        assert_eq!(mean.value(Some(2), &factor), "");
        assert_eq!(mean.value(None, &factor), "");

        let count = Set::from_node(&set("count", None, "7"));
        assert_eq!(count.value(Some(0), &factor), "7");
        assert_eq!(count.value(Some(0), &Factor::Scale(1)), "7.0");
    }

    #[test]
    fn test_data_set_error_fills_columns() {
        let node = Node::new("dataset")
            .with_attr("type", "latency")
            .with_attr("error", "unavailable")
            .with_child(set("min", None, "1"))
            .with_child(set("max", None, "2"));
        let data_set = DataSet::from_node(&node, UnitStyle::Raw);
        assert_eq!(data_set.row(Some(0)), vec!["unavailable", ""]);
        assert_eq!(data_set.headers(), vec!["latency min", "latency max"]);
    }

    #[test]
    fn test_configurable_data_set() {
        let node = Node::new("dataset")
            .with_attr("configurableStat", "Orders")
            .with_attr("customUnit", "orders")
            .with_child(set("value", None, "3"));
        let data_set = DataSet::from_node(&node, UnitStyle::Raw);
        assert!(data_set.headers().is_empty());
        assert_eq!(data_set.configurable_headers(), vec!["Orders (orders)"]);
    }

    #[test]
    fn test_from_node() {
        let document = Node::new("getLiveStatsResponse")
            .with_attr("updatePeriod", "5")
            .with_child(
                Node::new("statsGroup")
                    .with_attr("name", "g1")
                    .with_attr("timestamp", "1000")
                    .with_attr("points", "3")
                    .with_child(
                        Node::new("measurementPoints").with_child(
                            Node::new("measurementPoint")
                                .with_attr("name", "PortA")
                                .with_child(Node::new("dataset").with_attr("type", "bytes")),
                        ),
                    ),
            );
        let response = LiveStatsResponse::from_node(&document, UnitStyle::Raw).unwrap();
        assert_eq!(response.update_period, 5);
        assert_eq!(response.timestamp(), Some(1000));
        let group = &response.groups[0];
        assert_eq!(group.points, 3);
        assert_eq!(group.measurement_points[0].name, "PortA");
        assert_eq!(group.measurement_points[0].headers(), vec!["bytes"]);
    }

    #[test]
    fn test_from_node_errors() {
        assert_eq!(
            LiveStatsResponse::from_node(&Node::new("Envelope"), UnitStyle::Raw),
            Err(DecodeError::MissingResponse)
        );
        let document = Node::new("getLiveStatsResponse")
            .with_attr("updatePeriod", "5")
            .with_child(Node::new("statsGroup").with_attr("timestamp", "1000"));
        assert_eq!(
            LiveStatsResponse::from_node(&document, UnitStyle::Raw),
            Err(DecodeError::InvalidField {
                field: "points",
                value: String::new()
            })
        );
    }
}
