use super::{label_unit, series::Cell};
use crate::{
    columns::{column_header, UnitStyle},
    node::Node,
    value::{parse_int, Factor},
};

/// A single value over the whole reporting period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub kind: String,
    pub unit: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub value: Option<String>,
    pub factor: Factor,
}

impl Scalar {
    pub fn from_node(node: &Node, style: UnitStyle) -> Self {
        Self {
            kind: node.field("type").unwrap_or_default().to_string(),
            unit: label_unit(node, "unit", style),
            start_time: parse_int(node.field("startTimes")),
            end_time: parse_int(node.field("endTimes")),
            value: node.field("value").map(str::to_string),
            factor: Factor::parse(node.field("factor")),
        }
    }

    pub fn header(&self) -> String {
        column_header(&self.kind, self.unit.as_deref())
    }

    pub fn rendered(&self) -> String {
        self.factor.scale_str(self.value.as_deref())
    }
}

/// One reported point of a distribution: an aggregate or a named quantile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPoint {
    // Quantile name, e.g. "99". None for min, mean and max.
    pub quantile: Option<String>,
    pub aggregate: &'static str,
    pub value: Option<String>,
    pub value_filter: Option<String>,
}

impl DistributionPoint {
    fn from_node(node: Option<&Node>, aggregate: &'static str) -> Self {
        Self {
            quantile: node.and_then(|n| n.attr("quantile")).map(str::to_string),
            aggregate,
            value: node.and_then(Node::value).map(str::to_string),
            value_filter: node
                .and_then(|n| n.attr("valueFilter"))
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub kind: String,
    pub unit: Option<String>,
    pub factor: Factor,
    pub availability: Option<String>,
    pub points: Vec<DistributionPoint>,
}

impl Distribution {
    pub fn from_node(node: &Node, style: UnitStyle) -> Self {
        let mut points: Vec<DistributionPoint> = ["min", "mean", "max"]
            .into_iter()
            .map(|aggregate| DistributionPoint::from_node(node.child(aggregate), aggregate))
            .collect();
        points.extend(
            node.children_named("quantile")
                .map(|q| DistributionPoint::from_node(Some(q), "percentile")),
        );

        Self {
            kind: node.field("type").unwrap_or_default().to_string(),
            unit: label_unit(node, "unit", style),
            factor: Factor::parse(node.field("factor")),
            availability: node.field("availability").map(str::to_string),
            points,
        }
    }

    pub fn header(&self) -> String {
        column_header(&self.kind, self.unit.as_deref())
    }

    // "latency 99 percentile gt10 (us)"
    fn column(&self, point: &DistributionPoint) -> String {
        let mut column = self.kind.clone();
        if let Some(quantile) = &point.quantile {
            column.push(' ');
            column.push_str(quantile);
        }
        column.push(' ');
        column.push_str(point.aggregate);
        if let Some(filter) = &point.value_filter {
            column.push(' ');
            column.push_str(filter);
        }
        column_header(&column, self.unit.as_deref())
    }

    pub fn cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .points
            .iter()
            .map(|p| Cell::new(self.column(p), self.factor.scale_str(p.value.as_deref())))
            .collect();
        cells.push(Cell::new(
            format!("{} availability (%)", self.kind),
            self.availability.clone().unwrap_or_default(),
        ));
        cells
    }
}
