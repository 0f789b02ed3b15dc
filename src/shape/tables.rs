use super::{each, header, marker};
use crate::{
    columns::Columns,
    sink::RowSink,
    stat::{
        scalar::{Distribution, Scalar},
        series::Cell,
        Statistic, StatsResponse,
    },
    value::{format_millis, format_opt},
};
use std::io::Result;

fn distributions(stat: &Statistic) -> Option<&Distribution> {
    match stat {
        Statistic::Distribution(d) => Some(d),
        _ => None,
    }
}

fn scalars(stat: &Statistic) -> Option<&Scalar> {
    match stat {
        Statistic::Scalar(s) => Some(s),
        _ => None,
    }
}

pub(crate) fn write_distribution<S: RowSink>(response: &StatsResponse, sink: &mut S) -> Result<bool> {
    let mut columns = Columns::new();
    for (_, distribution) in each(&response.points, distributions) {
        for cell in distribution.cells() {
            columns.push(&cell.column);
        }
    }
    if columns.is_empty() {
        return Ok(false);
    }

    sink.write_row(&marker("#distribution data"))?;
    sink.write_row(&header(&["#measurement point"], columns.as_slice()))?;
    for point in &response.points {
        let cells: Vec<Cell> = point
            .stats
            .iter()
            .filter_map(distributions)
            .flat_map(Distribution::cells)
            .collect();
        let mut row = vec![point.name.clone()];
        row.extend(columns.iter().map(|column| {
            cells
                .iter()
                .find(|c| &c.column == column)
                .map(|c| c.value.clone())
                .unwrap_or_default()
        }));
        sink.write_row(&row)?;
    }
    Ok(true)
}

pub(crate) fn write_scalar<S: RowSink>(response: &StatsResponse, sink: &mut S) -> Result<bool> {
    let mut columns = Columns::new();
    for (_, scalar) in each(&response.points, scalars) {
        columns.push(&scalar.header());
    }
    if columns.is_empty() {
        return Ok(false);
    }

    sink.write_row(&marker("#scalar value data"))?;
    sink.write_row(&header(
        &[
            "#measurement point",
            "start time",
            "start timestamp",
            "end time",
            "end timestamp",
        ],
        columns.as_slice(),
    ))?;
    for point in &response.points {
        // Times come from the point's scalar in the leftmost column.
        let first = columns
            .iter()
            .find_map(|column| point.stat_by_header(column).and_then(scalars));
        let start = first.and_then(|s| s.start_time);
        let end = first.and_then(|s| s.end_time);

        let mut row = vec![
            point.name.clone(),
            start.map(format_millis).unwrap_or_default(),
            format_opt(start),
            end.map(format_millis).unwrap_or_default(),
            format_opt(end),
        ];
        row.extend(columns.iter().map(|column| {
            point
                .stat_by_header(column)
                .and_then(scalars)
                .map(Scalar::rendered)
                .unwrap_or_default()
        }));
        sink.write_row(&row)?;
    }
    Ok(true)
}

#[cfg(test)]
pub mod tests {
    use super::{write_distribution, write_scalar};
    use crate::{
        config::ShapeConfig,
        node::Node,
        sink::RowBuffer,
        stat::{MeasurementPoint, StatsResponse},
    };

    fn distribution(kind: &str, min: &str) -> Node {
        Node::new(kind)
            .with_class("Distribution")
            .with_attr("type", kind)
            .with_child(Node::leaf("min", min))
            .with_child(Node::leaf("mean", min))
            .with_child(Node::leaf("max", min))
            .with_child(Node::leaf("availability", "100"))
    }

    fn scalar(kind: &str, start: &str, end: &str) -> Node {
        Node::new(kind)
            .with_class("ScalarValue")
            .with_attr("type", kind)
            .with_child(Node::leaf("startTimes", start))
            .with_child(Node::leaf("endTimes", end))
            .with_child(Node::leaf("value", "1"))
    }

    #[test]
    fn test_scalar_times_follow_column_order() {
        let config = ShapeConfig::default();
        let a = Node::new("measurementPoint")
            .with_attr("name", "PortA")
            .with_child(scalar("packets", "0", "180000"));
        let b = Node::new("measurementPoint")
            .with_attr("name", "PortB")
            .with_child(scalar("bytes", "1000", "2000"))
            .with_child(scalar("packets", "0", "180000"));
        let response = StatsResponse {
            points: vec![
                MeasurementPoint::from_node(&a, &config).0,
                MeasurementPoint::from_node(&b, &config).0,
            ],
            ..Default::default()
        };

        let mut buffer = RowBuffer::new();
        assert!(write_scalar(&response, &mut buffer).unwrap());
        assert_eq!(&buffer.rows[1][5..], ["packets", "bytes"]);
        assert_eq!(buffer.rows[3][0], "PortB");
        assert_eq!(buffer.rows[3][2], "0");
        assert_eq!(buffer.rows[3][4], "180000");
        assert_eq!(&buffer.rows[3][5..], ["1.0", "1.0"]);
    }

    #[test]
    fn test_distribution_block() {
        let config = ShapeConfig::default();
        let a = Node::new("measurementPoint")
            .with_attr("name", "PortA")
            .with_child(distribution("latency", "3"));
        let b = Node::new("measurementPoint")
            .with_attr("name", "PortB")
            .with_child(distribution("jitter", "-"));
        let response = StatsResponse {
            points: vec![
                MeasurementPoint::from_node(&a, &config).0,
                MeasurementPoint::from_node(&b, &config).0,
            ],
            ..Default::default()
        };

        let mut buffer = RowBuffer::new();
        assert!(write_distribution(&response, &mut buffer).unwrap());
        assert_eq!(buffer.rows[0], vec!["#distribution data"]);
        assert_eq!(
            buffer.rows[1],
            vec![
                "#measurement point",
                "latency min",
                "latency mean",
                "latency max",
                "latency availability (%)",
                "jitter min",
                "jitter mean",
                "jitter max",
                "jitter availability (%)",
            ]
        );
        assert_eq!(
            buffer.rows[2],
            vec!["PortA", "3.0", "3.0", "3.0", "100", "", "", "", ""]
        );
        assert_eq!(
            buffer.rows[3],
            vec!["PortB", "", "", "", "", "", "", "", "100"]
        );
    }
}
