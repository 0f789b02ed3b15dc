use super::{each, header, marker};
use crate::{
    columns::Columns,
    sink::RowSink,
    stat::{
        topn::{TimeSeriesTopN, TopN},
        MeasurementPoint, Statistic, StatsResponse,
    },
    value::{format_millis, format_opt},
};
use std::io::Result;

fn top_n(stat: &Statistic) -> Option<&TopN> {
    match stat {
        Statistic::TopN(t) => Some(t),
        _ => None,
    }
}

fn time_series_top_n(stat: &Statistic) -> Option<&TimeSeriesTopN> {
    match stat {
        Statistic::TimeSeriesTopN(t) => Some(t),
        _ => None,
    }
}

fn find<'a, T>(
    point: &'a MeasurementPoint,
    select: fn(&Statistic) -> Option<&T>,
    kind: impl Fn(&T) -> &str,
    wanted: &str,
) -> Option<&'a T> {
    point.stats.iter().filter_map(select).find(|t| kind(*t) == wanted)
}

pub(crate) fn write_top_n<S: RowSink>(response: &StatsResponse, sink: &mut S) -> Result<bool> {
    let mut kinds = Columns::new();
    for (_, top) in each(&response.points, top_n) {
        kinds.push(&top.kind);
    }
    if kinds.is_empty() {
        return Ok(false);
    }

    sink.write_row(&marker("#summary results for topn data"))?;
    sink.write_row(&header(
        &[
            "#measurement point",
            "type",
            "totalBytes (bytes)",
            "totalPackets (packets)",
            "totalFlows (flows)",
            "maxError",
            "availability (%)",
            "periodEndsAt (ms)",
        ],
        &[],
    ))?;
    for point in &response.points {
        for kind in &kinds {
            let mut row = vec![point.name.clone(), kind.clone()];
            match find(point, top_n, |t| t.kind.as_str(), kind) {
                Some(top) => row.extend(top.totals()),
                None => row.extend(vec![String::new(); 6]),
            }
            sink.write_row(&row)?;
        }
    }

    sink.blank()?;
    sink.write_row(&marker("#topn data"))?;
    sink.write_row(&header(
        &[
            "#measurement point",
            "type",
            "key",
            "byteCount (bytes)",
            "byteCountPercentage (%)",
            "packetCount (packets)",
            "flowCount (flows)",
            "bitRate (kbps)",
            "application",
        ],
        &[],
    ))?;
    for point in &response.points {
        for kind in &kinds {
            let top = match find(point, top_n, |t| t.kind.as_str(), kind) {
                Some(top) => top,
                None => continue,
            };
            for entry in &top.entries {
                let mut row = vec![point.name.clone(), kind.clone(), entry.key.clone()];
                row.extend(entry.cells());
                sink.write_row(&row)?;
            }
        }
    }
    Ok(true)
}

pub(crate) fn write_time_series_top_n<S: RowSink>(response: &StatsResponse, sink: &mut S) -> Result<bool> {
    let mut kinds = Columns::new();
    for (_, top) in each(&response.points, time_series_top_n) {
        kinds.push(&top.kind);
    }
    if kinds.is_empty() {
        return Ok(false);
    }

    let columns: Vec<String> = kinds
        .iter()
        .flat_map(|kind| {
            [
                format!("{} availability (%)", kind),
                format!("{} config changes (ms)", kind),
            ]
        })
        .collect();
    sink.write_row(&marker("#summary results for time series topn data"))?;
    sink.write_row(&header(&["#measurement point"], &columns))?;
    for point in &response.points {
        let mut row = vec![point.name.clone()];
        for kind in &kinds {
            match find(point, time_series_top_n, |t| t.kind.as_str(), kind) {
                Some(top) => {
                    row.push(format_opt(top.base.availability));
                    row.push(top.base.config_changes.clone().unwrap_or_default());
                }
                None => row.extend([String::new(), String::new()]),
            }
        }
        sink.write_row(&row)?;
    }

    sink.blank()?;
    sink.write_row(&marker("#time series topn data"))?;
    sink.write_row(&header(
        &[
            "#measurement point",
            "type",
            "key",
            "start time",
            "start timestamp",
            "end time",
            "end timestamp",
            "bit rate (bps)",
            "packet rate (pps)",
        ],
        &[],
    ))?;
    for point in &response.points {
        for kind in &kinds {
            let top = match find(point, time_series_top_n, |t| t.kind.as_str(), kind) {
                Some(top) => top,
                None => continue,
            };
            for key_data in &top.key_data {
                for (start, end, bits, packets) in top.buckets(key_data) {
                    sink.write_row(&[
                        point.name.clone(),
                        kind.clone(),
                        key_data.key.clone(),
                        format_millis(start),
                        start.to_string(),
                        format_millis(end),
                        end.to_string(),
                        bits,
                        packets,
                    ])?;
                }
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
pub mod tests {
    use super::{write_time_series_top_n, write_top_n};
    use crate::{
        config::ShapeConfig,
        node::Node,
        sink::RowBuffer,
        stat::{MeasurementPoint, StatsResponse},
    };

    fn response(points: Vec<Node>) -> StatsResponse {
        let config = ShapeConfig::default();
        StatsResponse {
            points: points
                .iter()
                .map(|p| MeasurementPoint::from_node(p, &config).0)
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_top_n_blocks() {
        let top = Node::new("talkers")
            .with_class("TopN")
            .with_attr("type", "talkers")
            .with_child(Node::leaf("totalBytes", "900"))
            .with_child(
                Node::new("entry")
                    .with_child(Node::leaf("key", "10.0.0.1"))
                    .with_child(Node::leaf("byteCount", "600")),
            )
            .with_child(
                Node::new("entry")
                    .with_child(Node::leaf("key", "10.0.0.2"))
                    .with_child(Node::leaf("byteCount", "300")),
            );
        let response = response(vec![
            Node::new("measurementPoint").with_attr("name", "PortA").with_child(top),
            Node::new("measurementPoint").with_attr("name", "PortB"),
        ]);

        let mut buffer = RowBuffer::new();
        assert!(write_top_n(&response, &mut buffer).unwrap());
        let rows = &buffer.rows;
        assert_eq!(rows[0], vec!["#summary results for topn data"]);
        assert_eq!(rows[2], vec!["PortA", "talkers", "900", "", "", "", "", ""]);
        assert_eq!(rows[3], vec!["PortB", "talkers", "", "", "", "", "", ""]);
        assert!(rows[4].is_empty());
        assert_eq!(rows[5], vec!["#topn data"]);
        assert_eq!(rows[7][..4], ["PortA", "talkers", "10.0.0.1", "600"]);
        assert_eq!(rows[8][2], "10.0.0.2");
        assert_eq!(rows.len(), 9);
    }

    #[test]
    fn test_time_series_top_n_blocks() {
        let top = Node::new("flows")
            .with_class("TimeSeriesTopN")
            .with_attr("type", "flows")
            .with_child(Node::leaf("startTimes", "0 60"))
            .with_child(Node::leaf("endTimes", "60 120"))
            .with_child(Node::leaf("availability", "100"))
            .with_child(Node::leaf("configChanges", "0"))
            .with_child(
                Node::new("keyData")
                    .with_attr("key", "tcp")
                    .with_child(Node::leaf("bitRate", "800 -"))
                    .with_child(Node::leaf("packetRate", "2 3")),
            );
        let response = response(vec![Node::new("measurementPoint")
            .with_attr("name", "PortA")
            .with_child(top)]);

        let mut buffer = RowBuffer::new();
        assert!(write_time_series_top_n(&response, &mut buffer).unwrap());
        let rows = &buffer.rows;
        assert_eq!(
            rows[1],
            vec!["#measurement point", "flows availability (%)", "flows config changes (ms)"]
        );
        assert_eq!(rows[2], vec!["PortA", "100", "0"]);
        assert_eq!(
            rows[6],
            vec![
                "PortA",
                "flows",
                "tcp",
                "1970-01-01 00:00:00",
                "0",
                "1970-01-01 00:00:00",
                "60",
                "800",
                "2"
            ]
        );
        assert_eq!(rows[7][7], "");
        assert_eq!(rows.len(), 8);
    }

    #[test]
    fn test_no_top_n() {
        let response = response(vec![]);
        let mut buffer = RowBuffer::new();
        assert!(!write_top_n(&response, &mut buffer).unwrap());
        assert!(!write_time_series_top_n(&response, &mut buffer).unwrap());
    }
}
