use super::{header, marker};
use crate::{
    columns::Columns,
    sink::RowSink,
    stat::{
        series::{Cell, Series, SeriesColumn},
        MeasurementPoint, Statistic, StatsResponse,
    },
    timeline::{BucketGrid, ResponseWindow},
    value::format_millis,
};
use log::debug;
use std::io::Result;

const BUCKET_COLUMNS: [&str; 5] = [
    "#measurement point",
    "start time",
    "start timestamp (ms)",
    "end time",
    "end timestamp (ms)",
];

struct Block {
    select: fn(&Statistic) -> Option<&dyn Series>,
    summary_marker: &'static str,
    data_marker: &'static str,
}

const TIME_SERIES: Block = Block {
    select: Statistic::as_time_series,
    summary_marker: "#summary results for time series data",
    data_marker: "#time series data",
};

const EVENT_DATA: Block = Block {
    select: event_data,
    summary_marker: "#summary results for event data",
    data_marker: "#time series event data",
};

fn event_data(stat: &Statistic) -> Option<&dyn Series> {
    match stat {
        Statistic::EventData(e) => Some(e),
        _ => None,
    }
}

pub(crate) fn write_time_series<S: RowSink>(
    response: &StatsResponse,
    grid: Option<&BucketGrid>,
    sink: &mut S,
) -> Result<bool> {
    write_block(&TIME_SERIES, response, grid, sink)
}

pub(crate) fn write_event_data<S: RowSink>(
    response: &StatsResponse,
    grid: Option<&BucketGrid>,
    sink: &mut S,
) -> Result<bool> {
    write_block(&EVENT_DATA, response, grid, sink)
}

// Cells and columns of one statistic, rendered once.
struct Rendered<'a> {
    series: &'a dyn Series,
    summary: Vec<Cell>,
    columns: Vec<SeriesColumn>,
}

fn render<'a>(block: &Block, point: &'a MeasurementPoint, window: ResponseWindow) -> Vec<Rendered<'a>> {
    point
        .stats
        .iter()
        .filter_map(block.select)
        .map(|series| Rendered {
            series,
            summary: series.summary_cells(window),
            columns: series.series_columns(),
        })
        .collect()
}

fn write_block<S: RowSink>(
    block: &Block,
    response: &StatsResponse,
    grid: Option<&BucketGrid>,
    sink: &mut S,
) -> Result<bool> {
    let points: Vec<(&MeasurementPoint, Vec<Rendered>)> = response
        .points
        .iter()
        .map(|p| (p, render(block, p, response.window)))
        .collect();

    let mut summary_columns = Columns::new();
    let mut series_columns = Columns::new();
    for rendered in points.iter().flat_map(|(_, r)| r) {
        summary_columns.extend(rendered.summary.iter().map(|c| &c.column));
        series_columns.extend(rendered.columns.iter().map(|c| &c.column));
    }
    if summary_columns.is_empty() {
        return Ok(false);
    }

    sink.write_row(&marker(block.summary_marker))?;
    sink.write_row(&header(&["#measurement point"], summary_columns.as_slice()))?;
    for (point, rendered) in &points {
        let mut row = vec![point.name.clone()];
        row.extend(summary_columns.iter().map(|column| {
            rendered
                .iter()
                .flat_map(|r| &r.summary)
                .find(|c| &c.column == column)
                .map(|c| c.value.clone())
                .unwrap_or_default()
        }));
        sink.write_row(&row)?;
    }

    sink.blank()?;
    sink.write_row(&marker(block.data_marker))?;
    sink.write_row(&header(&BUCKET_COLUMNS, series_columns.as_slice()))?;

    let grid = match grid {
        Some(grid) => grid,
        None => {
            debug!("no bucket grid, skipping {} rows", block.data_marker);
            return Ok(true);
        }
    };
    for (point, rendered) in &points {
        let aligned: Vec<Vec<String>> = series_columns
            .iter()
            .map(|column| {
                rendered
                    .iter()
                    .find_map(|r| {
                        // A statistic without values leaves the column to the next one.
                        r.columns
                            .iter()
                            .filter(|c| !c.values.is_empty())
                            .find(|c| &c.column == column)
                            .map(|c| grid.align(&r.series.base().start_times, &c.values))
                    })
                    .unwrap_or_else(|| vec![String::new(); grid.len()])
            })
            .collect();

        for (i, bucket) in grid.buckets().iter().enumerate() {
            let mut row = vec![
                point.name.clone(),
                format_millis(bucket.start),
                bucket.start.to_string(),
                format_millis(bucket.end),
                bucket.end.to_string(),
            ];
            row.extend(aligned.iter().map(|values| values[i].clone()));
            sink.write_row(&row)?;
        }
    }
    Ok(true)
}

#[cfg(test)]
pub mod tests {
    use super::{write_event_data, write_time_series};
    use crate::{
        config::ShapeConfig,
        node::Node,
        sink::RowBuffer,
        stat::{MeasurementPoint, StatsResponse},
        timeline::ResponseWindow,
    };

    fn series(kind: &str, starts: &str, ends: &str, values: &str) -> Node {
        Node::new(kind)
            .with_class("TimeSeries")
            .with_attr("type", kind)
            .with_child(Node::leaf("startTimes", starts))
            .with_child(Node::leaf("endTimes", ends))
            .with_child(Node::leaf("values", values))
    }

    fn response(points: Vec<Node>) -> StatsResponse {
        let config = ShapeConfig::default();
        StatsResponse {
            window: ResponseWindow::new(0, 180),
            points: points
                .iter()
                .map(|p| MeasurementPoint::from_node(p, &config).0)
                .collect(),
            diagnostics: vec![],
        }
    }

    #[test]
    fn test_columns_union_across_points() {
        let response = response(vec![
            Node::new("measurementPoint")
                .with_attr("name", "PortA")
                .with_child(series("bytes", "0 60 120", "60 120 180", "1 2 3")),
            Node::new("measurementPoint")
                .with_attr("name", "PortB")
                .with_child(series("packets", "60", "120", "7")),
        ]);
        let grid = response.bucket_grid().unwrap();
        let mut buffer = RowBuffer::new();
        assert!(write_time_series(&response, Some(&grid), &mut buffer).unwrap());

        let data = buffer
            .rows
            .iter()
            .position(|r| r[0] == "#time series data")
            .unwrap();
        assert_eq!(&buffer.rows[data + 1][5..], ["bytes value", "packets value"]);

        let rows = &buffer.rows[data + 2..];
        assert_eq!(rows.len(), 6);
        for row in rows {
            assert_eq!(row.len(), 7);
        }
        assert_eq!(&rows[2][5..], ["3.0", ""]);
        assert_eq!(rows[4][0], "PortB");
        assert_eq!(&rows[4][5..], ["", "7.0"]);
        assert_eq!(&rows[3][5..], ["", ""]);
    }

    #[test]
    fn test_empty_series_yields_shared_column() {
        let empty = Node::new("bytes")
            .with_class("TimeSeries")
            .with_attr("type", "bytes")
            .with_child(Node::leaf("startTimes", "0"))
            .with_child(Node::leaf("endTimes", "60"))
            .with_child(Node::leaf("values", ""));
        let received =
            series("rxBytes", "0 60 120", "60 120 180", "1 2 3").with_attr("type", "bytes");
        let response = response(vec![Node::new("measurementPoint")
            .with_attr("name", "PortA")
            .with_child(empty)
            .with_child(received)]);
        let grid = response.bucket_grid().unwrap();
        let mut buffer = RowBuffer::new();
        assert!(write_time_series(&response, Some(&grid), &mut buffer).unwrap());

        let data = buffer
            .rows
            .iter()
            .position(|r| r[0] == "#time series data")
            .unwrap();
        assert_eq!(&buffer.rows[data + 1][5..], ["bytes value"]);
        let values: Vec<&str> = buffer.rows[data + 2..].iter().map(|r| r[5].as_str()).collect();
        assert_eq!(values, vec!["1.0", "2.0", "3.0"]);
    }

    #[test]
    fn test_event_data_shares_grid() {
        let events = Node::new("statEventData").with_child(
            Node::new("event")
                .with_class("TimeSeriesEventData")
                .with_attr("name", "Gaps")
                .with_child(Node::leaf("startTimes", "120"))
                .with_child(Node::leaf("endTimes", "180"))
                .with_child(Node::leaf("values", "4"))
                .with_child(Node::leaf("total", "90")),
        );
        let response = response(vec![Node::new("measurementPoint")
            .with_attr("name", "PortA")
            .with_child(series("bytes", "0", "60", "1"))
            .with_child(events)]);
        let grid = response.bucket_grid().unwrap();
        assert_eq!(grid.width(), 60);

        let mut buffer = RowBuffer::new();
        assert!(write_event_data(&response, Some(&grid), &mut buffer).unwrap());
        assert_eq!(buffer.rows[0], vec!["#summary results for event data"]);
        assert_eq!(buffer.rows[2][1], "90");
        assert_eq!(buffer.rows[2][2], "50.0");

        let values: Vec<&str> = buffer.rows[6..].iter().map(|r| r[5].as_str()).collect();
        assert_eq!(values, vec!["", "", "4.0"]);
    }

    #[test]
    fn test_without_grid_only_summary_is_written() {
        let response = response(vec![Node::new("measurementPoint")
            .with_attr("name", "PortA")
            .with_child(series("bytes", "", "", ""))]);
        assert!(response.bucket_grid().is_none());

        let mut buffer = RowBuffer::new();
        assert!(write_time_series(&response, None, &mut buffer).unwrap());
        assert_eq!(buffer.rows.len(), 6);
        assert_eq!(buffer.rows[5][0], "#measurement point");
    }

    #[test]
    fn test_no_series() {
        let response = response(vec![]);
        let mut buffer = RowBuffer::new();
        assert!(!write_time_series(&response, None, &mut buffer).unwrap());
        assert!(!write_event_data(&response, None, &mut buffer).unwrap());
        assert!(buffer.rows.is_empty());
    }
}
