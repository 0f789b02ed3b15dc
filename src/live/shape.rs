use super::model::{LivePoint, LiveStatsResponse, StatsGroup};
use crate::{sink::RowSink, value::format_secs};
use std::io::Result;

const FIXED_COLUMNS: [&str; 5] = [
    "#mp name",
    "start time",
    "start timestamp (s)",
    "end time",
    "end timestamp (s)",
];

/// Header of a live session, fixed by the first response that carries data.
/// Later rows are laid out against it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveColumns {
    pub header: Vec<String>,
    // Configurable statistic name and its column count, in first-seen order.
    configurable: Vec<(String, usize)>,
}

impl LiveColumns {
    pub fn configurable(&self) -> impl Iterator<Item = &str> {
        self.configurable.iter().map(|(name, _)| name.as_str())
    }
}

impl LiveStatsResponse {
    /// Regular columns come from the first measurement point of the first
    /// group. Configurable columns are the union across every point.
    pub fn columns(&self) -> LiveColumns {
        let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
        let group = match self.groups.first() {
            Some(group) => group,
            None => {
                return LiveColumns {
                    header,
                    configurable: Vec::new(),
                }
            }
        };
        if let Some(point) = group.measurement_points.first() {
            header.extend(point.headers());
        }

        let mut configurable: Vec<(String, usize)> = Vec::new();
        let data_sets = self
            .groups
            .iter()
            .flat_map(|g| &g.measurement_points)
            .flat_map(|p| &p.data_sets);
        for data_set in data_sets {
            let name = match &data_set.configurable_stat {
                Some(name) => name,
                None => continue,
            };
            if configurable.iter().any(|(n, _)| n == name) {
                continue;
            }
            let headers = data_set.configurable_headers();
            configurable.push((name.clone(), headers.len()));
            header.extend(headers);
        }
        LiveColumns {
            header,
            configurable,
        }
    }

    pub fn write_header<S: RowSink>(&self, sink: &mut S) -> Result<LiveColumns> {
        let columns = self.columns();
        sink.write_row(&columns.header)?;
        Ok(columns)
    }

    /// Rows of the newest `history_limit` buckets of every group, at most
    /// `row_limit` per measurement point, ordered by bucket start.
    pub fn rows(
        &self,
        columns: &LiveColumns,
        history_limit: Option<usize>,
        row_limit: Option<usize>,
    ) -> Vec<Vec<String>> {
        let mut rows: Vec<(i64, Vec<String>)> = Vec::new();
        for group in &self.groups {
            for point in &group.measurement_points {
                let mut point_rows = self.point_rows(group, point, columns, history_limit);
                if let Some(limit) = row_limit {
                    point_rows.truncate(limit);
                }
                rows.extend(point_rows);
            }
        }
        // Stable, so points sharing a bucket keep document order.
        rows.sort_by_key(|(start, _)| *start);
        rows.into_iter().map(|(_, row)| row).collect()
    }

    pub fn write_rows<S: RowSink>(
        &self,
        sink: &mut S,
        columns: &LiveColumns,
        history_limit: Option<usize>,
        row_limit: Option<usize>,
    ) -> Result<usize> {
        let rows = self.rows(columns, history_limit, row_limit);
        for row in &rows {
            sink.write_row(row)?;
        }
        Ok(rows.len())
    }

    fn point_rows(
        &self,
        group: &StatsGroup,
        point: &LivePoint,
        columns: &LiveColumns,
        history_limit: Option<usize>,
    ) -> Vec<(i64, Vec<String>)> {
        let points = group.points.max(0) as usize;
        if points == 0 {
            let row = row(point, columns, group.timestamp, group.timestamp, None);
            return vec![(group.timestamp, row)];
        }

        let first = match history_limit {
            Some(limit) => points.saturating_sub(limit),
            None => 0,
        };
        (first..points)
            .map(|index| {
                let back = (points - index) as i64;
                let start = group
                    .timestamp
                    .saturating_sub(back.saturating_mul(self.update_period));
                let end = group
                    .timestamp
                    .saturating_sub((back - 1).saturating_mul(self.update_period));
                (start, row(point, columns, start, end, Some(index)))
            })
            .collect()
    }
}

fn row(point: &LivePoint, columns: &LiveColumns, start: i64, end: i64, index: Option<usize>) -> Vec<String> {
    let mut row = vec![
        point.name.clone(),
        format_secs(start),
        start.to_string(),
        format_secs(end),
        end.to_string(),
    ];
    for data_set in point.data_sets.iter().filter(|d| d.kind.is_some()) {
        row.extend(data_set.row(index));
    }
    for (name, width) in &columns.configurable {
        match point.configurable(name) {
            Some(data_set) => row.extend(data_set.row(index)),
            None => row.extend(vec![String::new(); *width]),
        }
    }
    row
}
