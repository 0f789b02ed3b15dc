use super::each;
use crate::{
    columns::{column_header, Columns},
    sink::RowSink,
    stat::{summary::Summary, MeasurementPoint, Statistic, StatsResponse},
};
use std::io::Result;

pub(crate) fn write_summary<S: RowSink>(response: &StatsResponse, sink: &mut S) -> Result<bool> {
    let summaries: Vec<(&MeasurementPoint, &Summary)> = each(&response.points, |s| match s {
        Statistic::Summary(summary) => Some(summary),
        _ => None,
    })
    .collect();
    if summaries.is_empty() {
        return Ok(false);
    }

    let mut configurable = Columns::new();
    for (_, summary) in &summaries {
        for stat in &summary.configurable {
            configurable.push(&stat.name);
        }
    }

    let mut header = vec!["#measurement point summary".to_string()];
    header.extend(fixed_columns(&summaries));
    header.extend(configurable.iter().cloned());
    sink.write_row(&header)?;

    for (point, summary) in &summaries {
        let mut row = vec![point.name.clone()];
        row.extend(summary.cells());
        row.extend(
            configurable
                .iter()
                .map(|name| summary.configurable_value(name).unwrap_or_default()),
        );
        sink.write_row(&row)?;
    }
    Ok(true)
}

// Units come from the first summary that reports the field.
fn fixed_columns(summaries: &[(&MeasurementPoint, &Summary)]) -> Vec<String> {
    let with_unit = |label: &str, field: &str| {
        let unit = summaries.iter().find_map(|(_, s)| s.unit(field));
        column_header(label, unit)
    };
    vec![
        with_unit("configured capacity", "configuredCapacity"),
        with_unit("effective capacity", "effectiveCapacity"),
        with_unit("total bytes", "totalBytes"),
        "average utilisation".to_string(),
        "network service indicator".to_string(),
        "measure messages".to_string(),
        "monitoring mechanism".to_string(),
        with_unit("one second peak", "oneSecondPeak"),
        with_unit("max microburst", "maxMicroburst"),
        "packet microburst available".to_string(),
        with_unit("link size packet delay", "linkSizePacketDelay"),
        with_unit("link size queue length", "linkSizeQueueLength"),
        "recommendation".to_string(),
    ]
}
