mod series;
mod summary;
mod tables;
mod topn;

use crate::{
    sink::RowSink,
    stat::{MeasurementPoint, Statistic, StatsResponse},
    timeline::BucketGrid,
};
use std::io::Result;

impl StatsResponse {
    /// Writes every block present in the response, each followed by a blank
    /// row.
    pub fn to_csv<S: RowSink>(&self, mut sink: S) -> Result<()> {
        let grid = self.bucket_grid();

        if summary::write_summary(self, &mut sink)? {
            sink.blank()?;
        }
        if tables::write_distribution(self, &mut sink)? {
            sink.blank()?;
        }
        if tables::write_scalar(self, &mut sink)? {
            sink.blank()?;
        }
        if series::write_time_series(self, grid.as_ref(), &mut sink)? {
            sink.blank()?;
        }
        if series::write_event_data(self, grid.as_ref(), &mut sink)? {
            sink.blank()?;
        }
        if topn::write_top_n(self, &mut sink)? {
            sink.blank()?;
        }
        if topn::write_time_series_top_n(self, &mut sink)? {
            sink.blank()?;
        }
        Ok(())
    }

    /// The bucket grid shared by every series in the response, sized from the
    /// first series that reported a bucket.
    pub fn bucket_grid(&self) -> Option<BucketGrid> {
        let series = self
            .points
            .iter()
            .flat_map(|p| p.stats.iter())
            .filter_map(Statistic::as_series)
            .map(|s| {
                let base = s.base();
                (&base.start_times[..], &base.end_times[..])
            });
        BucketGrid::infer(self.window, series)
    }
}

// Every statistic picked out by `select`, with the point it belongs to.
fn each<'a, T: ?Sized + 'a, F>(
    points: &'a [MeasurementPoint],
    select: F,
) -> impl Iterator<Item = (&'a MeasurementPoint, &'a T)> + 'a
where
    F: Fn(&'a Statistic) -> Option<&'a T> + Copy + 'a,
{
    points.iter().flat_map(move |point| {
        point
            .stats
            .iter()
            .filter_map(move |stat| select(stat).map(|t| (point, t)))
    })
}

fn marker(text: &str) -> Vec<String> {
    vec![text.to_string()]
}

fn header(fixed: &[&str], columns: &[String]) -> Vec<String> {
    fixed
        .iter()
        .map(|c| c.to_string())
        .chain(columns.iter().cloned())
        .collect()
}
