use log::{trace, warn};

// Upper bound on buckets per response. A year of one-minute buckets fits.
pub const MAX_BUCKETS: i64 = 1 << 20;

/// Requested start and end of a stats response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseWindow {
    pub start: i64,
    pub end: i64, // exclusive
}

impl ResponseWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// `None` when the span does not fit in an `i64`.
    pub fn duration(&self) -> Option<i64> {
        self.end.checked_sub(self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub start: i64,
    pub end: i64,
}

/// The complete, gap-free list of buckets covering a response window. Every
/// time-series column of a response is aligned onto the same grid so that
/// rows line up across statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketGrid {
    width: i64,
    buckets: Vec<Bucket>,
}

impl BucketGrid {
    pub fn new(window: ResponseWindow, width: i64) -> Option<Self> {
        let buckets = match window.duration() {
            Some(duration) if width > 0 && duration > 0 => Self::layout(window.start, duration, width),
            _ => None,
        };
        if buckets.is_none() {
            warn!(
                "cannot build time buckets: width {} over window [{}, {})",
                width, window.start, window.end
            );
        }
        buckets.map(|buckets| Self { width, buckets })
    }

    fn layout(origin: i64, duration: i64, width: i64) -> Option<Vec<Bucket>> {
        let count = duration / width + i64::from(duration % width != 0);
        if count > MAX_BUCKETS {
            return None;
        }
        (0..count)
            .map(|i| {
                let start = i.checked_mul(width).and_then(|offset| origin.checked_add(offset))?;
                let end = start.checked_add(width)?;
                Some(Bucket { start, end })
            })
            .collect()
    }

    /// Takes the bucket width from the first series that reported at least
    /// one bucket, given as `(start_times, end_times)` pairs.
    pub fn infer<'a, I>(window: ResponseWindow, series: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a [i64], &'a [i64])>,
    {
        let width = series
            .into_iter()
            .find_map(|(starts, ends)| match (starts.first(), ends.first()) {
                (Some(start), Some(end)) => Some(end.checked_sub(*start)),
                _ => None,
            })?;
        match width {
            Some(width) => Self::new(window, width),
            None => {
                warn!("bucket width does not fit in a timestamp, skipping time buckets");
                None
            }
        }
    }

    pub fn width(&self) -> i64 {
        self.width
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Places each reported value into the bucket with the same start time.
    /// Buckets nobody reported stay empty. A start time that is not on the
    /// grid is dropped: the appliance occasionally reports buckets that are
    /// skewed from the requested window and those points are tolerated
    /// rather than treated as an error.
    pub fn align(&self, start_times: &[i64], values: &[String]) -> Vec<String> {
        let mut aligned = vec![String::new(); self.buckets.len()];
        // Reported buckets are in time order, so each search can resume where
        // the previous one matched.
        let mut from = 0;
        for (start, value) in start_times.iter().zip(values) {
            match self.buckets[from..].iter().position(|b| b.start == *start) {
                Some(offset) => {
                    from += offset;
                    aligned[from] = value.clone();
                }
                None => trace!("dropping point at {} not on the bucket grid", start),
            }
        }
        aligned
    }
}

#[cfg(test)]
pub mod tests {
    use super::{Bucket, BucketGrid, ResponseWindow, MAX_BUCKETS};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_grid_covers_window() {
        let grid = BucketGrid::new(ResponseWindow::new(0, 180), 60).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.width(), 60);
        assert_eq!(grid.buckets()[0], Bucket { start: 0, end: 60 });
        assert_eq!(grid.buckets()[2], Bucket { start: 120, end: 180 });
    }

    #[test]
    fn test_grid_count_rounds_up() {
        let grid = BucketGrid::new(ResponseWindow::new(1000, 1250), 100).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.buckets()[2], Bucket { start: 1200, end: 1300 });
    }

    #[test]
    fn test_grid_rejects_bad_width() {
        assert!(BucketGrid::new(ResponseWindow::new(0, 180), 0).is_none());
        assert!(BucketGrid::new(ResponseWindow::new(0, 180), -60).is_none());
        assert!(BucketGrid::new(ResponseWindow::new(180, 0), 60).is_none());
    }

    #[test]
    fn test_grid_rejects_extreme_windows() {
        let window = ResponseWindow::new(-i64::MAX, i64::MAX);
        assert_eq!(window.duration(), None);
        assert!(BucketGrid::new(window, 60).is_none());

        assert!(BucketGrid::new(ResponseWindow::new(0, i64::MAX), 1).is_none());
        assert!(BucketGrid::new(ResponseWindow::new(0, MAX_BUCKETS + 1), 1).is_none());
        assert_eq!(
            BucketGrid::new(ResponseWindow::new(0, MAX_BUCKETS), 1).unwrap().len(),
            MAX_BUCKETS as usize
        );

        // The last bucket would end past i64::MAX.
        assert!(BucketGrid::new(ResponseWindow::new(i64::MAX - 90, i64::MAX), 60).is_none());
    }

    #[test]
    fn test_infer_rejects_overflowing_width() {
        let starts = vec![-i64::MAX];
        let ends = vec![i64::MAX];
        assert!(BucketGrid::infer(ResponseWindow::new(0, 180), vec![(&starts[..], &ends[..])]).is_none());
    }

    #[test]
    fn test_infer_uses_first_reporting_series() {
        let empty: Vec<i64> = vec![];
        let starts = vec![30, 60];
        let ends = vec![60, 90];
        let grid = BucketGrid::infer(
            ResponseWindow::new(0, 90),
            vec![(&empty[..], &empty[..]), (&starts[..], &ends[..])],
        )
        .unwrap();
        assert_eq!(grid.width(), 30);
        assert_eq!(grid.len(), 3);

        assert!(BucketGrid::infer(ResponseWindow::new(0, 90), vec![(&empty[..], &empty[..])]).is_none());
    }

    #[test]
    fn test_align_fills_gaps() {
        let grid = BucketGrid::new(ResponseWindow::new(0, 180), 60).unwrap();
        let aligned = grid.align(&[0, 120], &strings(&["5.0", "9.0"]));
        assert_eq!(aligned, strings(&["5.0", "", "9.0"]));
    }

    #[test]
    fn test_align_drops_points_off_grid() {
        let grid = BucketGrid::new(ResponseWindow::new(0, 180), 60).unwrap();
        let aligned = grid.align(&[0, 61, 120], &strings(&["1.0", "2.0", "3.0"]));
        assert_eq!(aligned, strings(&["1.0", "", "3.0"]));
    }

    #[test]
    fn test_align_does_not_search_backwards() {
        let grid = BucketGrid::new(ResponseWindow::new(0, 180), 60).unwrap();
        let aligned = grid.align(&[120, 0], &strings(&["3.0", "1.0"]));
        assert_eq!(aligned, strings(&["", "", "3.0"]));
    }

    #[test]
    fn test_align_ignores_missing_values() {
        let grid = BucketGrid::new(ResponseWindow::new(0, 180), 60).unwrap();
        let aligned = grid.align(&[0, 60, 120], &strings(&["1.0"]));
        assert_eq!(aligned, strings(&["1.0", "", ""]));
    }
}
