use crate::value::Sample;
use serde::{Deserialize, Serialize};

/// How units are printed in column headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStyle {
    // As reported by the appliance.
    #[default]
    Raw,
    // Rate units renamed the way the appliance UI shows them.
    Friendly,
}

impl UnitStyle {
    pub fn label(&self, unit: &str) -> String {
        match (self, unit) {
            (UnitStyle::Friendly, "bps") => "kbits/s".to_string(),
            (UnitStyle::Friendly, "pps") => "pkts/s".to_string(),
            _ => unit.to_string(),
        }
    }
}

/// `"kind (unit)"`, or just `"kind"` without a unit.
pub fn column_header(kind: &str, unit: Option<&str>) -> String {
    match unit {
        Some(unit) if !unit.is_empty() => format!("{} ({})", kind, unit),
        _ => kind.to_string(),
    }
}

/// `"kind aggregate (unit)"`, e.g. `"e2e-latency max (ms)"`.
pub fn aggregate_column(kind: &str, aggregate: &str, unit: Option<&str>) -> String {
    column_header(&format!("{} {}", kind, aggregate), unit)
}

/// Suffix for value columns rebuilt from per-bucket `count * mean`. The
/// appliance rounds the mean, so each value may be off by up to half the
/// largest count.
pub fn rounding_suffix(counts: &[Sample]) -> String {
    match counts.iter().flatten().max() {
        Some(&max) if max != 0 => {
            let error = (max as f64 / 2.0).ceil() as i64;
            format!(" +/- {}", error)
        }
        _ => String::new(),
    }
}

/// Column names in first-seen order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    names: Vec<String>,
}

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str) {
        if !self.contains(name) {
            self.names.push(name.to_string());
        }
    }

    pub fn extend<'a, I: IntoIterator<Item = &'a String>>(&mut self, names: I) {
        for name in names {
            self.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}
