use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw integer reported by the appliance. `None` is the appliance's `-`,
/// meaning no data for that bucket.
pub type Sample = Option<i64>;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Integer divisor that turns raw values into real units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Factor {
    // Never zero.
    Scale(i64),
    Malformed(String),
}

impl Default for Factor {
    fn default() -> Self {
        Factor::Scale(1)
    }
}

impl Factor {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Factor::Scale(1),
            Some(s) => match s.parse::<i64>() {
                Ok(0) => Factor::Scale(1),
                Ok(n) => Factor::Scale(n),
                Err(_) => Factor::Malformed(s.to_string()),
            },
        }
    }

    /// Renders a raw textual value divided by this factor. `-`, empty and
    /// non-numeric values render as an empty cell. With a malformed factor
    /// the raw value is passed through unscaled.
    pub fn scale_str(&self, raw: Option<&str>) -> String {
        let raw = match raw.map(str::trim) {
            None | Some("") | Some("-") => return String::new(),
            Some(raw) => raw,
        };
        let value: f64 = match raw.parse() {
            Ok(v) => v,
            Err(_) => return String::new(),
        };
        match self {
            Factor::Scale(n) => format_float(value / *n as f64),
            Factor::Malformed(_) => raw.to_string(),
        }
    }

    pub fn scale(&self, sample: Sample) -> String {
        match (sample, self) {
            (None, _) => String::new(),
            (Some(v), Factor::Scale(n)) => format_float(v as f64 / *n as f64),
            (Some(v), Factor::Malformed(_)) => v.to_string(),
        }
    }
}

/// Integral values keep a trailing `.0`, everything else uses the shortest
/// round-trip representation. Very large or small magnitudes use exponent
/// form with a signed, two digit exponent (`1e+20`, `1.5e-07`).
pub fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let text = format!("{:?}", value);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

/// Renders a raw value as a whole number without scaling, as done for
/// `count` fields.
pub fn format_integer(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None | Some("") | Some("-") => String::new(),
        Some(raw) => match raw.parse::<i64>() {
            Ok(v) => v.to_string(),
            Err(_) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => (v.trunc() as i64).to_string(),
                _ => String::new(),
            },
        },
    }
}

pub fn format_sample(sample: Sample) -> String {
    sample.map(|v| v.to_string()).unwrap_or_default()
}

pub fn format_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Parses a space separated list such as `"10 - 12"`.
pub fn parse_samples(raw: Option<&str>) -> Vec<Sample> {
    raw.map(|s| s.split_whitespace().map(parse_sample).collect())
        .unwrap_or_default()
}

pub fn parse_sample(raw: &str) -> Sample {
    if raw == "-" {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::trace!("ignoring non-numeric sample {:?}", raw);
            None
        }
    }
}

/// Parses a list of timestamps, skipping anything that is not a number.
pub fn parse_times(raw: Option<&str>) -> Vec<i64> {
    parse_samples(raw).into_iter().flatten().collect()
}

pub fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse().ok())
}

pub fn format_millis(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

pub fn format_secs(timestamp_s: i64) -> String {
    DateTime::from_timestamp(timestamp_s, 0)
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Millis,
    Nanos,
}

#[derive(Error, Debug, PartialEq)]
pub enum TimeError {
    #[error("invalid time: {0}")]
    Invalid(String),
}

/// Parses `YYYY-MM-DD HH:MM:SS` (UTC) or an epoch timestamp. Values that fit
/// in 31 bits are taken as seconds and widened to `precision`; larger values
/// are assumed to already be in `precision`.
pub fn parse_time(input: &str, precision: Precision) -> Result<i64, TimeError> {
    let input = input.trim();
    let raw = match NaiveDateTime::parse_from_str(input, TIME_FORMAT) {
        Ok(t) => t.and_utc().timestamp(),
        Err(_) => input
            .parse::<i64>()
            .map_err(|_| TimeError::Invalid(input.to_string()))?,
    };
    if raw >= 0x7fff_ffff {
        return Ok(raw);
    }
    let multiplier = match precision {
        Precision::Millis => 1_000,
        Precision::Nanos => 1_000_000_000,
    };
    raw.checked_mul(multiplier)
        .ok_or_else(|| TimeError::Invalid(input.to_string()))
}
