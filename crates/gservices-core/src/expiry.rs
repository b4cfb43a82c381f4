//! Access-token expiry timestamps.
//!
//! Callers store expiry instants in whatever shape their persistence layer
//! prefers: a UNIX timestamp (integer or fractional seconds), a textual date
//! or a native [`DateTime`]. [`ExpiryValue`] captures those inputs and
//! [`ExpiryValue::normalize`] folds them into a single [`Expiry`].
//!
//! Normalization never fails. Text that cannot be read as a date is kept as
//! [`Expiry::Unparsed`] so that credential validation can report it with the
//! field name attached.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Naive layouts accepted in addition to RFC 3339 and RFC 2822.
/// Values without an offset are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// A caller-supplied expiry value, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpiryValue {
    /// Whole seconds since the UNIX epoch.
    EpochSeconds(i64),
    /// Fractional seconds since the UNIX epoch.
    EpochFloat(f64),
    /// A textual date-time, e.g. `2024-03-15T10:00:00Z`.
    Text(String),
    /// An already-typed instant.
    Timestamp(DateTime<Utc>),
}

impl ExpiryValue {
    /// Folds this value into an [`Expiry`].
    pub fn normalize(&self) -> Expiry {
        match self {
            Self::Timestamp(at) => Expiry::At(*at),
            Self::EpochSeconds(secs) => match Utc.timestamp_opt(*secs, 0).single() {
                Some(at) => Expiry::At(at),
                None => Expiry::Unparsed(secs.to_string()),
            },
            Self::EpochFloat(secs) => from_epoch_float(*secs)
                .map(Expiry::At)
                .unwrap_or_else(|| Expiry::Unparsed(secs.to_string())),
            Self::Text(text) => parse_text(text)
                .map(Expiry::At)
                .unwrap_or_else(|| Expiry::Unparsed(text.clone())),
        }
    }
}

impl From<DateTime<Utc>> for ExpiryValue {
    fn from(at: DateTime<Utc>) -> Self {
        Self::Timestamp(at)
    }
}

impl From<i64> for ExpiryValue {
    fn from(secs: i64) -> Self {
        Self::EpochSeconds(secs)
    }
}

impl From<f64> for ExpiryValue {
    fn from(secs: f64) -> Self {
        Self::EpochFloat(secs)
    }
}

impl From<String> for ExpiryValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ExpiryValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A normalized expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// An absolute instant in UTC.
    At(DateTime<Utc>),
    /// Input that could not be read as an instant, kept verbatim.
    Unparsed(String),
}

impl Expiry {
    /// Returns the instant, if this expiry was parsed.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(at) => Some(*at),
            Self::Unparsed(_) => None,
        }
    }

    /// Returns true if this expiry holds a usable instant.
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::At(_))
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(at: DateTime<Utc>) -> Self {
        Self::At(at)
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(at) => write!(f, "{}", at.to_rfc3339()),
            Self::Unparsed(raw) => write!(f, "{}", raw),
        }
    }
}

fn from_epoch_float(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1_000_000_000.0).round() as u32;
    // Rounding can push the fraction up to a full second.
    let (whole, nanos) = if nanos >= 1_000_000_000 {
        (whole + 1.0, 0)
    } else {
        (whole, nanos)
    };
    Utc.timestamp_opt(whole as i64, nanos).single()
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = DateTime::parse_from_rfc2822(text) {
        return Some(at.with_timezone(&Utc));
    }
    if let Some(at) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(at.and_utc());
    }

    // Numeric strings are epoch seconds, as some stores keep them as text.
    if let Ok(secs) = text.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    text.parse::<f64>().ok().and_then(from_epoch_float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap()
    }

    fn assert_close(expiry: Expiry, expected: DateTime<Utc>) {
        let at = expiry.instant().expect("expiry should parse");
        let delta = (at - expected).num_milliseconds().abs();
        assert!(delta <= 1000, "{} is {}ms away from {}", at, delta, expected);
    }

    #[test]
    fn every_input_form_lands_on_the_same_instant() {
        let at = instant();
        let forms = [
            ExpiryValue::from(at),
            ExpiryValue::from(at.timestamp()),
            ExpiryValue::from(at.timestamp() as f64 + 0.25),
            ExpiryValue::from(at.to_rfc3339()),
        ];

        for form in forms {
            assert_close(form.normalize(), at);
        }
    }

    #[test]
    fn epoch_float_keeps_sub_second_precision() {
        let expiry = ExpiryValue::EpochFloat(1_710_498_600.5).normalize();
        let at = expiry.instant().unwrap();
        assert_eq!(at.timestamp(), 1_710_498_600);
        assert_eq!(at.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn text_with_offset_is_converted_to_utc() {
        let expiry = ExpiryValue::from("2024-03-15T12:30:00+02:00").normalize();
        assert_eq!(expiry, Expiry::At(instant()));
    }

    #[test]
    fn naive_text_is_read_as_utc() {
        let expiry = ExpiryValue::from("2024-03-15 10:30:00").normalize();
        assert_eq!(expiry, Expiry::At(instant()));
    }

    #[test]
    fn rfc2822_text() {
        let expiry = ExpiryValue::from("Fri, 15 Mar 2024 10:30:00 +0000").normalize();
        assert_eq!(expiry, Expiry::At(instant()));
    }

    #[test]
    fn numeric_text_is_epoch_seconds() {
        let at = instant();
        let expiry = ExpiryValue::Text(at.timestamp().to_string()).normalize();
        assert_eq!(expiry, Expiry::At(at));
    }

    #[test]
    fn garbage_text_passes_through() {
        let expiry = ExpiryValue::from("next tuesday-ish").normalize();
        assert_eq!(expiry, Expiry::Unparsed("next tuesday-ish".to_string()));
        assert!(!expiry.is_parsed());
        assert!(expiry.instant().is_none());
    }

    #[test]
    fn non_finite_float_passes_through() {
        let expiry = ExpiryValue::EpochFloat(f64::NAN).normalize();
        assert!(!expiry.is_parsed());
    }

    #[test]
    fn deserializes_untagged_json() {
        let at = instant();
        let from_int: ExpiryValue =
            serde_json::from_value(serde_json::json!(at.timestamp())).unwrap();
        let from_text: ExpiryValue =
            serde_json::from_value(serde_json::json!("2024-03-15T10:30:00Z")).unwrap();
        let from_float: ExpiryValue =
            serde_json::from_value(serde_json::json!(1_710_498_600.75)).unwrap();

        assert_eq!(from_int.normalize(), Expiry::At(at));
        assert_eq!(from_text.normalize(), Expiry::At(at));
        assert_close(from_float.normalize(), at + Duration::milliseconds(750));
    }

    #[test]
    fn display_uses_rfc3339() {
        assert_eq!(
            Expiry::At(instant()).to_string(),
            "2024-03-15T10:30:00+00:00"
        );
    }
}
