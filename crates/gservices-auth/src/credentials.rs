//! Credential inputs and their normalized record.
//!
//! Callers model user credentials either as plain data ([`CredentialMap`]) or
//! as their own domain type implementing [`CredentialSource`]. Either way the
//! manager reads three logical fields and folds them into a
//! [`CredentialRecord`].
//!
//! A source may additionally opt into write-back by returning itself from any
//! of the setter capability methods. Each capability is independent: a type
//! can accept a new access token while keeping its refresh token read-only.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use gservices_core::{Expiry, ExpiryValue};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const ACCESS_TOKEN_FIELD: &str = "access_token";
pub const REFRESH_TOKEN_FIELD: &str = "refresh_token";
pub const EXPIRES_AT_FIELD: &str = "access_token_expires_at";

/// Accepts a refreshed access token.
pub trait SetAccessToken {
    fn set_access_token(&mut self, token: &str);
}

/// Accepts a rotated refresh token.
pub trait SetRefreshToken {
    fn set_refresh_token(&mut self, token: &str);
}

/// Accepts the expiry of a refreshed access token.
pub trait SetAccessTokenExpiresAt {
    fn set_access_token_expires_at(&mut self, expires_at: DateTime<Utc>);
}

/// Anything that can supply the three credential fields.
///
/// Implementors that can store refreshed values override the setter
/// capability methods to return `Some(self)`.
pub trait CredentialSource: Send {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    fn access_token_expires_at(&self) -> Option<ExpiryValue>;

    fn access_token_setter(&mut self) -> Option<&mut dyn SetAccessToken> {
        None
    }

    fn refresh_token_setter(&mut self) -> Option<&mut dyn SetRefreshToken> {
        None
    }

    fn expiry_setter(&mut self) -> Option<&mut dyn SetAccessTokenExpiresAt> {
        None
    }
}

/// A credential source shared between the caller and a manager.
pub type SharedSource = Arc<Mutex<dyn CredentialSource>>;

/// Which write-back setters a source exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteBackCapabilities {
    pub access_token: bool,
    pub refresh_token: bool,
    pub expires_at: bool,
}

impl WriteBackCapabilities {
    /// Checks the source's setter capabilities.
    pub fn probe(source: &mut dyn CredentialSource) -> Self {
        Self {
            access_token: source.access_token_setter().is_some(),
            refresh_token: source.refresh_token_setter().is_some(),
            expires_at: source.expiry_setter().is_some(),
        }
    }

    /// Returns true if at least one field can be written back.
    pub fn any(&self) -> bool {
        self.access_token || self.refresh_token || self.expires_at
    }
}

/// Key/value credentials, as read from JSON or a plain map.
///
/// Both the `google_`-prefixed key names and the plain OAuth names are
/// recognized. Maps are read-only: refreshed values are not written back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialMap {
    values: Map<String, Value>,
}

impl CredentialMap {
    const ACCESS_TOKEN_KEYS: &'static [&'static str] = &["google_token", "access_token"];
    const REFRESH_TOKEN_KEYS: &'static [&'static str] =
        &["google_refresh_token", "refresh_token"];
    const EXPIRES_AT_KEYS: &'static [&'static str] = &[
        "google_token_expires_at",
        "access_token_expires_at",
        "expires_at",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON object. Non-object values yield an empty map.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values },
            _ => Self::default(),
        }
    }

    /// Adds or replaces an entry.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    fn lookup(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.values.get(*key))
            .find(|value| !value.is_null())
    }

    fn string(&self, keys: &[&str]) -> Option<String> {
        match self.lookup(keys)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl From<HashMap<String, Value>> for CredentialMap {
    fn from(map: HashMap<String, Value>) -> Self {
        Self {
            values: map.into_iter().collect(),
        }
    }
}

impl From<HashMap<String, String>> for CredentialMap {
    fn from(map: HashMap<String, String>) -> Self {
        Self {
            values: map.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
        }
    }
}

impl CredentialSource for CredentialMap {
    fn access_token(&self) -> Option<String> {
        self.string(Self::ACCESS_TOKEN_KEYS)
    }

    fn refresh_token(&self) -> Option<String> {
        self.string(Self::REFRESH_TOKEN_KEYS)
    }

    fn access_token_expires_at(&self) -> Option<ExpiryValue> {
        match self.lookup(Self::EXPIRES_AT_KEYS)? {
            Value::Number(n) => match n.as_i64() {
                Some(secs) => Some(ExpiryValue::EpochSeconds(secs)),
                None => n.as_f64().map(ExpiryValue::EpochFloat),
            },
            Value::String(s) => Some(ExpiryValue::Text(s.clone())),
            other => Some(ExpiryValue::Text(other.to_string())),
        }
    }
}

/// The normalized token triple.
///
/// Fields are optional so that incomplete input can be reported by
/// [`CredentialRecord::validate`] rather than rejected during normalization.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialRecord {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token_expires_at: Option<Expiry>,
}

impl CredentialRecord {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            access_token_expires_at: Some(Expiry::At(expires_at)),
        }
    }

    /// Reads and normalizes the fields of `source`.
    ///
    /// Empty strings count as absent. Expiry values are coerced to a single
    /// instant; unparseable values are kept for validation to report.
    pub fn from_source(source: &dyn CredentialSource) -> Self {
        Self {
            access_token: non_empty(source.access_token()),
            refresh_token: non_empty(source.refresh_token()),
            access_token_expires_at: source
                .access_token_expires_at()
                .map(|value| value.normalize()),
        }
    }

    /// Names of the required fields that are absent, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.access_token.is_none() {
            missing.push(ACCESS_TOKEN_FIELD);
        }
        if self.refresh_token.is_none() {
            missing.push(REFRESH_TOKEN_FIELD);
        }
        if self.access_token_expires_at.is_none() {
            missing.push(EXPIRES_AT_FIELD);
        }
        missing
    }

    /// Checks that all three fields are present and the expiry parsed.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(Error::configuration(format!(
                "credentials must include: {}",
                missing.join(", ")
            )));
        }

        if let Some(Expiry::Unparsed(raw)) = &self.access_token_expires_at {
            return Err(Error::configuration(format!(
                "{} is not a recognizable timestamp: {:?}",
                EXPIRES_AT_FIELD, raw
            )));
        }

        Ok(())
    }

    /// Returns the parsed expiry instant.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_token_expires_at
            .as_ref()
            .and_then(Expiry::instant)
    }

    /// Returns true once the expiry instant has been reached.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }

    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at().map(|at| at - now)
    }
}

// Tokens never appear in debug output.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("access_token_expires_at", &self.access_token_expires_at)
            .finish()
    }
}

/// A bare record is itself a writable source.
impl CredentialSource for CredentialRecord {
    fn access_token(&self) -> Option<String> {
        self.access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.refresh_token.clone()
    }

    fn access_token_expires_at(&self) -> Option<ExpiryValue> {
        self.access_token_expires_at.as_ref().map(|expiry| match expiry {
            Expiry::At(at) => ExpiryValue::Timestamp(*at),
            Expiry::Unparsed(raw) => ExpiryValue::Text(raw.clone()),
        })
    }

    fn access_token_setter(&mut self) -> Option<&mut dyn SetAccessToken> {
        Some(self)
    }

    fn refresh_token_setter(&mut self) -> Option<&mut dyn SetRefreshToken> {
        Some(self)
    }

    fn expiry_setter(&mut self) -> Option<&mut dyn SetAccessTokenExpiresAt> {
        Some(self)
    }
}

impl SetAccessToken for CredentialRecord {
    fn set_access_token(&mut self, token: &str) {
        self.access_token = Some(token.to_string());
    }
}

impl SetRefreshToken for CredentialRecord {
    fn set_refresh_token(&mut self, token: &str) {
        self.refresh_token = Some(token.to_string());
    }
}

impl SetAccessTokenExpiresAt for CredentialRecord {
    fn set_access_token_expires_at(&mut self, expires_at: DateTime<Utc>) {
        self.access_token_expires_at = Some(Expiry::At(expires_at));
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::TimeZone;
    use serde_json::json;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap()
    }

    /// A domain type with a read-only refresh token.
    struct Account {
        token: String,
        refresh: String,
        expires: i64,
    }

    impl CredentialSource for Account {
        fn access_token(&self) -> Option<String> {
            Some(self.token.clone())
        }

        fn refresh_token(&self) -> Option<String> {
            Some(self.refresh.clone())
        }

        fn access_token_expires_at(&self) -> Option<ExpiryValue> {
            Some(ExpiryValue::EpochSeconds(self.expires))
        }

        fn access_token_setter(&mut self) -> Option<&mut dyn SetAccessToken> {
            Some(self)
        }
    }

    impl SetAccessToken for Account {
        fn set_access_token(&mut self, token: &str) {
            self.token = token.to_string();
        }
    }

    #[test]
    fn map_with_google_keys() {
        let map = CredentialMap::from_json(json!({
            "google_token": "A1",
            "google_refresh_token": "R1",
            "google_token_expires_at": instant().timestamp(),
        }));

        let record = CredentialRecord::from_source(&map);
        assert_eq!(record.access_token.as_deref(), Some("A1"));
        assert_eq!(record.refresh_token.as_deref(), Some("R1"));
        assert_eq!(record.expires_at(), Some(instant()));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn map_with_plain_oauth_keys_and_text_expiry() {
        let map = CredentialMap::new()
            .with("access_token", "A1")
            .with("refresh_token", "R1")
            .with("expires_at", "2024-03-15T10:30:00Z");

        let record = CredentialRecord::from_source(&map);
        assert_eq!(record.expires_at(), Some(instant()));
    }

    #[test]
    fn map_from_string_hash_map() {
        let mut values = HashMap::new();
        values.insert("google_token".to_string(), "A1".to_string());
        values.insert("google_refresh_token".to_string(), "R1".to_string());
        values.insert(
            "google_token_expires_at".to_string(),
            instant().timestamp().to_string(),
        );

        let record = CredentialRecord::from_source(&CredentialMap::from(values));
        assert_eq!(record.expires_at(), Some(instant()));
    }

    #[test]
    fn map_float_expiry() {
        let map = CredentialMap::new().with("expires_at", instant().timestamp() as f64 + 0.5);
        let record = CredentialRecord::from_source(&map);
        let at = record.expires_at().unwrap();
        assert_eq!(at.timestamp(), instant().timestamp());
    }

    #[test]
    fn maps_are_read_only() {
        let mut map = CredentialMap::new().with("access_token", "A1");
        assert!(!WriteBackCapabilities::probe(&mut map).any());
    }

    #[test]
    fn empty_and_null_values_are_missing() {
        let map = CredentialMap::from_json(json!({
            "google_token": "",
            "google_refresh_token": null,
            "google_token_expires_at": instant().timestamp(),
        }));

        let record = CredentialRecord::from_source(&map);
        assert_eq!(record.missing_fields(), vec![ACCESS_TOKEN_FIELD, REFRESH_TOKEN_FIELD]);
    }

    #[test]
    fn validation_lists_exactly_the_missing_fields() {
        let cases: [(CredentialMap, &str); 4] = [
            (
                CredentialMap::new().with("refresh_token", "R").with("expires_at", 1),
                "credentials must include: access_token",
            ),
            (
                CredentialMap::new().with("access_token", "A").with("expires_at", 1),
                "credentials must include: refresh_token",
            ),
            (
                CredentialMap::new().with("access_token", "A").with("refresh_token", "R"),
                "credentials must include: access_token_expires_at",
            ),
            (
                CredentialMap::new(),
                "credentials must include: access_token, refresh_token, access_token_expires_at",
            ),
        ];

        for (map, expected) in cases {
            let err = CredentialRecord::from_source(&map).validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            assert_eq!(err.message(), expected);
        }
    }

    #[test]
    fn unparseable_expiry_survives_normalization_but_fails_validation() {
        let map = CredentialMap::new()
            .with("access_token", "A")
            .with("refresh_token", "R")
            .with("expires_at", "soonish");

        let record = CredentialRecord::from_source(&map);
        assert_eq!(
            record.access_token_expires_at,
            Some(Expiry::Unparsed("soonish".to_string()))
        );

        let err = record.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.message().contains(EXPIRES_AT_FIELD));
        assert!(err.message().contains("soonish"));
    }

    #[test]
    fn domain_type_capabilities_are_independent() {
        let mut account = Account {
            token: "A1".to_string(),
            refresh: "R1".to_string(),
            expires: instant().timestamp(),
        };

        let caps = WriteBackCapabilities::probe(&mut account);
        assert_eq!(
            caps,
            WriteBackCapabilities {
                access_token: true,
                refresh_token: false,
                expires_at: false,
            }
        );

        let record = CredentialRecord::from_source(&account);
        assert_eq!(record.expires_at(), Some(instant()));
    }

    #[test]
    fn record_is_a_fully_writable_source() {
        let mut record = CredentialRecord::new("A1", "R1", instant());
        let caps = WriteBackCapabilities::probe(&mut record);
        assert!(caps.access_token && caps.refresh_token && caps.expires_at);

        let later = instant() + Duration::hours(1);
        if let Some(setter) = record.expiry_setter() {
            setter.set_access_token_expires_at(later);
        }
        assert_eq!(record.expires_at(), Some(later));
        assert_eq!(CredentialRecord::from_source(&record), record);
    }

    #[test]
    fn expiry_helpers() {
        let record = CredentialRecord::new("A1", "R1", instant());
        assert!(!record.is_expired(instant() - Duration::seconds(1)));
        assert!(record.is_expired(instant()));
        assert_eq!(
            record.time_until_expiry(instant() - Duration::minutes(5)),
            Some(Duration::minutes(5))
        );
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let record = CredentialRecord::new("secret-access", "secret-refresh", instant());
        let debug = format!("{:?}", record);
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
        assert!(debug.contains("<redacted>"));
    }
}
