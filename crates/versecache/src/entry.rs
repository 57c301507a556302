//! Persisted entry format and validity rules
//!
//! On disk every value is wrapped as
//! ```json
//! { "value": <payload>, "expiresAt": <epoch ms or -1>, "version": "<schema tag>" }
//! ```

use std::time::Duration;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

/// `expiresAt` sentinel for entries without a TTL
pub const NEVER_EXPIRES: i64 = -1;

/// Unit of persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// Payload
    pub value: T,
    /// Absolute deadline in epoch ms, or [`NEVER_EXPIRES`]
    pub expires_at: i64,
    /// Schema tag written at creation
    pub version: String,
}

impl<T> CacheEntry<T> {
    /// Stamp a new entry. A missing or zero TTL never expires.
    pub fn new(value: T, ttl: Option<Duration>, now_millis: i64, version: &str) -> Self {
        let expires_at = match ttl {
            Some(ttl) if !ttl.is_zero() => {
                let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                now_millis.saturating_add(millis)
            }
            _ => NEVER_EXPIRES,
        };

        Self {
            value,
            expires_at,
            version: version.to_string(),
        }
    }

    /// Validity of this entry at `now_millis` under schema `current_version`
    pub fn validity(&self, now_millis: i64, current_version: &str) -> Validity {
        if self.version != current_version {
            Validity::StaleSchema
        } else if self.expires_at != NEVER_EXPIRES && now_millis >= self.expires_at {
            Validity::Expired
        } else {
            Validity::Valid
        }
    }

    /// Whether this entry carries a deadline
    pub fn expires(&self) -> bool {
        self.expires_at != NEVER_EXPIRES
    }
}

/// Outcome of checking a stored entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Current schema and not past its deadline
    Valid,
    /// Past its deadline
    Expired,
    /// Written under another schema version
    StaleSchema,
    /// Not a well-formed entry
    Malformed,
}

impl Validity {
    /// Only [`Validity::Valid`] entries may be returned to callers
    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }
}

/// Decode a raw entry, keeping the payload only if the entry is valid
pub fn decode<T: DeserializeOwned>(
    raw: &str,
    now_millis: i64,
    current_version: &str,
) -> Result<T, Validity> {
    let entry: CacheEntry<T> = serde_json::from_str(raw).map_err(|_| Validity::Malformed)?;
    match entry.validity(now_millis, current_version) {
        Validity::Valid => Ok(entry.value),
        invalid => Err(invalid),
    }
}

/// Check a raw entry without materializing its payload
pub fn check(raw: &str, now_millis: i64, current_version: &str) -> Validity {
    match serde_json::from_str::<CacheEntry<IgnoredAny>>(raw) {
        Ok(entry) => entry.validity(now_millis, current_version),
        Err(_) => Validity::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let entry = CacheEntry::new("hello", Some(Duration::from_secs(1)), 1_000, "v1");
        let json = serde_json::to_string(&entry).unwrap();

        assert_eq!(json, r#"{"value":"hello","expiresAt":2000,"version":"v1"}"#);
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let entry = CacheEntry::new(true, None, 1_000, "v1");
        assert_eq!(entry.expires_at, NEVER_EXPIRES);
        assert!(!entry.expires());
        assert_eq!(entry.validity(i64::MAX, "v1"), Validity::Valid);

        let zero = CacheEntry::new(true, Some(Duration::ZERO), 1_000, "v1");
        assert_eq!(zero.expires_at, NEVER_EXPIRES);
    }

    #[test]
    fn test_deadline_is_exclusive() {
        let entry = CacheEntry::new(1, Some(Duration::from_secs(10)), 0, "v1");

        assert_eq!(entry.validity(9_999, "v1"), Validity::Valid);
        assert_eq!(entry.validity(10_000, "v1"), Validity::Expired);
    }

    #[test]
    fn test_schema_mismatch_wins_over_expiry() {
        let entry = CacheEntry::new(1, None, 0, "v1");
        assert_eq!(entry.validity(0, "v2"), Validity::StaleSchema);
    }

    #[test]
    fn test_decode_and_check() {
        let raw = r#"{"value":[1,2,3],"expiresAt":-1,"version":"v1"}"#;

        assert_eq!(decode::<Vec<u32>>(raw, 0, "v1"), Ok(vec![1, 2, 3]));
        assert_eq!(decode::<Vec<u32>>(raw, 0, "v2"), Err(Validity::StaleSchema));
        assert_eq!(decode::<String>(raw, 0, "v1"), Err(Validity::Malformed));
        assert_eq!(check(raw, 0, "v1"), Validity::Valid);
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        assert_eq!(check(r#"{"value":1,"version":"v1"}"#, 0, "v1"), Validity::Malformed);
        assert_eq!(check(r#"{"value":1,"expiresAt":-1}"#, 0, "v1"), Validity::Malformed);
        assert_eq!(check("not json", 0, "v1"), Validity::Malformed);
    }
}
