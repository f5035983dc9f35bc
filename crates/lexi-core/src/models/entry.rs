//! Entry model

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum accepted key length, in characters.
pub const MAX_KEY_LEN: usize = 256;

/// Which side supplied the authoritative value of an entry during the last merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Value came from the local store
    #[default]
    Local,
    /// Value came from the remote store
    Remote,
    /// Both sides held the key and a conflict was resolved
    Merged,
}

impl Provenance {
    /// Stable string form used for persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            "merged" => Ok(Self::Merged),
            other => Err(Error::InvalidInput(format!("unknown provenance '{other}'"))),
        }
    }
}

/// A topic entry in one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Key, unique within a table (case-sensitive)
    pub key: String,
    /// Free text description
    pub description: String,
    /// Ordered usage examples
    #[serde(default)]
    pub examples: Vec<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Identifier assigned by the remote store on first upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Origin of the current value, set by the last merge
    #[serde(default)]
    pub provenance: Provenance,
}

impl Entry {
    /// Create a new local entry stamped with the current time
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        description: impl Into<String>,
        examples: Vec<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self::with_timestamps(key, description, examples, now, now)
    }

    /// Create an entry with explicit timestamps
    #[must_use]
    pub fn with_timestamps(
        key: impl Into<String>,
        description: impl Into<String>,
        examples: Vec<String>,
        created_at: i64,
        updated_at: i64,
    ) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            examples,
            created_at,
            updated_at,
            remote_id: None,
            provenance: Provenance::Local,
        }
    }

    /// Refresh `updated_at`. The timestamp never moves backwards.
    pub fn touch(&mut self, now: i64) {
        self.updated_at = now.max(self.updated_at);
    }

    /// Same user-visible value (description and examples).
    #[must_use]
    pub fn same_value(&self, other: &Self) -> bool {
        self.description == other.description && self.examples == other.examples
    }

    /// Same value and same `updated_at`: nothing to reconcile.
    #[must_use]
    pub fn is_identical(&self, other: &Self) -> bool {
        self.updated_at == other.updated_at && self.same_value(other)
    }

    /// Total order on content, used to break exact timestamp ties.
    #[must_use]
    pub fn content_cmp(&self, other: &Self) -> Ordering {
        self.description
            .cmp(&other.description)
            .then_with(|| self.examples.cmp(&other.examples))
    }
}

/// Validate an entry key.
///
/// Keys must be non-empty after trimming, at most [`MAX_KEY_LEN`] characters,
/// and free of control characters. Case is preserved.
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput("Entry key cannot be empty".to_string()));
    }
    if key.chars().count() > MAX_KEY_LEN {
        return Err(Error::InvalidInput(format!(
            "Entry key exceeds {MAX_KEY_LEN} characters"
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(Error::InvalidInput(
            "Entry key cannot contain control characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_new() {
        let entry = Entry::new("borrow", "Take temporarily", vec!["&x".to_string()]);
        assert_eq!(entry.key, "borrow");
        assert_eq!(entry.created_at, entry.updated_at);
        assert_eq!(entry.provenance, Provenance::Local);
        assert!(entry.remote_id.is_none());
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut entry = Entry::with_timestamps("k", "d", Vec::new(), 10, 50);
        entry.touch(40);
        assert_eq!(entry.updated_at, 50);
        entry.touch(60);
        assert_eq!(entry.updated_at, 60);
        assert_eq!(entry.created_at, 10);
    }

    #[test]
    fn test_identity_requires_same_timestamp() {
        let a = Entry::with_timestamps("k", "d", vec!["1".into()], 1, 5);
        let mut b = a.clone();
        assert!(a.is_identical(&b));

        b.updated_at = 6;
        assert!(a.same_value(&b));
        assert!(!a.is_identical(&b));
    }

    #[test]
    fn test_content_cmp_orders_description_then_examples() {
        let a = Entry::with_timestamps("k", "A", vec!["2".into()], 1, 1);
        let b = Entry::with_timestamps("k", "B", vec!["1".into()], 1, 1);
        let c = Entry::with_timestamps("k", "A", vec!["3".into()], 1, 1);
        assert_eq!(a.content_cmp(&b), Ordering::Less);
        assert_eq!(a.content_cmp(&c), Ordering::Less);
        assert_eq!(b.content_cmp(&a), Ordering::Greater);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("Rust").is_ok());
        assert!(validate_key("   ").is_err());
        assert!(validate_key("tab\there").is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
    }

    #[test]
    fn test_provenance_roundtrip_strings() {
        for provenance in [Provenance::Local, Provenance::Remote, Provenance::Merged] {
            assert_eq!(provenance.as_str().parse::<Provenance>().unwrap(), provenance);
        }
        assert!("elsewhere".parse::<Provenance>().is_err());
    }
}
