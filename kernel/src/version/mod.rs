// Version Identifiers
//
// Validates `v<major>.<minor>.<patch>` identifiers and defines the
// ordering used for regression checks and sorted history display.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

const VERSION_PATTERN: &str = r"^v[0-9]+\.[0-9]+\.[0-9]+$";

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VERSION_PATTERN).expect("version pattern is a valid regex"))
}

/// Returns true iff `version` is exactly `v<digits>.<digits>.<digits>`.
pub fn validate(version: &str) -> bool {
    version_regex().is_match(version)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version format `{0}`: use 'vX.Y.Z' (e.g. v1.0.0)")]
    InvalidFormat(String),
}

/// A validated version identifier.
///
/// NOTE:
/// Ordering is plain lexicographic comparison of the raw string, so
/// `v10.0.0` sorts before `v2.0.0`. Regression checks rely on this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionId(String);

impl VersionId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, VersionError> {
        let raw = raw.into();
        if validate(&raw) {
            Ok(Self(raw))
        } else {
            Err(VersionError::InvalidFormat(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.0, &other.0)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VersionId {
    type Error = VersionError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<VersionId> for String {
    fn from(version: VersionId) -> Self {
        version.0
    }
}

/// Compare two raw version strings the way history ordering does.
pub fn compare(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

/// True when publishing `candidate` would go backwards from `latest`.
pub fn is_regression(candidate: &str, latest: &str) -> bool {
    compare(candidate, latest) == Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_versions() {
        assert!(validate("v1.0.0"));
        assert!(validate("v0.0.0"));
        assert!(validate("v12.345.6789"));
    }

    #[test]
    fn rejects_malformed_versions() {
        for bad in [
            "", "1.0.0", "v1.0", "v1.0.0.0", "V1.0.0", "v1.0.0-rc1", " v1.0.0", "v1.0.0\n",
            "v1..0", "va.b.c", "v-1.0.0", "v١.0.0",
        ] {
            assert!(!validate(bad), "accepted {bad:?}");
        }
    }

    #[test]
    fn parse_reports_offending_input() {
        let err = VersionId::parse("1.2").unwrap_err();
        assert_eq!(err, VersionError::InvalidFormat("1.2".into()));
        assert!(err.to_string().contains("vX.Y.Z"));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let ten = VersionId::parse("v10.0.0").unwrap();
        let two = VersionId::parse("v2.0.0").unwrap();
        assert!(ten < two);
        assert!(is_regression("v10.0.0", "v2.0.0"));
        assert!(is_regression("v1.0.0", "v2.0.0"));
        assert!(!is_regression("v2.0.0", "v2.0.0"));
        assert!(!is_regression("v2.0.1", "v2.0.0"));
    }

    #[test]
    fn deserialize_rejects_invalid_version() {
        let ok: VersionId = serde_json::from_str("\"v1.2.3\"").unwrap();
        assert_eq!(ok.as_str(), "v1.2.3");
        assert!(serde_json::from_str::<VersionId>("\"latest\"").is_err());
    }
}
