use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome for a single URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Block,
}

impl Decision {
    /// Parses a classifier answer. Anything other than `block` (any case) is ALLOW.
    pub fn from_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_uppercase()) {
            Some(s) if s == "BLOCK" => Decision::Block,
            _ => Decision::Allow,
        }
    }

    pub fn is_block(self) -> bool {
        self == Decision::Block
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => f.write_str("ALLOW"),
            Decision::Block => f.write_str("BLOCK"),
        }
    }
}

/// Which stage of the pipeline produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictSource {
    Whitelist,
    Blacklist,
    Cache,
    Remote,
    ErrorFallback,
}

impl VerdictSource {
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictSource::Whitelist => "whitelist",
            VerdictSource::Blacklist => "blacklist",
            VerdictSource::Cache => "cache",
            VerdictSource::Remote => "remote",
            VerdictSource::ErrorFallback => "error-fallback",
        }
    }
}

impl fmt::Display for VerdictSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: Decision,
    pub source: VerdictSource,
}

impl Verdict {
    pub const fn new(decision: Decision, source: VerdictSource) -> Self {
        Self { decision, source }
    }

    /// The fail-open verdict used whenever classification could not complete.
    pub const fn fallback() -> Self {
        Self::new(Decision::Allow, VerdictSource::ErrorFallback)
    }
}

/// Operator rule list membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Allow,
    Deny,
}

impl ListKind {
    /// Name of the persisted collection holding this list.
    pub fn collection(self) -> &'static str {
        match self {
            ListKind::Allow => "allowlist",
            ListKind::Deny => "denylist",
        }
    }
}

/// A cached verdict. Timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub decision: Decision,
    pub created_at: u64,
    pub expires_at: u64,
}

impl CacheEntry {
    pub fn is_valid_at(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// One enforced BLOCK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockEvent {
    /// URL the verdict was computed for.
    pub url: String,
    /// URL literally requested; differs from `url` for sub-resources.
    pub original_url: String,
    pub timestamp: u64,
    pub source: VerdictSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_decision_parsing() {
        assert_eq!(Decision::from_lenient(Some("block")), Decision::Block);
        assert_eq!(Decision::from_lenient(Some("BLOCK")), Decision::Block);
        assert_eq!(Decision::from_lenient(Some("Block ")), Decision::Block);
        assert_eq!(Decision::from_lenient(Some("allow")), Decision::Allow);
        assert_eq!(Decision::from_lenient(Some("WARN")), Decision::Allow);
        assert_eq!(Decision::from_lenient(Some("")), Decision::Allow);
        assert_eq!(Decision::from_lenient(None), Decision::Allow);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&VerdictSource::ErrorFallback).unwrap(),
            "\"error-fallback\""
        );
        assert_eq!(serde_json::to_string(&Decision::Block).unwrap(), "\"BLOCK\"");

        let event = BlockEvent {
            url: "http://a.evil.com/".into(),
            original_url: "http://cdn.evil.com/x.js".into(),
            timestamp: 1,
            source: VerdictSource::Blacklist,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["originalUrl"], "http://cdn.evil.com/x.js");
        assert_eq!(json["source"], "blacklist");
    }

    #[test]
    fn test_cache_entry_validity_boundary() {
        let entry = CacheEntry {
            decision: Decision::Allow,
            created_at: 1_000,
            expires_at: 2_000,
        };
        assert!(entry.is_valid_at(1_999));
        assert!(!entry.is_valid_at(2_000));
    }
}
