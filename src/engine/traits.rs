use super::types::{Decision, ListKind};
use crate::error::ClassifierError;

/// The "Hot Path" check against operator rules.
pub trait RuleMatcher: Send + Sync {
    /// Returns true if any pattern in `kind` matches the URL.
    fn matches(&self, url: &str, kind: ListKind) -> bool;
}

/// Result of asking the remote classifier about a URL.
#[derive(Debug)]
pub enum Classification {
    /// The service gave an answer.
    Decided(Decision),
    /// The service could not be used; the caller fails open.
    Unavailable(ClassifierError),
}

/// Reputation lookup of last resort.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Never fails: transport and protocol problems come back as `Unavailable`.
    async fn classify(&self, url: &str) -> Classification;
}
