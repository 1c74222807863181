//! Decision Pipeline.
//!
//! Resolves a URL to a verdict in strict precedence order:
//! 1. Allow-list
//! 2. Deny-list
//! 3. Decision cache
//! 4. Remote classifier (successful answers are cached, fallbacks are not)

use crate::engine::{
    Classification, Classifier, Decision, DecisionCache, ListKind, RuleMatcher, RuleStore,
    Verdict, VerdictSource,
};
use crate::error::PatternError;
use futures::future::{BoxFuture, FutureExt, Shared};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

type InflightCall = Shared<BoxFuture<'static, Arc<Classification>>>;
type InflightMap = Mutex<FxHashMap<String, InflightCall>>;

pub struct DecisionPipeline {
    rules: Arc<RuleStore>,
    cache: Arc<DecisionCache>,
    classifier: Arc<dyn Classifier>,
    /// Present when concurrent remote calls for one URL are collapsed.
    inflight: Option<InflightMap>,
}

impl DecisionPipeline {
    pub fn new(
        rules: Arc<RuleStore>,
        cache: Arc<DecisionCache>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            rules,
            cache,
            classifier,
            inflight: None,
        }
    }

    /// Shares one remote call between concurrent evaluations of the same URL.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.inflight = enabled.then(|| Mutex::new(FxHashMap::default()));
        self
    }

    pub async fn decide(&self, url: &str) -> Verdict {
        // One snapshot for both lists: an operator edit lands entirely before or after.
        let rules = self.rules.snapshot();
        if rules.matches(url, ListKind::Allow) {
            return Verdict::new(Decision::Allow, VerdictSource::Whitelist);
        }
        if rules.matches(url, ListKind::Deny) {
            return Verdict::new(Decision::Block, VerdictSource::Blacklist);
        }
        drop(rules);

        if let Some(entry) = self.cache.get(url) {
            return Verdict::new(entry.decision, VerdictSource::Cache);
        }

        match &*self.classify(url).await {
            Classification::Decided(decision) => {
                self.cache.put(url, *decision);
                Verdict::new(*decision, VerdictSource::Remote)
            }
            Classification::Unavailable(e) => {
                debug!("Failing open for {}: {}", url, e);
                Verdict::fallback()
            }
        }
    }

    async fn classify(&self, url: &str) -> Arc<Classification> {
        let Some(inflight) = &self.inflight else {
            return Arc::new(self.classifier.classify(url).await);
        };

        let (call, _guard) = {
            let mut calls = inflight.lock().unwrap_or_else(|e| e.into_inner());
            match calls.get(url) {
                Some(call) => (call.clone(), None),
                None => {
                    let classifier = self.classifier.clone();
                    let owned = url.to_string();
                    let call = async move { Arc::new(classifier.classify(&owned).await) }
                        .boxed()
                        .shared();
                    calls.insert(url.to_string(), call.clone());
                    (call, Some(InflightGuard { calls: inflight, url }))
                }
            }
        };

        call.await
    }

    pub fn add_pattern(&self, kind: ListKind, pattern: &str) -> Result<bool, PatternError> {
        self.rules.add(kind, pattern)
    }

    pub fn remove_pattern(&self, kind: ListKind, pattern: &str) -> bool {
        self.rules.remove(kind, pattern)
    }

    pub fn patterns(&self, kind: ListKind) -> Vec<String> {
        self.rules.patterns(kind)
    }

    /// Operator-triggered invalidation of every cached verdict.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drops expired cache entries. Returns how many were removed.
    pub fn sweep_cache(&self) -> usize {
        self.cache.sweep_expired()
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }
}

/// Clears the in-flight slot when the leading caller finishes or is dropped.
struct InflightGuard<'a> {
    calls: &'a InflightMap,
    url: &'a str,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls.remove(self.url);
    }
}
