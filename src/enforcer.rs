//! Request Enforcer: turns a pipeline verdict into a network action.

use crate::engine::{BlockEvent, Clock, VerdictSource};
use crate::ledger::BlockLedger;
use crate::logger::{DecisionLogEntry, DecisionLogger};
use crate::pipeline::DecisionPipeline;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;
use url::Url;

/// An outbound request caught before it hits the network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InterceptedRequest {
    /// Literal requested URL.
    pub url: String,
    /// True for top-level navigations, false for sub-resource fetches.
    pub top_level: bool,
    /// Owning document's URL, for sub-resources.
    #[serde(default)]
    pub document_url: Option<String>,
}

impl InterceptedRequest {
    pub fn navigation(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            top_level: true,
            document_url: None,
        }
    }

    pub fn sub_resource(url: impl Into<String>, document_url: Option<String>) -> Self {
        Self {
            url: url.into(),
            top_level: false,
            document_url,
        }
    }

    /// The URL the verdict is computed for.
    ///
    /// Sub-resources are judged by the document that loads them.
    pub fn evaluation_target(&self) -> &str {
        if self.top_level {
            return &self.url;
        }
        match self.document_url.as_deref() {
            Some(doc) if !doc.is_empty() => doc,
            _ => &self.url,
        }
    }

    fn is_http(&self) -> bool {
        let scheme = self.url.split_once("://").map(|(s, _)| s);
        matches!(scheme, Some(s) if s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum EnforcementAction {
    /// Let the request through unmodified.
    Proceed,
    /// Drop a sub-resource request.
    Cancel,
    /// Send a top-level navigation to the block interstitial.
    Redirect { redirect_url: String },
}

impl EnforcementAction {
    pub fn label(&self) -> &'static str {
        match self {
            EnforcementAction::Proceed => "proceed",
            EnforcementAction::Cancel => "cancel",
            EnforcementAction::Redirect { .. } => "redirect",
        }
    }
}

pub struct RequestEnforcer {
    pipeline: Arc<DecisionPipeline>,
    ledger: BlockLedger,
    block_page: Url,
    clock: Arc<dyn Clock>,
    logger: Option<Arc<DecisionLogger>>,
}

impl RequestEnforcer {
    pub fn new(
        pipeline: Arc<DecisionPipeline>,
        ledger: BlockLedger,
        block_page: Url,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pipeline,
            ledger,
            block_page,
            clock,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<DecisionLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn pipeline(&self) -> &Arc<DecisionPipeline> {
        &self.pipeline
    }

    pub fn ledger(&self) -> &BlockLedger {
        &self.ledger
    }

    /// Decides what happens to an intercepted request.
    ///
    /// Never fails: non-HTTP traffic and any panic inside the pipeline both proceed.
    pub async fn enforce(&self, request: &InterceptedRequest) -> EnforcementAction {
        if !request.is_http() {
            return EnforcementAction::Proceed;
        }

        let start = Instant::now();
        let target = request.evaluation_target();

        let verdict = match AssertUnwindSafe(self.pipeline.decide(target))
            .catch_unwind()
            .await
        {
            Ok(verdict) => verdict,
            Err(_) => {
                error!("Decision pipeline panicked for {}; allowing", target);
                return EnforcementAction::Proceed;
            }
        };

        let action = if verdict.decision.is_block() {
            self.record_block(target, &request.url, verdict.source);
            if request.top_level {
                EnforcementAction::Redirect {
                    redirect_url: self.block_page_url(target, verdict.source),
                }
            } else {
                EnforcementAction::Cancel
            }
        } else {
            EnforcementAction::Proceed
        };

        if let Some(logger) = &self.logger {
            logger.log(DecisionLogEntry {
                url: target.to_string(),
                original_url: request.url.clone(),
                decision: verdict.decision,
                source: verdict.source,
                action: action.label(),
                latency_ms: start.elapsed().as_millis() as u64,
            });
        }

        action
    }

    /// Interstitial URL carrying the evaluated URL and verdict source.
    pub fn block_page_url(&self, url: &str, source: VerdictSource) -> String {
        let mut page = self.block_page.clone();
        page.query_pairs_mut()
            .append_pair("url", url)
            .append_pair("source", source.as_str());
        page.to_string()
    }

    fn record_block(&self, url: &str, original_url: &str, source: VerdictSource) {
        self.ledger.append(BlockEvent {
            url: url.to_string(),
            original_url: original_url.to_string(),
            timestamp: self.clock.now_ms(),
            source,
        });
    }
}
