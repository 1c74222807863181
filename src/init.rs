//! Initialization helpers for the application startup.

use crate::classifier::HttpClassifier;
use crate::config::Config;
use crate::enforcer::RequestEnforcer;
use crate::engine::{Classifier, Clock, DecisionCache, ListKind, RuleStore};
use crate::ledger::BlockLedger;
use crate::logger::DecisionLogger;
use crate::pipeline::DecisionPipeline;
use crate::store::{restore_state, MemoryStore, PersistenceAdapter, PersistenceWriter, SqliteStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();

        // Keep HTTP client/server internals quiet unless asked for
        for noisy in ["hyper", "reqwest"] {
            if !filter.contains(noisy) {
                filter.push_str(&format!(",{}=warn", noisy));
            }
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Opens the configured persistence backend, falling back to memory if SQLite is unusable.
pub fn init_store(config: &Config) -> Arc<dyn PersistenceAdapter> {
    if config.persistence.backend == "sqlite" {
        match SqliteStore::open(config.persistence.sqlite_path.clone()) {
            Ok(store) => match store.initialize() {
                Ok(()) => {
                    info!("Using SQLite store at {}", store.path());
                    return Arc::new(store);
                }
                Err(e) => error!("Failed to initialize SQLite store: {}", e),
            },
            Err(e) => error!("Failed to open SQLite store: {}", e),
        }
        warn!("Falling back to in-memory store; state will not survive restarts.");
    } else if config.persistence.backend != "memory" {
        warn!(
            "Unknown persistence backend '{}', using in-memory store",
            config.persistence.backend
        );
    }

    let store = MemoryStore::new();
    if let Err(e) = store.initialize() {
        error!("Failed to initialize in-memory store: {}", e);
    }
    Arc::new(store)
}

/// Builds the HTTP classifier client from config.
pub fn init_classifier(config: &Config) -> Result<Arc<dyn Classifier>> {
    let classifier =
        HttpClassifier::from_config(config).context("Failed to build classifier client")?;
    info!(
        "Remote classifier at {} (timeout {}ms)",
        classifier.endpoint(),
        config.classifier.timeout_ms
    );
    Ok(Arc::new(classifier))
}

/// Fully wired decision service.
pub struct Sentinel {
    pub enforcer: Arc<RequestEnforcer>,
    pub pipeline: Arc<DecisionPipeline>,
    pub writer: PersistenceWriter,
}

/// Restores persisted state and assembles pipeline, enforcer and background writer.
///
/// Must be called from within a Tokio runtime.
pub fn build_sentinel(
    config: &Config,
    store: Arc<dyn PersistenceAdapter>,
    classifier: Arc<dyn Classifier>,
    clock: Arc<dyn Clock>,
) -> Result<Sentinel> {
    let block_page = Url::parse(&config.block_page).context("Invalid block_page URL")?;

    let rules = RuleStore::new();
    let cache = DecisionCache::new(config.cache_ttl(), config.cache.capacity, clock.clone());
    let ledger = BlockLedger::new(config.ledger.capacity);

    restore_state(store.as_ref(), &rules, &cache, &ledger);

    // Attached after the restore so loading does not write back.
    let writer = PersistenceWriter::spawn(store);
    let rules = Arc::new(rules.with_writer(writer.clone()));
    let cache = Arc::new(cache.with_writer(writer.clone()));
    let ledger = ledger.with_writer(writer.clone());

    merge_seed_rules(&rules, ListKind::Allow, &config.rules.allowlist);
    merge_seed_rules(&rules, ListKind::Deny, &config.rules.denylist);

    let pipeline = Arc::new(
        DecisionPipeline::new(rules, cache, classifier)
            .with_single_flight(config.classifier.single_flight),
    );

    let enforcer = RequestEnforcer::new(pipeline.clone(), ledger, block_page, clock)
        .with_logger(DecisionLogger::new(config.logging.clone()));

    Ok(Sentinel {
        enforcer: Arc::new(enforcer),
        pipeline,
        writer,
    })
}

fn merge_seed_rules(rules: &RuleStore, kind: ListKind, seeds: &[String]) {
    for pattern in seeds {
        if let Err(e) = rules.add(kind, pattern) {
            warn!("Ignoring configured {} pattern '{}': {}", kind.collection(), pattern, e);
        }
    }
}

/// Periodically drops expired cache entries.
pub fn spawn_cache_sweeper(pipeline: Arc<DecisionPipeline>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let removed = pipeline.sweep_cache();
            if removed > 0 {
                info!("Swept {} expired cache entries", removed);
            }
        }
    })
}
