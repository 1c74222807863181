use super::PersistenceAdapter;
use crate::engine::types::{BlockEvent, CacheEntry, ListKind};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

#[derive(Debug)]
enum PersistCommand {
    Rules(ListKind, Vec<String>),
    Cache(Vec<(String, CacheEntry)>),
    Ledger(Vec<BlockEvent>),
    /// Acknowledged once every earlier command has been applied.
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget queue in front of a [`PersistenceAdapter`].
///
/// Writes run on a dedicated thread; callers never wait for them.
#[derive(Clone)]
pub struct PersistenceWriter {
    tx: Sender<PersistCommand>,
}

impl PersistenceWriter {
    pub fn spawn(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        let (tx, rx) = mpsc::channel::<PersistCommand>();

        if let Err(e) = thread::Builder::new()
            .name("persistence-writer".into())
            .spawn(move || run_writer(adapter, rx))
        {
            error!("Failed to start persistence writer: {}", e);
        }

        Self { tx }
    }

    pub fn save_rules(&self, kind: ListKind, patterns: Vec<String>) {
        self.send(PersistCommand::Rules(kind, patterns));
    }

    pub fn save_cache(&self, entries: Vec<(String, CacheEntry)>) {
        self.send(PersistCommand::Cache(entries));
    }

    pub fn save_ledger(&self, events: Vec<BlockEvent>) {
        self.send(PersistCommand::Ledger(events));
    }

    /// Waits until everything queued so far has been written.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(PersistCommand::Flush(ack_tx));
        let _ = ack_rx.await;
    }

    fn send(&self, cmd: PersistCommand) {
        if let Err(e) = self.tx.send(cmd) {
            error!("Failed to queue persistence write: {}", e);
        }
    }
}

/// Pending writes, keeping only the newest value per collection.
#[derive(Default)]
struct Batch {
    allow: Option<Vec<String>>,
    deny: Option<Vec<String>>,
    cache: Option<Vec<(String, CacheEntry)>>,
    ledger: Option<Vec<BlockEvent>>,
    acks: Vec<oneshot::Sender<()>>,
}

impl Batch {
    fn push(&mut self, cmd: PersistCommand) {
        match cmd {
            PersistCommand::Rules(ListKind::Allow, p) => self.allow = Some(p),
            PersistCommand::Rules(ListKind::Deny, p) => self.deny = Some(p),
            PersistCommand::Cache(e) => self.cache = Some(e),
            PersistCommand::Ledger(e) => self.ledger = Some(e),
            PersistCommand::Flush(ack) => self.acks.push(ack),
        }
    }

    fn apply(self, adapter: &dyn PersistenceAdapter) {
        if let Some(p) = self.allow {
            if let Err(e) = adapter.save_rules(ListKind::Allow, &p) {
                error!("Failed to persist allowlist: {}", e);
            }
        }
        if let Some(p) = self.deny {
            if let Err(e) = adapter.save_rules(ListKind::Deny, &p) {
                error!("Failed to persist denylist: {}", e);
            }
        }
        if let Some(entries) = self.cache {
            debug!("Persisting cache snapshot ({} entries)", entries.len());
            if let Err(e) = adapter.save_cache(&entries) {
                error!("Failed to persist cache snapshot: {}", e);
            }
        }
        if let Some(events) = self.ledger {
            if let Err(e) = adapter.save_ledger(&events) {
                error!("Failed to persist block ledger: {}", e);
            }
        }
        for ack in self.acks {
            let _ = ack.send(());
        }
    }
}

fn run_writer(adapter: Arc<dyn PersistenceAdapter>, rx: Receiver<PersistCommand>) {
    while let Ok(first) = rx.recv() {
        let mut batch = Batch::default();
        batch.push(first);
        // Coalesce whatever queued up while the last batch was being written.
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }
        batch.apply(adapter.as_ref());
    }

    info!("Persistence writer stopping.");
}
