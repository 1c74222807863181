pub mod console_sink;
pub mod types;

pub use self::console_sink::ConsoleLogSink;
pub use self::types::{DecisionLogEntry, DecisionLogSink};

use crate::config::LoggingConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Fans decision log entries out to the configured sinks.
///
/// Each sink drains its own bounded channel on a background task; a full
/// channel drops the entry rather than slowing enforcement.
pub struct DecisionLogger {
    sinks: Vec<mpsc::Sender<DecisionLogEntry>>,
}

impl DecisionLogger {
    /// Must be called from within a Tokio runtime.
    pub fn new(config: LoggingConfig) -> Arc<Self> {
        let mut sinks: Vec<Box<dyn DecisionLogSink>> = Vec::new();

        for sink_type in &config.sinks {
            match sink_type.as_str() {
                "console" => sinks.push(Box::new(ConsoleLogSink::new(config.clone()))),
                other => warn!("Unknown decision log sink type: {}", other),
            }
        }

        Self::with_sinks(sinks)
    }

    pub fn with_sinks(sinks: Vec<Box<dyn DecisionLogSink>>) -> Arc<Self> {
        let senders = sinks
            .into_iter()
            .map(|sink| {
                let (tx, mut rx) = mpsc::channel::<DecisionLogEntry>(1000);
                tokio::spawn(async move {
                    while let Some(entry) = rx.recv().await {
                        sink.log(&entry);
                    }
                });
                tx
            })
            .collect();

        Arc::new(Self { sinks: senders })
    }

    pub fn log(&self, entry: DecisionLogEntry) {
        let Some((last, rest)) = self.sinks.split_last() else {
            return;
        };
        for sink in rest {
            let _ = sink.try_send(entry.clone());
        }
        let _ = last.try_send(entry);
    }
}
