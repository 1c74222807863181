use crate::config::LoggingConfig;
use crate::logger::types::{DecisionLogEntry, DecisionLogSink};
use tracing::info;

pub struct ConsoleLogSink {
    config: LoggingConfig,
}

impl ConsoleLogSink {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    fn should_log(&self, entry: &DecisionLogEntry) -> bool {
        if !self.config.enable {
            return false;
        }
        if entry.decision.is_block() {
            self.config.log_blocked
        } else {
            self.config.log_all_decisions
        }
    }
}

impl DecisionLogSink for ConsoleLogSink {
    fn log(&self, entry: &DecisionLogEntry) {
        if !self.should_log(entry) {
            return;
        }

        if self.config.format == "json" {
            info!(
                target: "decision",
                url = %entry.url,
                original_url = %entry.original_url,
                decision = %entry.decision,
                source = %entry.source,
                action = entry.action,
                lat = entry.latency_ms
            );
        } else if entry.url == entry.original_url {
            info!(
                "{} -> {} by {} ({}) [{}ms]",
                entry.url, entry.decision, entry.source, entry.action, entry.latency_ms
            );
        } else {
            info!(
                "{} (document {}) -> {} by {} ({}) [{}ms]",
                entry.original_url,
                entry.url,
                entry.decision,
                entry.source,
                entry.action,
                entry.latency_ms
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Decision, VerdictSource};

    fn entry(decision: Decision) -> DecisionLogEntry {
        DecisionLogEntry {
            url: "http://a.com".into(),
            original_url: "http://a.com".into(),
            decision,
            source: VerdictSource::Remote,
            action: "proceed",
            latency_ms: 1,
        }
    }

    #[test]
    fn test_filtering_by_decision() {
        let config = LoggingConfig {
            log_all_decisions: false,
            log_blocked: true,
            ..LoggingConfig::default()
        };
        let sink = ConsoleLogSink::new(config);
        assert!(sink.should_log(&entry(Decision::Block)));
        assert!(!sink.should_log(&entry(Decision::Allow)));
    }

    #[test]
    fn test_disabled_logs_nothing() {
        let config = LoggingConfig {
            enable: false,
            log_all_decisions: true,
            ..LoggingConfig::default()
        };
        let sink = ConsoleLogSink::new(config);
        assert!(!sink.should_log(&entry(Decision::Block)));
        assert!(!sink.should_log(&entry(Decision::Allow)));
    }
}
