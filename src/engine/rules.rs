use super::matcher::{compile_pattern, PatternMatcher};
use super::traits::RuleMatcher;
use super::types::ListKind;
use crate::error::PatternError;
use crate::store::PersistenceWriter;
use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
struct RuleLists {
    allow: Vec<String>,
    deny: Vec<String>,
}

impl RuleLists {
    fn get(&self, kind: ListKind) -> &Vec<String> {
        match kind {
            ListKind::Allow => &self.allow,
            ListKind::Deny => &self.deny,
        }
    }

    fn get_mut(&mut self, kind: ListKind) -> &mut Vec<String> {
        match kind {
            ListKind::Allow => &mut self.allow,
            ListKind::Deny => &mut self.deny,
        }
    }
}

/// Operator-maintained allow and deny lists.
///
/// Writers serialize on a mutex and publish a freshly compiled matcher;
/// readers take a lock-free snapshot, so an evaluation sees either the old
/// or the new lists, never a half-applied edit.
pub struct RuleStore {
    lists: Mutex<RuleLists>,
    matcher: ArcSwap<PatternMatcher>,
    writer: Option<PersistenceWriter>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self {
            lists: Mutex::new(RuleLists::default()),
            matcher: ArcSwap::from_pointee(PatternMatcher::default()),
            writer: None,
        }
    }

    /// Queues the edited list for persistence after every change.
    pub fn with_writer(mut self, writer: PersistenceWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_lists(allowlist: Vec<String>, denylist: Vec<String>) -> Self {
        let store = Self::new();
        store.replace(ListKind::Allow, allowlist);
        store.replace(ListKind::Deny, denylist);
        store
    }

    /// Current compiled matcher for both lists.
    pub fn snapshot(&self) -> Arc<PatternMatcher> {
        self.matcher.load_full()
    }

    pub fn patterns(&self, kind: ListKind) -> Vec<String> {
        self.lock().get(kind).clone()
    }

    /// Appends a pattern. Returns `Ok(false)` if it was already present.
    pub fn add(&self, kind: ListKind, pattern: &str) -> Result<bool, PatternError> {
        let pattern = pattern.trim();
        compile_pattern(pattern)?;

        let mut lists = self.lock();
        let list = lists.get_mut(kind);
        if list.iter().any(|p| p == pattern) {
            return Ok(false);
        }
        list.push(pattern.to_string());
        self.publish(&lists, kind);
        info!("Added '{}' to {}", pattern, kind.collection());
        Ok(true)
    }

    /// Removes a pattern. Returns false if it was not present.
    pub fn remove(&self, kind: ListKind, pattern: &str) -> bool {
        let pattern = pattern.trim();
        let mut lists = self.lock();
        let list = lists.get_mut(kind);
        let before = list.len();
        list.retain(|p| p != pattern);
        if list.len() == before {
            return false;
        }
        self.publish(&lists, kind);
        info!("Removed '{}' from {}", pattern, kind.collection());
        true
    }

    /// Replaces a whole list, dropping duplicates but keeping first-seen order.
    pub fn replace(&self, kind: ListKind, patterns: Vec<String>) {
        let mut lists = self.lock();
        let list = lists.get_mut(kind);
        list.clear();
        for p in patterns {
            if !list.contains(&p) {
                list.push(p);
            }
        }
        self.publish(&lists, kind);
    }

    // Called with the lists lock held, so persisted lists follow edit order.
    fn publish(&self, lists: &RuleLists, changed: ListKind) {
        let matcher = PatternMatcher::new(lists.get(ListKind::Allow), lists.get(ListKind::Deny));
        debug!(
            "Published rules: {} allow, {} deny",
            matcher.rule_count(ListKind::Allow),
            matcher.rule_count(ListKind::Deny)
        );
        self.matcher.store(Arc::new(matcher));
        if let Some(writer) = &self.writer {
            writer.save_rules(changed, lists.get(changed).clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RuleLists> {
        // A poisoned lock still holds consistent lists: every edit publishes last.
        self.lists.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleMatcher for RuleStore {
    fn matches(&self, url: &str, kind: ListKind) -> bool {
        self.matcher.load().matches(url, kind)
    }
}
