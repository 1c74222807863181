use super::traits::RuleMatcher;
use super::types::ListKind;
use crate::error::PatternError;
use regex::Regex;
use tracing::warn;

/// Compiles a glob-style rule into a fully anchored expression.
///
/// Every regex metacharacter is escaped except `*`, which becomes a run of
/// non-whitespace characters.
pub fn compile_pattern(pattern: &str) -> Result<Regex, PatternError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(PatternError::Empty);
    }

    let body = trimmed
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\S*");

    Regex::new(&format!("^{}$", body)).map_err(|source| PatternError::Invalid {
        pattern: pattern.to_string(),
        source,
    })
}

/// Host portion of a URL, taken literally: no case folding, userinfo and port removed.
pub fn host_of(url: &str) -> Option<&str> {
    let rest = &url[url.find("://")? + 3..];
    let authority = match rest.find(['/', '?', '#']) {
        Some(end) => &rest[..end],
        None => rest,
    };
    let host_port = match authority.rfind('@') {
        Some(at) => &authority[at + 1..],
        None => authority,
    };
    let host = if host_port.starts_with('[') {
        // IPv6 literal keeps its brackets
        match host_port.find(']') {
            Some(end) => &host_port[..=end],
            None => host_port,
        }
    } else {
        match host_port.rfind(':') {
            Some(colon) => &host_port[..colon],
            None => host_port,
        }
    };

    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// One compiled rule list.
#[derive(Debug, Default)]
struct CompiledList {
    rules: Vec<Regex>,
}

impl CompiledList {
    fn compile(patterns: &[String], kind: ListKind) -> Self {
        let rules = patterns
            .iter()
            .filter_map(|p| match compile_pattern(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    // Skip the broken rule, keep the rest of the list live.
                    warn!("Skipping {} rule: {}", kind.collection(), e);
                    None
                }
            })
            .collect();
        Self { rules }
    }

    fn matches(&self, url: &str, host: Option<&str>) -> bool {
        self.rules
            .iter()
            .any(|re| re.is_match(url) || host.is_some_and(|h| re.is_match(h)))
    }
}

/// Immutable matcher built from a snapshot of both rule lists.
///
/// A URL matches a list when any pattern matches either the full URL or its host.
#[derive(Debug, Default)]
pub struct PatternMatcher {
    allow: CompiledList,
    deny: CompiledList,
}

impl PatternMatcher {
    pub fn new(allowlist: &[String], denylist: &[String]) -> Self {
        Self {
            allow: CompiledList::compile(allowlist, ListKind::Allow),
            deny: CompiledList::compile(denylist, ListKind::Deny),
        }
    }

    pub fn rule_count(&self, kind: ListKind) -> usize {
        match kind {
            ListKind::Allow => self.allow.rules.len(),
            ListKind::Deny => self.deny.rules.len(),
        }
    }
}

impl RuleMatcher for PatternMatcher {
    fn matches(&self, url: &str, kind: ListKind) -> bool {
        let host = host_of(url);
        match kind {
            ListKind::Allow => self.allow.matches(url, host),
            ListKind::Deny => self.deny.matches(url, host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wildcard_host_match() {
        let matcher = PatternMatcher::new(&list(&["*.trusted.com"]), &list(&["*.evil.com"]));

        assert!(matcher.matches("http://a.trusted.com/x", ListKind::Allow));
        assert!(matcher.matches("https://deep.sub.trusted.com", ListKind::Allow));
        assert!(!matcher.matches("http://a.trusted.com/x", ListKind::Deny));

        assert!(matcher.matches("http://a.evil.com/x", ListKind::Deny));
        assert!(!matcher.matches("http://notevil.com/", ListKind::Deny));
        // `*.` requires a label before the suffix
        assert!(!matcher.matches("http://evil.com/", ListKind::Deny));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let matcher = PatternMatcher::new(&list(&["http://site.com/a?b=(1)+[2]"]), &[]);
        assert!(matcher.matches("http://site.com/a?b=(1)+[2]", ListKind::Allow));
        // `.` must not act as a wildcard
        assert!(!matcher.matches("http://sitexcom/a?b=(1)+[2]", ListKind::Allow));
    }

    #[test]
    fn test_full_anchoring() {
        let matcher = PatternMatcher::new(&list(&["http://exact.com/page"]), &[]);
        assert!(matcher.matches("http://exact.com/page", ListKind::Allow));
        assert!(!matcher.matches("http://exact.com/page2", ListKind::Allow));
        assert!(!matcher.matches("xhttp://exact.com/page", ListKind::Allow));
    }

    #[test]
    fn test_wildcard_does_not_cross_whitespace() {
        let matcher = PatternMatcher::new(&list(&["http://a.com/*"]), &[]);
        assert!(matcher.matches("http://a.com/some/path?q=1", ListKind::Allow));
        assert!(!matcher.matches("http://a.com/has space", ListKind::Allow));
    }

    #[test]
    fn test_no_case_folding() {
        let matcher = PatternMatcher::new(&[], &list(&["*.evil.com"]));
        assert!(!matcher.matches("http://a.EVIL.com/", ListKind::Deny));
    }

    #[test]
    fn test_empty_pattern_skipped_others_survive() {
        let matcher = PatternMatcher::new(&list(&["", "   ", "*.ok.com"]), &[]);
        assert_eq!(matcher.rule_count(ListKind::Allow), 1);
        assert!(matcher.matches("http://x.ok.com/", ListKind::Allow));
    }

    #[test]
    fn test_compile_rejects_empty() {
        assert!(matches!(compile_pattern("  "), Err(PatternError::Empty)));
    }

    #[test]
    fn test_host_extraction() {
        assert_eq!(host_of("http://a.com/x"), Some("a.com"));
        assert_eq!(host_of("https://user:pw@a.com:8443/x?y#z"), Some("a.com"));
        assert_eq!(host_of("http://a.com?q"), Some("a.com"));
        assert_eq!(host_of("http://[::1]:80/"), Some("[::1]"));
        assert_eq!(host_of("http:///path"), None);
        assert_eq!(host_of("no-scheme"), None);
    }
}
