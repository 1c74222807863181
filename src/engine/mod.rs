pub mod cache;
pub mod clock;
mod matcher;
pub mod rules;
mod traits;
pub mod types;

pub use cache::DecisionCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use matcher::{compile_pattern, host_of, PatternMatcher};
pub use rules::RuleStore;
pub use traits::{Classification, Classifier, RuleMatcher};
pub use types::{BlockEvent, CacheEntry, Decision, ListKind, Verdict, VerdictSource};
