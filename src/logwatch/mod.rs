//! Incremental log keyword monitoring
//!
//! Rules come from a semicolon-delimited file. Each check run resumes every
//! selected file at the byte offset stored by the previous run, reports new
//! lines matching the rule's keyword, and stores the new offset.

pub mod discovery;
pub mod error;
pub mod position;
pub mod report;
pub mod rules;
pub mod scanner;
pub mod schema;

pub use discovery::{discover, DiscoveryItem, DiscoveryMode};
pub use error::{ConfigError, DiscoveryError, PositionError, ScanError};
pub use position::{FilePositionStore, MemoryPositionStore, PositionKey, PositionStore};
pub use report::{run_check, Finding, Report};
pub use rules::{load_or_bootstrap, load_rules, parse_rules, RuleSet};
pub use scanner::{scan, ScanOutcome};
pub use schema::{MatchEvent, MonitorRule};
