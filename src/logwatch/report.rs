//! Check run driver and its text verdict
//!
//! The monitoring agent parses stdout: a single `OK`, or one `PROBLEM:` line
//! per finding. The process exit code carries no verdict.

use std::fmt;
use tracing::{debug, warn};

use super::error::ScanError;
use super::position::PositionStore;
use super::rules::RuleSet;
use super::scanner;
use super::schema::MatchEvent;

/// One reportable result of a check run
#[derive(Debug)]
pub enum Finding {
    /// A new line matched a rule's keyword
    Match(MatchEvent),
    /// A rule could not be scanned this cycle
    Error {
        tag: String,
        severity: String,
        error: ScanError,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Match(event) => write!(
                f,
                "PROBLEM:{}:{}:Keyword \"{}\" found in {}: {}",
                event.severity,
                event.tag,
                event.keyword_pattern,
                event.file.display(),
                event.matched_line
            ),
            Finding::Error {
                tag,
                severity,
                error,
            } => write!(f, "PROBLEM:{}:{}:{}", severity, tag, error),
        }
    }
}

/// Aggregated verdict of one check run
#[derive(Debug, Default)]
pub struct Report {
    /// Number of rules selected by the severity filter
    pub evaluated: usize,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn matches(&self) -> impl Iterator<Item = &MatchEvent> {
        self.findings.iter().filter_map(|f| match f {
            Finding::Match(event) => Some(event),
            Finding::Error { .. } => None,
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("OK");
        }
        for (i, finding) in self.findings.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", finding)?;
        }
        Ok(())
    }
}

/// Scan every rule selected by `severity`, in file order
///
/// Rules with another severity are not touched. A rule that fails to scan is
/// reported and the run moves on to the next one.
pub fn run_check<S: PositionStore + ?Sized>(
    rules: &RuleSet,
    severity: &str,
    store: &mut S,
) -> Report {
    let mut report = Report::default();

    for rule in rules.for_severity(severity) {
        report.evaluated += 1;
        match scanner::scan(rule, store) {
            Ok(outcome) => {
                report
                    .findings
                    .extend(outcome.matches.into_iter().map(Finding::Match));
            }
            Err(error) => {
                warn!("Rule {:?} failed: {}", rule.tag, error);
                report.findings.push(Finding::Error {
                    tag: rule.tag.clone(),
                    severity: rule.severity_label(),
                    error,
                });
            }
        }
    }

    debug!(
        "Check for severity {}: {} rules evaluated, {} findings",
        severity,
        report.evaluated,
        report.findings.len()
    );
    report
}
