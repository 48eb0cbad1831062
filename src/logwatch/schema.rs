//! Data types shared by the rule loader, scanner and report

use std::path::PathBuf;

/// Number of `;`-separated fields in a log-monitor rule line
pub const RULE_FIELD_COUNT: usize = 5;

/// One log-watch rule from the rules file
///
/// Line format: `tag;directory;filename;keywordPattern;severity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorRule {
    /// Free-form label reported with every finding
    pub tag: String,
    /// Directory containing the watched file
    pub directory: PathBuf,
    /// File name inside `directory`
    pub filename: String,
    /// Regular expression searched in each new line
    pub keyword_pattern: String,
    /// Severity as written in the rules file
    pub severity: String,
}

impl MonitorRule {
    /// Full path of the watched file
    pub fn target_path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    /// Whether this rule is selected by the given severity filter (case-insensitive)
    pub fn matches_severity(&self, filter: &str) -> bool {
        self.severity.to_lowercase() == filter.trim().to_lowercase()
    }

    /// Severity in the canonical upper-case form used for output and position keys
    pub fn severity_label(&self) -> String {
        self.severity.to_uppercase()
    }
}

/// A line that matched a rule's keyword during one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvent {
    pub tag: String,
    pub severity: String,
    pub file: PathBuf,
    pub keyword_pattern: String,
    /// Line content without its line terminator
    pub matched_line: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(severity: &str) -> MonitorRule {
        MonitorRule {
            tag: "app1".to_string(),
            directory: PathBuf::from("/var/log"),
            filename: "app.log".to_string(),
            keyword_pattern: "ERROR".to_string(),
            severity: severity.to_string(),
        }
    }

    #[test]
    fn test_target_path() {
        assert_eq!(rule("CRITICAL").target_path(), PathBuf::from("/var/log/app.log"));
    }

    #[test]
    fn test_matches_severity_ignores_case() {
        let r = rule("Critical");
        assert!(r.matches_severity("CRITICAL"));
        assert!(r.matches_severity("critical"));
        assert!(!r.matches_severity("WARNING"));
        assert!(!r.matches_severity("CRIT"));
    }

    #[test]
    fn test_matches_severity_non_ascii() {
        let r = rule("übel");
        assert!(r.matches_severity("ÜBEL"));
        assert!(r.matches_severity("Übel"));
        assert!(!r.matches_severity("UBEL"));
    }

    #[test]
    fn test_severity_label() {
        assert_eq!(rule("warning").severity_label(), "WARNING");
    }
}
