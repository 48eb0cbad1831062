//! Rules file loading
//!
//! One rule per line: `tag;directory;filename;keywordPattern;severity`.
//! Blank lines and `#` comments are skipped. A malformed line is logged and
//! dropped; the remaining lines still load.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::error::ConfigError;
use super::schema::{MonitorRule, RULE_FIELD_COUNT};

/// Header written to a freshly bootstrapped rules file
pub const RULES_TEMPLATE: &str = "#tag;directory;filename;keyword;severity\n";

/// A line that could not be turned into a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    /// 1-based line number in the rules file
    pub line_no: usize,
    pub reason: String,
}

/// Rules in file order plus the lines that were skipped
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub rules: Vec<MonitorRule>,
    pub malformed: Vec<MalformedLine>,
}

impl RuleSet {
    /// Rules selected by a severity filter, in file order
    pub fn for_severity<'a>(&'a self, filter: &'a str) -> impl Iterator<Item = &'a MonitorRule> + 'a {
        self.rules.iter().filter(move |r| r.matches_severity(filter))
    }
}

/// Read and parse the rules file. Failing to read the file is fatal.
pub fn load_rules(path: &Path) -> Result<RuleSet, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let set = parse_rules(&content);
    for bad in &set.malformed {
        warn!(
            "Skipping malformed line {} in {}: {}",
            bad.line_no,
            path.display(),
            bad.reason
        );
    }
    debug!("Loaded {} rules from {}", set.rules.len(), path.display());
    Ok(set)
}

/// Like [`load_rules`], but a missing file is first created from [`RULES_TEMPLATE`]
pub fn load_or_bootstrap(path: &Path) -> Result<RuleSet, ConfigError> {
    if !path.exists() {
        bootstrap_rules_file(path)?;
    }
    load_rules(path)
}

/// Create the rules file with its header comment if it does not exist yet
///
/// Returns `true` when a new file was written.
pub fn bootstrap_rules_file(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }
    let err = |source| ConfigError::Bootstrap {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(err)?;
    }
    std::fs::write(path, RULES_TEMPLATE).map_err(err)?;
    debug!("Created rules template at {}", path.display());
    Ok(true)
}

/// Parse rules file content
pub fn parse_rules(content: &str) -> RuleSet {
    let mut set = RuleSet::default();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line) {
            Ok(rule) => set.rules.push(rule),
            Err(reason) => set.malformed.push(MalformedLine {
                line_no: idx + 1,
                reason,
            }),
        }
    }

    set
}

fn parse_line(line: &str) -> Result<MonitorRule, String> {
    let fields: Vec<&str> = line.split(';').collect();
    if fields.len() != RULE_FIELD_COUNT {
        return Err(format!(
            "expected {} fields, found {}",
            RULE_FIELD_COUNT,
            fields.len()
        ));
    }

    let [tag, directory, filename, keyword, severity] =
        [fields[0], fields[1], fields[2], fields[3], fields[4]];

    for (name, value) in [
        ("directory", directory),
        ("filename", filename),
        ("keyword", keyword),
        ("severity", severity),
    ] {
        if value.is_empty() {
            return Err(format!("empty {} field", name));
        }
    }

    Ok(MonitorRule {
        tag: tag.to_string(),
        directory: PathBuf::from(directory),
        filename: filename.to_string(),
        keyword_pattern: keyword.to_string(),
        severity: severity.to_string(),
    })
}
