//! Low-level discovery output
//!
//! Turns the rules for one severity into the JSON array the monitoring
//! server uses to create log items: `[{"{#TAG}": .., "{#PATH}": .., ...}]`.

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::error::DiscoveryError;
use super::rules::RuleSet;
use super::schema::MonitorRule;

/// One discovered log item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryItem {
    #[serde(rename = "{#TAG}")]
    pub tag: String,
    #[serde(rename = "{#PATH}")]
    pub path: String,
    #[serde(rename = "{#KEYWORD}")]
    pub keyword: String,
    #[serde(rename = "{#SEVERITY}")]
    pub severity: String,
}

impl DiscoveryItem {
    fn new(rule: &MonitorRule, path: String) -> Self {
        Self {
            tag: rule.tag.clone(),
            path,
            keyword: rule.keyword_pattern.clone(),
            severity: rule.severity_label(),
        }
    }
}

/// How file names in rules are turned into item paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryMode {
    /// One item per rule, path is `directory/filename`
    #[default]
    Literal,
    /// `filename` is a regex matched from the start of each file name found
    /// anywhere under `directory`; one item per matching file
    Expand,
}

/// Discovery items for the rules selected by `severity`
pub fn discover(rules: &RuleSet, severity: &str, mode: DiscoveryMode) -> Vec<DiscoveryItem> {
    let mut items = Vec::new();

    for rule in rules.for_severity(severity) {
        match mode {
            DiscoveryMode::Literal => {
                let path = rule.target_path().to_string_lossy().into_owned();
                items.push(DiscoveryItem::new(rule, path));
            }
            DiscoveryMode::Expand => match expand_rule(rule) {
                Ok(found) => items.extend(found),
                Err(e) => warn!("Cannot expand rule {:?}: {}", rule.tag, e),
            },
        }
    }

    debug!("Discovered {} items for severity {}", items.len(), severity);
    items
}

fn expand_rule(rule: &MonitorRule) -> Result<Vec<DiscoveryItem>, DiscoveryError> {
    let pattern = Regex::new(&format!("^(?:{})", rule.filename)).map_err(|source| {
        DiscoveryError::FilenamePattern {
            pattern: rule.filename.clone(),
            source,
        }
    })?;

    let mut paths: Vec<String> = WalkDir::new(&rule.directory)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| pattern.is_match(&e.file_name().to_string_lossy()))
        .map(|e| e.path().to_string_lossy().into_owned())
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| DiscoveryItem::new(rule, path))
        .collect())
}

/// Compact JSON array as expected by the discovery rule
pub fn to_json(items: &[DiscoveryItem]) -> Result<String, DiscoveryError> {
    Ok(serde_json::to_string(items)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logwatch::rules::parse_rules;
    use tempfile::tempdir;

    #[test]
    fn test_literal_discovery_json() {
        let rules = parse_rules(
            "app1;/var/log;app.log;ERROR;critical\nweb;/var/log/nginx;error.log;crit;WARNING\n",
        );
        let items = discover(&rules, "CRITICAL", DiscoveryMode::Literal);
        assert_eq!(items.len(), 1);

        let json = to_json(&items).unwrap();
        assert_eq!(
            json,
            r#"[{"{#TAG}":"app1","{#PATH}":"/var/log/app.log","{#KEYWORD}":"ERROR","{#SEVERITY}":"CRITICAL"}]"#
        );
    }

    #[test]
    fn test_no_rules_is_empty_array() {
        let items = discover(&RuleSet::default(), "CRITICAL", DiscoveryMode::Literal);
        assert_eq!(to_json(&items).unwrap(), "[]");
    }

    #[test]
    fn test_expand_walks_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("app-1.log"), "").unwrap();
        std::fs::write(nested.join("app-2.log"), "").unwrap();
        std::fs::write(dir.path().join("other.log"), "").unwrap();
        std::fs::write(dir.path().join("my-app-3.log"), "").unwrap();

        let rules = parse_rules(&format!(
            "app;{};app-\\d+\\.log;ERROR;CRITICAL\n",
            dir.path().display()
        ));
        let items = discover(&rules, "CRITICAL", DiscoveryMode::Expand);

        let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();
        let mut expected = vec![
            dir.path().join("app-1.log").to_string_lossy().into_owned(),
            nested.join("app-2.log").to_string_lossy().into_owned(),
        ];
        expected.sort();
        assert_eq!(paths, expected);
        assert!(items.iter().all(|i| i.tag == "app" && i.severity == "CRITICAL"));
    }

    #[test]
    fn test_expand_invalid_pattern_is_typed_error() {
        let rules = parse_rules("app;/var/log;app(.log;ERROR;CRITICAL\n");
        let result = expand_rule(&rules.rules[0]);
        assert!(matches!(
            result,
            Err(DiscoveryError::FilenamePattern { ref pattern, .. }) if pattern == "app(.log"
        ));
    }

    #[test]
    fn test_expand_invalid_pattern_yields_nothing() {
        let dir = tempdir().unwrap();
        let rules = parse_rules(&format!(
            "app;{};app(.log;ERROR;CRITICAL\n",
            dir.path().display()
        ));
        assert!(discover(&rules, "CRITICAL", DiscoveryMode::Expand).is_empty());
    }
}
