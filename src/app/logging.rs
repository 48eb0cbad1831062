//! Log file handling
//!
//! Check runs happen every few minutes for the lifetime of the host, so the
//! log is split per day and only the newest files are kept.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use super::config::LOG_FILE_NAME;

/// Daily log files kept next to the position files
pub const LOG_FILES_KEPT: usize = 7;

/// Daily rotated appender writing `<log_path>.YYYY-MM-DD`
pub fn rolling_appender(log_path: &Path) -> Result<RollingFileAppender> {
    let dir = match log_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let prefix = log_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| LOG_FILE_NAME.to_string());

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(LOG_FILES_KEPT)
        .build(dir)
        .with_context(|| format!("Failed to open log files in {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_appender_writes_dated_file() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("tmp").join("zbx-logmon.log");

        let mut appender = rolling_appender(&log_path).unwrap();
        appender.write_all(b"first run\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path().join("tmp"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("zbx-logmon.log."));
        assert_ne!(names[0], "zbx-logmon.log");

        let content = std::fs::read_to_string(dir.path().join("tmp").join(&names[0])).unwrap();
        assert_eq!(content, "first run\n");
    }

    #[test]
    fn test_appender_fails_when_directory_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("tmp");
        std::fs::write(&blocker, "").unwrap();

        let err = rolling_appender(&blocker.join("zbx-logmon.log")).unwrap_err();
        assert!(err.to_string().contains("Failed to create log directory"));
    }
}
