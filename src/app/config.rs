use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default scripts directory of the monitoring agent
#[cfg(windows)]
pub const DEFAULT_SCRIPTS_DIR: &str = "C:\\zabbix\\scripts";
#[cfg(not(windows))]
pub const DEFAULT_SCRIPTS_DIR: &str = "/etc/zabbix/scripts";

/// Rules file name inside the scripts directory
pub const DEFAULT_RULES_FILE: &str = "zbx_logMonitor.conf";

/// Position files directory inside the scripts directory
pub const DEFAULT_STATE_DIR: &str = "tmp";

pub const LOG_FILE_NAME: &str = "zbx-logmon.log";

/// Settings for one invocation
///
/// Loaded once in `main`, overridden by command-line flags, then passed down.
/// Relative `rules_file`, `state_dir` and `log_file` are taken relative to
/// `scripts_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the rules file and the state directory
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
    /// Rules file (`tag;directory;filename;keyword;severity`)
    #[serde(default = "default_rules_file")]
    pub rules_file: PathBuf,
    /// Where position files live
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Diagnostic log file; defaults to `<state_dir>/zbx-logmon.log`
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SCRIPTS_DIR)
}

fn default_rules_file() -> PathBuf {
    PathBuf::from(DEFAULT_RULES_FILE)
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            rules_file: default_rules_file(),
            state_dir: default_state_dir(),
            log_file: None,
            log_level: default_log_level(),
        }
    }
}

/// Values given on the command line; `None` keeps the file/default value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub scripts_dir: Option<PathBuf>,
    pub rules_file: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load settings from `path`, or from the default location when `None`
    ///
    /// A missing file at the default location yields the defaults. A file
    /// named explicitly must exist. A file that exists but cannot be read or
    /// parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Settings file {} does not exist", p.display());
                }
                p.to_path_buf()
            }
            None => match Self::config_path() {
                Ok(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse settings {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Default settings file: ~/.config/zbx-logmon/config.toml
    pub fn config_path() -> Result<PathBuf> {
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))?;
        Ok(base_dirs.home_dir().join(".config/zbx-logmon/config.toml"))
    }

    /// Write these settings to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings {}", path.display()))?;

        Ok(())
    }

    /// Apply command-line values on top of these settings
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(dir) = overrides.scripts_dir {
            self.scripts_dir = dir;
        }
        if let Some(file) = overrides.rules_file {
            self.rules_file = file;
        }
        if let Some(dir) = overrides.state_dir {
            self.state_dir = dir;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        self
    }

    pub fn rules_path(&self) -> PathBuf {
        self.scripts_dir.join(&self.rules_file)
    }

    pub fn state_path(&self) -> PathBuf {
        self.scripts_dir.join(&self.state_dir)
    }

    pub fn log_path(&self) -> PathBuf {
        match &self.log_file {
            Some(file) => self.scripts_dir.join(file),
            None => self.state_path().join(LOG_FILE_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_paths() {
        let config = Config::default();
        assert_eq!(config.rules_path(), Path::new(DEFAULT_SCRIPTS_DIR).join("zbx_logMonitor.conf"));
        assert_eq!(config.state_path(), Path::new(DEFAULT_SCRIPTS_DIR).join("tmp"));
        assert_eq!(
            config.log_path(),
            Path::new(DEFAULT_SCRIPTS_DIR).join("tmp").join("zbx-logmon.log")
        );
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let config = Config {
            scripts_dir: PathBuf::from("/opt/scripts"),
            rules_file: PathBuf::from("/etc/logmon/rules.conf"),
            state_dir: PathBuf::from("/var/lib/logmon"),
            ..Config::default()
        };
        assert_eq!(config.rules_path(), PathBuf::from("/etc/logmon/rules.conf"));
        assert_eq!(config.state_path(), PathBuf::from("/var/lib/logmon"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml("scripts_dir = \"/opt/zabbix\"\nlog_level = \"debug\"\n").unwrap();
        assert_eq!(config.scripts_dir, PathBuf::from("/opt/zabbix"));
        assert_eq!(config.rules_file, PathBuf::from(DEFAULT_RULES_FILE));
        assert_eq!(config.log_level, "debug");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml("scripts_dir = [").is_err());
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            scripts_dir: dir.path().to_path_buf(),
            log_file: Some(PathBuf::from("logmon.log")),
            ..Config::default()
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(Some(path.as_path())).unwrap(), config);
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().with_overrides(Overrides {
            scripts_dir: Some(PathBuf::from("/srv/scripts")),
            log_level: Some("trace".to_string()),
            ..Overrides::default()
        });
        assert_eq!(config.scripts_dir, PathBuf::from("/srv/scripts"));
        assert_eq!(config.rules_path(), PathBuf::from("/srv/scripts/zbx_logMonitor.conf"));
        assert_eq!(config.log_level, "trace");
    }
}
