//! Persisted read offsets
//!
//! Each (file, severity, keyword) key owns one small file in the state
//! directory holding the decimal byte offset reached by the last scan.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::error::PositionError;
use super::schema::MonitorRule;

/// Hex digits of the keyword digest kept in the key
const KEYWORD_HASH_LEN: usize = 16;

/// Identifies one tracked offset
///
/// Built from the target file's base name, not its full path, so two
/// same-named files in different directories share a key when severity and
/// keyword are equal too. The key is also the position file name, so only
/// `[A-Za-z0-9._-]` survive in the name and severity parts; anything else
/// becomes `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey(String);

impl PositionKey {
    pub fn new(file_identity: &str, severity: &str, keyword_pattern: &str) -> Self {
        let digest = Sha256::digest(keyword_pattern.as_bytes());
        let hash = hex::encode(digest);
        Self(format!(
            "{}.{}.{}",
            file_name_safe(file_identity),
            file_name_safe(&severity.to_uppercase()),
            &hash[..KEYWORD_HASH_LEN]
        ))
    }

    pub fn for_rule(rule: &MonitorRule) -> Self {
        let identity = Path::new(&rule.filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| rule.filename.clone());
        Self::new(&identity, &rule.severity, &rule.keyword_pattern)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn file_name_safe(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage for scan offsets
pub trait PositionStore {
    /// Last stored offset, or 0 when nothing usable is stored
    fn get(&self, key: &PositionKey) -> u64;

    /// Replace the stored offset. Durable once this returns `Ok`.
    fn set(&mut self, key: &PositionKey, offset: u64) -> Result<(), PositionError>;
}

/// Position files under a state directory
#[derive(Debug, Clone)]
pub struct FilePositionStore {
    dir: PathBuf,
}

impl FilePositionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`'s offset
    pub fn path_for(&self, key: &PositionKey) -> PathBuf {
        self.dir.join(format!("{}.pos", key))
    }

    /// Create the state directory. Safe to call when it already exists.
    pub fn ensure_dir(&self) -> Result<(), PositionError> {
        fs::create_dir_all(&self.dir).map_err(|source| PositionError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }
}

impl PositionStore for FilePositionStore {
    fn get(&self, key: &PositionKey) -> u64 {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!("Cannot read position file {}: {}", path.display(), e);
                return 0;
            }
        };

        match content.trim().parse::<u64>() {
            Ok(offset) => offset,
            Err(_) => {
                warn!(
                    "Corrupt position file {} ({:?}), restarting from 0",
                    path.display(),
                    content.trim()
                );
                0
            }
        }
    }

    fn set(&mut self, key: &PositionKey, offset: u64) -> Result<(), PositionError> {
        self.ensure_dir()?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.pos.tmp", key));
        let write_err = |source| PositionError::Write {
            path: path.clone(),
            source,
        };

        let mut file = File::create(&tmp).map_err(write_err)?;
        file.write_all(offset.to_string().as_bytes())
            .map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        fs::rename(&tmp, &path).map_err(write_err)?;

        Ok(())
    }
}

/// In-memory store for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryPositionStore {
    offsets: HashMap<PositionKey, u64>,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl PositionStore for MemoryPositionStore {
    fn get(&self, key: &PositionKey) -> u64 {
        self.offsets.get(key).copied().unwrap_or(0)
    }

    fn set(&mut self, key: &PositionKey, offset: u64) -> Result<(), PositionError> {
        self.offsets.insert(key.clone(), offset);
        Ok(())
    }
}
