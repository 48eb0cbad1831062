//! Incremental keyword scan of one log file

use regex::bytes::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use tracing::{debug, info};

use super::error::ScanError;
use super::position::{PositionKey, PositionStore};
use super::schema::{MatchEvent, MonitorRule};

/// Longest line prefix kept for matching; the rest of a longer line is skipped
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Result of scanning one rule
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Offset reading started from (after any rotation reset)
    pub start_offset: u64,
    /// Offset persisted for the next scan
    pub end_offset: u64,
    /// The stored offset was past the end of the file and was reset to 0
    pub rotated: bool,
    /// One entry per matching line
    pub matches: Vec<MatchEvent>,
}

impl ScanOutcome {
    pub fn matched(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Scan the new part of `rule`'s file and record how far it got
///
/// Reading resumes at the stored offset and runs to the end of the file as
/// it is at read time, including a final line without a terminator. A line
/// is reported once however many times the pattern occurs in it. The new
/// offset is stored whether or not anything matched.
pub fn scan<S: PositionStore + ?Sized>(
    rule: &MonitorRule,
    store: &mut S,
) -> Result<ScanOutcome, ScanError> {
    let path = rule.target_path();
    let pattern = Regex::new(&rule.keyword_pattern).map_err(|source| ScanError::Pattern {
        pattern: rule.keyword_pattern.clone(),
        source,
    })?;
    let unreadable = |source| ScanError::Unreadable {
        path: path.clone(),
        source,
    };

    let key = PositionKey::for_rule(rule);
    let stored = store.get(&key);

    let file = File::open(&path).map_err(unreadable)?;
    let file_size = file.metadata().map_err(unreadable)?.len();

    let rotated = stored > file_size;
    let start_offset = if rotated {
        info!(
            "{} shrank below stored offset {} (now {} bytes), rescanning from start",
            path.display(),
            stored,
            file_size
        );
        0
    } else {
        stored
    };

    let mut reader = BufReader::new(file);
    reader
        .seek(SeekFrom::Start(start_offset))
        .map_err(unreadable)?;

    let mut matches = Vec::new();
    let mut position = start_offset;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = read_line_capped(&mut reader, &mut buf, MAX_LINE_BYTES).map_err(unreadable)?;
        if n == 0 {
            break;
        }
        position += n;

        let line = strip_line_ending(&buf);
        if pattern.is_match(line) {
            matches.push(MatchEvent {
                tag: rule.tag.clone(),
                severity: rule.severity_label(),
                file: path.clone(),
                keyword_pattern: rule.keyword_pattern.clone(),
                matched_line: String::from_utf8_lossy(line).into_owned(),
            });
        }
    }

    store.set(&key, position)?;

    debug!(
        "Scanned {} [{}] bytes {}..{}: {} matches",
        path.display(),
        key,
        start_offset,
        position,
        matches.len()
    );

    Ok(ScanOutcome {
        start_offset,
        end_offset: position,
        rotated,
        matches,
    })
}

/// `read_until(b'\n')` that keeps at most `cap` bytes of the line in `buf`
///
/// Returns the number of bytes consumed, dropped tail included, so the
/// caller's offset always lands after the terminator.
fn read_line_capped<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>, cap: usize) -> io::Result<u64> {
    let mut consumed = 0u64;
    loop {
        let (done, used) = {
            let available = match reader.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let (chunk, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (&available[..=i], true),
                None => (available, available.is_empty()),
            };
            let room = cap.saturating_sub(buf.len());
            buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
            (done, chunk.len())
        };
        reader.consume(used);
        consumed += used as u64;
        if done {
            return Ok(consumed);
        }
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
