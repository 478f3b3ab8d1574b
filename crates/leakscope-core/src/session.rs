//! Append-only NDJSON session log.
//!
//! One file per session, one JSON record per line: a `flag` record for each
//! non-duplicate detection, and a single `no_flags` activity record when a
//! scan finds nothing. Both carry the scan's potential-field count, so
//! "scanned at T with potential=N" is always reconstructible from the log.
//!
//! Appends are serialized by one mutex. Records are appended, never
//! rewritten.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::patterns::DataCategory;

/// Longest input echo kept in a log record.
const INPUT_PREVIEW_MAX: usize = 2000;

/// One line of a session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogRecord {
    /// A flagged detection
    Flag {
        session_id: String,
        timestamp: DateTime<Utc>,
        category: DataCategory,
        content: String,
        confidence: f64,
        position: (usize, usize),
        context: String,
        input_preview: String,
        potential_fields: u64,
    },
    /// Scan activity with zero detections
    NoFlags {
        session_id: String,
        timestamp: DateTime<Utc>,
        context: String,
        input_preview: String,
        potential_fields: u64,
    },
}

impl LogRecord {
    pub fn session_id(&self) -> &str {
        match self {
            LogRecord::Flag { session_id, .. } | LogRecord::NoFlags { session_id, .. } => {
                session_id
            }
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LogRecord::Flag { timestamp, .. } | LogRecord::NoFlags { timestamp, .. } => *timestamp,
        }
    }

    pub fn potential_fields(&self) -> u64 {
        match self {
            LogRecord::Flag {
                potential_fields, ..
            }
            | LogRecord::NoFlags {
                potential_fields, ..
            } => *potential_fields,
        }
    }

    pub fn is_flag(&self) -> bool {
        matches!(self, LogRecord::Flag { .. })
    }
}

/// Truncate an input echo to [`INPUT_PREVIEW_MAX`] on a char boundary.
pub(crate) fn input_preview(text: &str) -> String {
    if text.len() <= INPUT_PREVIEW_MAX {
        return text.to_string();
    }
    let mut cut = INPUT_PREVIEW_MAX;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

/// Writer/reader for per-session NDJSON logs under one directory.
pub struct SessionLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SessionLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of one session's log file.
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("session_{}.ndjson", session_id))
    }

    /// Append one record to its session's log.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let _guard = self.write_lock.lock();
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.session_path(record.session_id());
        let json = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;
        writeln!(file, "{}", json).map_err(|e| Error::io(&path, e))?;
        Ok(())
    }

    /// Read a session's records back. Malformed lines are counted and
    /// skipped, not fatal; a missing file is an empty session.
    pub fn read_session(&self, session_id: &str) -> Result<Vec<LogRecord>> {
        let path = self.session_path(session_id);
        read_records(&path)
    }

    /// Session ids with a log file present, unsorted.
    pub fn session_ids(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(_) => return Vec::new(),
        };
        entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.strip_prefix("session_")?
                    .strip_suffix(".ndjson")
                    .map(str::to_string)
            })
            .collect()
    }
}

fn read_records(path: &Path) -> Result<Vec<LogRecord>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(path, e)),
    };

    let mut records = Vec::new();
    let mut malformed = 0usize;
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LogRecord>(line) {
            Ok(record) => records.push(record),
            Err(_) => malformed += 1,
        }
    }
    if malformed > 0 {
        tracing::warn!(
            path = %path.display(),
            malformed,
            "skipped malformed session log lines"
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flag_record(session_id: &str, content: &str) -> LogRecord {
        LogRecord::Flag {
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            category: DataCategory::SecretApi,
            content: content.to_string(),
            confidence: 0.9,
            position: (0, content.len()),
            context: format!("api_key = {}", content),
            input_preview: String::new(),
            potential_fields: 1,
        }
    }

    #[test]
    fn test_append_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path());
        log.append(&flag_record("s1", "sk-abc")).unwrap();
        log.append(&flag_record("s1", "sk-def")).unwrap();

        let records = log.read_session("s1").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(LogRecord::is_flag));
    }

    #[test]
    fn test_sessions_are_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path());
        log.append(&flag_record("a", "x")).unwrap();
        log.append(&flag_record("b", "y")).unwrap();

        assert_eq!(log.read_session("a").unwrap().len(), 1);
        assert_eq!(log.read_session("b").unwrap().len(), 1);
        let mut ids = log.session_ids();
        ids.sort();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_missing_session_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path());
        assert!(log.read_session("nope").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path());
        log.append(&flag_record("s1", "sk-abc")).unwrap();
        let path = log.session_path("s1");
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("{not json}\n");
        fs::write(&path, content).unwrap();
        log.append(&flag_record("s1", "sk-def")).unwrap();

        let records = log.read_session("s1").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_no_flags_record_serialization() {
        let record = LogRecord::NoFlags {
            session_id: "s1".to_string(),
            timestamp: Utc::now(),
            context: "Input length: 12 characters".to_string(),
            input_preview: "hello world!".to_string(),
            potential_fields: 3,
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["kind"], "no_flags");
        assert_eq!(parsed["potential_fields"], 3);
    }

    #[test]
    fn test_input_preview_truncates_on_char_boundary() {
        let long = "é".repeat(2000);
        let preview = input_preview(&long);
        assert!(preview.ends_with("..."));
        assert!(preview.len() <= INPUT_PREVIEW_MAX + 3);
    }
}
