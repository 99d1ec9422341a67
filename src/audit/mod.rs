//! Audit log — append-only, hash-chained operation history.
//!
//! Stores one JSON object per line at `<workdir>/.envx/audit.logl`.
//! Every entry carries `prev_hash`, the hex SHA-256 of the exact bytes of
//! the line before it, so editing, deleting, or reordering any line shows
//! up as a break at the next line.
//!
//! Appends hold a process-wide lock and an exclusive file lock on the log
//! across "read last line, hash, append".

mod entry;

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use parking_lot::Mutex;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::errors::{EnvxError, Result};

pub use entry::{AuditEntry, EntryFields, Op};

/// Directory (relative to the workspace) holding the log.
pub const AUDIT_DIR: &str = ".envx";

/// Log file name inside `AUDIT_DIR`.
pub const AUDIT_FILE: &str = "audit.logl";

static APPEND_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Result of checking the hash chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub total_entries: usize,
    /// 1-based line numbers whose `prev_hash` does not match.
    pub breaks: Vec<usize>,
}

impl VerifyReport {
    pub fn is_intact(&self) -> bool {
        self.breaks.is_empty()
    }
}

/// Only the chain link is needed to verify a line.
#[derive(Deserialize)]
struct ChainLink {
    #[serde(default)]
    prev_hash: String,
}

/// Handle to a workspace's audit log file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Audit log for the workspace rooted at `workdir`.
    pub fn new(workdir: &Path) -> Self {
        Self {
            path: Self::log_path(workdir),
        }
    }

    /// Return the path to the audit log (for testing/display).
    pub fn log_path(workdir: &Path) -> PathBuf {
        workdir.join(AUDIT_DIR).join(AUDIT_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new entry, chaining it to the current last line.
    ///
    /// Creates the directory and file if needed.
    pub fn append(&self, op: Op, fields: EntryFields) -> Result<AuditEntry> {
        let _guard = APPEND_LOCK.lock();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        // Restrict the log to the owner.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        // Held until `file` is closed at the end of this call.
        FileExt::lock_exclusive(&file)
            .map_err(|e| EnvxError::AuditError(format!("lock audit log: {e}")))?;

        let mut contents = Vec::new();
        (&file).read_to_end(&mut contents)?;
        let prev_hash = split_lines(&contents)
            .last()
            .map(|line| line_hash(line))
            .unwrap_or_default();

        let entry = AuditEntry::new(op, fields, Utc::now(), prev_hash);
        let json = serde_json::to_string(&entry)
            .map_err(|e| EnvxError::SerializationError(format!("audit entry: {e}")))?;

        // Terminate a last line left without its newline before chaining onto it.
        let mut line = String::with_capacity(json.len() + 2);
        if contents.last().is_some_and(|b| *b != b'\n') {
            line.push('\n');
        }
        line.push_str(&json);
        line.push('\n');

        (&file).write_all(line.as_bytes())?;
        (&file).flush()?;

        Ok(entry)
    }

    /// Entries oldest-to-newest, keeping only the last `last_n` when
    /// `last_n > 0`.  Blank and unparsable lines are skipped.
    pub fn show(&self, last_n: usize) -> Result<Vec<AuditEntry>> {
        let contents = self.read_all()?;

        let mut entries: Vec<AuditEntry> = split_lines(&contents)
            .into_iter()
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .filter_map(|line| serde_json::from_slice(line).ok())
            .collect();

        if last_n > 0 && entries.len() > last_n {
            entries.drain(..entries.len() - last_n);
        }

        Ok(entries)
    }

    /// Recent `envelope_create` / `envelope_run` entries, oldest first.
    pub fn envelope_history(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let mut entries: Vec<AuditEntry> = self
            .show(0)?
            .into_iter()
            .filter(|e| e.op.is_envelope_use())
            .collect();

        if limit > 0 && entries.len() > limit {
            entries.drain(..entries.len() - limit);
        }

        Ok(entries)
    }

    /// Recompute the chain and report every line where it breaks.
    ///
    /// Never modifies the file.  Finding breaks is a successful result.
    pub fn verify(&self) -> Result<VerifyReport> {
        let contents = self.read_all()?;
        let lines = split_lines(&contents);

        let mut report = VerifyReport {
            total_entries: lines.len(),
            breaks: Vec::new(),
        };

        for (i, line) in lines.iter().enumerate() {
            let link: ChainLink = match serde_json::from_slice(line) {
                Ok(link) => link,
                Err(_) => {
                    report.breaks.push(i + 1);
                    continue;
                }
            };

            let intact = match i {
                // Only the very first entry may start the chain.
                0 => link.prev_hash.is_empty(),
                _ => link.prev_hash == line_hash(lines[i - 1]),
            };

            if !intact {
                report.breaks.push(i + 1);
            }
        }

        Ok(report)
    }

    fn read_all(&self) -> Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(EnvxError::NoAuditLog),
            Err(e) => Err(e.into()),
        }
    }
}

/// Append an entry to the log under `workdir`.
pub fn append(workdir: &Path, op: Op, fields: EntryFields) -> Result<AuditEntry> {
    AuditLog::new(workdir).append(op, fields)
}

/// Read entries from the log under `workdir`.
pub fn show(workdir: &Path, last_n: usize) -> Result<Vec<AuditEntry>> {
    AuditLog::new(workdir).show(last_n)
}

/// Verify the chain of the log under `workdir`.
pub fn verify(workdir: &Path) -> Result<VerifyReport> {
    AuditLog::new(workdir).verify()
}

/// Split file contents into lines without their terminators.
///
/// A trailing newline does not produce an extra empty line; `\r\n` is
/// treated like `\n`.
fn split_lines(contents: &[u8]) -> Vec<&[u8]> {
    let body = contents.strip_suffix(b"\n").unwrap_or(contents);
    if body.is_empty() && contents.len() <= 1 {
        return Vec::new();
    }
    body.split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

fn line_hash(line: &[u8]) -> String {
    hex::encode(Sha256::digest(line))
}
