//! # Claim Store
//!
//! Durable record of every accepted claim, in insertion order. The
//! registry rebuilds its accumulator by replaying [`ClaimStore::load_all`]
//! at startup, so the store is the source of truth and the accumulator is
//! derived state.
//!
//! ## Backends
//!
//! - [`MemoryClaimStore`]: volatile, for tests and ephemeral deployments.
//! - [`FileClaimStore`]: append-only JSON-lines log (`claims.jsonl`). Each
//!   record is written as one line and flushed with `sync_data` before the
//!   append returns.
//!
//! ## Failed appends
//!
//! If the write or the flush fails, the log is cut back to its length
//! before the append and flushed again, so a rejected record never
//! reappears on replay. If that rollback fails too, the store refuses
//! further appends with [`StoreError::Poisoned`] until it is reopened.
//!
//! ## Recovery
//!
//! A crash mid-append can leave a partial last line with no newline. On
//! load, that tail is discarded with a warning and truncated away. Any
//! newline-terminated line that does not parse, or a leaf index out of
//! sequence, is reported as [`StoreError::Corrupt`].

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use claimsrv_core::Claim;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Name of the claim log inside the storage directory.
pub const CLAIM_LOG_FILE: &str = "claims.jsonl";

/// One persisted claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    /// Position of the claim's leaf in the accumulator.
    pub leaf_index: u64,
    /// The claim.
    pub claim: Claim,
    /// When the record was accepted.
    pub stored_at: DateTime<Utc>,
}

/// Append-only persistence for claim records.
///
/// Implementations must make a record durable before `append` returns `Ok`,
/// and must return records from `load_all` in append order.
pub trait ClaimStore: Send + Sync {
    /// Persist one record.
    fn append(&self, record: &ClaimRecord) -> Result<(), StoreError>;

    /// Every persisted record, in append order.
    fn load_all(&self) -> Result<Vec<ClaimRecord>, StoreError>;

    /// Short backend name for logs and the admin info endpoint.
    fn kind(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Volatile store backed by a `Vec`.
#[derive(Debug, Default)]
pub struct MemoryClaimStore {
    records: Mutex<Vec<ClaimRecord>>,
}

impl MemoryClaimStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClaimStore for MemoryClaimStore {
    fn append(&self, record: &ClaimRecord) -> Result<(), StoreError> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ClaimRecord>, StoreError> {
        Ok(self.records.lock().clone())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

// ---------------------------------------------------------------------------
// File-backed
// ---------------------------------------------------------------------------

/// Append-only JSON-lines claim log.
#[derive(Debug)]
pub struct FileClaimStore {
    path: PathBuf,
    log: Mutex<LogFile>,
}

#[derive(Debug)]
struct LogFile {
    file: File,
    /// Set when a failed append could not be rolled back.
    poisoned: bool,
}

impl FileClaimStore {
    /// Open (or create) the claim log under `dir`, creating `dir` if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(CLAIM_LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            log: Mutex::new(LogFile {
                file,
                poisoned: false,
            }),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line` using `write`, restoring the previous file length if
    /// `write` fails.
    pub(crate) fn append_line_with<F>(&self, line: &[u8], write: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut File, &[u8]) -> io::Result<()>,
    {
        let mut log = self.log.lock();
        if log.poisoned {
            return Err(StoreError::Poisoned);
        }
        let prev_len = log.file.metadata()?.len();
        let Err(e) = write(&mut log.file, line) else {
            return Ok(());
        };

        let rollback = log.file.set_len(prev_len).and_then(|()| log.file.sync_data());
        match rollback {
            Ok(()) => tracing::warn!(
                path = %self.path.display(),
                len = prev_len,
                error = %e,
                "claim log append failed, rolled back"
            ),
            Err(rollback) => {
                log.poisoned = true;
                tracing::error!(
                    path = %self.path.display(),
                    len = prev_len,
                    error = %e,
                    rollback_error = %rollback,
                    "claim log rollback failed, refusing further appends"
                );
            }
        }
        Err(e.into())
    }
}

impl ClaimStore for FileClaimStore {
    fn append(&self, record: &ClaimRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.append_line_with(&line, |file, bytes| {
            file.write_all(bytes)?;
            file.sync_data()
        })
    }

    fn load_all(&self) -> Result<Vec<ClaimRecord>, StoreError> {
        let mut contents = Vec::new();
        File::open(&self.path)?.read_to_end(&mut contents)?;

        let mut records = Vec::new();
        let mut valid_len = 0usize;
        let mut offset = 0usize;
        let mut line_no = 0usize;

        while offset < contents.len() {
            line_no += 1;
            let rest = &contents[offset..];
            let (line, next, terminated) = match rest.iter().position(|b| *b == b'\n') {
                Some(pos) => (&rest[..pos], offset + pos + 1, true),
                None => (rest, contents.len(), false),
            };

            if line.iter().all(u8::is_ascii_whitespace) {
                if terminated {
                    valid_len = next;
                }
                offset = next;
                continue;
            }

            match serde_json::from_slice::<ClaimRecord>(line) {
                Ok(record) if terminated => {
                    let expected = records.len() as u64;
                    if record.leaf_index != expected {
                        return Err(StoreError::Corrupt {
                            line: line_no,
                            reason: format!(
                                "leaf index {} out of sequence, expected {expected}",
                                record.leaf_index
                            ),
                        });
                    }
                    records.push(record);
                    valid_len = next;
                }
                Err(e) if terminated => {
                    return Err(StoreError::Corrupt {
                        line: line_no,
                        reason: e.to_string(),
                    });
                }
                // Unterminated final line: a torn write.
                _ => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = line_no,
                        bytes = line.len(),
                        "discarding torn record at end of claim log"
                    );
                    break;
                }
            }
            offset = next;
        }

        if valid_len < contents.len() {
            let log = self.log.lock();
            log.file.set_len(valid_len as u64)?;
            log.file.sync_data()?;
        }

        Ok(records)
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(i: u64) -> ClaimRecord {
        ClaimRecord {
            leaf_index: i,
            claim: Claim::new(format!("idx-{i}").into_bytes(), b"data".to_vec()).unwrap(),
            stored_at: Utc::now(),
        }
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryClaimStore::new();
        assert!(store.load_all().unwrap().is_empty());
        let r0 = record(0);
        let r1 = record(1);
        store.append(&r0).unwrap();
        store.append(&r1).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![r0, r1]);
        assert_eq!(store.kind(), "memory");
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let r0 = record(0);
        let r1 = record(1);
        {
            let store = FileClaimStore::open(dir.path()).unwrap();
            store.append(&r0).unwrap();
            store.append(&r1).unwrap();
        }
        let store = FileClaimStore::open(dir.path()).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![r0, r1]);
        assert_eq!(store.kind(), "file");
        assert!(store.path().ends_with(CLAIM_LOG_FILE));
    }

    #[test]
    fn file_store_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileClaimStore::open(&nested).unwrap();
        assert!(store.load_all().unwrap().is_empty());
        assert!(nested.join(CLAIM_LOG_FILE).exists());
    }

    #[test]
    fn torn_tail_is_discarded_and_truncated() {
        let dir = TempDir::new().unwrap();
        let r0 = record(0);
        {
            let store = FileClaimStore::open(dir.path()).unwrap();
            store.append(&r0).unwrap();
        }
        let path = dir.path().join(CLAIM_LOG_FILE);
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"{\"leafIndex\":1,\"cla").unwrap();
        drop(f);

        let store = FileClaimStore::open(dir.path()).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![r0.clone()]);

        // The next append starts on a clean line.
        let r1 = record(1);
        store.append(&r1).unwrap();
        let reopened = FileClaimStore::open(dir.path()).unwrap();
        assert_eq!(reopened.load_all().unwrap(), vec![r0, r1]);
    }

    #[test]
    fn complete_record_without_newline_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CLAIM_LOG_FILE);
        fs::write(&path, serde_json::to_vec(&record(0)).unwrap()).unwrap();
        let store = FileClaimStore::open(dir.path()).unwrap();
        assert!(store.load_all().unwrap().is_empty());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn failed_partial_write_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let r0 = record(0);
        let r1 = record(1);
        let store = FileClaimStore::open(dir.path()).unwrap();
        store.append(&r0).unwrap();
        let len_before = fs::metadata(store.path()).unwrap().len();

        let line = serde_json::to_vec(&r1).unwrap();
        let err = store
            .append_line_with(&line, |file, bytes| {
                file.write_all(&bytes[..bytes.len() / 2])?;
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(fs::metadata(store.path()).unwrap().len(), len_before);

        store.append(&r1).unwrap();
        let reopened = FileClaimStore::open(dir.path()).unwrap();
        assert_eq!(reopened.load_all().unwrap(), vec![r0, r1]);
    }

    #[test]
    fn failed_sync_after_full_write_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let r0 = record(0);
        let store = FileClaimStore::open(dir.path()).unwrap();

        let mut line = serde_json::to_vec(&r0).unwrap();
        line.push(b'\n');
        let err = store
            .append_line_with(&line, |file, bytes| {
                file.write_all(bytes)?;
                Err(io::Error::new(io::ErrorKind::Other, "fsync failed"))
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(store.load_all().unwrap().is_empty());

        store.append(&r0).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![r0]);
    }

    #[test]
    fn poisoned_log_refuses_appends() {
        let dir = TempDir::new().unwrap();
        let store = FileClaimStore::open(dir.path()).unwrap();
        store.log.lock().poisoned = true;
        assert!(matches!(store.append(&record(0)), Err(StoreError::Poisoned)));
        assert_eq!(fs::metadata(store.path()).unwrap().len(), 0);
    }

    #[test]
    fn terminated_unparseable_last_line_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CLAIM_LOG_FILE);
        let mut contents = serde_json::to_vec(&record(0)).unwrap();
        contents.push(b'\n');
        contents.extend_from_slice(b"{\"leafIndex\":1,\"cla\n");
        fs::write(&path, &contents).unwrap();

        let store = FileClaimStore::open(dir.path()).unwrap();
        match store.load_all() {
            Err(StoreError::Corrupt { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt error, got {other:?}"),
        }
        assert_eq!(fs::metadata(&path).unwrap().len(), contents.len() as u64);
    }

    #[test]
    fn corruption_before_tail_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CLAIM_LOG_FILE);
        let mut contents = b"not json\n".to_vec();
        contents.extend(serde_json::to_vec(&record(0)).unwrap());
        contents.push(b'\n');
        fs::write(&path, contents).unwrap();

        let store = FileClaimStore::open(dir.path()).unwrap();
        match store.load_all() {
            Err(StoreError::Corrupt { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected corrupt error, got {other:?}"),
        }
    }

    #[test]
    fn leaf_index_gap_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = FileClaimStore::open(dir.path()).unwrap();
        store.append(&record(0)).unwrap();
        store.append(&record(2)).unwrap();
        match store.load_all() {
            Err(StoreError::Corrupt { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("out of sequence"), "got: {reason}");
            }
            other => panic!("expected corrupt error, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CLAIM_LOG_FILE);
        let mut contents = serde_json::to_vec(&record(0)).unwrap();
        contents.extend_from_slice(b"\n\n");
        fs::write(&path, contents).unwrap();
        let store = FileClaimStore::open(dir.path()).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_value(record(3)).unwrap();
        assert_eq!(json["leafIndex"], 3);
        assert!(json["claim"]["indexData"].is_string());
        assert!(json["storedAt"].is_string());
    }
}
