//! Append-only batch log
//!
//! Every node, edge and constraint created during a load is appended to
//! `graph.log` as a length-prefixed bincode record. Replaying the log in
//! order rebuilds the exact same store, ids included.

use crate::graph::PropertyMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File name of the log inside the output directory
pub const LOG_FILE_NAME: &str = "graph.log";

/// Batch log errors
#[derive(Error, Debug)]
pub enum BatchLogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Checksum mismatch or truncated record
    #[error("Batch log corruption detected at sequence {0}")]
    Corruption(u64),
}

pub type BatchLogResult<T> = Result<T, BatchLogError>;

/// Batch log entry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogEntry {
    CreateNode {
        node_id: u64,
        labels: Vec<String>,
        properties: PropertyMap,
    },
    CreateEdge {
        edge_id: u64,
        source: u64,
        target: u64,
        edge_type: String,
        properties: PropertyMap,
    },
    DeclareConstraint {
        label: String,
        property: String,
    },
    /// Written once by a clean shutdown
    Shutdown {
        timestamp: i64,
    },
}

/// On-disk record. The entry is stored pre-encoded and the checksum covers
/// those bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogRecord {
    sequence: u64,
    payload: Vec<u8>,
    checksum: u32,
}

impl LogRecord {
    fn new(sequence: u64, entry: &LogEntry) -> BatchLogResult<Self> {
        let payload = bincode::serialize(entry)?;
        let checksum = Self::checksum_of(&payload);
        Ok(Self {
            sequence,
            payload,
            checksum,
        })
    }

    fn checksum_of(payload: &[u8]) -> u32 {
        let digest = Sha256::digest(payload);
        u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    fn verify_checksum(&self) -> bool {
        self.checksum == Self::checksum_of(&self.payload)
    }

    fn entry(&self) -> BatchLogResult<LogEntry> {
        Ok(bincode::deserialize(&self.payload)?)
    }
}

/// Append-only writer over `graph.log`
pub struct BatchLog {
    path: PathBuf,
    writer: BufWriter<File>,
    sequence: u64,
}

impl BatchLog {
    /// Open the log in `dir`, creating both if missing. Appends continue
    /// after any records already present.
    pub fn open(dir: impl AsRef<Path>) -> BatchLogResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE_NAME);

        let sequence = if path.exists() {
            Self::replay_file(&path, |_| Ok(()))?
        } else {
            0
        };

        info!("Opening batch log at {:?}, sequence: {}", path, sequence);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            sequence,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }

    /// Append an entry; returns its sequence number
    pub fn append(&mut self, entry: LogEntry) -> BatchLogResult<u64> {
        self.sequence += 1;
        let record = LogRecord::new(self.sequence, &entry)?;
        let data = bincode::serialize(&record)?;

        self.writer.write_all(&(data.len() as u32).to_le_bytes())?;
        self.writer.write_all(&data)?;

        Ok(self.sequence)
    }

    pub fn flush(&mut self) -> BatchLogResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Append the shutdown marker, flush and close
    pub fn close(mut self) -> BatchLogResult<u64> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        self.append(LogEntry::Shutdown { timestamp })?;
        self.flush()?;
        self.writer.get_ref().sync_all()?;
        debug!("Closed batch log {:?} at sequence {}", self.path, self.sequence);
        Ok(self.sequence)
    }

    /// Replay every entry of the log in `dir`; returns the last sequence seen
    pub fn replay<F>(dir: impl AsRef<Path>, callback: F) -> BatchLogResult<u64>
    where
        F: FnMut(&LogEntry) -> BatchLogResult<()>,
    {
        Self::replay_file(&dir.as_ref().join(LOG_FILE_NAME), callback)
    }

    fn replay_file<F>(path: &Path, mut callback: F) -> BatchLogResult<u64>
    where
        F: FnMut(&LogEntry) -> BatchLogResult<()>,
    {
        let mut reader = BufReader::new(File::open(path)?);
        let mut buf = Vec::new();
        let mut last_sequence = 0u64;

        loop {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            buf.resize(u32::from_le_bytes(len_bytes) as usize, 0);
            if let Err(e) = reader.read_exact(&mut buf) {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    warn!("Truncated batch log record after sequence {}", last_sequence);
                    return Err(BatchLogError::Corruption(last_sequence + 1));
                }
                return Err(e.into());
            }

            let record: LogRecord = bincode::deserialize(&buf)?;
            if !record.verify_checksum() {
                warn!("Batch log corruption detected at sequence {}", record.sequence);
                return Err(BatchLogError::Corruption(record.sequence));
            }

            callback(&record.entry()?)?;
            last_sequence = record.sequence;
        }

        debug!("Replayed batch log {:?} up to sequence {}", path, last_sequence);
        Ok(last_sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn node_entry(id: u64) -> LogEntry {
        let mut properties = PropertyMap::new();
        properties.insert("oid".to_string(), (id as i64).into());
        LogEntry::CreateNode {
            node_id: id,
            labels: vec!["Person".to_string()],
            properties,
        }
    }

    #[test]
    fn test_append_and_replay() {
        let temp_dir = TempDir::new().unwrap();
        let mut log = BatchLog::open(temp_dir.path()).unwrap();

        for i in 0..5 {
            log.append(node_entry(i)).unwrap();
        }
        assert_eq!(log.close().unwrap(), 6);

        let mut entries = Vec::new();
        let last = BatchLog::replay(temp_dir.path(), |entry| {
            entries.push(entry.clone());
            Ok(())
        })
        .unwrap();

        assert_eq!(last, 6);
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[2], node_entry(2));
        assert!(matches!(entries[5], LogEntry::Shutdown { .. }));
    }

    #[test]
    fn test_multi_property_entries_replay() {
        let temp_dir = TempDir::new().unwrap();
        let mut properties = PropertyMap::new();
        for (i, key) in ["name", "oid", "birthDate", "salary", "active"].iter().enumerate() {
            properties.insert(key.to_string(), (i as i64).into());
        }
        let entry = LogEntry::CreateNode {
            node_id: 0,
            labels: vec!["a_Person".to_string()],
            properties,
        };

        let mut log = BatchLog::open(temp_dir.path()).unwrap();
        log.append(entry.clone()).unwrap();
        log.close().unwrap();

        let mut replayed = Vec::new();
        BatchLog::replay(temp_dir.path(), |e| {
            replayed.push(e.clone());
            Ok(())
        })
        .unwrap();
        assert_eq!(replayed[0], entry);
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut log = BatchLog::open(temp_dir.path()).unwrap();
            log.append(node_entry(0)).unwrap();
            log.close().unwrap();
        }

        let mut log = BatchLog::open(temp_dir.path()).unwrap();
        assert_eq!(log.current_sequence(), 2);
        assert_eq!(log.append(node_entry(1)).unwrap(), 3);
    }

    #[test]
    fn test_corrupted_record_is_detected() {
        let temp_dir = TempDir::new().unwrap();
        let mut log = BatchLog::open(temp_dir.path()).unwrap();
        log.append(node_entry(0)).unwrap();
        let path = log.path().to_path_buf();
        log.close().unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        // Flip one byte of the first record's label text
        let pos = bytes.windows(6).position(|w| w == b"Person").unwrap();
        bytes[pos] = b'X';
        std::fs::write(&path, bytes).unwrap();

        let result = BatchLog::replay(temp_dir.path(), |_| Ok(()));
        assert!(matches!(result, Err(BatchLogError::Corruption(1))));
    }

    #[test]
    fn test_truncated_tail_is_detected() {
        let temp_dir = TempDir::new().unwrap();
        let mut log = BatchLog::open(temp_dir.path()).unwrap();
        log.append(node_entry(0)).unwrap();
        log.append(node_entry(1)).unwrap();
        let path = log.path().to_path_buf();
        log.flush().unwrap();
        drop(log);

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let result = BatchLog::replay(temp_dir.path(), |_| Ok(()));
        assert!(matches!(result, Err(BatchLogError::Corruption(2))));
    }
}
