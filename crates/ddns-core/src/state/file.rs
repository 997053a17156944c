// # File State Store
//
// Append-only, newline-delimited JSON implementation of StateStore.
//
// ## File Format
//
// One observation per line:
//
// ```text
// {"ip":"203.0.113.7","timestamp":"2025-01-09T23:59:00Z"}
// {"ip":"203.0.113.9","timestamp":"2025-01-10T23:59:00Z"}
// ```
//
// ## Crash Tolerance
//
// - Lines that fail to decode are skipped when looking for the last address
// - A torn final line (no trailing newline) is closed off before the next
//   append so the new record stays decodable
// - Every append is flushed and synced before returning

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::Error;
use crate::model::{Address, Observation};
use crate::traits::state_store::StateStore;

/// File-based observation log
///
/// Single-writer by contract: cycles never overlap, so no file locking is
/// done here.
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::model::{Address, Observation};
/// use ddns_core::state::FileStateStore;
/// use ddns_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/ddns/ip_log.log").await?;
///
///     store.append(&Observation::now(Address::from("1.2.3.4"))).await?;
///     assert_eq!(store.read_last().await?, Some(Address::from("1.2.3.4")));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store for `path`, creating parent directories if needed
    ///
    /// The log file itself is created lazily by the first append.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode one log line, `None` if it is not a usable record
    fn decode_line(line: &[u8]) -> Option<Address> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_slice::<Observation>(line) {
            Ok(obs) if !obs.address().is_empty() => Some(obs.address().clone()),
            Ok(_) => {
                tracing::debug!("Skipping log record with empty address");
                None
            }
            Err(e) => {
                tracing::debug!("Skipping malformed log record: {}", e);
                None
            }
        }
    }

    /// Whether the existing log ends mid-record
    async fn ends_without_separator(file: &mut fs::File) -> Result<bool, Error> {
        let len = file
            .metadata()
            .await
            .map_err(|e| Error::state_store(format!("Failed to stat log file: {}", e)))?
            .len();
        if len == 0 {
            return Ok(false);
        }

        file.seek(SeekFrom::End(-1))
            .await
            .map_err(|e| Error::state_store(format!("Failed to seek log file: {}", e)))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)
            .await
            .map_err(|e| Error::state_store(format!("Failed to read log file: {}", e)))?;

        Ok(last[0] != b'\n')
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn read_last(&self) -> Result<Option<Address>, Error> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Log file does not exist: {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::state_store(format!(
                    "Failed to read log file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        Ok(content.rsplit(|b| *b == b'\n').find_map(Self::decode_line))
    }

    async fn append(&self, observation: &Observation) -> Result<(), Error> {
        let mut record = serde_json::to_vec(observation)
            .map_err(|e| Error::state_store(format!("Failed to serialize observation: {}", e)))?;
        record.push(b'\n');

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::state_store(format!(
                    "Failed to open log file {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        if Self::ends_without_separator(&mut file).await? {
            tracing::warn!(
                "Log file {} ends with a partial record, closing it off",
                self.path.display()
            );
            record.insert(0, b'\n');
        }

        file.write_all(&record).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to write to log file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        file.flush()
            .await
            .map_err(|e| Error::state_store(format!("Failed to flush log file: {}", e)))?;
        file.sync_data()
            .await
            .map_err(|e| Error::state_store(format!("Failed to sync log file: {}", e)))?;

        tracing::trace!("Observation appended to {}", self.path.display());
        Ok(())
    }
}
