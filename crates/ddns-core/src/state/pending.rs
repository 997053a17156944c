// # File Pending-Host Store
//
// Persists the set of hosts still owed an update, so a host that failed
// while the address changed is retried by later cycles even though the
// observation log already shows the new address.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "pending": {
//     "home.example.com": "203.0.113.9"
//   }
// }
// ```
//
// Writes go to a temporary file that is then renamed over the real one.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::{PendingHostStore, PendingHosts};

/// Ledger file format version
const LEDGER_FILE_VERSION: &str = "1.0";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct LedgerFileFormat {
    version: String,
    #[serde(default)]
    pending: PendingHosts,
}

/// JSON-file pending-host ledger
#[derive(Debug, Clone)]
pub struct FilePendingHostStore {
    path: PathBuf,
}

impl FilePendingHostStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Ledger path conventionally kept next to an observation log
    pub fn beside_log(log_path: &Path) -> Self {
        let mut name = log_path.as_os_str().to_os_string();
        name.push(".pending.json");
        Self::new(PathBuf::from(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl PendingHostStore for FilePendingHostStore {
    async fn load(&self) -> Result<PendingHosts, Error> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PendingHosts::new());
            }
            Err(e) => return Err(e.into()),
        };

        let ledger: LedgerFileFormat = serde_json::from_str(&content)?;

        if ledger.version != LEDGER_FILE_VERSION {
            tracing::warn!(
                "Pending ledger version mismatch: expected {}, got {}. Attempting to load anyway.",
                LEDGER_FILE_VERSION,
                ledger.version
            );
        }

        Ok(ledger.pending)
    }

    async fn save(&self, pending: &PendingHosts) -> Result<(), Error> {
        let ledger = LedgerFileFormat {
            version: LEDGER_FILE_VERSION.to_string(),
            pending: pending.clone(),
        };
        let json = serde_json::to_string_pretty(&ledger)?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(json.as_bytes()).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &self.path).await?;

        tracing::trace!("Pending ledger written: {}", self.path.display());
        Ok(())
    }
}
