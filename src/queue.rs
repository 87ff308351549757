//! Durable log of payloads the mediator failed to process.
//!
//! Entries are kept until they are replayed successfully. Saving the same payload twice stores it
//! twice.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{trace, warn};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait PayloadQueue: Send + Sync {
    async fn save(&self, payload: &str) -> Result<(), QueueError>;

    /// Up to `limit` payloads, oldest first.
    async fn list(&self, limit: usize) -> Result<Vec<String>, QueueError>;

    /// Removes every entry equal to `payload`.
    async fn delete(&self, payload: &str) -> Result<(), QueueError>;

    /// Moves `payload` behind every other entry, keeping a single copy of it.
    async fn requeue(&self, payload: &str) -> Result<(), QueueError>;
}

/// Queue stored as a JSON lines file, one JSON string per payload.
pub struct FilePayloadQueue {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePayloadQueue {
    pub fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn read_entries(&self) -> Result<Vec<String>, QueueError> {
        // a torn write can also cut a multi-byte character in half
        let content = match fs::read(&self.path).await {
            Ok(content) => String::from_utf8_lossy(&content).into_owned(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(
                    line = index + 1,
                    error = %err,
                    "skipping unreadable entry of {}",
                    self.path.display()
                ),
            }
        }

        Ok(entries)
    }

    /// Replaces the whole queue with `entries`.
    async fn rewrite(&self, entries: &[String]) -> Result<(), QueueError> {
        let mut content = String::new();
        for entry in entries {
            content.push_str(&serde_json::to_string(entry)?);
            content.push('\n');
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

/// Whether `file` is empty or ends with a complete line.
async fn ends_with_newline(file: &mut fs::File) -> io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(true);
    }

    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

#[async_trait]
impl PayloadQueue for FilePayloadQueue {
    async fn save(&self, payload: &str) -> Result<(), QueueError> {
        let mut line = serde_json::to_string(payload)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;
        // an append cut short by a crash leaves a partial line behind
        if !ends_with_newline(&mut file).await? {
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes()).await?;
        file.sync_all().await?;

        trace!("saved payload to {}", self.path.display());
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<String>, QueueError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.truncate(limit);

        Ok(entries)
    }

    async fn delete(&self, payload: &str) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        let before = entries.len();
        entries.retain(|entry| entry != payload);
        self.rewrite(&entries).await?;

        trace!(
            "deleted {} entries from {}",
            before - entries.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn requeue(&self, payload: &str) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.retain(|entry| entry != payload);
        entries.push(payload.to_owned());
        self.rewrite(&entries).await?;

        trace!("moved payload to the back of {}", self.path.display());
        Ok(())
    }
}
