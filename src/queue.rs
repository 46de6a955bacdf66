use bincode::{deserialize_from, serialize_into};
use chrono::Utc;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::codec::PositionalRow;

/// One failed append waiting to be retried.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PendingAppend {
    /// Stable identifier used to remove the item after a successful retry.
    pub id: String,

    /// Dataset the rows belong to.
    pub dataset: String,

    /// Already-encoded rows, replayed as-is.
    pub rows: Vec<PositionalRow>,

    /// RFC 3339 timestamp of when the append was queued.
    pub queued_at: String,
}

impl PendingAppend {
    pub fn new(dataset: &str, rows: Vec<PositionalRow>) -> Self {
        PendingAppend {
            id: Uuid::new_v4().to_string(),
            dataset: dataset.to_string(),
            rows,
            queued_at: Utc::now().to_rfc3339(),
        }
    }
}

/// FIFO queue of failed appends, persisted to disk so it survives restarts.
///
/// The whole queue is rewritten on every mutation as a gzip-compressed
/// bincode snapshot. Queues here are small, a handful of rows that could not
/// reach the spreadsheet, so snapshot rewrites stay cheap.
pub struct LocalDurableQueue {
    path: PathBuf,
    items: Vec<PendingAppend>,
}

impl LocalDurableQueue {
    /// Load the queue from disk, starting empty when no file exists yet.
    pub fn load(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(LocalDurableQueue {
                path,
                items: Vec::new(),
            });
        }

        let file = File::open(&path)?;
        let decoder = GzDecoder::new(file);
        let mut reader = std::io::BufReader::new(decoder);

        let items: Vec<PendingAppend> = deserialize_from(&mut reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        Ok(LocalDurableQueue { path, items })
    }

    /// Append an item at the back of the queue and persist.
    pub fn enqueue(&mut self, item: PendingAppend) -> std::io::Result<()> {
        self.items.push(item);
        self.persist()
    }

    /// Remove an item by id and persist. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> std::io::Result<bool> {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Oldest item, next in line for a retry.
    pub fn front(&self) -> Option<&PendingAppend> {
        self.items.first()
    }

    pub fn items(&self) -> &[PendingAppend] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_all(parent)?;
            }
        }

        let file = File::create(&self.path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = std::io::BufWriter::new(encoder);

        serialize_into(&mut writer, &self.items)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        Ok(())
    }
}
