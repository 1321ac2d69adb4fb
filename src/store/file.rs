use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Collections, Fields, Filter, Record, RecordStore, StoreError};

/// Record store persisted as a single JSON document on disk.
///
/// Every call takes an exclusive `fd-lock` on the file for the whole
/// read-modify-write cycle, so several processes can share one data file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run<T, F>(&self, write_back: bool, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Collections) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || with_locked_tables(&path, write_back, op))
            .await
            .map_err(|e| StoreError::Unavailable {
                message: format!("file store task failed: {e}"),
            })?
    }
}

fn with_locked_tables<T>(
    path: &Path,
    write_back: bool,
    op: impl FnOnce(&mut Collections) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    let mut lock = fd_lock::RwLock::new(file);
    let mut guard = lock.write()?;

    let mut contents = String::new();
    guard.read_to_string(&mut contents)?;
    let mut tables: Collections = if contents.trim().is_empty() {
        Collections::default()
    } else {
        serde_json::from_str(&contents)?
    };

    let result = op(&mut tables)?;

    if write_back {
        let encoded = serde_json::to_vec_pretty(&tables)?;
        guard.set_len(0)?;
        guard.seek(SeekFrom::Start(0))?;
        guard.write_all(&encoded)?;
        guard.sync_all()?;
        debug!(path = %path.display(), bytes = encoded.len(), "Wrote record store file");
    }

    Ok(result)
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn get_list(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.run(false, move |tables| Ok(tables.list(&collection, &filter)))
            .await
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Record, StoreError> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.run(false, move |tables| tables.get(&collection, &id)).await
    }

    async fn create(&self, collection: &str, payload: Fields) -> Result<Record, StoreError> {
        let collection = collection.to_string();
        self.run(true, move |tables| Ok(tables.insert(&collection, payload)))
            .await
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<Record, StoreError> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.run(true, move |tables| tables.patch(&collection, &id, &patch))
            .await
    }
}
