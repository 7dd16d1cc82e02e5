//! JSON-file backend. Each collection lives in a single pretty-printed JSON
//! array; every mutation reads the whole collection, changes it and writes the
//! whole file back. Mutations within one process are serialized. There is no
//! locking between processes: the last writer wins.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, trace};

use crate::error::{Error, Result, StorageError};
use crate::models::{ClusterRecord, ConnectionSettings};
use crate::repositories::{ClusterRepository, ConnectionSettingsRepository};

pub const CLUSTER_FILE: &str = "cluster.json";
pub const CONNECTION_SETTINGS_FILE: &str = "cluster-connection-settings.json";

/// A whole collection of `T` stored as one JSON document.
struct JsonCollection<T> {
    path: PathBuf,
    // Held from read to write of every mutation
    writer: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            writer: Mutex::new(()),
            _records: PhantomData,
        }
    }

    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    async fn create_if_missing(&self) -> std::result::Result<(), StorageError> {
        let _guard = self.lock().await;
        if fs::try_exists(&self.path).await? {
            return Ok(());
        }

        trace!("Creating empty collection file {}", self.path.display());
        self.write_all(&[]).await
    }

    async fn read_all(&self) -> std::result::Result<Vec<T>, StorageError> {
        trace!("Reading collection from {}", self.path.display());

        let bytes = fs::read(&self.path).await.map_err(|e| {
            error!("Error reading {}: {}", self.path.display(), e);
            StorageError::Io(e)
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Callers must hold the writer lock.
    async fn write_all(&self, records: &[T]) -> std::result::Result<(), StorageError> {
        trace!("Writing {} records to {}", records.len(), self.path.display());

        let json = serde_json::to_vec_pretty(records)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, &json))
            .await
            .map_err(|e| StorageError::Io(io::Error::new(io::ErrorKind::Other, e)))?
            .map_err(|e| {
                error!("Error saving {}: {}", self.path.display(), e);
                StorageError::Io(e)
            })
    }
}

/// Writes `contents` to a fresh sibling file and renames it over `path`, so
/// readers see either the old or the new document.
fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut staging = NamedTempFile::new_in(parent)?;
    staging.write_all(contents)?;
    staging.as_file().sync_all()?;
    staging.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub struct ClusterFileRepository {
    collection: JsonCollection<ClusterRecord>,
}

impl ClusterFileRepository {
    /// Opens the cluster file, creating an empty one when it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let collection = JsonCollection::new(path.into());
        collection.create_if_missing().await?;
        Ok(Self { collection })
    }

    pub fn path(&self) -> &Path {
        &self.collection.path
    }
}

#[async_trait]
impl ClusterRepository for ClusterFileRepository {
    async fn find_all(&self) -> Result<Vec<ClusterRecord>> {
        Ok(self.collection.read_all().await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ClusterRecord>> {
        let clusters = self.collection.read_all().await?;
        Ok(clusters.into_iter().find(|cluster| cluster.id == id))
    }

    async fn save(&self, mut cluster: ClusterRecord) -> Result<ClusterRecord> {
        if cluster.id.trim().is_empty() {
            return Err(Error::InvalidInput("cluster id must not be blank".to_string()));
        }
        cluster.internal_name = None;

        let guard = self.collection.lock().await;
        let mut clusters = self.collection.read_all().await?;
        let id = cluster.id.clone();
        match clusters.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = cluster,
            None => clusters.push(cluster),
        }
        self.collection.write_all(&clusters).await?;
        drop(guard);

        debug!("Saved cluster '{}' to {}", id, self.path().display());
        self.find_by_id(&id).await?.ok_or_else(|| {
            StorageError::Corrupt(format!("cluster '{}' missing after save", id)).into()
        })
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let _guard = self.collection.lock().await;
        let mut clusters = self.collection.read_all().await?;
        clusters.retain(|cluster| cluster.id != id);
        self.collection.write_all(&clusters).await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let _guard = self.collection.lock().await;
        self.collection.write_all(&[]).await?;
        Ok(())
    }
}

/// Connection settings kept in a JSON file.
///
/// New ids are `max(existing ids) + 1`. Saves within one process never share
/// an id; two processes writing the same file can, and the later write drops
/// the earlier record.
pub struct ConnectionSettingsFileRepository {
    collection: JsonCollection<ConnectionSettings>,
}

impl ConnectionSettingsFileRepository {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let collection = JsonCollection::new(path.into());
        collection.create_if_missing().await?;
        Ok(Self { collection })
    }

    pub fn path(&self) -> &Path {
        &self.collection.path
    }

    fn next_id(all_settings: &[ConnectionSettings]) -> i64 {
        all_settings
            .iter()
            .filter_map(|settings| settings.id)
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[async_trait]
impl ConnectionSettingsRepository for ConnectionSettingsFileRepository {
    async fn find_all(&self) -> Result<Vec<ConnectionSettings>> {
        Ok(self.collection.read_all().await?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ConnectionSettings>> {
        let all_settings = self.collection.read_all().await?;
        Ok(all_settings.into_iter().find(|settings| settings.id == Some(id)))
    }

    async fn save(&self, mut settings: ConnectionSettings) -> Result<ConnectionSettings> {
        let guard = self.collection.lock().await;
        let mut all_settings = self.collection.read_all().await?;

        let existing = settings
            .id
            .and_then(|id| all_settings.iter().position(|s| s.id == Some(id)));

        let id = match existing {
            Some(index) => {
                let id = settings.id.unwrap_or_default();
                all_settings[index] = settings;
                id
            }
            None => {
                let id = Self::next_id(&all_settings);
                settings.id = Some(id);
                all_settings.push(settings);
                id
            }
        };
        self.collection.write_all(&all_settings).await?;
        drop(guard);

        debug!("Saved connection settings [{}] to {}", id, self.path().display());
        self.find_by_id(id).await?.ok_or_else(|| {
            StorageError::Corrupt(format!("connection settings [{}] missing after save", id)).into()
        })
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        let _guard = self.collection.lock().await;
        let mut all_settings = self.collection.read_all().await?;
        all_settings.retain(|settings| settings.id != Some(id));
        self.collection.write_all(&all_settings).await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let _guard = self.collection.lock().await;
        self.collection.write_all(&[]).await?;
        Ok(())
    }
}
