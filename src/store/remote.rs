//! Object store gateway built on the `object_store` crate
//!
//! The orchestrators are synchronous; every call here drives the async client
//! to completion on a private current-thread runtime.

use std::path::Path;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tokio::io::AsyncWriteExt;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{DbsnapError, DbsnapResult};
use crate::models::{KeyPrefix, ObjectKey};

use super::{ObjectStoreGateway, RemoteObject};

/// Endpoint scheme selecting the local filesystem backend
const FILE_SCHEME: &str = "file://";

/// Synchronous facade over an `object_store` backend
pub struct RemoteStore {
    store: Arc<dyn ObjectStore>,
    runtime: Runtime,
    description: String,
}

impl RemoteStore {
    /// Wrap an existing backend
    pub fn new(store: Arc<dyn ObjectStore>) -> DbsnapResult<Self> {
        let description = store.to_string();
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbsnapError::Config(format!("Failed to start I/O runtime: {}", e)))?;

        Ok(Self {
            store,
            runtime,
            description,
        })
    }

    /// Build the backend described by the settings
    ///
    /// `S3_ENDPOINT=file:///dir` selects a local directory; anything else is
    /// an S3-compatible endpoint. Credentials and region come from the usual
    /// `AWS_*` variables.
    pub fn from_settings(settings: &Settings) -> DbsnapResult<Self> {
        match settings.endpoint.as_deref() {
            Some(endpoint) if endpoint.starts_with(FILE_SCHEME) => {
                let root = &endpoint[FILE_SCHEME.len()..];
                Self::local(Path::new(root).join(&settings.bucket))
            }
            endpoint => Self::s3(&settings.bucket, endpoint),
        }
    }

    /// S3 or S3-compatible bucket
    pub fn s3(bucket: &str, endpoint: Option<&str>) -> DbsnapResult<Self> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(endpoint) = endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| DbsnapError::Config(format!("Invalid object store settings: {}", e)))?;
        Self::new(Arc::new(store))
    }

    /// Directory on the local filesystem, created if missing
    pub fn local(root: impl AsRef<Path>) -> DbsnapResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| {
            DbsnapError::Config(format!("Failed to create store directory {}: {}", root.display(), e))
        })?;

        let store = LocalFileSystem::new_with_prefix(root)
            .map_err(|e| DbsnapError::Config(format!("Invalid store directory: {}", e)))?;
        Self::new(Arc::new(store))
    }

    /// Process-local store, for tests and dry runs
    pub fn in_memory() -> DbsnapResult<Self> {
        Self::new(Arc::new(InMemory::new()))
    }

    async fn upload_async(&self, location: ObjectPath, source: &Path) -> Result<u64, String> {
        let mut file = tokio::fs::File::open(source)
            .await
            .map_err(|e| format!("open {}: {}", source.display(), e))?;

        let mut writer = BufWriter::new(Arc::clone(&self.store), location);
        let copied = match tokio::io::copy(&mut file, &mut writer).await {
            Ok(copied) => copied,
            Err(e) => {
                let _ = writer.abort().await;
                return Err(e.to_string());
            }
        };
        writer.shutdown().await.map_err(|e| e.to_string())?;
        Ok(copied)
    }

    async fn download_async(&self, location: ObjectPath, dest: &Path) -> Result<u64, String> {
        let result = self.store.get(&location).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => "object not found".to_string(),
            other => other.to_string(),
        })?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| format!("create {}: {}", dest.display(), e))?;

        let mut stream = result.into_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| e.to_string())?;
            file.write_all(&chunk).await.map_err(|e| e.to_string())?;
            written += chunk.len() as u64;
        }
        file.sync_all().await.map_err(|e| e.to_string())?;
        Ok(written)
    }
}

impl ObjectStoreGateway for RemoteStore {
    fn upload(&self, key: &ObjectKey, source: &Path) -> DbsnapResult<u64> {
        debug!(key = %key, source = %source.display(), store = %self.description, "uploading");
        let size = self
            .runtime
            .block_on(self.upload_async(ObjectPath::from(key.as_str()), source))
            .map_err(|reason| DbsnapError::upload(key.as_str(), reason))?;

        info!(key = %key, size_bytes = size, "uploaded backup");
        Ok(size)
    }

    fn download(&self, key: &ObjectKey, dest: &Path) -> DbsnapResult<u64> {
        debug!(key = %key, dest = %dest.display(), store = %self.description, "downloading");
        let result = self
            .runtime
            .block_on(self.download_async(ObjectPath::from(key.as_str()), dest));

        match result {
            Ok(size) => {
                info!(key = %key, size_bytes = size, "downloaded backup");
                Ok(size)
            }
            Err(reason) => {
                let _ = std::fs::remove_file(dest);
                Err(DbsnapError::download(key.as_str(), reason))
            }
        }
    }

    fn list(&self, prefix: &KeyPrefix) -> DbsnapResult<Vec<RemoteObject>> {
        let location = (!prefix.is_empty()).then(|| ObjectPath::from(prefix.as_str()));

        let metas = self
            .runtime
            .block_on(self.store.list(location.as_ref()).try_collect::<Vec<_>>())
            .map_err(|e| DbsnapError::download(prefix.as_str(), e))?;

        let mut objects: Vec<RemoteObject> = metas
            .into_iter()
            .filter_map(|meta| {
                let key = meta.location.to_string();
                let timestamp = prefix.timestamp_of(&key)?;
                Some(RemoteObject {
                    key,
                    timestamp,
                    size_bytes: meta.size,
                    last_modified: meta.last_modified,
                })
            })
            .collect();

        // Newest first
        objects.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotTimestamp;
    use std::fs;
    use tempfile::TempDir;

    fn key(prefix: &str, ts: &str) -> ObjectKey {
        KeyPrefix::new(prefix).object_key(&SnapshotTimestamp::parse(ts).unwrap())
    }

    #[test]
    fn test_upload_download_in_memory() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("upload.bak");
        let dest = temp.path().join("download.bak");
        let payload: Vec<u8> = (0..50_000).map(|i| (i % 251) as u8).collect();
        fs::write(&source, &payload).unwrap();

        let store = RemoteStore::in_memory().unwrap();
        let key = key("db", "20250102030405");

        assert_eq!(store.upload(&key, &source).unwrap(), payload.len() as u64);
        assert_eq!(store.download(&key, &dest).unwrap(), payload.len() as u64);
        assert_eq!(fs::read(&dest).unwrap(), payload);
    }

    #[test]
    fn test_download_missing_object() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("download.bak");
        let store = RemoteStore::in_memory().unwrap();

        let err = store.download(&key("db", "20250102030405"), &dest).unwrap_err();
        assert!(matches!(err, DbsnapError::DownloadFailed { .. }));
        assert!(err.to_string().contains("not found"));
        assert!(!dest.exists());
    }

    #[test]
    fn test_upload_missing_source() {
        let temp = TempDir::new().unwrap();
        let store = RemoteStore::in_memory().unwrap();

        let err = store
            .upload(&key("db", "20250102030405"), &temp.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, DbsnapError::UploadFailed { .. }));
    }

    #[test]
    fn test_local_store_layout() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("bucket");
        let source = temp.path().join("upload.bak");
        fs::write(&source, b"snapshot").unwrap();

        let store = RemoteStore::local(&root).unwrap();
        store.upload(&key("prod/app", "20250102030405"), &source).unwrap();

        let stored = root.join("prod").join("app").join("20250102030405.bak");
        assert_eq!(fs::read(stored).unwrap(), b"snapshot");
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("upload.bak");
        fs::write(&source, b"snapshot").unwrap();

        let store = RemoteStore::in_memory().unwrap();
        store.upload(&key("db", "20250101000000"), &source).unwrap();
        store.upload(&key("db", "20250301000000"), &source).unwrap();
        store.upload(&key("db", "20250201000000"), &source).unwrap();
        store.upload(&key("other", "20250401000000"), &source).unwrap();

        let listed = store.list(&KeyPrefix::new("db")).unwrap();
        let names: Vec<String> = listed.iter().map(|o| o.timestamp.to_string()).collect();
        assert_eq!(names, vec!["20250301000000", "20250201000000", "20250101000000"]);
        assert_eq!(listed[0].size_bytes, 8);
        assert_eq!(listed[0].key, "db/20250301000000.bak");
    }

    #[test]
    fn test_from_settings_file_endpoint() {
        let temp = TempDir::new().unwrap();
        let endpoint = format!("file://{}", temp.path().display());
        let settings = Settings::from_lookup(|name| match name {
            "S3_BUCKET" => Some("backups".to_string()),
            "DATABASE_PATH" => Some("/data/app.db".to_string()),
            "S3_ENDPOINT" => Some(endpoint.clone()),
            _ => None,
        })
        .unwrap();

        RemoteStore::from_settings(&settings).unwrap();
        assert!(temp.path().join("backups").is_dir());
    }
}
