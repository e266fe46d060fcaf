//! Content store module
//!
//! Maps keys to records persisted one file per key under a data directory.
//! Writes land in a dot-prefixed temporary file and are renamed into place,
//! so a reader sees either the old record or the new one. Writers of the
//! same key are serialized through [`KeyLocks`].

mod locks;
mod record;

use locks::KeyLocks;
pub use record::Record;

use hyper::body::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;

/// Content store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Exists,
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    fn from_io(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(err)
        }
    }
}

/// Whether `key` may address a record: one or more ASCII alphanumerics
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// File-backed key to record store
///
/// Mutations run on their own task: once started, a write or delete
/// completes even if the request that issued it goes away.
pub struct ContentStore {
    root: PathBuf,
    locks: Arc<KeyLocks>,
}

impl ContentStore {
    /// Open a store rooted at `dir`, creating the directory if missing.
    ///
    /// Temporary files left by writes interrupted in an earlier run are
    /// removed.
    pub async fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let root = dir.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        sweep_temp_files(&root).await?;
        Ok(Self {
            root,
            locks: Arc::new(KeyLocks::new()),
        })
    }

    #[cfg(test)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True iff a record is persisted under `key`
    pub async fn exists(&self, key: &str) -> bool {
        match self.path_for(key) {
            Ok(path) => is_file(&path).await,
            Err(_) => false,
        }
    }

    pub async fn read(&self, key: &str) -> Result<Record, StoreError> {
        let path = self.path_for(key)?;
        let blob = fs::read(&path).await.map_err(StoreError::from_io)?;
        Ok(Record::decode(Bytes::from(blob)))
    }

    /// Persist `record` under `key`, replacing whatever was there
    pub async fn write(&self, key: &str, record: &Record) -> Result<(), StoreError> {
        self.mutate(key, Some(record), Precondition::Any).await
    }

    /// Persist `record` under a key that must not be taken yet
    pub async fn create(&self, key: &str, record: &Record) -> Result<(), StoreError> {
        self.mutate(key, Some(record), Precondition::Absent).await
    }

    /// Overwrite the record under a key that must already exist
    pub async fn replace(&self, key: &str, record: &Record) -> Result<(), StoreError> {
        self.mutate(key, Some(record), Precondition::Present).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.mutate(key, None, Precondition::Any).await
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if is_valid_key(key) {
            Ok(self.root.join(key))
        } else {
            Err(StoreError::InvalidKey(key.to_string()))
        }
    }

    /// Write (`Some`) or remove (`None`) the record under `key` while holding
    /// the key lock, on a detached task.
    async fn mutate(
        &self,
        key: &str,
        record: Option<&Record>,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!(".{key}.tmp"));
        let locks = Arc::clone(&self.locks);
        let key = key.to_string();
        let blob = record.map(Record::encode);

        let task = tokio::spawn(async move {
            let _guard = locks.lock(&key).await;
            let present = is_file(&path).await;
            match precondition {
                Precondition::Absent if present => return Err(StoreError::Exists),
                Precondition::Present if !present => return Err(StoreError::NotFound),
                _ => {}
            }
            match blob {
                Some(blob) => persist(&tmp, &path, blob).await,
                None => fs::remove_file(&path).await.map_err(StoreError::from_io),
            }
        });

        task.await.map_err(|e| StoreError::Io(io::Error::other(e)))?
    }
}

/// What must hold for a mutation to go ahead
#[derive(Debug, Clone, Copy)]
enum Precondition {
    Any,
    Absent,
    Present,
}

/// Write through a temporary sibling, then rename over the target
async fn persist(tmp: &Path, path: &Path, blob: Vec<u8>) -> Result<(), StoreError> {
    if let Err(e) = fs::write(tmp, blob).await {
        let _ = fs::remove_file(tmp).await;
        return Err(StoreError::Io(e));
    }
    if let Err(e) = fs::rename(tmp, path).await {
        let _ = fs::remove_file(tmp).await;
        return Err(StoreError::Io(e));
    }
    Ok(())
}

fn is_temp_name(name: &str) -> bool {
    name.strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(".tmp"))
        .is_some_and(is_valid_key)
}

async fn sweep_temp_files(root: &Path) -> io::Result<()> {
    let mut entries = fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if is_temp_name(name) && entry.file_type().await?.is_file() {
            fs::remove_file(entry.path()).await?;
            crate::logger::log_warning(&format!("Removed leftover temporary file {name}"));
        }
    }
    Ok(())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path().join("data")).await.unwrap();
        (dir, store)
    }

    #[test]
    fn test_key_grammar() {
        assert!(is_valid_key("abc123XYZ"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("../etc"));
        assert!(!is_valid_key("a.b"));
        assert!(!is_valid_key("a/b"));
        assert!(!is_valid_key("ключ"));
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let (_dir, store) = temp_store().await;
        assert!(store.root().is_dir());
    }

    #[test]
    fn test_temp_names() {
        assert!(is_temp_name(".k1.tmp"));
        assert!(!is_temp_name("k1"));
        assert!(!is_temp_name(".k1"));
        assert!(!is_temp_name("..tmp"));
        assert!(!is_temp_name(".a.b.tmp"));
    }

    #[tokio::test]
    async fn test_open_removes_interrupted_writes() {
        let (dir, store) = temp_store().await;
        store.write("k1", &Record::new("text/plain", "kept")).await.unwrap();
        std::fs::write(store.root().join(".k2.tmp"), b"text/plain\nhalf").unwrap();
        std::fs::write(store.root().join(".notes"), b"unrelated").unwrap();
        drop(store);

        let store = ContentStore::open(dir.path().join("data")).await.unwrap();
        assert!(!store.root().join(".k2.tmp").exists());
        assert!(store.root().join(".notes").exists());
        assert!(!store.exists("k2").await);
        assert_eq!(
            store.read("k1").await.unwrap().payload,
            Bytes::from_static(b"kept")
        );
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, store) = temp_store().await;
        store
            .write("k1", &Record::new("text/plain", "hello"))
            .await
            .unwrap();

        let record = store.read("k1").await.unwrap();
        assert_eq!(record.content_type, "text/plain");
        assert_eq!(record.payload, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_on_disk_layout() {
        let (_dir, store) = temp_store().await;
        store
            .write("k1", &Record::new("text/plain", "line1\nline2"))
            .await
            .unwrap();

        let raw = std::fs::read(store.root().join("k1")).unwrap();
        assert_eq!(raw, b"text/plain\nline1\nline2");
        // no temporary files left behind
        let entries = std::fs::read_dir(store.root()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_write_overwrites_whole_record() {
        let (_dir, store) = temp_store().await;
        store
            .write("k1", &Record::new("text/plain", "a much longer first body"))
            .await
            .unwrap();
        store
            .write("k1", &Record::new("application/json", "{}"))
            .await
            .unwrap();

        let record = store.read("k1").await.unwrap();
        assert_eq!(record, Record::new("application/json", "{}"));
    }

    #[tokio::test]
    async fn test_read_missing() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(store.read("nope").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_exists() {
        let (_dir, store) = temp_store().await;
        assert!(!store.exists("k1").await);
        store.write("k1", &Record::new("text/plain", "")).await.unwrap();
        assert!(store.exists("k1").await);
        assert!(!store.exists("").await);
        assert!(!store.exists("..").await);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let (_dir, store) = temp_store().await;
        store.write("k1", &Record::new("text/plain", "x")).await.unwrap();

        assert!(store.delete("k1").await.is_ok());
        assert!(matches!(store.delete("k1").await, Err(StoreError::NotFound)));
        assert!(!store.exists("k1").await);
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(store.delete("ghost").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_create_refuses_taken_key() {
        let (_dir, store) = temp_store().await;
        let first = Record::new("text/plain", "first");
        store.create("k1", &first).await.unwrap();

        let result = store.create("k1", &Record::new("text/plain", "second")).await;
        assert!(matches!(result, Err(StoreError::Exists)));
        assert_eq!(store.read("k1").await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_replace_requires_existing() {
        let (_dir, store) = temp_store().await;
        let result = store.replace("k1", &Record::new("text/plain", "x")).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
        assert!(!store.exists("k1").await);

        store.write("k1", &Record::new("text/plain", "x")).await.unwrap();
        store
            .replace("k1", &Record::new("text/plain", "y"))
            .await
            .unwrap();
        assert_eq!(store.read("k1").await.unwrap().payload, Bytes::from_static(b"y"));
    }

    #[tokio::test]
    async fn test_invalid_keys_never_touch_disk() {
        let (_dir, store) = temp_store().await;
        let record = Record::new("text/plain", "x");
        assert!(matches!(
            store.write("../escape", &record).await,
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.read("").await, Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.delete("a/b").await, Err(StoreError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_one_complete_record() {
        let (_dir, store) = temp_store().await;
        let store = Arc::new(store);

        let mut tasks = Vec::new();
        for i in 0..16u8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let payload = vec![b'a' + i; 4096];
                store
                    .write("shared", &Record::new("text/plain", payload))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let record = store.read("shared").await.unwrap();
        assert_eq!(record.payload.len(), 4096);
        let first = record.payload[0];
        assert!(record.payload.iter().all(|&b| b == first));
    }
}
