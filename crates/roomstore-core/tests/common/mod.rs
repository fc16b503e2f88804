use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use roomstore_core::{Blob, ContentEntry, ContentStore, MemoryContentStore, StoreError, WriteOutcome};

/// Memory store that counts calls and fails chosen paths.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryContentStore,
    pub writes: AtomicUsize,
    pub deletes: AtomicUsize,
    failing_deletes: Mutex<HashSet<String>>,
    failing_writes: Mutex<HashSet<String>>,
    failing_lists: Mutex<HashSet<String>>,
}

#[allow(dead_code)]
impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_delete_of(&self, path: &str) {
        self.failing_deletes.lock().unwrap().insert(path.to_string());
    }

    pub fn fail_write_of(&self, path: &str) {
        self.failing_writes.lock().unwrap().insert(path.to_string());
    }

    pub fn fail_list_of(&self, path: &str) {
        self.failing_lists.lock().unwrap().insert(path.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_deletes.lock().unwrap().clear();
        self.failing_writes.lock().unwrap().clear();
        self.failing_lists.lock().unwrap().clear();
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn reset_counts(&self) {
        self.writes.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
    }

    pub async fn seed(&self, path: &str, content: &[u8]) {
        self.inner.write_blob(path, content, "seed", None).await.unwrap();
    }
}

#[async_trait]
impl ContentStore for RecordingStore {
    async fn list_children(&self, path: &str) -> Result<Vec<ContentEntry>, StoreError> {
        if self.failing_lists.lock().unwrap().contains(path) {
            return Err(StoreError::Transport(format!("injected list failure for {}", path)));
        }
        self.inner.list_children(path).await
    }

    async fn read_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        self.inner.read_blob(path).await
    }

    async fn write_blob(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<WriteOutcome, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing_writes.lock().unwrap().contains(path) {
            return Err(StoreError::Remote {
                status: 500,
                message: format!("injected write failure for {}", path),
            });
        }
        self.inner.write_blob(path, content, message, sha).await
    }

    async fn delete_blob(&self, path: &str, sha: &str, message: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.lock().unwrap().contains(path) {
            return Err(StoreError::Remote {
                status: 500,
                message: format!("injected delete failure for {}", path),
            });
        }
        self.inner.delete_blob(path, sha, message).await
    }
}
