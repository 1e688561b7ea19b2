//! In-memory file share.
//!
//! Stores files in a concurrent map and records every call made against it, so tests can assert
//! both on the resulting content and on which remote operations were (or were not) attempted.
//! Content is lost when the value is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::{FilePath, FileShare, Result, StorageError};

/// A call made against the share, in the order it was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareCall {
    ShareExists,
    CreateFile { path: String, length: u64 },
    WriteRange { path: String, offset: u64, len: u64 },
    DeleteFile { path: String },
}

/// Operation at which an injected fault is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    ShareExists,
    CreateFile,
    WriteRange,
    DeleteFile,
}

/// In-memory implementation of [`FileShare`].
///
/// Cloning yields a handle to the same share, which lets a test keep one handle for assertions
/// while the application owns another.
///
/// # Example
/// ```ignore
/// let share = InMemoryFileShare::new();
/// let app = Application::with_share(config, Arc::new(share.clone()));
/// // ... drive requests ...
/// assert_eq!(share.file("uploads/a.txt"), Some(b"hello".to_vec()));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryFileShare {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    missing: AtomicBool,
    files: DashMap<String, Vec<u8>>,
    calls: Mutex<Vec<ShareCall>>,
    faults: Mutex<Vec<FaultPoint>>,
}

impl InMemoryFileShare {
    /// Create an empty share that exists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle whose share reports as not existing.
    pub fn missing() -> Self {
        let share = Self::new();
        share.inner.missing.store(true, Ordering::SeqCst);
        share
    }

    /// Make the next call to `point` fail with [`StorageError::Injected`].
    pub fn fail_on(&self, point: FaultPoint) {
        self.inner.faults.lock().unwrap_or_else(|e| e.into_inner()).push(point);
    }

    /// Content of the file at `path` (e.g. `"uploads/a.txt"`), if present.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.files.get(path).map(|f| f.value().clone())
    }

    /// Number of files currently stored.
    pub fn file_count(&self) -> usize {
        self.inner.files.len()
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<ShareCall> {
        self.inner.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, call: ShareCall) {
        self.inner.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }

    fn check_fault(&self, point: FaultPoint, operation: &'static str) -> Result<()> {
        let mut faults = self.inner.faults.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(index) = faults.iter().position(|p| *p == point) {
            faults.remove(index);
            return Err(StorageError::Injected(operation));
        }
        Ok(())
    }
}

#[async_trait]
impl FileShare for InMemoryFileShare {
    async fn share_exists(&self) -> Result<bool> {
        self.record(ShareCall::ShareExists);
        self.check_fault(FaultPoint::ShareExists, "share_exists")?;
        Ok(!self.inner.missing.load(Ordering::SeqCst))
    }

    async fn create_file(&self, path: &FilePath, length: u64) -> Result<()> {
        let key = path.to_string();
        self.record(ShareCall::CreateFile { path: key.clone(), length });
        self.check_fault(FaultPoint::CreateFile, "create_file")?;

        // Creating over an existing file resets it to zeroes, as the real service does
        self.inner.files.insert(key, vec![0; length as usize]);
        Ok(())
    }

    async fn write_range(&self, path: &FilePath, offset: u64, data: Bytes) -> Result<()> {
        let key = path.to_string();
        self.record(ShareCall::WriteRange {
            path: key.clone(),
            offset,
            len: data.len() as u64,
        });
        self.check_fault(FaultPoint::WriteRange, "write_range")?;

        let mut file = self.inner.files.get_mut(&key).ok_or_else(|| StorageError::NotFound(key.clone()))?;
        let file_len = file.len() as u64;
        let end = offset + data.len() as u64;
        if end > file_len {
            return Err(StorageError::RangeOutOfBounds {
                path: key,
                offset,
                len: data.len() as u64,
                file_len,
            });
        }
        file[offset as usize..end as usize].copy_from_slice(&data);
        Ok(())
    }

    async fn delete_file(&self, path: &FilePath) -> Result<()> {
        let key = path.to_string();
        self.record(ShareCall::DeleteFile { path: key.clone() });
        self.check_fault(FaultPoint::DeleteFile, "delete_file")?;

        self.inner.files.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(name: &str) -> FilePath {
        FilePath::from_client_name("uploads", name).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_write() {
        let share = InMemoryFileShare::new();
        share.create_file(&path("a.txt"), 5).await.unwrap();
        assert_eq!(share.file("uploads/a.txt"), Some(vec![0; 5]));

        share.write_range(&path("a.txt"), 1, Bytes::from_static(b"bcd")).await.unwrap();
        assert_eq!(share.file("uploads/a.txt"), Some(b"\0bcd\0".to_vec()));
    }

    #[tokio::test]
    async fn test_write_past_end_fails() {
        let share = InMemoryFileShare::new();
        share.create_file(&path("a.txt"), 2).await.unwrap();

        let err = share.write_range(&path("a.txt"), 0, Bytes::from_static(b"abc")).await.unwrap_err();
        assert!(matches!(err, StorageError::RangeOutOfBounds { file_len: 2, len: 3, .. }));
    }

    #[tokio::test]
    async fn test_write_to_missing_file_fails() {
        let share = InMemoryFileShare::new();
        let err = share.write_range(&path("a.txt"), 0, Bytes::from_static(b"a")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(p) if p == "uploads/a.txt"));
    }

    #[tokio::test]
    async fn test_fault_is_raised_once() {
        let share = InMemoryFileShare::new();
        share.fail_on(FaultPoint::CreateFile);

        assert!(share.create_file(&path("a.txt"), 1).await.is_err());
        assert!(share.create_file(&path("a.txt"), 1).await.is_ok());
        assert_eq!(share.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_share_and_call_log() {
        let share = InMemoryFileShare::missing();
        assert!(!share.share_exists().await.unwrap());
        share.delete_file(&path("nope.txt")).await.unwrap();

        assert_eq!(
            share.calls(),
            vec![
                ShareCall::ShareExists,
                ShareCall::DeleteFile {
                    path: "uploads/nope.txt".to_string()
                }
            ]
        );
    }
}
