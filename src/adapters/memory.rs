use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory storage for unit tests.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned()
    }

    pub async fn get_text(&self, path: &str) -> Option<String> {
        self.get_file(path)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Storage for MemoryStorage {
    async fn ensure_root(&self) -> Result<()> {
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            EtlError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        let mut files = self.files.lock().await;
        files.remove(path).map(|_| ()).ok_or_else(|| {
            EtlError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        let files = self.files.lock().await;
        Ok(files.keys().cloned().collect())
    }

    fn location(&self, path: &str) -> String {
        format!("memory/{}", path)
    }
}
