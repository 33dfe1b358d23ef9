use crate::adapters::atomic;
use crate::core::Storage;
use crate::utils::error::{EtlError, FileStage, Result};
use std::fs;
use std::path::Path;

/// 本機檔案系統；寫入一律經過原子替換
#[derive(Debug, Clone, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for LocalStorage {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| {
            let message = match e.kind() {
                std::io::ErrorKind::NotFound => "input file not found",
                std::io::ErrorKind::PermissionDenied => "permission denied",
                _ => "cannot read file",
            };
            EtlError::file(path, FileStage::Reading, message, e)
        })
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        atomic::write_atomic(path, data)?;
        Ok(())
    }
}
