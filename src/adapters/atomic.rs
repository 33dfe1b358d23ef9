//! Crash-safe file replacement.
//!
//! A write is split into two phases. [`stage`] writes the bytes to a uniquely
//! named temporary file next to the destination and syncs it to disk;
//! [`StagedWrite::commit`] renames it over the destination in one step. Until
//! the commit the destination keeps its previous content (or stays absent).

use crate::utils::error::{EtlError, FileStage, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const TEMP_MARKER: &str = ".tmp.";

/// 已寫入並同步到磁碟、尚未改名的暫存檔
///
/// 未 commit 就被 drop 時，暫存檔會被盡力刪除。
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    destination: PathBuf,
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// 原子性地將暫存檔改名為目的地
    pub fn commit(self) -> Result<PathBuf> {
        let destination = self.destination;
        self.temp.persist(&destination).map_err(|e| {
            EtlError::file(&destination, FileStage::Writing, "atomic rename failed", e.error)
        })?;
        sync_parent_dir(&destination);
        Ok(destination)
    }
}

fn temp_prefix(destination: &Path) -> String {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(".{}{}", name, TEMP_MARKER)
}

/// 將資料寫入同目錄下的暫存檔並 fsync
pub fn stage(destination: &Path, data: &[u8]) -> Result<StagedWrite> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(&temp_prefix(destination))
        .tempfile_in(dir)
        .map_err(|e| EtlError::file(destination, FileStage::Writing, "cannot create temporary file", e))?;

    temp.write_all(data)
        .and_then(|_| temp.flush())
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| EtlError::file(destination, FileStage::Writing, "cannot write temporary file", e))?;

    tracing::debug!("Staged {} bytes at {}", data.len(), temp.path().display());

    Ok(StagedWrite {
        temp,
        destination: destination.to_path_buf(),
    })
}

/// 寫入暫存檔、同步、改名，一次完成
pub fn write_atomic(destination: &Path, data: &[u8]) -> Result<PathBuf> {
    stage(destination, data)?.commit()
}

#[cfg(unix)]
fn sync_parent_dir(destination: &Path) {
    let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    if let Err(e) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
        tracing::debug!("Could not sync directory {}: {}", parent.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_destination: &Path) {}

fn is_stray_temp(name: &str) -> bool {
    name.starts_with('.') && name.contains(TEMP_MARKER)
}

/// 清除先前中斷留下的暫存檔，回傳刪除的數量
pub fn sweep_stray_temps(dir: &Path) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Skipping temp sweep of {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_temp = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(is_stray_temp)
            .unwrap_or(false);
        if !is_temp || !path.is_file() {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::warn!("🧹 Removed stray temporary file {}", path.display());
                removed += 1;
            }
            Err(e) => tracing::warn!("Could not remove stray file {}: {}", path.display(), e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("drilling_machine_1.json");

        write_atomic(&target, b"first").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"first");

        write_atomic(&target, b"second").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_temp_file_lives_next_to_destination() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("rig.json");
        let staged = stage(&target, b"{}").unwrap();

        assert_eq!(staged.temp_path().parent(), Some(dir.path()));
        let name = staged.temp_path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".rig.json.tmp."));
        assert!(!target.exists());
    }

    #[test]
    fn test_dropped_stage_leaves_previous_content() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("rig.json");
        fs::write(&target, b"old").unwrap();

        let staged = stage(&target, b"new content").unwrap();
        let temp_path = staged.temp_path().to_path_buf();
        drop(staged);

        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_sweep_removes_only_temp_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".rig.json.tmp.abc123"), b"partial").unwrap();
        fs::write(dir.path().join("rig.json"), b"{}").unwrap();

        assert_eq!(sweep_stray_temps(dir.path()), 1);
        assert!(dir.path().join("rig.json").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_stage_fails_for_missing_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("rig.json");
        let err = stage(&target, b"{}").unwrap_err();
        assert_eq!(err.stage(), Some(FileStage::Writing));
    }
}
