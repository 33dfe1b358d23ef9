use anyhow::Result;
use drilling_etl::adapters::atomic;
use std::fs;
use tempfile::TempDir;

/// 模擬在改名前當機：目的地必須維持原本內容
#[test]
fn test_crash_before_rename_keeps_previous_content() -> Result<()> {
    let dir = TempDir::new()?;
    let target = dir.path().join("drilling_machine_1.json");
    fs::write(&target, "{\"version\": 1}")?;

    let staged = atomic::stage(&target, b"{\"version\": 2, \"truncated")?;
    let temp_path = staged.temp_path().to_path_buf();
    // 不執行 destructor，等同行程在此中斷
    std::mem::forget(staged);

    assert_eq!(fs::read_to_string(&target)?, "{\"version\": 1}");
    assert!(temp_path.exists());

    // 下一次執行會清掉殘留的暫存檔
    assert_eq!(atomic::sweep_stray_temps(dir.path()), 1);
    assert!(!temp_path.exists());
    assert_eq!(fs::read_to_string(&target)?, "{\"version\": 1}");
    Ok(())
}

#[test]
fn test_crash_before_rename_leaves_destination_absent() -> Result<()> {
    let dir = TempDir::new()?;
    let target = dir.path().join("drilling_machine_2.json");

    let staged = atomic::stage(&target, b"{}")?;
    std::mem::forget(staged);

    assert!(!target.exists());
    Ok(())
}

#[test]
fn test_commit_replaces_destination_completely() -> Result<()> {
    let dir = TempDir::new()?;
    let target = dir.path().join("drilling_machine_3.json");
    fs::write(&target, "x".repeat(4096))?;

    let staged = atomic::stage(&target, b"{\"ok\": true}")?;
    assert_eq!(fs::read(&target)?.len(), 4096);
    let written = staged.commit()?;

    assert_eq!(written, target);
    assert_eq!(fs::read_to_string(&target)?, "{\"ok\": true}");
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}
