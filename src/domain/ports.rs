use crate::domain::model::Record;
use crate::utils::error::{BoxError, Result};
use serde_json::Value;
use std::path::Path;

/// 單一轉換步驟的回傳值；不是物件的值會被執行器視為失敗
pub type StepResult = std::result::Result<Value, BoxError>;

/// 純函式轉換步驟：讀取記錄、產生新值，絕不修改輸入
pub trait TransformStep {
    fn name(&self) -> &str;
    fn apply(&self, record: &Record) -> StepResult;
}

pub trait Storage {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// 寫入必須是原子性的：目的地要嘛是舊的完整檔案，要嘛是新的完整檔案
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;
}

pub trait ConfigProvider {
    fn input_dir(&self) -> &Path;
    fn output_dir(&self) -> &Path;
    fn file_pattern(&self) -> &str;
}
