use crate::core::executor::PipelineDefinition;
use crate::core::{Record, Storage};
use crate::domain::model::value_kind;
use crate::utils::error::{EtlError, FileStage, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// 讀取單一檔案、套用管道、原子性寫出結果
pub struct FileProcessor<'a, S: Storage> {
    storage: &'a S,
    pipeline: &'a PipelineDefinition,
    output_dir: PathBuf,
}

impl<'a, S: Storage> FileProcessor<'a, S> {
    pub fn new(storage: &'a S, pipeline: &'a PipelineDefinition, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            pipeline,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_path_for(&self, input_path: &Path) -> Result<PathBuf> {
        let name = input_path.file_name().ok_or_else(|| EtlError::FileError {
            path: input_path.to_path_buf(),
            stage: FileStage::Reading,
            message: "path has no file name".to_string(),
            source: None,
        })?;
        Ok(self.output_dir.join(name))
    }

    /// 處理一個檔案，成功時回傳輸出路徑
    ///
    /// 任何階段失敗都不會產生輸出檔。
    pub fn process(&self, input_path: &Path) -> Result<PathBuf> {
        tracing::info!("📥 Processing {}", display_name(input_path));

        let output_path = self.output_path_for(input_path)?;
        let bytes = self.storage.read_file(input_path)?;
        let record = parse_record(input_path, &bytes)?;
        tracing::debug!("Parsed {} top-level fields", record.len());

        let transformed = self.pipeline.run(&record).map_err(|failure| EtlError::StepError {
            path: input_path.to_path_buf(),
            step: failure.step,
            message: failure.message,
            source: failure.source,
        })?;

        let serialized = serde_json::to_vec_pretty(&transformed).map_err(|e| {
            EtlError::file(&output_path, FileStage::Writing, "cannot serialize record", e.into())
        })?;

        self.storage.write_file(&output_path, &serialized)?;
        tracing::debug!("💾 Wrote {}", output_path.display());

        Ok(output_path)
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 解析 JSON，頂層必須是物件
pub fn parse_record(path: &Path, bytes: &[u8]) -> Result<Record> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| EtlError::ParseError {
        path: path.to_path_buf(),
        message: "invalid JSON".to_string(),
        source: Some(e),
    })?;

    Record::from_value(value).map_err(|other| EtlError::ParseError {
        path: path.to_path_buf(),
        message: format!("expected a JSON object, found {}", value_kind(&other)),
        source: None,
    })
}
