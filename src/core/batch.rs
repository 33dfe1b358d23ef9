use crate::adapters::atomic;
use crate::core::executor::PipelineDefinition;
use crate::core::processor::{display_name, FileProcessor};
use crate::core::Storage;
use crate::utils::error::{EtlError, FileStage, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// 單次執行的計數器；只由批次執行器更新，每個檔案結果更新一次
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetrics {
    pub files_total: usize,
    pub files_succeeded: usize,
    pub files_failed: usize,
    pub failures_by_step: BTreeMap<String, usize>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.files_total += 1;
        self.files_succeeded += 1;
    }

    pub fn record_failure(&mut self, bucket: &str) {
        self.files_total += 1;
        self.files_failed += 1;
        *self.failures_by_step.entry(bucket.to_string()).or_insert(0) += 1;
    }

    pub fn is_success(&self) -> bool {
        self.files_failed == 0
    }

    /// 0：全部成功；1：至少一個檔案失敗
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl fmt::Display for RunMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed (total {} files)",
            self.files_succeeded, self.files_failed, self.files_total
        )?;
        if !self.failures_by_step.is_empty() {
            let buckets: Vec<String> = self
                .failures_by_step
                .iter()
                .map(|(step, count)| format!("{}={}", step, count))
                .collect();
            write!(f, "; failures by step: {}", buckets.join(", "))?;
        }
        Ok(())
    }
}

/// 失敗檔案的診斷資訊
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub file: PathBuf,
    pub stage: Option<FileStage>,
    pub step: Option<String>,
    pub cause: String,
}

impl FileFailure {
    fn from_error(file: &Path, error: &EtlError) -> Self {
        Self {
            file: file.to_path_buf(),
            stage: error.stage(),
            step: error.step_name().map(str::to_string),
            cause: error.cause_chain(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub metrics: RunMetrics,
    pub failures: Vec<FileFailure>,
    pub written: Vec<PathBuf>,
    #[serde(skip)]
    pub duration: Duration,
}

impl BatchReport {
    pub fn exit_code(&self) -> i32 {
        self.metrics.exit_code()
    }
}

/// 將 `*`、`?` 萬用字元轉成完整比對的正規表達式
pub fn pattern_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');

    Regex::new(&expr).map_err(|e| EtlError::InvalidConfigValueError {
        field: "pattern".to_string(),
        value: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// 列出目錄中符合樣式的檔案，依檔名排序，不遞迴
pub fn discover_input_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = pattern_to_regex(pattern)?;
    let entries = fs::read_dir(dir).map_err(|source| EtlError::InputDirectoryError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| EtlError::InputDirectoryError {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|name| matcher.is_match(name))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// 批次執行器：逐一處理檔案，單一檔案失敗不會中止整批
pub struct BatchRunner<'a, S: Storage> {
    storage: &'a S,
    pipeline: &'a PipelineDefinition,
    output_dir: PathBuf,
}

impl<'a, S: Storage> BatchRunner<'a, S> {
    pub fn new(storage: &'a S, pipeline: &'a PipelineDefinition, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            pipeline,
            output_dir: output_dir.into(),
        }
    }

    /// 確保輸出目錄可用；無法建立時整批失敗
    pub fn prepare_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|source| EtlError::OutputDirectoryError {
            path: self.output_dir.clone(),
            source,
        })?;
        atomic::sweep_stray_temps(&self.output_dir);
        Ok(())
    }

    /// 依序處理給定的檔案並彙整結果
    pub fn run_batch(&self, input_files: &[PathBuf]) -> BatchReport {
        let started = Instant::now();
        let processor = FileProcessor::new(self.storage, self.pipeline, self.output_dir.clone());
        let mut metrics = RunMetrics::new();
        let mut failures = Vec::new();
        let mut written = Vec::new();

        for file in input_files {
            match processor.process(file) {
                Ok(output_path) => {
                    metrics.record_success();
                    tracing::info!(
                        "✅ Processed {} (success={}, failures={})",
                        display_name(file),
                        metrics.files_succeeded,
                        metrics.files_failed
                    );
                    written.push(output_path);
                }
                Err(e) => {
                    metrics.record_failure(e.metrics_bucket());
                    let failure = FileFailure::from_error(file, &e);
                    tracing::error!(
                        file = %display_name(file),
                        stage = ?failure.stage,
                        step = failure.step.as_deref().unwrap_or("-"),
                        "❌ {}",
                        failure.cause
                    );
                    failures.push(failure);
                }
            }
        }

        let report = BatchReport {
            metrics,
            failures,
            written,
            duration: started.elapsed(),
        };

        tracing::info!(
            "📊 Processing complete: {} in {:?}",
            report.metrics,
            report.duration
        );
        report
    }

    /// 探索輸入目錄並執行整批
    pub fn run_directory(&self, input_dir: &Path, pattern: &str) -> Result<BatchReport> {
        if !input_dir.is_dir() {
            tracing::error!("Input folder does not exist: {}", input_dir.display());
            return Err(EtlError::InputDirectoryError {
                path: input_dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }
        self.prepare_output_dir()?;

        let files = discover_input_files(input_dir, pattern)?;
        if files.is_empty() {
            tracing::warn!("⚠️ No files matched '{}' in {}", pattern, input_dir.display());
        } else {
            tracing::info!("🔍 Discovered {} input files", files.len());
        }

        Ok(self.run_batch(&files))
    }
}
