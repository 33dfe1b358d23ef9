use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 轉換步驟回傳的底層錯誤
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 單一檔案處理到哪個階段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    Reading,
    Parsing,
    Transforming,
    Writing,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileStage::Reading => "reading",
            FileStage::Parsing => "parsing",
            FileStage::Transforming => "transforming",
            FileStage::Writing => "writing",
        };
        f.write_str(name)
    }
}

/// 非步驟造成的失敗在 metrics 中的分類
pub const FILE_BUCKET: &str = "file";

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("File error while {stage} {}: {message}", path.display())]
    FileError {
        path: PathBuf,
        stage: FileStage,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Parse error in {}: {message}", path.display())]
    ParseError {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Step '{step}' failed for {}: {message}", path.display())]
    StepError {
        path: PathBuf,
        step: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Input directory is not accessible: {}", path.display())]
    InputDirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output directory is not accessible: {}", path.display())]
    OutputDirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;

impl EtlError {
    pub fn file(
        path: impl AsRef<Path>,
        stage: FileStage,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        EtlError::FileError {
            path: path.as_ref().to_path_buf(),
            stage,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        EtlError::ConfigError {
            message: message.into(),
        }
    }

    /// 錯誤發生時所在的檔案階段；非檔案層級的錯誤回傳 None
    pub fn stage(&self) -> Option<FileStage> {
        match self {
            EtlError::FileError { stage, .. } => Some(*stage),
            EtlError::ParseError { .. } => Some(FileStage::Parsing),
            EtlError::StepError { .. } => Some(FileStage::Transforming),
            _ => None,
        }
    }

    pub fn step_name(&self) -> Option<&str> {
        match self {
            EtlError::StepError { step, .. } => Some(step),
            _ => None,
        }
    }

    /// 失敗計數使用的鍵：步驟名稱，或通用的 "file"
    pub fn metrics_bucket(&self) -> &str {
        self.step_name().unwrap_or(FILE_BUCKET)
    }

    /// 會中止整個批次的錯誤
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EtlError::FileError { .. } | EtlError::ParseError { .. } | EtlError::StepError { .. }
        )
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            2
        } else {
            1
        }
    }

    /// 完整的錯誤鏈，用於日誌
    pub fn cause_chain(&self) -> String {
        let mut chain = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            current = cause.source();
        }
        chain
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::FileError { path, stage, .. } => {
                format!("Could not complete {} of {}", stage, path.display())
            }
            EtlError::ParseError { path, .. } => {
                format!("{} does not contain a valid JSON object", path.display())
            }
            EtlError::StepError { path, step, .. } => {
                format!("Transformation '{}' rejected {}", step, path.display())
            }
            EtlError::ConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => format!("Invalid configuration: {}", self),
            EtlError::InputDirectoryError { path, .. } => {
                format!("Cannot read input folder {}", path.display())
            }
            EtlError::OutputDirectoryError { path, .. } => {
                format!("Cannot write to output folder {}", path.display())
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::FileError { stage: FileStage::Writing, .. } => {
                "Check free disk space and write permissions on the output folder"
            }
            EtlError::FileError { .. } => "Check that the file exists and is readable",
            EtlError::ParseError { .. } => "Fix the JSON syntax; the file must hold a single object",
            EtlError::StepError { .. } => "Inspect the record fields used by the failing step",
            EtlError::ConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => "Review the TOML configuration and CLI flags",
            EtlError::InputDirectoryError { .. } => "Verify the --input-dir path",
            EtlError::OutputDirectoryError { .. } => "Verify the --output-dir path and permissions",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_buckets_by_step_name() {
        let err = EtlError::StepError {
            path: PathBuf::from("drilling_machine_1.json"),
            step: "format_dates".to_string(),
            message: "boom".to_string(),
            source: None,
        };
        assert_eq!(err.metrics_bucket(), "format_dates");
        assert_eq!(err.stage(), Some(FileStage::Transforming));
        assert!(!err.is_fatal());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_file_errors_use_generic_bucket() {
        let err = EtlError::file(
            "missing.json",
            FileStage::Reading,
            "cannot read",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.metrics_bucket(), FILE_BUCKET);
        assert_eq!(err.stage(), Some(FileStage::Reading));
        assert!(err.cause_chain().ends_with("no such file"));
    }

    #[test]
    fn test_config_errors_are_fatal() {
        let err = EtlError::config("bad step");
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.stage(), None);
    }
}
