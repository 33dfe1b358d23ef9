use crate::core::steps::{TransformSettings, DEFAULT_STEP_ORDER};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_known_names, validate_non_empty_string, validate_path, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub pipeline: PipelineSection,
    pub transform: TransformSettings,
    pub io: IoSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub steps: Vec<String>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEP_ORDER.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// 命令列未指定時使用的路徑設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoSection {
    pub input_dir: Option<String>,
    pub output_dir: Option<String>,
    pub pattern: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            EtlError::config(format!(
                "cannot read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| EtlError::config(format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${RAW_DIR})；未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| EtlError::config(format!("invalid placeholder pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_known_names("pipeline.steps", &self.pipeline.steps, &DEFAULT_STEP_ORDER)?;
        self.transform.validate()?;

        if let Some(dir) = &self.io.input_dir {
            validate_path("io.input_dir", dir)?;
        }
        if let Some(dir) = &self.io.output_dir {
            validate_path("io.output_dir", dir)?;
        }
        if let Some(pattern) = &self.io.pattern {
            validate_non_empty_string("io.pattern", pattern)?;
        }
        Ok(())
    }
}
