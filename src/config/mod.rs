#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::steps::TransformSettings;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use std::path::{Path, PathBuf};
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

pub const DEFAULT_INPUT_DIR: &str = "./raw";
pub const DEFAULT_OUTPUT_DIR: &str = "./processed";
pub const DEFAULT_PATTERN: &str = "drilling_machine*.json";

/// 合併命令列與 TOML 之後的最終設定
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub pattern: String,
    pub steps: Vec<String>,
    pub transform: TransformSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::resolve(None, None, None, TomlConfig::default())
    }
}

impl RunConfig {
    /// 命令列優先，其次 TOML 的 [io]，最後是預設值
    pub fn resolve(
        input_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        pattern: Option<String>,
        file: TomlConfig,
    ) -> Self {
        let TomlConfig {
            pipeline,
            transform,
            io,
        } = file;

        Self {
            input_dir: input_dir
                .or_else(|| io.input_dir.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
            output_dir: output_dir
                .or_else(|| io.output_dir.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            pattern: pattern
                .or(io.pattern)
                .unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
            steps: pipeline.steps,
            transform,
        }
    }

    #[cfg(feature = "cli")]
    pub fn from_cli(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        Ok(Self::resolve(
            cli.input_dir.clone(),
            cli.output_dir.clone(),
            cli.pattern.clone(),
            file,
        ))
    }
}

impl ConfigProvider for RunConfig {
    fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn file_pattern(&self) -> &str {
        &self.pattern
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input_dir", &self.input_dir.to_string_lossy())?;
        validate_path("output_dir", &self.output_dir.to_string_lossy())?;
        validate_non_empty_string("pattern", &self.pattern)?;
        crate::utils::validation::validate_known_names(
            "pipeline.steps",
            &self.steps,
            &crate::core::steps::DEFAULT_STEP_ORDER,
        )?;
        self.transform.validate()
    }
}
