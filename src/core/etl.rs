use crate::config::RunConfig;
use crate::core::batch::{discover_input_files, BatchReport, BatchRunner};
use crate::core::executor::PipelineDefinition;
use crate::core::steps::build_pipeline;
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::path::PathBuf;

/// 函式庫入口：組好管道後對整個輸入目錄執行一次
pub struct EtlEngine<S: Storage> {
    storage: S,
    pipeline: PipelineDefinition,
    config: RunConfig,
}

impl<S: Storage> EtlEngine<S> {
    pub fn new(storage: S, config: RunConfig) -> Result<Self> {
        config.validate()?;
        let pipeline = build_pipeline(&config.steps, &config.transform)?;
        Ok(Self {
            storage,
            pipeline,
            config,
        })
    }

    pub fn pipeline(&self) -> &PipelineDefinition {
        &self.pipeline
    }

    pub fn run(&self) -> Result<BatchReport> {
        tracing::info!(
            "🚀 Starting run: {} -> {} (pattern '{}')",
            self.config.input_dir().display(),
            self.config.output_dir().display(),
            self.config.file_pattern()
        );
        tracing::debug!("Pipeline order: {:?}", self.pipeline.step_names());

        let runner = BatchRunner::new(&self.storage, &self.pipeline, self.config.output_dir());
        runner.run_directory(self.config.input_dir(), self.config.file_pattern())
    }

    /// 只列出會被處理的檔案
    pub fn dry_run(&self) -> Result<Vec<PathBuf>> {
        discover_input_files(self.config.input_dir(), self.config.file_pattern())
    }
}
