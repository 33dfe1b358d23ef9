pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::storage::LocalStorage;
pub use crate::config::RunConfig;
pub use crate::core::batch::{BatchReport, BatchRunner, RunMetrics};
pub use crate::core::executor::{run, FnStep, PipelineDefinition, StepFailure};
pub use crate::core::processor::FileProcessor;
pub use crate::core::{etl::EtlEngine, Record, TransformStep};
pub use crate::utils::error::{EtlError, Result};
