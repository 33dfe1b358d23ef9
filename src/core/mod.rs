pub mod batch;
pub mod etl;
pub mod executor;
pub mod processor;
pub mod steps;

pub use crate::domain::model::Record;
pub use crate::domain::ports::{ConfigProvider, StepResult, Storage, TransformStep};
pub use crate::utils::error::Result;
