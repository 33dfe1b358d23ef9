use crate::core::{Record, StepResult, TransformStep};
use crate::domain::model::value_kind;
use crate::utils::error::BoxError;
use thiserror::Error;

/// 管道中某一步驟失敗；攜帶步驟名稱與原始錯誤
#[derive(Error, Debug)]
#[error("step '{step}' {message}")]
pub struct StepFailure {
    pub step: String,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

/// 以閉包實作的具名步驟
pub struct FnStep<F> {
    name: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&Record) -> StepResult,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> TransformStep for FnStep<F>
where
    F: Fn(&Record) -> StepResult,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, record: &Record) -> StepResult {
        (self.func)(record)
    }
}

/// 有序的轉換步驟清單，建立後順序固定
#[derive(Default)]
pub struct PipelineDefinition {
    steps: Vec<Box<dyn TransformStep>>,
}

impl PipelineDefinition {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn with_step(mut self, step: impl TransformStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn add_step(&mut self, step: Box<dyn TransformStep>) {
        self.steps.push(step);
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 依序套用所有步驟
    pub fn run(&self, record: &Record) -> Result<Record, StepFailure> {
        run(record, &self.steps)
    }
}

/// 依宣告順序套用步驟，第一個失敗即停止
///
/// 輸入記錄以共享參考傳入，呼叫端的資料永遠不會被修改。
/// 步驟回傳錯誤、或回傳的值不是 JSON 物件，都會以該步驟名稱回報，
/// 後續步驟不會執行。
pub fn run(record: &Record, steps: &[Box<dyn TransformStep>]) -> Result<Record, StepFailure> {
    let mut current = record.clone();

    for step in steps {
        let name = step.name();
        tracing::debug!("🔄 Applying step '{}' ({} fields)", name, current.len());

        let output = step.apply(&current).map_err(|source| StepFailure {
            step: name.to_string(),
            message: "raised an error".to_string(),
            source: Some(source),
        })?;

        current = Record::from_value(output).map_err(|other| StepFailure {
            step: name.to_string(),
            message: format!("returned {} instead of an object", value_kind(&other)),
            source: None,
        })?;

        tracing::debug!("✅ Step '{}' done ({} fields)", name, current.len());
    }

    Ok(current)
}
