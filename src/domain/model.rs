use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 一筆鑽機資料，對應一個輸入 JSON 檔的頂層物件
///
/// 欄位順序與原始檔案一致。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// 只接受 JSON 物件，其餘型別原樣退回
    pub fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Object(data) => Ok(Self { data }),
            other => Err(other),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

/// JSON 值的型別名稱，用於錯誤訊息
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
