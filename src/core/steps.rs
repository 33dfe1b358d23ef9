//! The five record transformations applied to every drilling machine file.

use crate::core::executor::PipelineDefinition;
use crate::core::{Record, StepResult, TransformStep};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_date_format, validate_known_names, validate_non_empty_list, validate_non_empty_string,
    validate_positive_factor, validate_range, Validate,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use std::fmt::Write;

pub const LOWERCASE_KEYS: &str = "lowercase_keys";
pub const CONVERT_UNITS: &str = "convert_units";
pub const REMOVE_IRRELEVANT_FIELDS: &str = "remove_irrelevant_fields";
pub const FORMAT_DATES: &str = "format_dates";
pub const FILL_MISSING_CONTACT: &str = "fill_missing_contact";

/// 預設執行順序；單位轉換必須在白名單過濾之前，轉換後的欄位才會被保留
pub const DEFAULT_STEP_ORDER: [&str; 5] = [
    LOWERCASE_KEYS,
    CONVERT_UNITS,
    REMOVE_IRRELEVANT_FIELDS,
    FORMAT_DATES,
    FILL_MISSING_CONTACT,
];

pub const METERS_PER_MILE: f64 = 1609.344;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    pub from: String,
    pub to: String,
    pub factor: f64,
}

impl UnitConversion {
    pub fn new(from: &str, to: &str, factor: f64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            factor,
        }
    }
}

/// 轉換步驟使用的所有可注入設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    pub relevant_keys: Vec<String>,
    pub date_fields: Vec<String>,
    pub date_input_format: String,
    pub date_output_format: String,
    pub conversions: Vec<UnitConversion>,
    pub nested_sections: Vec<String>,
    pub decimal_places: Option<u32>,
    pub contact_field: String,
    pub contact_template: Vec<String>,
}

impl Default for TransformSettings {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            relevant_keys: strings(&[
                "machine_id",
                "name",
                "location",
                "status",
                "specifications",
                "last_maintenance_date",
                "next_maintenance_due",
                "start_date",
                "depth_meters",
                "contact_information",
            ]),
            date_fields: strings(&["last_maintenance_date", "next_maintenance_due", "start_date"]),
            date_input_format: "%Y-%m-%d".to_string(),
            date_output_format: "%d/%m/%Y".to_string(),
            conversions: vec![
                UnitConversion::new("depth_miles", "depth_meters", METERS_PER_MILE),
                UnitConversion::new("depth_capacity_miles", "depth_capacity_meters", METERS_PER_MILE),
                UnitConversion::new(
                    "drilling_speed_miles_per_day",
                    "drilling_speed_meters_per_day",
                    METERS_PER_MILE,
                ),
            ],
            nested_sections: strings(&["specifications"]),
            decimal_places: Some(2),
            contact_field: "contact_information".to_string(),
            contact_template: strings(&["operator_company", "contact_person", "phone", "email"]),
        }
    }
}

impl Validate for TransformSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_list("transform.relevant_keys", &self.relevant_keys)?;
        validate_date_format("transform.date_input_format", &self.date_input_format)?;
        validate_date_format("transform.date_output_format", &self.date_output_format)?;
        validate_non_empty_string("transform.contact_field", &self.contact_field)?;

        for conversion in &self.conversions {
            validate_non_empty_string("transform.conversions.from", &conversion.from)?;
            validate_non_empty_string("transform.conversions.to", &conversion.to)?;
            validate_positive_factor("transform.conversions.factor", conversion.factor)?;
        }

        if let Some(places) = self.decimal_places {
            validate_range("transform.decimal_places", places, 0, 10)?;
        }

        Ok(())
    }
}

/// 依名稱建立步驟
pub fn build_step(name: &str, settings: &TransformSettings) -> Result<Box<dyn TransformStep>> {
    let step: Box<dyn TransformStep> = match name {
        LOWERCASE_KEYS => Box::new(LowercaseKeys),
        CONVERT_UNITS => Box::new(ConvertUnits::new(
            settings.conversions.clone(),
            settings.nested_sections.clone(),
            settings.decimal_places,
        )),
        REMOVE_IRRELEVANT_FIELDS => Box::new(RemoveIrrelevantFields::new(
            settings.relevant_keys.iter().cloned(),
        )),
        FORMAT_DATES => Box::new(FormatDates::new(
            settings.date_fields.clone(),
            &settings.date_input_format,
            &settings.date_output_format,
        )),
        FILL_MISSING_CONTACT => Box::new(FillMissingContact::new(
            &settings.contact_field,
            &settings.contact_template,
        )),
        other => {
            return Err(EtlError::InvalidConfigValueError {
                field: "pipeline.steps".to_string(),
                value: other.to_string(),
                reason: format!("Unknown step. Available steps: {}", DEFAULT_STEP_ORDER.join(", ")),
            })
        }
    };
    Ok(step)
}

/// 依設定的順序組出管道
pub fn build_pipeline(order: &[String], settings: &TransformSettings) -> Result<PipelineDefinition> {
    validate_known_names("pipeline.steps", order, &DEFAULT_STEP_ORDER)?;
    settings.validate()?;

    let mut pipeline = PipelineDefinition::new();
    for name in order {
        pipeline.add_step(build_step(name, settings)?);
    }
    Ok(pipeline)
}

pub fn default_pipeline(settings: &TransformSettings) -> Result<PipelineDefinition> {
    let order: Vec<String> = DEFAULT_STEP_ORDER.iter().map(|s| s.to_string()).collect();
    build_pipeline(&order, settings)
}

fn lowercase_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut result = Map::with_capacity(map.len());
            for (key, inner) in map {
                result.insert(key.to_lowercase(), lowercase_value(inner));
            }
            Value::Object(result)
        }
        Value::Array(items) => Value::Array(items.iter().map(lowercase_value).collect()),
        other => other.clone(),
    }
}

/// 遞迴將所有鍵轉為小寫
pub struct LowercaseKeys;

impl TransformStep for LowercaseKeys {
    fn name(&self) -> &str {
        LOWERCASE_KEYS
    }

    fn apply(&self, record: &Record) -> StepResult {
        let mut result = Map::with_capacity(record.len());
        for (key, value) in &record.data {
            result.insert(key.to_lowercase(), lowercase_value(value));
        }
        Ok(Value::Object(result))
    }
}

pub struct RemoveIrrelevantFields {
    relevant: HashSet<String>,
}

impl RemoveIrrelevantFields {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            relevant: keys.into_iter().collect(),
        }
    }
}

impl TransformStep for RemoveIrrelevantFields {
    fn name(&self) -> &str {
        REMOVE_IRRELEVANT_FIELDS
    }

    fn apply(&self, record: &Record) -> StepResult {
        let mut result = Map::new();
        for (key, value) in &record.data {
            if self.relevant.contains(key) {
                result.insert(key.clone(), value.clone());
            } else {
                tracing::debug!("Dropping irrelevant field: {}", key);
            }
        }
        Ok(Value::Object(result))
    }
}

pub struct FormatDates {
    fields: Vec<String>,
    input_format: String,
    output_format: String,
}

impl FormatDates {
    pub fn new(fields: Vec<String>, input_format: &str, output_format: &str) -> Self {
        Self {
            fields,
            input_format: input_format.to_string(),
            output_format: output_format.to_string(),
        }
    }

    fn reformat(&self, value: &str) -> Option<String> {
        let date = NaiveDate::parse_from_str(value.trim(), &self.input_format).ok()?;
        let mut formatted = String::new();
        write!(formatted, "{}", date.format(&self.output_format)).ok()?;
        Some(formatted)
    }
}

impl TransformStep for FormatDates {
    fn name(&self) -> &str {
        FORMAT_DATES
    }

    fn apply(&self, record: &Record) -> StepResult {
        let mut result = record.data.clone();
        for field in &self.fields {
            let Some(Value::String(raw)) = result.get(field).cloned() else {
                continue;
            };
            match self.reformat(&raw) {
                Some(formatted) => {
                    tracing::debug!("Converted {}: {} -> {}", field, raw, formatted);
                    result.insert(field.clone(), Value::String(formatted));
                }
                None => tracing::debug!("No date conversion for {} (value={:?})", field, raw),
            }
        }
        Ok(Value::Object(result))
    }
}

/// 數字或可解析為數字的字串；其他型別回傳 None
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

pub struct ConvertUnits {
    conversions: Vec<UnitConversion>,
    nested_sections: Vec<String>,
    decimal_places: Option<u32>,
}

impl ConvertUnits {
    pub fn new(
        conversions: Vec<UnitConversion>,
        nested_sections: Vec<String>,
        decimal_places: Option<u32>,
    ) -> Self {
        Self {
            conversions,
            nested_sections,
            decimal_places,
        }
    }

    fn round(&self, value: f64) -> f64 {
        match self.decimal_places {
            Some(places) => {
                let scale = 10f64.powi(places as i32);
                (value * scale).round() / scale
            }
            None => value,
        }
    }

    fn convert_map(&self, map: &mut Map<String, Value>) {
        for conversion in &self.conversions {
            let Some(amount) = map.get(&conversion.from).and_then(numeric_value) else {
                continue;
            };
            let Some(converted) = Number::from_f64(self.round(amount * conversion.factor)) else {
                continue;
            };
            tracing::debug!(
                "Converted {} -> {}: {} -> {}",
                conversion.from,
                conversion.to,
                amount,
                converted
            );
            replace_key_in_place(map, &conversion.from, &conversion.to, Value::Number(converted));
        }
    }
}

/// 將 `from` 換成 `to`，保留原本的位置；舊的 `to` 欄位被取代
fn replace_key_in_place(map: &mut Map<String, Value>, from: &str, to: &str, value: Value) {
    let mut replacement = Some(value);
    let rebuilt: Map<String, Value> = std::mem::take(map)
        .into_iter()
        .filter_map(|(key, inner)| {
            if key == from {
                replacement.take().map(|v| (to.to_string(), v))
            } else if key == to {
                None
            } else {
                Some((key, inner))
            }
        })
        .collect();
    *map = rebuilt;
}

impl TransformStep for ConvertUnits {
    fn name(&self) -> &str {
        CONVERT_UNITS
    }

    fn apply(&self, record: &Record) -> StepResult {
        let mut result = record.data.clone();
        self.convert_map(&mut result);

        for section in &self.nested_sections {
            if let Some(Value::Object(nested)) = result.get_mut(section) {
                self.convert_map(nested);
            }
        }

        Ok(Value::Object(result))
    }
}

pub struct FillMissingContact {
    field: String,
    template: Map<String, Value>,
}

impl FillMissingContact {
    pub fn new(field: &str, template_keys: &[String]) -> Self {
        let template = template_keys
            .iter()
            .map(|key| (key.clone(), Value::Null))
            .collect();
        Self {
            field: field.to_string(),
            template,
        }
    }
}

impl TransformStep for FillMissingContact {
    fn name(&self) -> &str {
        FILL_MISSING_CONTACT
    }

    fn apply(&self, record: &Record) -> StepResult {
        let mut result = record.data.clone();
        if !matches!(result.get(&self.field), Some(Value::Object(_))) {
            tracing::debug!("Added missing {} template", self.field);
            result.insert(self.field.clone(), Value::Object(self.template.clone()));
        }
        Ok(Value::Object(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    fn apply(step: &dyn TransformStep, value: Value) -> Value {
        step.apply(&record(value)).unwrap()
    }

    #[test]
    fn test_lowercase_keys_is_recursive() {
        let output = apply(
            &LowercaseKeys,
            json!({"Machine_ID": "DM-7", "Specs": {"Depth": 3, "Parts": [{"Part_No": 1}]}}),
        );
        assert_eq!(
            output,
            json!({"machine_id": "DM-7", "specs": {"depth": 3, "parts": [{"part_no": 1}]}})
        );
    }

    #[test]
    fn test_lowercase_keys_is_idempotent() {
        let once = apply(&LowercaseKeys, json!({"A": {"B": 1}, "c": [{"D": 2}]}));
        let twice = apply(&LowercaseKeys, once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_remove_irrelevant_fields_keeps_whitelist_only() {
        let step = RemoveIrrelevantFields::new(["name".to_string(), "status".to_string()]);
        let output = apply(&step, json!({"name": "Rig", "status": {"x": 1}, "color": "red"}));
        assert_eq!(output, json!({"name": "Rig", "status": {"x": 1}}));
    }

    #[test]
    fn test_format_dates_converts_iso_dates() {
        let step = FormatDates::new(vec!["start_date".into(), "end_date".into()], "%Y-%m-%d", "%d/%m/%Y");
        let output = apply(&step, json!({"start_date": "2024-03-05", "end_date": "soon"}));
        assert_eq!(output, json!({"start_date": "05/03/2024", "end_date": "soon"}));
    }

    #[test]
    fn test_format_dates_ignores_non_strings_and_bad_dates() {
        let step = FormatDates::new(vec!["start_date".into()], "%Y-%m-%d", "%d/%m/%Y");
        assert_eq!(apply(&step, json!({"start_date": 20240305})), json!({"start_date": 20240305}));
        assert_eq!(
            apply(&step, json!({"start_date": "2024-02-30"})),
            json!({"start_date": "2024-02-30"})
        );
    }

    #[test]
    fn test_convert_units_top_level_and_nested() {
        let settings = TransformSettings::default();
        let step = ConvertUnits::new(settings.conversions, settings.nested_sections, Some(2));
        let output = apply(
            &step,
            json!({
                "depth_miles": "1.5",
                "specifications": {"depth_capacity_miles": 2, "drilling_speed_miles_per_day": "n/a"}
            }),
        );
        assert_eq!(output["depth_meters"], json!(2414.02));
        assert!(output.get("depth_miles").is_none());
        assert_eq!(output["specifications"]["depth_capacity_meters"], json!(3218.69));
        assert_eq!(output["specifications"]["drilling_speed_miles_per_day"], json!("n/a"));
    }

    #[test]
    fn test_convert_units_keeps_key_order() {
        let settings = TransformSettings::default();
        let step = ConvertUnits::new(settings.conversions, settings.nested_sections, Some(2));
        let output = apply(
            &step,
            json!({"machine_id": "DM-1", "depth_miles": 1, "name": "Rig", "status": "ok", "location": "North"}),
        );
        let keys: Vec<&String> = output.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["machine_id", "depth_meters", "name", "status", "location"]);
        assert_eq!(output["depth_meters"], json!(1609.34));
    }

    #[test]
    fn test_convert_units_replaces_existing_target() {
        let step = ConvertUnits::new(vec![UnitConversion::new("a_miles", "a_meters", 2.0)], vec![], None);
        let output = apply(&step, json!({"a_meters": 1.0, "a_miles": 3.0, "b": 0}));
        let keys: Vec<&String> = output.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a_meters", "b"]);
        assert_eq!(output["a_meters"], json!(6.0));
    }

    #[test]
    fn test_lowercase_keys_collision_keeps_first_position_last_value() {
        let output = apply(&LowercaseKeys, json!({"Name": 1, "x": 0, "NAME": 2}));
        let keys: Vec<&String> = output.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "x"]);
        assert_eq!(output, json!({"name": 2, "x": 0}));
    }

    #[test]
    fn test_unrenderable_date_format_is_rejected() {
        let settings = TransformSettings {
            date_output_format: "%Q".to_string(),
            ..TransformSettings::default()
        };
        let err = default_pipeline(&settings).err().expect("invalid format must be rejected");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("date_output_format"));
    }

    #[test]
    fn test_format_dates_keeps_value_when_format_cannot_render() {
        let step = FormatDates::new(vec!["start_date".into()], "%Y-%m-%d", "%d %z");
        assert_eq!(
            apply(&step, json!({"start_date": "2024-03-05"})),
            json!({"start_date": "2024-03-05"})
        );
    }

    #[test]
    fn test_convert_units_without_rounding() {
        let step = ConvertUnits::new(vec![UnitConversion::new("len_miles", "len_meters", 1609.0)], vec![], None);
        let output = apply(&step, json!({"len_miles": 0.5}));
        assert_eq!(output, json!({"len_meters": 804.5}));
    }

    #[test]
    fn test_fill_missing_contact() {
        let step = FillMissingContact::new("contact_information", &["phone".to_string(), "email".to_string()]);
        assert_eq!(
            apply(&step, json!({"contact_information": null})),
            json!({"contact_information": {"phone": null, "email": null}})
        );
        assert_eq!(
            apply(&step, json!({})),
            json!({"contact_information": {"phone": null, "email": null}})
        );
        let existing = json!({"contact_information": {"phone": "555"}});
        assert_eq!(apply(&step, existing.clone()), existing);
    }

    #[test]
    fn test_build_pipeline_rejects_unknown_step() {
        let order = vec!["lowercase_keys".to_string(), "shout".to_string()];
        assert!(build_pipeline(&order, &TransformSettings::default()).is_err());
    }

    #[test]
    fn test_default_pipeline_order() {
        let pipeline = default_pipeline(&TransformSettings::default()).unwrap();
        assert_eq!(pipeline.step_names(), DEFAULT_STEP_ORDER.to_vec());
    }
}
