use crate::utils::error::{EtlError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt::Write;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_list(field_name: &str, values: &[String]) -> Result<()> {
    if values.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: "[]".to_string(),
            reason: "List cannot be empty".to_string(),
        });
    }
    for value in values {
        validate_non_empty_string(field_name, value)?;
    }
    Ok(())
}

pub fn validate_positive_factor(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Factor must be a finite number greater than zero".to_string(),
        });
    }
    Ok(())
}

/// 每個名稱都必須屬於 allowed，且不可重複
pub fn validate_known_names(field_name: &str, names: &[String], allowed: &[&str]) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed.iter().copied().collect();
    let mut seen = HashSet::new();

    for name in names {
        if !allowed_set.contains(name.as_str()) {
            return Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: name.clone(),
                reason: format!("Unknown name. Allowed values: {}", allowed.join(", ")),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: name.clone(),
                reason: "Duplicate entry".to_string(),
            });
        }
    }

    Ok(())
}

/// strftime 格式必須可解析，且能套用在純日期上
pub fn validate_date_format(field_name: &str, format: &str) -> Result<()> {
    validate_non_empty_string(field_name, format)?;

    let invalid = |reason: &str| EtlError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: format.to_string(),
        reason: reason.to_string(),
    };

    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(invalid("Unknown strftime specifier"));
    }

    // 例如 %z、%H 需要時間或時區，純日期無法輸出
    let sample = NaiveDate::from_ymd_opt(2024, 1, 31).ok_or_else(|| invalid("Invalid sample date"))?;
    let mut rendered = String::new();
    if write!(rendered, "{}", sample.format(format)).is_err() {
        return Err(invalid("Format needs fields a calendar date does not have"));
    }

    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("output_dir", "./processed").is_ok());
        assert!(validate_path("output_dir", "").is_err());
        assert!(validate_path("output_dir", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_factor() {
        assert!(validate_positive_factor("factor", 1609.344).is_ok());
        assert!(validate_positive_factor("factor", 0.0).is_err());
        assert!(validate_positive_factor("factor", f64::NAN).is_err());
        assert!(validate_positive_factor("factor", f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_known_names() {
        let allowed = ["lowercase_keys", "format_dates"];
        let ok = vec!["format_dates".to_string(), "lowercase_keys".to_string()];
        assert!(validate_known_names("pipeline.steps", &ok, &allowed).is_ok());

        let unknown = vec!["uppercase_keys".to_string()];
        assert!(validate_known_names("pipeline.steps", &unknown, &allowed).is_err());

        let duplicated = vec!["format_dates".to_string(), "format_dates".to_string()];
        assert!(validate_known_names("pipeline.steps", &duplicated, &allowed).is_err());
    }

    #[test]
    fn test_validate_date_format() {
        assert!(validate_date_format("date_output_format", "%d/%m/%Y").is_ok());
        assert!(validate_date_format("date_output_format", "%Y-%m-%d").is_ok());
        assert!(validate_date_format("date_output_format", "%Q").is_err());
        assert!(validate_date_format("date_output_format", "%d %z").is_err());
        assert!(validate_date_format("date_output_format", "").is_err());
    }

    #[test]
    fn test_validate_non_empty_list() {
        assert!(validate_non_empty_list("relevant_keys", &["name".to_string()]).is_ok());
        assert!(validate_non_empty_list("relevant_keys", &[]).is_err());
        assert!(validate_non_empty_list("relevant_keys", &["  ".to_string()]).is_err());
    }
}
