//! Request validation helpers
//!
//! Field-level rules live on the request types as `validator` derives. The
//! functions here cover the rules that span several fields and turn
//! `ValidationErrors` into the single message reported to callers.

use std::borrow::Cow;

use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::{CoreError, Result};

/// Run the derived validation for a request and flatten the failure.
pub fn validate_request<T: Validate>(request: &T) -> Result<()> {
    request
        .validate()
        .map_err(|errors| CoreError::Validation(first_error_message(&errors)))
}

/// Build a human-readable message for the first failing field.
///
/// Fields are visited in name order so the message is stable across runs.
pub fn first_error_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(error) = list.first() {
                    return describe(field, error);
                }
            }
            ValidationErrorsKind::Struct(nested) => return first_error_message(nested),
            ValidationErrorsKind::List(items) => {
                if let Some(nested) = items.values().next() {
                    return first_error_message(nested);
                }
            }
        }
    }

    "validation failed".to_string()
}

fn describe(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let param = |name: &str| {
        error
            .params
            .get(name)
            .map(|v| v.to_string().trim_matches('"').to_string())
    };

    match &*error.code {
        "length" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("{field} must be between {min} and {max} characters"),
            (Some(min), None) => format!("{field} must be at least {min} characters"),
            (None, Some(max)) => format!("{field} must be at most {max} characters"),
            _ => format!("{field} has an invalid length"),
        },
        "range" => {
            if let Some(min) = param("exclusive_min") {
                format!("{field} must be greater than {min}")
            } else if let Some(min) = param("min") {
                format!("{field} must be greater than or equal to {min}")
            } else {
                format!("{field} is out of range")
            }
        }
        "email" => format!("{field} must be a valid email address"),
        "required" => format!("{field} is required"),
        _ => format!("{field} validation failed"),
    }
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Budget rule for clients.
///
/// Each bound must be positive when present, and the minimum may not exceed
/// the maximum when both are present.
pub fn check_budget(
    budget_min: Option<f64>,
    budget_max: Option<f64>,
) -> std::result::Result<(), ValidationError> {
    if budget_min.is_some_and(|min| min <= 0.0) {
        return Err(rule_error(
            "budget_min",
            "budget_min must be greater than 0",
        ));
    }
    if budget_max.is_some_and(|max| max <= 0.0) {
        return Err(rule_error(
            "budget_max",
            "budget_max must be greater than 0",
        ));
    }
    if let (Some(min), Some(max)) = (budget_min, budget_max) {
        if min > max {
            return Err(rule_error(
                "budget_range",
                "budget_min must be less than or equal to budget_max",
            ));
        }
    }
    Ok(())
}

/// Room rule for properties: apartments and houses must state their rooms.
pub fn check_rooms(
    requires_rooms: bool,
    bedrooms: Option<i32>,
    bathrooms: Option<i32>,
) -> std::result::Result<(), ValidationError> {
    if bedrooms.is_some_and(|n| n < 0) {
        return Err(rule_error(
            "bedrooms",
            "bedrooms must be greater than or equal to 0",
        ));
    }
    if bathrooms.is_some_and(|n| n < 0) {
        return Err(rule_error(
            "bathrooms",
            "bathrooms must be greater than or equal to 0",
        ));
    }
    if requires_rooms && bedrooms.is_none() {
        return Err(rule_error(
            "bedrooms",
            "bedrooms is required for apartments and houses",
        ));
    }
    if requires_rooms && bathrooms.is_none() {
        return Err(rule_error(
            "bathrooms",
            "bathrooms is required for apartments and houses",
        ));
    }
    Ok(())
}

/// Convert a cross-field rule failure into a core error.
pub fn rule_to_core(error: ValidationError) -> CoreError {
    CoreError::Validation(
        error
            .message
            .map(|m| m.to_string())
            .unwrap_or_else(|| error.code.to_string()),
    )
}

/// `HH:MM` wire format for appointment times.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn parse(value: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(value, FORMAT)
            .ok()
            .or_else(|| NaiveTime::parse_from_str(value, "%H:%M:%S").ok())
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("time must be in HH:MM format, got '{value}'"))
        })
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(value) => parse(&value).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "time must be in HH:MM format, got '{value}'"
                    ))
                }),
                None => Ok(None),
            }
        }
    }
}
