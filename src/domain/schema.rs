// src/domain/schema.rs

use crate::domain::lead::{Bhk, City, LeadDraft, PropertyType, Purpose, Source, Status, Timeline};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One problem with one field of a candidate lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Joins errors as `field: message, field: message` for one-line reports.
    pub fn summarize(errors: &[FieldError]) -> String {
        errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Character count within `min..=max`.
    Text { min: usize, max: usize },
    Email,
    OneOf(&'static [&'static str]),
    PositiveInt,
    StringList,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub rule: Rule,
    /// Value written when an optional field is absent.
    pub default: Option<fn() -> Value>,
}

impl FieldSpec {
    const fn required(name: &'static str, rule: Rule) -> Self {
        Self {
            name,
            required: true,
            rule,
            default: None,
        }
    }

    const fn optional(name: &'static str, rule: Rule) -> Self {
        Self {
            name,
            required: false,
            rule,
            default: None,
        }
    }

    const fn defaulted(name: &'static str, rule: Rule, default: fn() -> Value) -> Self {
        Self {
            name,
            required: false,
            rule,
            default: Some(default),
        }
    }
}

fn default_status() -> Value {
    Value::String(Status::New.as_str().to_string())
}

fn default_tags() -> Value {
    Value::Array(Vec::new())
}

/// Every attribute of a buyer lead, in evaluation order.
pub const LEAD_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required("fullName", Rule::Text { min: 2, max: 80 }),
    FieldSpec::optional("email", Rule::Email),
    FieldSpec::required("phone", Rule::Text { min: 10, max: 15 }),
    FieldSpec::required("city", Rule::OneOf(City::NAMES)),
    FieldSpec::required("propertyType", Rule::OneOf(PropertyType::NAMES)),
    FieldSpec::optional("bhk", Rule::OneOf(Bhk::NAMES)),
    FieldSpec::required("purpose", Rule::OneOf(Purpose::NAMES)),
    FieldSpec::optional("budgetMin", Rule::PositiveInt),
    FieldSpec::optional("budgetMax", Rule::PositiveInt),
    FieldSpec::required("timeline", Rule::OneOf(Timeline::NAMES)),
    FieldSpec::required("source", Rule::OneOf(Source::NAMES)),
    FieldSpec::defaulted("status", Rule::OneOf(Status::NAMES), default_status),
    FieldSpec::optional("notes", Rule::Text { min: 0, max: 1000 }),
    FieldSpec::defaulted("tags", Rule::StringList, default_tags),
    FieldSpec::required("ownerId", Rule::Text { min: 1, max: 128 }),
];

pub const BHK_MESSAGE: &str = "BHK is only valid for Apartment or Villa property types";
pub const BUDGET_MESSAGE: &str = "Maximum budget must be greater than or equal to minimum budget";

/// Returns true when `name` is a lead attribute known to the schema.
pub fn is_lead_field(name: &str) -> bool {
    LEAD_SCHEMA.iter().any(|spec| spec.name == name)
}

/// Validates a candidate lead and returns it normalized, or every problem found.
///
/// Text is stored trimmed and blank tags are dropped, the same shape a CSV
/// import produces.
///
/// Field rules run first in schema order, then the BHK rule, then the budget
/// rule. Nothing short-circuits: the error list covers the whole record.
pub fn validate(candidate: &Map<String, Value>) -> Result<LeadDraft, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut normalized = Map::new();

    for spec in LEAD_SCHEMA {
        match present_value(candidate.get(spec.name)) {
            None if spec.required => errors.push(FieldError::new(spec.name, "is required")),
            None => {
                let fallback = spec.default.map_or(Value::Null, |make| make());
                normalized.insert(spec.name.to_string(), fallback);
            }
            Some(raw) => match check_rule(spec.rule, raw) {
                Ok(value) => {
                    normalized.insert(spec.name.to_string(), value);
                }
                Err(message) => errors.push(FieldError::new(spec.name, message)),
            },
        }
    }

    check_bhk(&normalized, &mut errors);
    check_budget(&normalized, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value(Value::Object(normalized))
        .map_err(|e| vec![FieldError::new("record", e.to_string())])
}

/// `null`, a missing key, and a blank string all mean "not provided".
fn present_value(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

fn check_rule(rule: Rule, raw: &Value) -> Result<Value, String> {
    match rule {
        Rule::Text { min, max } => {
            let text = raw.as_str().ok_or("must be a string")?.trim();
            let len = text.chars().count();
            if len < min || len > max {
                return Err(if min == 0 {
                    format!("must be at most {max} characters")
                } else {
                    format!("must be between {min} and {max} characters")
                });
            }
            Ok(Value::String(text.to_string()))
        }
        Rule::Email => {
            let text = raw.as_str().ok_or("must be a string")?.trim();
            if !looks_like_email(text) {
                return Err("must be a valid email address".to_string());
            }
            Ok(Value::String(text.to_string()))
        }
        Rule::OneOf(allowed) => {
            let text = raw.as_str().ok_or("must be a string")?;
            if !allowed.contains(&text) {
                return Err(format!("must be one of: {}", allowed.join(", ")));
            }
            Ok(Value::String(text.to_string()))
        }
        Rule::PositiveInt => match positive_int(raw) {
            Some(n) => Ok(Value::Number(Number::from(n))),
            None => Err("must be a positive integer".to_string()),
        },
        Rule::StringList => {
            let items = raw.as_array().ok_or("must be a list of strings")?;
            let mut tags = Vec::with_capacity(items.len());
            for item in items {
                let tag = item.as_str().ok_or("must be a list of strings")?.trim();
                if !tag.is_empty() {
                    tags.push(Value::String(tag.to_string()));
                }
            }
            Ok(Value::Array(tags))
        }
    }
}

fn positive_int(raw: &Value) -> Option<i64> {
    let number = raw.as_number()?;
    if let Some(n) = number.as_i64() {
        return (n > 0).then_some(n);
    }
    // JSON clients may send 5000000.0 for an integral budget.
    let f = number.as_f64()?;
    (f > 0.0 && f.fract() == 0.0 && f <= i64::MAX as f64).then_some(f as i64)
}

/// Structural check only: one `@`, a non-empty local part, a dotted domain.
fn looks_like_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

fn check_bhk(normalized: &Map<String, Value>, errors: &mut Vec<FieldError>) {
    let Some(Value::String(_)) = normalized.get("bhk") else {
        return;
    };
    let Some(property_type) = normalized
        .get("propertyType")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<PropertyType>().ok())
    else {
        return;
    };
    if !property_type.allows_bhk() {
        errors.push(FieldError::new("bhk", BHK_MESSAGE));
    }
}

fn check_budget(normalized: &Map<String, Value>, errors: &mut Vec<FieldError>) {
    let min = normalized.get("budgetMin").and_then(Value::as_i64);
    let max = normalized.get("budgetMax").and_then(Value::as_i64);
    if let (Some(min), Some(max)) = (min, max) {
        if max < min {
            errors.push(FieldError::new("budgetMax", BUDGET_MESSAGE));
        }
    }
}
