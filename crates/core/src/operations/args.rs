//! Raw JSON arguments to typed values.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::{ActivityType, Contact, ContactFieldType, Gender, RelationshipType};
use crate::errors::DispatchError;
use crate::operations::{DefaultValue, ScalarType};

#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Text(String),
    Int(i64),
    Number(Decimal),
    Bool(bool),
    Date(NaiveDate),
    Choice(String),
    TextList(Vec<String>),
    Contact(Contact),
    Contacts(Vec<Contact>),
    Gender(Gender),
    RelationshipType(RelationshipType),
    Medium(ContactFieldType),
    ActivityType(ActivityType),
}

/// Resolved and validated arguments for one invocation, keyed by parameter
/// name. Absent optional parameters without a default are simply missing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundArgs {
    values: BTreeMap<&'static str, ArgValue>,
}

impl BoundArgs {
    pub fn insert(&mut self, name: &'static str, value: ArgValue) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn take(&mut self, name: &'static str) -> Option<ArgValue> {
        self.values.remove(name)
    }
}

/// Reads a raw argument, treating JSON `null` as absent.
pub fn raw_arg<'a>(args: &'a serde_json::Map<String, Value>, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|value| !value.is_null())
}

pub fn default_value(default: DefaultValue) -> Value {
    match default {
        DefaultValue::Text(text) => Value::String(text.to_string()),
        DefaultValue::Int(value) => Value::from(value),
        DefaultValue::Bool(value) => Value::Bool(value),
        DefaultValue::Today => Value::String(Utc::now().date_naive().to_string()),
    }
}

/// Name (or names) handed to the resolver for an entity-reference parameter.
pub fn reference_text(field: &str, raw: &Value) -> Result<String, DispatchError> {
    match raw {
        Value::String(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        Value::String(_) => Err(DispatchError::validation(field, "must not be empty")),
        _ => Err(DispatchError::validation(field, "expected a name")),
    }
}

pub fn reference_list(field: &str, raw: &Value) -> Result<Vec<String>, DispatchError> {
    let names = text_list(field, raw)?;
    if names.is_empty() {
        return Err(DispatchError::validation(field, "must name at least one entry"));
    }
    Ok(names)
}

pub fn coerce_scalar(
    field: &str,
    scalar: ScalarType,
    raw: &Value,
) -> Result<ArgValue, DispatchError> {
    match scalar {
        ScalarType::String => coerce_text(field, raw).map(ArgValue::Text),
        ScalarType::Int => coerce_int(field, raw).map(ArgValue::Int),
        ScalarType::Float => coerce_number(field, raw).map(ArgValue::Number),
        ScalarType::Bool => coerce_bool(field, raw).map(ArgValue::Bool),
        ScalarType::Date => coerce_date(field, raw).map(ArgValue::Date),
        ScalarType::Enum(choices) => coerce_choice(field, choices, raw).map(ArgValue::Choice),
        ScalarType::StringList => {
            let values = text_list(field, raw)?;
            if values.is_empty() {
                return Err(DispatchError::validation(field, "must contain at least one value"));
            }
            Ok(ArgValue::TextList(values))
        }
    }
}

fn coerce_text(field: &str, raw: &Value) -> Result<String, DispatchError> {
    let text = match raw {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return Err(DispatchError::validation(field, "expected a string")),
    };
    if text.is_empty() {
        return Err(DispatchError::validation(field, "must not be empty"));
    }
    Ok(text)
}

fn coerce_int(field: &str, raw: &Value) -> Result<i64, DispatchError> {
    let parsed = match raw {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| DispatchError::validation(field, "expected an integer"))
}

fn coerce_number(field: &str, raw: &Value) -> Result<Decimal, DispatchError> {
    let text = match raw {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().trim_start_matches(['$', '€', '£']).replace(',', ""),
        _ => return Err(DispatchError::validation(field, "expected a number")),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| DispatchError::validation(field, "expected a number"))
}

fn coerce_bool(field: &str, raw: &Value) -> Result<bool, DispatchError> {
    match raw {
        Value::Bool(flag) => Ok(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            _ => Err(DispatchError::validation(field, "expected true or false")),
        },
        _ => Err(DispatchError::validation(field, "expected true or false")),
    }
}

fn coerce_date(field: &str, raw: &Value) -> Result<NaiveDate, DispatchError> {
    raw.as_str()
        .and_then(|text| NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok())
        .ok_or_else(|| DispatchError::validation(field, "expected an ISO date (YYYY-MM-DD)"))
}

fn coerce_choice(
    field: &str,
    choices: &'static [&'static str],
    raw: &Value,
) -> Result<String, DispatchError> {
    let candidate = raw.as_str().map(|text| text.trim().to_ascii_lowercase());
    match candidate {
        Some(choice) if choices.contains(&choice.as_str()) => Ok(choice),
        _ => Err(DispatchError::validation(
            field,
            format!("expected one of: {}", choices.join(", ")),
        )),
    }
}

/// Accepts a JSON array of strings or a single comma-separated string.
fn text_list(field: &str, raw: &Value) -> Result<Vec<String>, DispatchError> {
    let items: Vec<String> = match raw {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.trim().to_string()),
                _ => Err(DispatchError::validation(field, "expected a list of strings")),
            })
            .collect::<Result<_, _>>()?,
        Value::String(text) => text.split(',').map(|part| part.trim().to_string()).collect(),
        _ => return Err(DispatchError::validation(field, "expected a list of strings")),
    };
    Ok(items.into_iter().filter(|item| !item.is_empty()).collect())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::errors::DispatchError;
    use crate::operations::args::{coerce_scalar, reference_list, reference_text, ArgValue};
    use crate::operations::ScalarType;

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(
            coerce_scalar("date", ScalarType::Date, &json!("2024-02-29")),
            Ok(ArgValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date")))
        );
        assert_eq!(
            coerce_scalar("date", ScalarType::Date, &json!("29/02/2024")),
            Err(DispatchError::validation("date", "expected an ISO date (YYYY-MM-DD)"))
        );
        assert!(coerce_scalar("date", ScalarType::Date, &json!("2023-02-29")).is_err());
    }

    #[test]
    fn numbers_parse_exactly_from_json_or_text() {
        assert_eq!(
            coerce_scalar("amount", ScalarType::Float, &json!(49.99)),
            Ok(ArgValue::Number(Decimal::new(4999, 2)))
        );
        assert_eq!(
            coerce_scalar("amount", ScalarType::Float, &json!("$1,250")),
            Ok(ArgValue::Number(Decimal::new(1250, 0)))
        );
        assert!(coerce_scalar("amount", ScalarType::Float, &json!("lots")).is_err());
    }

    #[test]
    fn integers_reject_fractions() {
        assert_eq!(coerce_scalar("task_id", ScalarType::Int, &json!("42")), Ok(ArgValue::Int(42)));
        assert!(coerce_scalar("task_id", ScalarType::Int, &json!(4.5)).is_err());
    }

    #[test]
    fn enum_choices_are_case_insensitive_and_listed_on_error() {
        let choices: &'static [&'static str] = &["idea", "offered", "received"];
        assert_eq!(
            coerce_scalar("status", ScalarType::Enum(choices), &json!("Offered")),
            Ok(ArgValue::Choice("offered".to_string()))
        );
        assert_eq!(
            coerce_scalar("status", ScalarType::Enum(choices), &json!("stolen"))
                .map_err(|error| error.to_string()),
            Err("Invalid argument 'status': expected one of: idea, offered, received".to_string())
        );
    }

    #[test]
    fn lists_accept_arrays_or_comma_separated_text() {
        assert_eq!(
            coerce_scalar("tags", ScalarType::StringList, &json!(["work", " gym "])),
            Ok(ArgValue::TextList(vec!["work".to_string(), "gym".to_string()]))
        );
        assert_eq!(
            reference_list("people_names", &json!("Ann, Bob")),
            Ok(vec!["Ann".to_string(), "Bob".to_string()])
        );
        assert!(coerce_scalar("tags", ScalarType::StringList, &json!([])).is_err());
    }

    #[test]
    fn blank_references_are_rejected() {
        assert_eq!(
            reference_text("person_name", &json!("   ")),
            Err(DispatchError::validation("person_name", "must not be empty"))
        );
        assert!(reference_text("person_name", &json!(7)).is_err());
    }
}
