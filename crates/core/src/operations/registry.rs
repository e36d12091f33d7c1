use std::collections::HashMap;
use std::fmt::Write as _;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::operations::catalog::standard_catalog;
use crate::operations::{DefaultValue, OperationSpec, ParamKind, ScalarType};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operation `{0}` is declared more than once")]
    DuplicateOperation(&'static str),
}

/// Immutable operation catalog, built once at startup.
#[derive(Clone, Debug)]
pub struct OperationRegistry {
    specs: Vec<OperationSpec>,
    by_name: HashMap<&'static str, usize>,
}

impl OperationRegistry {
    pub fn new(specs: Vec<OperationSpec>) -> Result<Self, RegistryError> {
        let mut by_name = HashMap::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            if by_name.insert(spec.name, index).is_some() {
                return Err(RegistryError::DuplicateOperation(spec.name));
            }
        }
        Ok(Self { specs, by_name })
    }

    pub fn standard() -> Result<Self, RegistryError> {
        Self::new(standard_catalog())
    }

    pub fn lookup(&self, name: &str) -> Option<&OperationSpec> {
        self.by_name.get(name).map(|index| &self.specs[*index])
    }

    pub fn specs(&self) -> &[OperationSpec] {
        &self.specs
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.specs.iter().map(|spec| spec.name).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Plain-text schema, one block per operation.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for spec in &self.specs {
            let _ = writeln!(out, "{} ({:?}): {}", spec.name, spec.category, spec.description);
            for param in &spec.params {
                let presence = if param.required { "required" } else { "optional" };
                let default = match param.default {
                    Some(default) => format!(", default {}", render_default(default)),
                    None => String::new(),
                };
                let _ = writeln!(
                    out,
                    "  - {}: {} ({presence}{default}) {}",
                    param.name,
                    param.kind.label(),
                    param.description
                );
            }
        }
        out
    }

    /// Tool list in the JSON-schema shape chat models accept for function
    /// calling.
    pub fn to_json_schema(&self) -> Value {
        let tools: Vec<Value> = self
            .specs
            .iter()
            .map(|spec| {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for param in &spec.params {
                    let mut schema = param_schema(param.kind);
                    if let Value::Object(object) = &mut schema {
                        object.insert("description".to_string(), json!(param.description));
                        if let Some(default) = param.default {
                            object.insert("default".to_string(), default_json(default));
                        }
                    }
                    properties.insert(param.name.to_string(), schema);
                    if param.required {
                        required.push(json!(param.name));
                    }
                }

                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "category": spec.category,
                    "parameters": {
                        "type": "object",
                        "properties": properties,
                        "required": required,
                    }
                })
            })
            .collect();
        Value::Array(tools)
    }
}

fn param_schema(kind: ParamKind) -> Value {
    match kind {
        ParamKind::Scalar(ScalarType::String) => json!({ "type": "string" }),
        ParamKind::Scalar(ScalarType::Int) => json!({ "type": "integer" }),
        ParamKind::Scalar(ScalarType::Float) => json!({ "type": "number" }),
        ParamKind::Scalar(ScalarType::Bool) => json!({ "type": "boolean" }),
        ParamKind::Scalar(ScalarType::Date) => json!({ "type": "string", "format": "date" }),
        ParamKind::Scalar(ScalarType::Enum(choices)) => json!({ "type": "string", "enum": choices }),
        ParamKind::Scalar(ScalarType::StringList) => {
            json!({ "type": "array", "items": { "type": "string" } })
        }
        ParamKind::EntityReference(kind) => json!({ "type": "string", "x-entity": kind }),
        ParamKind::EntityReferenceList(kind) => {
            json!({ "type": "array", "items": { "type": "string" }, "x-entity": kind })
        }
    }
}

fn render_default(default: DefaultValue) -> String {
    match default {
        DefaultValue::Text(text) => format!("'{text}'"),
        DefaultValue::Int(value) => value.to_string(),
        DefaultValue::Bool(value) => value.to_string(),
        DefaultValue::Today => "today".to_string(),
    }
}

fn default_json(default: DefaultValue) -> Value {
    match default {
        DefaultValue::Text(text) => json!(text),
        DefaultValue::Int(value) => json!(value),
        DefaultValue::Bool(value) => json!(value),
        DefaultValue::Today => json!("today"),
    }
}

#[cfg(test)]
mod tests {
    use crate::operations::registry::{OperationRegistry, RegistryError};
    use crate::operations::{OperationCategory, OperationSpec, ParamKind, ParamSpec, ScalarType};

    fn spec(name: &'static str) -> OperationSpec {
        OperationSpec::new(
            name,
            OperationCategory::Read,
            "test",
            vec![ParamSpec::required("q", ParamKind::Scalar(ScalarType::String), "query")],
        )
    }

    #[test]
    fn duplicate_names_fail_construction() {
        let result = OperationRegistry::new(vec![spec("find"), spec("other"), spec("find")]);

        assert_eq!(result.err(), Some(RegistryError::DuplicateOperation("find")));
    }

    #[test]
    fn lookup_hits_and_misses() {
        let registry = OperationRegistry::standard().expect("standard registry");

        assert!(registry.lookup("track_debt").is_some());
        assert!(registry.lookup("launch_rocket").is_none());
        assert_eq!(registry.names().first(), Some(&"remember_person"));
    }

    #[test]
    fn describe_lists_parameters_with_flags() {
        let registry = OperationRegistry::standard().expect("standard registry");
        let text = registry.describe();

        assert!(text.contains("log_job_for_person (Update)"));
        assert!(text.contains("  - person_name: contact name (required)"));
        assert!(text.contains("frequency_type: enum(one_time, week, month, year) (optional, default 'one_time')"));
    }

    #[test]
    fn json_schema_marks_required_parameters() {
        let registry = OperationRegistry::standard().expect("standard registry");
        let schema = registry.to_json_schema();
        let tools = schema.as_array().expect("tool array");
        let gift = tools
            .iter()
            .find(|tool| tool["name"] == "log_gift")
            .expect("log_gift tool");

        assert_eq!(gift["parameters"]["required"], serde_json::json!(["person_name", "gift_name", "status"]));
        assert_eq!(
            gift["parameters"]["properties"]["status"]["enum"],
            serde_json::json!(["idea", "offered", "received"])
        );
        assert_eq!(gift["category"], "create");
    }
}
