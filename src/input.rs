//! Input reference resolution
//!
//! Module definitions refer to values with `${{module.input.key}}` and
//! `${{module.model.kind.field}}`. References are resolved here into the
//! flat map handed to [`declarative::TransactionService::with_inputs`].

use anyhow::{Result, bail};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{\{\s*([\w-]+)\.(input|model)\.([^}]+?)\s*\}\}$")
        .expect("reference pattern is valid")
});

/// A parsed `${{...}}` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `${{module.input.key}}`
    Input { module: String, key: String },
    /// `${{module.model.kind.field}}`
    Model {
        module: String,
        kind: String,
        field: String,
    },
}

impl Reference {
    /// Parse `text` if the whole string is a reference
    pub fn parse(text: &str) -> Option<Self> {
        let caps = REFERENCE.captures(text)?;
        let module = caps[1].to_string();
        let rest = &caps[3];
        match &caps[2] {
            "input" => Some(Self::Input {
                module,
                key: rest.to_string(),
            }),
            _ => {
                let (kind, field) = rest.split_once('.')?;
                Some(Self::Model {
                    module,
                    kind: kind.to_string(),
                    field: field.to_string(),
                })
            }
        }
    }

    /// Key of the reference in the resolved input map
    pub fn key(&self) -> String {
        match self {
            Self::Input { module, key } => format!("{module}.input.{key}"),
            Self::Model {
                module,
                kind,
                field,
            } => format!("{module}.model.{kind}.{field}"),
        }
    }
}

/// Every reference inside `value`, depth first
pub fn references(value: &Value) -> Vec<Reference> {
    let mut found = Vec::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &Value, found: &mut Vec<Reference>) {
    match value {
        Value::String(text) => found.extend(Reference::parse(text)),
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, found)),
        Value::Object(map) => map.values().for_each(|v| collect_references(v, found)),
        _ => {}
    }
}

/// Replace every reference string inside `value` with what `lookup` returns
///
/// Strings that are not references are kept as is.
pub fn substitute<F>(value: &Value, lookup: &F) -> Result<Value>
where
    F: Fn(&Reference) -> Result<Value>,
{
    Ok(match value {
        Value::String(text) => match Reference::parse(text) {
            Some(reference) => lookup(&reference)?,
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| substitute(v, lookup))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), substitute(v, lookup)?)))
                .collect::<Result<_>>()?,
        ),
        other => other.clone(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct InputService {
    inputs: BTreeMap<String, Value>,
    models: BTreeMap<String, Value>,
}

impl InputService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module input value
    pub fn register_input(&mut self, module: &str, key: &str, value: Value) {
        self.inputs.insert(format!("{module}.input.{key}"), value);
    }

    /// Register `module.key=value` as given on the command line
    ///
    /// The value is parsed as JSON when it can be, otherwise kept as a string.
    pub fn register_assignment(&mut self, assignment: &str) -> Result<()> {
        let Some((name, raw)) = assignment.split_once('=') else {
            bail!("expected module.key=value, got {assignment}");
        };
        let Some((module, key)) = name.trim().split_once('.') else {
            bail!("expected module.key=value, got {assignment}");
        };
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.register_input(module, key, value);
        Ok(())
    }

    /// Register the properties of a model exposed by a module
    ///
    /// Each top-level property becomes `module.model.kind.field`.
    pub fn register_model(
        &mut self,
        module: &str,
        kind: &str,
        properties: &serde_json::Map<String, Value>,
    ) {
        for (field, value) in properties {
            self.models
                .insert(format!("{module}.model.{kind}.{field}"), value.clone());
        }
    }

    fn lookup(&self, reference: &Reference) -> Result<Value> {
        let key = reference.key();
        let source = match reference {
            Reference::Input { .. } => &self.inputs,
            Reference::Model { .. } => &self.models,
        };
        match source.get(&key) {
            Some(value) => Ok(value.clone()),
            None => bail!("input not found: {key}"),
        }
    }

    /// Resolve one reference string
    pub fn resolve(&self, text: &str) -> Result<Value> {
        let Some(reference) = Reference::parse(text) else {
            bail!("not an input reference: {text}");
        };
        self.lookup(&reference)
    }

    /// Replace every reference string inside `value`, recursively
    pub fn resolve_value(&self, value: &Value) -> Result<Value> {
        substitute(value, &|reference: &Reference| self.lookup(reference))
    }

    /// Flat map of everything registered, keyed like the references
    pub fn resolved_inputs(&self) -> BTreeMap<String, Value> {
        self.inputs
            .iter()
            .chain(&self.models)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_references() {
        assert_eq!(
            Reference::parse("${{ backend.input.image }}"),
            Some(Reference::Input {
                module: "backend".into(),
                key: "image".into(),
            })
        );
        assert_eq!(
            Reference::parse("${{network.model.region.regionId}}"),
            Some(Reference::Model {
                module: "network".into(),
                kind: "region".into(),
                field: "regionId".into(),
            })
        );
        assert_eq!(Reference::parse("plain"), None);
        assert_eq!(Reference::parse("${{network.model.region}}"), None);
        assert_eq!(Reference::parse("prefix ${{a.input.b}}"), None);
    }

    #[test]
    fn test_resolve_value_recursively() {
        let mut inputs = InputService::new();
        inputs.register_input("backend", "image", json!("nginx:1.27"));
        let region = json!({ "regionId": "us-east-1" });
        inputs.register_model("network", "region", region.as_object().unwrap());

        let resolved = inputs
            .resolve_value(&json!({
                "image": "${{backend.input.image}}",
                "placement": ["${{ network.model.region.regionId }}", "fixed"],
                "replicas": 2,
            }))
            .unwrap();
        assert_eq!(
            resolved,
            json!({
                "image": "nginx:1.27",
                "placement": ["us-east-1", "fixed"],
                "replicas": 2,
            })
        );
    }

    #[test]
    fn test_missing_reference() {
        let inputs = InputService::new();
        let err = inputs.resolve("${{backend.input.image}}").unwrap_err();
        assert_eq!(err.to_string(), "input not found: backend.input.image");
        assert!(inputs.resolve("image").is_err());
    }

    #[test]
    fn test_resolved_inputs_flatten_both_kinds() {
        let mut inputs = InputService::new();
        inputs.register_input("backend", "image", json!("nginx"));
        let region = json!({ "regionId": "r1" });
        inputs.register_model("network", "region", region.as_object().unwrap());
        let flat = inputs.resolved_inputs();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat["backend.input.image"], json!("nginx"));
        assert_eq!(flat["network.model.region.regionId"], json!("r1"));
    }

    #[test]
    fn test_register_assignment() {
        let mut inputs = InputService::new();
        inputs.register_assignment("backend.image=nginx:1.27").unwrap();
        inputs.register_assignment("backend.replicas=3").unwrap();
        inputs.register_assignment("backend.note=a=b").unwrap();
        assert_eq!(inputs.resolve("${{backend.input.image}}").unwrap(), json!("nginx:1.27"));
        assert_eq!(inputs.resolve("${{backend.input.replicas}}").unwrap(), json!(3));
        assert_eq!(inputs.resolve("${{backend.input.note}}").unwrap(), json!("a=b"));

        assert!(inputs.register_assignment("image=nginx").is_err());
        assert!(inputs.register_assignment("backend.image").is_err());
    }

    #[test]
    fn test_references_are_collected_depth_first() {
        let value = json!({
            "a": "${{net.input.cidr}}",
            "b": [{ "c": "${{net.model.vpc.id}}" }, "plain"],
        });
        let keys: Vec<String> = references(&value).iter().map(Reference::key).collect();
        assert_eq!(keys, vec!["net.input.cidr", "net.model.vpc.id"]);
    }
}
