//! Multi-document manifest parsing.
//!
//! A manifest is a YAML stream of loosely-typed objects separated by `---`.
//! Splitting separates Projects, which define namespaces, from everything
//! else so the former can be created first.

use serde::Deserialize;
use serde_json::Value;

use crate::core::{DynamicObject, Project, Resource, API_VERSION};
use crate::errors::{FreightlineError, Result};

/// Parses every document of `text` into a [`DynamicObject`].
///
/// Empty documents are skipped. Input order is preserved.
pub fn parse_yaml(text: &str) -> Result<Vec<DynamicObject>> {
    let mut objects = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(document).map_err(|e| {
            FreightlineError::invalid_argument(format!("parse manifest: document {index}: {e}"))
        })?;
        if value.is_null() {
            continue;
        }
        let obj = DynamicObject::from_value(value).map_err(|e| {
            FreightlineError::invalid_argument(format!("parse manifest: document {index}: {e}"))
        })?;
        objects.push(obj);
    }
    Ok(objects)
}

/// Returns true if `obj` is a namespace-defining Project.
#[must_use]
pub fn is_project(obj: &DynamicObject) -> bool {
    obj.is_a(API_VERSION, Project::KIND)
}

/// Partitions objects into (projects, others), keeping relative order in each.
#[must_use]
pub fn partition(objects: Vec<DynamicObject>) -> (Vec<DynamicObject>, Vec<DynamicObject>) {
    objects.into_iter().partition(is_project)
}

/// Parses `text` and partitions it into (projects, others).
pub fn split_yaml(text: &str) -> Result<(Vec<DynamicObject>, Vec<DynamicObject>)> {
    parse_yaml(text).map(partition)
}

/// Marshals an object back to YAML.
pub fn to_yaml(obj: &DynamicObject) -> Result<String> {
    serde_yaml::to_string(obj).map_err(|e| FreightlineError::Conversion {
        kind: obj.kind.clone(),
        message: e.to_string(),
    })
}
