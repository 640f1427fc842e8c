//! Inspection operations on composed roots: template generation, key lookup
//! and listing, and the `ConfigResult` type callers display.

use std::fmt;

use confique::meta::{FieldKind, Meta};
use serde_json::Value;

use crate::error::ComposeError;
use crate::merge::Tree;
use crate::root::Root;

/// Result of an inspection operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// A generated TOML template string.
    Template(String),
    /// A key's composed value and its doc comment.
    KeyValue {
        key: String,
        value: String,
        doc: Vec<String>,
    },
    /// Every leaf of a composed root, in declaration order.
    Listing { entries: Vec<(String, String)> },
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Template(t) => write!(f, "{t}"),
            ConfigResult::KeyValue { key, value, doc } => {
                for line in doc {
                    writeln!(f, "# {line}")?;
                }
                write!(f, "{key} = {value}")
            }
            ConfigResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
        }
    }
}

/// Commented TOML template of a root, built from its doc comments and
/// declared defaults.
pub fn generate_template<R: Root>() -> ConfigResult {
    ConfigResult::Template(confique::toml::template::<R>(
        confique::toml::FormatOptions::default(),
    ))
}

/// Look up a composed value by dotted key, with its doc comment.
pub fn get_value<R: Root>(root: &R, key: &str) -> Result<ConfigResult, ComposeError> {
    let tree = root.dump()?;
    let value = tree_get(&tree, key).ok_or_else(|| ComposeError::KeyNotFound(key.into()))?;
    Ok(ConfigResult::KeyValue {
        key: key.into(),
        value: format_value(value)?,
        doc: lookup_doc(&R::META, key),
    })
}

/// Every leaf of a composed root as flattened `key = value` pairs. Unset
/// optional values show as `<not set>`.
pub fn list_values<R: Root>(root: &R) -> Result<ConfigResult, ComposeError> {
    let tree = root.dump()?;
    let mut entries = Vec::new();
    collect_entries(&R::META, &tree, "", &mut entries)?;
    Ok(ConfigResult::Listing { entries })
}

fn collect_entries(
    meta: &Meta,
    tree: &Tree,
    prefix: &str,
    entries: &mut Vec<(String, String)>,
) -> Result<(), ComposeError> {
    for field in meta.fields {
        let dotted = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match (&field.kind, tree.get(field.name)) {
            (FieldKind::Nested { meta, .. }, Some(Value::Object(section))) => {
                collect_entries(meta, section, &dotted, entries)?;
            }
            (_, Some(value)) => entries.push((dotted, format_value(value)?)),
            (_, None) => entries.push((dotted, format_value(&Value::Null)?)),
        }
    }
    Ok(())
}

/// Navigate a tree by dotted key path (e.g. `"dns.mode"`).
fn tree_get<'a>(tree: &'a Tree, dotted_key: &str) -> Option<&'a Value> {
    let mut segments = dotted_key.split('.');
    let mut current = tree.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn format_value(value: &Value) -> Result<String, ComposeError> {
    Ok(match value {
        Value::Null => "<not set>".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value)?,
    })
}

/// Walk confique's `Meta` tree to find the doc comment for a dotted key path.
fn lookup_doc(meta: &Meta, dotted_key: &str) -> Vec<String> {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    lookup_doc_recursive(meta, &segments)
}

fn lookup_doc_recursive(meta: &Meta, segments: &[&str]) -> Vec<String> {
    let Some((first, rest)) = segments.split_first() else {
        return vec![];
    };
    let Some(field) = meta.fields.iter().find(|field| field.name == *first) else {
        return vec![];
    };
    match (&field.kind, rest.is_empty()) {
        (_, true) => field.doc.iter().map(|s| s.to_string()).collect(),
        (FieldKind::Nested { meta: nested, .. }, false) => lookup_doc_recursive(nested, rest),
        (FieldKind::Leaf { .. }, false) => vec![],
    }
}
