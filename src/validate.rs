//! One-pass validation of a structural tree against a typed schema.
//!
//! A [`Section`] walks one record of the tree. Each field is deserialized on
//! its own, so a type error in one field never hides errors in its siblings.
//! Leaf values go through `serde_ignored`, which reports keys nested inside a
//! typed value that the type doesn't consume. Keys of the record itself that
//! no field reads are reported by [`Section::finish`] (strict mode is always
//! on). Failed fields fall back to their default so the walk can continue;
//! the caller turns any collected issue into an error, so those placeholder
//! values never escape.

use confique::Config;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ComposeError;

/// A schema that can be read from a [`Section`] of a structural tree.
pub trait Schema: Sized {
    fn read(section: &mut Section<'_, '_>) -> Self;
}

/// Build a value from its `#[config(default = ...)]` declarations.
///
/// Every fragment declares a default for each non-optional field, so loading
/// without any source cannot fail.
pub(crate) fn declared_defaults<C: Config>() -> C {
    C::builder()
        .load()
        .expect("nullforge: declared defaults must cover every required field")
}

/// Cursor over one record of a tree, collecting issues as it goes.
pub struct Section<'t, 'i> {
    path: String,
    map: Option<&'t Map<String, Value>>,
    seen: Vec<&'static str>,
    issues: &'i mut Vec<ComposeError>,
}

impl<'t, 'i> Section<'t, 'i> {
    /// Open a section at `path`. A missing record reads as all-defaults; a
    /// value that is not a record is reported and also reads as all-defaults.
    pub fn new(
        path: impl Into<String>,
        value: Option<&'t Value>,
        issues: &'i mut Vec<ComposeError>,
    ) -> Self {
        let path = path.into();
        let map = match value {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                issues.push(ComposeError::violation(
                    display_path(&path),
                    format!("expected a record, found {}", kind_of(other)),
                ));
                None
            }
        };
        Self {
            path,
            map,
            seen: Vec::new(),
            issues,
        }
    }

    /// Open a section over a record known to be present.
    pub fn record(
        path: impl Into<String>,
        map: &'t Map<String, Value>,
        issues: &'i mut Vec<ComposeError>,
    ) -> Self {
        Self {
            path: path.into(),
            map: Some(map),
            seen: Vec::new(),
            issues,
        }
    }

    /// Dotted path of `key` inside this section.
    pub fn key_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    fn take(&mut self, key: &'static str) -> Option<&'t Value> {
        self.seen.push(key);
        self.map.and_then(|map| map.get(key))
    }

    /// Read a leaf field, or `default` when the key is absent.
    pub fn field<T: DeserializeOwned>(&mut self, key: &'static str, default: T) -> T {
        let Some(value) = self.take(key) else {
            return default;
        };
        let path = self.key_path(key);
        let mut ignored = Vec::new();
        let parsed: Result<T, _> =
            serde_ignored::deserialize(value, |inner| ignored.push(inner.to_string()));
        match parsed {
            Ok(parsed) => {
                for inner in ignored {
                    self.issues
                        .push(ComposeError::violation(format!("{path}.{inner}"), "unknown field"));
                }
                parsed
            }
            Err(e) => {
                self.issues.push(ComposeError::violation(path, e.to_string()));
                default
            }
        }
    }

    /// Read a field with a custom parser that reports its own issues.
    pub fn field_with<T>(
        &mut self,
        key: &'static str,
        default: T,
        parse: impl FnOnce(&'t Value, &str, &mut Vec<ComposeError>) -> T,
    ) -> T {
        let Some(value) = self.take(key) else {
            return default;
        };
        let path = self.key_path(key);
        parse(value, &path, &mut *self.issues)
    }

    /// Read a nested record as schema `T`.
    pub fn nested<T: Schema>(&mut self, key: &'static str) -> T {
        let value = self.take(key);
        let mut child = Section::new(self.key_path(key), value, &mut *self.issues);
        let out = T::read(&mut child);
        child.finish();
        out
    }

    /// Record a field-level rule failure.
    pub fn check(&mut self, key: &str, outcome: Result<(), String>) {
        if let Err(reason) = outcome {
            let path = self.key_path(key);
            self.issues.push(ComposeError::violation(path, reason));
        }
    }

    /// Record an issue that is not a plain field violation.
    pub fn reject(&mut self, error: ComposeError) {
        self.issues.push(error);
    }

    /// Report every key of this record that no field consumed.
    pub fn finish(self) {
        let Some(map) = self.map else {
            return;
        };
        for key in map.keys() {
            if !self.seen.iter().any(|seen| *seen == key.as_str()) {
                let path = if self.path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{key}", self.path)
                };
                self.issues.push(ComposeError::violation(path, "unknown field"));
            }
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a record",
    }
}

// -- Shared field rules ------------------------------------------------------

pub(crate) fn non_empty<T>(items: &[T], what: &str) -> Result<(), String> {
    if items.is_empty() {
        return Err(format!("{what} must contain at least one entry"));
    }
    Ok(())
}

pub(crate) fn non_blank(value: &str, what: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    Ok(())
}

pub(crate) fn port(value: u16) -> Result<(), String> {
    if value == 0 {
        return Err("port must be between 1 and 65535".into());
    }
    Ok(())
}
