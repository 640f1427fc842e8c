//! Raw key/value override layers.
//!
//! A [`RawOverride`] is an ordered list of `(path, value)` entries. Paths
//! address records of the root being composed; a dotted key such as
//! `"dns.mode"` expands into nested records when the override is turned into
//! a tree. Entry values are either plain structural values or typed
//! fragments, which are dumped in place.

use serde_json::{Map, Value};

use crate::error::ComposeError;
use crate::merge::Tree;
use crate::types::Fragment;
use crate::validate::kind_of;

/// The value carried by one raw entry.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Value(Value),
    Fragment(Fragment),
}

impl RawValue {
    fn into_value(self) -> Result<Value, ComposeError> {
        match self {
            RawValue::Value(value) => Ok(value),
            RawValue::Fragment(fragment) => fragment.dump(),
        }
    }
}

/// An untyped override of a root. Only the named keys are written here;
/// coercion fills every other key with its declared default.
///
/// ```
/// use nullforge::RawOverride;
///
/// let raw = RawOverride::new()
///     .dotted("dns.mode", "none")
///     .set("warp", serde_json::json!({"install": true}));
/// let tree = raw.into_tree().unwrap();
/// assert_eq!(tree["dns"]["mode"], "none");
/// assert_eq!(tree["warp"]["install"], true);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOverride {
    entries: Vec<(Vec<String>, RawValue)>,
}

impl RawOverride {
    /// An override with no entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a top-level key. The key is taken literally, dots included.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries
            .push((vec![key.into()], RawValue::Value(value.into())));
        self
    }

    /// Set a dotted key path to a typed fragment, dumped when the tree is built.
    pub fn fragment(mut self, dotted_key: &str, fragment: impl Into<Fragment>) -> Self {
        self.entries
            .push((split(dotted_key), RawValue::Fragment(fragment.into())));
        self
    }

    /// Set a dotted key path: `"networking.dns.mode"` becomes
    /// `{networking = {dns = {mode = ...}}}`.
    pub fn dotted(mut self, dotted_key: &str, value: impl Into<Value>) -> Self {
        self.entries
            .push((split(dotted_key), RawValue::Value(value.into())));
        self
    }

    /// Wrap an already-structured record. Anything but an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, ComposeError> {
        match value {
            Value::Object(map) => Ok(Self {
                entries: map
                    .into_iter()
                    .map(|(key, value)| (vec![key], RawValue::Value(value)))
                    .collect(),
            }),
            other => Err(ComposeError::violation(
                "<root>",
                format!("raw override must be a record, found {}", kind_of(&other)),
            )),
        }
    }

    /// Parse a TOML document into a raw override.
    pub fn from_toml_str(source: &str) -> Result<Self, ComposeError> {
        let value: Value = toml::from_str(source)?;
        Self::from_value(value)
    }

    /// True if no entry has been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Build the tree of named keys. If multiple entries target the same key, the
    /// last one wins.
    pub fn into_tree(self) -> Result<Tree, ComposeError> {
        let mut tree = Tree::new();
        for (segments, value) in self.entries {
            set_nested(&mut tree, &segments, value.into_value()?)?;
        }
        Ok(tree)
    }
}

fn split(dotted_key: &str) -> Vec<String> {
    dotted_key.split('.').map(str::to_string).collect()
}

fn set_nested(tree: &mut Tree, segments: &[String], value: Value) -> Result<(), ComposeError> {
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(ComposeError::violation("<root>", "empty override key"));
    };
    let mut current = tree;
    for (depth, segment) in parents.iter().enumerate() {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match slot {
            Value::Object(map) => map,
            other => {
                return Err(ComposeError::violation(
                    segments[..=depth].join("."),
                    format!(
                        "cannot set '{}' through {}",
                        segments.join("."),
                        kind_of(other)
                    ),
                ));
            }
        };
    }
    current.insert(leaf.clone(), value);
    Ok(())
}
