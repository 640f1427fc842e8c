//! Discriminated variant families.
//!
//! A family shares a tag field; each tag selects one concrete shape. Families
//! whose shapes are fully determined by the tag implement [`FixedVariant`]:
//! their values are only constructible through [`FixedVariant::resolve`], and
//! `resolve` is an exhaustive `match`, so a tag without a registry entry does
//! not compile. Structural candidates (from override trees or inventory data)
//! are checked with [`Variant::validate`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ComposeError;
use crate::validate::kind_of;

/// A tagged union that can be validated from a structural candidate.
pub trait Variant: Sized {
    /// Human-readable family name used in error messages.
    const FAMILY: &'static str;
    /// Name of the discriminator field.
    const TAG_FIELD: &'static str;

    /// Validate `candidate` found at `path`, pushing every problem into
    /// `issues`. Returns `None` when any issue was found.
    fn validate_at(candidate: &Value, path: &str, issues: &mut Vec<ComposeError>) -> Option<Self>;

    /// Validate a standalone candidate.
    fn validate(candidate: &Value) -> Result<Self, ComposeError> {
        let mut issues = Vec::new();
        match Self::validate_at(candidate, "", &mut issues) {
            Some(variant) if issues.is_empty() => Ok(variant),
            _ if issues.len() == 1 => Err(issues.remove(0)),
            _ => Err(ComposeError::Invalid {
                root: Self::FAMILY,
                issues,
            }),
        }
    }
}

/// A family whose every field is a constant of its tag.
pub trait FixedVariant: Variant + Serialize {
    type Tag: Copy + DeserializeOwned + std::fmt::Display;

    fn tag(&self) -> Self::Tag;

    /// The concrete variant for `tag`, with all fixed fields populated.
    fn resolve(tag: Self::Tag) -> Self;
}

pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Read and parse the tag of `candidate`. Reports and returns `None` when the
/// candidate is not a record or the tag is missing or unknown.
pub(crate) fn read_tag<'v, T: DeserializeOwned>(
    candidate: &'v Value,
    tag_field: &str,
    path: &str,
    issues: &mut Vec<ComposeError>,
) -> Option<(T, &'v serde_json::Map<String, Value>)> {
    let Value::Object(record) = candidate else {
        let at = if path.is_empty() { "<root>" } else { path };
        issues.push(ComposeError::violation(
            at,
            format!("expected a record, found {}", kind_of(candidate)),
        ));
        return None;
    };
    let tag_path = join(path, tag_field);
    let Some(raw_tag) = record.get(tag_field) else {
        issues.push(ComposeError::violation(tag_path, "missing discriminator field"));
        return None;
    };
    match serde_json::from_value::<T>(raw_tag.clone()) {
        Ok(tag) => Some((tag, record)),
        Err(e) => {
            issues.push(ComposeError::violation(tag_path, e.to_string()));
            None
        }
    }
}

/// Validate a candidate of a [`FixedVariant`] family: every field other than
/// the tag must be one of the tag's fixed fields and equal its constant.
pub(crate) fn validate_fixed<V: FixedVariant>(
    candidate: &Value,
    path: &str,
    issues: &mut Vec<ComposeError>,
) -> Option<V> {
    let (tag, record) = read_tag::<V::Tag>(candidate, V::TAG_FIELD, path, issues)?;
    let resolved = V::resolve(tag);
    let fixed = match serde_json::to_value(&resolved) {
        Ok(Value::Object(fixed)) => fixed,
        Ok(_) => serde_json::Map::new(),
        Err(e) => {
            issues.push(ComposeError::Dump(e));
            return None;
        }
    };

    let before = issues.len();
    for (field, found) in record {
        if field == V::TAG_FIELD {
            continue;
        }
        let field_path = join(path, field);
        match fixed.get(field) {
            Some(expected) if expected == found => {}
            Some(expected) => issues.push(ComposeError::VariantMismatch {
                path: field_path,
                tag: tag.to_string(),
                field: field.clone(),
                reason: format!("fixed to {expected}, found {found}"),
            }),
            None => issues.push(ComposeError::violation(
                field_path,
                format!("unknown field for {} variant '{tag}'", V::FAMILY),
            )),
        }
    }
    (issues.len() == before).then_some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments::containers::{ContainersBackend, ContainersBackendType, ContainersRuntime};
    use crate::fragments::warp::{WarpEngine, WarpEngineType};
    use serde_json::json;

    #[test]
    fn podman_always_resolves_to_crun() {
        let backend = ContainersBackend::resolve(ContainersBackendType::Podman);
        assert_eq!(backend.runtime(), ContainersRuntime::Crun);
        assert_eq!(backend.tag(), ContainersBackendType::Podman);
    }

    #[test]
    fn docker_with_crun_is_a_variant_mismatch() {
        let err = ContainersBackend::validate(&json!({"type": "docker", "runtime": "crun"}))
            .unwrap_err();
        match err {
            ComposeError::VariantMismatch { tag, field, .. } => {
                assert_eq!(tag, "docker");
                assert_eq!(field, "runtime");
            }
            other => panic!("Expected VariantMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn matching_fixed_fields_validate() {
        let backend =
            ContainersBackend::validate(&json!({"type": "crio", "runtime": "default"})).unwrap();
        assert_eq!(backend.runtime(), ContainersRuntime::Default);
    }

    #[test]
    fn tag_alone_resolves_fixed_fields() {
        let engine = WarpEngine::validate(&json!({"type": "wireguard"})).unwrap();
        assert_eq!(engine, WarpEngine::resolve(WarpEngineType::Wireguard));
        assert_eq!(engine.systemd_service_name(), "wg-quick@warp");
    }

    #[test]
    fn several_diverging_fields_are_all_reported() {
        let err = WarpEngine::validate(&json!({
            "type": "masque",
            "binary_path": "/opt/usque",
            "config_dir": "/tmp",
        }))
        .unwrap_err();
        match err {
            ComposeError::Invalid { issues, .. } => {
                assert_eq!(issues.len(), 2);
                assert!(
                    issues
                        .iter()
                        .all(|i| matches!(i, ComposeError::VariantMismatch { .. }))
                );
            }
            other => panic!("Expected Invalid, got: {other:?}"),
        }
    }

    #[test]
    fn missing_tag_is_a_schema_violation() {
        let err = ContainersBackend::validate(&json!({"runtime": "crun"})).unwrap_err();
        assert!(matches!(err, ComposeError::SchemaViolation { ref path, .. } if path == "type"));
    }

    #[test]
    fn unknown_tag_is_a_schema_violation() {
        let err = WarpEngine::validate(&json!({"type": "openvpn"})).unwrap_err();
        assert!(matches!(err, ComposeError::SchemaViolation { .. }));
    }

    #[test]
    fn unknown_field_is_a_schema_violation() {
        let err = ContainersBackend::validate(&json!({"type": "docker", "rootless": true}))
            .unwrap_err();
        assert!(matches!(err, ComposeError::SchemaViolation { ref path, .. } if path == "rootless"));
    }
}
