//! Aggregate roots: the two top-level configurations a deployment target has.
//!
//! A [`Root`] knows its own name, how to read itself from a structural tree
//! in one pass, and which [`Layer`] kinds it can take.

use confique::Config;
use serde::Serialize;
use serde_json::Value;

use crate::error::ComposeError;
use crate::fragments::{FeaturesRoot, SystemRoot};
use crate::merge::Tree;
use crate::overrides::RawOverride;
use crate::types::{Fragment, Layer};
use crate::validate::{Schema, Section, kind_of};

/// What a root makes of a [`Layer`] before coercion.
#[derive(Debug)]
pub enum Claim<R> {
    Absent,
    /// A complete value of this very root.
    Aggregate(R),
    /// A fragment of one of this root's sections.
    Fragment(Fragment),
    Raw(RawOverride),
    /// A layer this root has no place for; carries its kind name.
    Foreign(&'static str),
}

pub trait Root: Config + Schema + Serialize + Clone + Default + Send + Sync {
    /// Name used in error messages and logs.
    const NAME: &'static str;

    /// Sort a layer into what this root can do with it.
    fn claim(layer: Layer) -> Claim<Self>;

    /// Read a complete tree, collecting every offending path before failing.
    fn from_tree(tree: &Value) -> Result<Self, ComposeError> {
        match tree {
            Value::Object(record) => Self::from_record(record),
            other => Err(ComposeError::Invalid {
                root: Self::NAME,
                issues: vec![ComposeError::violation(
                    "<root>",
                    format!("expected a record, found {}", kind_of(other)),
                )],
            }),
        }
    }

    fn from_record(tree: &Tree) -> Result<Self, ComposeError> {
        let mut issues = Vec::new();
        let mut section = Section::record("", tree, &mut issues);
        let out = Self::read(&mut section);
        section.finish();
        if issues.is_empty() {
            Ok(out)
        } else {
            Err(ComposeError::Invalid {
                root: Self::NAME,
                issues,
            })
        }
    }

    /// Full structural dump, every declared field present.
    fn dump(&self) -> Result<Tree, ComposeError> {
        match serde_json::to_value(self)? {
            Value::Object(tree) => Ok(tree),
            other => Err(ComposeError::violation(
                "<root>",
                format!("{} dumped to a non-record: {other}", Self::NAME),
            )),
        }
    }
}

impl Root for FeaturesRoot {
    const NAME: &'static str = "features";

    fn claim(layer: Layer) -> Claim<Self> {
        match layer {
            Layer::Absent => Claim::Absent,
            Layer::Features(root) => Claim::Aggregate(*root),
            Layer::Fragment(fragment) => Claim::Fragment(fragment),
            Layer::Raw(raw) => Claim::Raw(raw),
            other @ Layer::System(_) => Claim::Foreign(other.kind()),
        }
    }
}

impl Root for SystemRoot {
    const NAME: &'static str = "system";

    fn claim(layer: Layer) -> Claim<Self> {
        match layer {
            Layer::Absent => Claim::Absent,
            Layer::System(root) => Claim::Aggregate(*root),
            Layer::Raw(raw) => Claim::Raw(raw),
            other @ (Layer::Features(_) | Layer::Fragment(_)) => Claim::Foreign(other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments::{DnsMode, WarpFragment};
    use serde_json::json;

    #[test]
    fn empty_tree_reads_as_defaults() {
        let features = FeaturesRoot::from_tree(&json!({})).unwrap();
        assert_eq!(features, FeaturesRoot::default());
        let system = SystemRoot::from_tree(&json!({})).unwrap();
        assert_eq!(system, SystemRoot::default());
    }

    #[test]
    fn dump_reads_back_unchanged() {
        let features = FeaturesRoot::default();
        let tree = Value::Object(features.dump().unwrap());
        assert_eq!(FeaturesRoot::from_tree(&tree).unwrap(), features);
    }

    #[test]
    fn dump_contains_every_section_and_null_leaves() {
        let tree = FeaturesRoot::default().dump().unwrap();
        for key in ["containers", "dns", "haproxy", "netsec", "profiles", "tor", "users", "warp", "xray"] {
            assert!(tree.contains_key(key), "missing section {key}");
        }
        assert_eq!(tree["dns"]["upstreams"], Value::Null);
    }

    #[test]
    fn sparse_tree_overrides_only_named_keys() {
        let features = FeaturesRoot::from_tree(&json!({"dns": {"mode": "none"}})).unwrap();
        assert_eq!(features.dns.mode, DnsMode::None);
        assert_eq!(features.users, FeaturesRoot::default().users);
    }

    #[test]
    fn every_offending_path_is_collected() {
        let err = FeaturesRoot::from_tree(&json!({
            "users": {"name": ""},
            "tor": {"socks_port": 0},
            "warp": {"iface": "has space"},
            "bogus": {},
        }))
        .unwrap_err();
        let paths = err.paths();
        assert!(paths.contains(&"users.name"));
        assert!(paths.contains(&"tor.socks_port"));
        assert!(paths.contains(&"warp.iface"));
        assert!(paths.contains(&"bogus"));
        assert!(matches!(err, ComposeError::Invalid { root: "features", .. }));
    }

    #[test]
    fn non_record_tree_is_rejected() {
        let err = SystemRoot::from_tree(&json!(7)).unwrap_err();
        assert_eq!(err.paths(), vec!["<root>"]);
    }

    #[test]
    fn system_root_has_no_place_for_fragments() {
        let layer = Layer::from(WarpFragment::default());
        assert!(matches!(SystemRoot::claim(layer), Claim::Foreign("WarpFragment")));
        let layer = Layer::from(FeaturesRoot::default());
        assert!(matches!(SystemRoot::claim(layer), Claim::Foreign("FeaturesRoot")));
    }

    #[test]
    fn features_root_claims_fragments() {
        let layer = Layer::from(WarpFragment::default());
        assert!(matches!(FeaturesRoot::claim(layer), Claim::Fragment(_)));
        let layer = Layer::from(SystemRoot::default());
        assert!(matches!(FeaturesRoot::claim(layer), Claim::Foreign("SystemRoot")));
    }
}
