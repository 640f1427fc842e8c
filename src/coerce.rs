//! Turn a [`Layer`] into the tree the merge engine consumes.

use confique::meta::{FieldKind, Meta};
use tracing::{debug, trace};

use crate::error::ComposeError;
use crate::merge::Tree;
use crate::root::{Claim, Root};
use crate::types::{Fragment, Layer};

/// Coerce one layer into a structural tree addressed from the root of `R`.
///
/// Typed values are already valid and are dumped as-is. Raw overrides are
/// validated against the whole schema of `R` first, so a bad key fails here
/// rather than after every later layer has been merged on top of it. The
/// validated root is then dumped in full: keys the override does not name
/// come back at their declared defaults and replace what earlier layers set.
pub fn coerce<R: Root>(layer: Layer) -> Result<Tree, ComposeError> {
    match R::claim(layer) {
        Claim::Absent => Ok(Tree::new()),
        Claim::Aggregate(root) => root.dump(),
        Claim::Fragment(fragment) => wrap_fragment::<R>(&fragment),
        Claim::Raw(raw) => {
            let tree = raw.into_tree()?;
            let root = R::from_record(&tree)?;
            trace!(root = R::NAME, keys = tree.len(), "raw override validated");
            root.dump()
        }
        Claim::Foreign(kind) => Err(ComposeError::UnknownLayerKind { root: R::NAME, kind }),
    }
}

fn wrap_fragment<R: Root>(fragment: &Fragment) -> Result<Tree, ComposeError> {
    let kind = fragment.kind();
    let key = kind.category();
    if !sections(&R::META).contains(&key) {
        return Err(ComposeError::OrphanCategory {
            fragment: kind.type_name(),
            key,
        });
    }
    debug!(root = R::NAME, fragment = kind.type_name(), section = key, "wrapping fragment");
    let mut tree = Tree::new();
    tree.insert(key.to_string(), fragment.section_value()?);
    Ok(tree)
}

/// Names of the nested sections declared at the top level of `meta`.
fn sections(meta: &Meta) -> Vec<&'static str> {
    meta.fields
        .iter()
        .filter(|field| matches!(field.kind, FieldKind::Nested { .. }))
        .map(|field| field.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use confique::Config;
    use crate::fragments::{
        ContainersBackend, ContainersBackendType, FeaturesRoot, NetSecFragment, SystemRoot,
        TorFragment,
    };
    use crate::overrides::RawOverride;
    use crate::types::FragmentKind;
    use crate::variants::FixedVariant;
    use serde_json::{Value, json};

    #[test]
    fn absent_is_an_empty_tree() {
        assert!(coerce::<FeaturesRoot>(Layer::Absent).unwrap().is_empty());
        assert!(coerce::<SystemRoot>(Layer::Absent).unwrap().is_empty());
    }

    #[test]
    fn fragment_is_wrapped_under_its_category() {
        let tor = TorFragment {
            install: true,
            ..TorFragment::default()
        };
        let tree = coerce::<FeaturesRoot>(tor.into()).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree["tor"]["install"], true);
        assert_eq!(tree["tor"]["socks_port"], 9050);
    }

    #[test]
    fn variant_fragment_sets_the_tag_field() {
        let backend = ContainersBackend::resolve(ContainersBackendType::Crio);
        let tree = coerce::<FeaturesRoot>(backend.into()).unwrap();
        assert_eq!(tree["containers"], json!({"backend_type": "crio"}));
    }

    #[test]
    fn every_fragment_category_is_a_features_section() {
        let known = sections(&FeaturesRoot::META);
        for kind in FragmentKind::ALL {
            assert!(known.contains(&kind.category()), "{kind:?} has no section");
        }
    }

    #[test]
    fn fragments_are_foreign_to_the_system_root() {
        let err = coerce::<SystemRoot>(NetSecFragment::default().into()).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::UnknownLayerKind { root: "system", kind: "NetSecFragment" }
        ));
    }

    #[test]
    fn roots_are_foreign_to_each_other() {
        let err = coerce::<FeaturesRoot>(SystemRoot::default().into()).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownLayerKind { kind: "SystemRoot", .. }));
    }

    #[test]
    fn matching_root_dumps_in_full() {
        let tree = coerce::<SystemRoot>(SystemRoot::default().into()).unwrap();
        assert_eq!(tree["timezone"], "UTC");
        assert_eq!(tree["hostname"], Value::Null);
    }

    #[test]
    fn raw_override_is_filled_with_defaults() {
        let raw = RawOverride::new().dotted("dns.mode", "none");
        let tree = coerce::<FeaturesRoot>(raw.into()).unwrap();
        let expected = FeaturesRoot::from_tree(&json!({"dns": {"mode": "none"}})).unwrap();
        assert_eq!(tree, expected.dump().unwrap());
        assert_eq!(tree["dns"]["mode"], "none");
        assert_eq!(tree["dns"]["upstream_provider"], "cloudflare");
        assert_eq!(tree["warp"]["install"], false);
    }

    #[test]
    fn raw_override_is_validated_before_merge() {
        let raw = RawOverride::new()
            .dotted("tor.socks_port", "not a port")
            .dotted("users.nmae", "typo");
        let err = coerce::<FeaturesRoot>(raw.into()).unwrap_err();
        assert_eq!(err.paths(), vec!["tor.socks_port", "users.nmae"]);
    }

    #[test]
    fn raw_override_for_system_root() {
        let raw = RawOverride::new().set("hostname", "edge-1.example.org");
        let tree = coerce::<SystemRoot>(raw.into()).unwrap();
        assert_eq!(tree["hostname"], "edge-1.example.org");
        assert_eq!(tree["timezone"], "UTC");
    }
}
