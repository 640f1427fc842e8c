//! Core composition pipeline: merge override layers over a base and produce a
//! typed root.
//!
//! Operates on values the caller already holds, with no I/O. Steps:
//!
//! 1. Dump the base into a fresh tree (the base itself is only borrowed)
//! 2. Coerce each layer and deep-merge it on top, in order (later wins)
//! 3. Read the merged tree back as the root, collecting every issue

use tracing::{debug, trace};

use crate::coerce::coerce;
use crate::error::ComposeError;
use crate::fragments::{FeaturesRoot, SystemRoot};
use crate::merge::deep_merge;
use crate::root::{Claim, Root};
use crate::types::Layer;

/// Compose `layers` over `base`, first layer lowest priority.
///
/// `base` is dumped anew on every call, so one default aggregate can be
/// shared by any number of compositions.
pub fn compose<R, I>(base: &R, layers: I) -> Result<R, ComposeError>
where
    R: Root,
    I: IntoIterator,
    I::Item: Into<Layer>,
{
    let mut merged = base.dump()?;
    for (index, layer) in layers.into_iter().enumerate() {
        let layer = layer.into();
        if matches!(layer, Layer::Absent) {
            trace!(root = R::NAME, index, "skipping absent layer");
            continue;
        }
        let kind = layer.kind();
        let tree = coerce::<R>(layer)?;
        debug!(root = R::NAME, index, kind, keys = tree.len(), "merging layer");
        merged = deep_merge(merged, tree);
    }
    match R::from_record(&merged) {
        Ok(root) => {
            debug!(root = R::NAME, "composition complete");
            Ok(root)
        }
        Err(e) => {
            debug!(root = R::NAME, issues = e.paths().len(), "composition rejected");
            Err(e)
        }
    }
}

/// Guarantee a concrete root for one input.
///
/// Absent yields the declared defaults, a typed root of the same kind passes
/// through unchanged and a raw override is validated against the full schema.
/// Fragments and foreign roots are rejected.
pub fn ensure<R: Root>(layer: impl Into<Layer>) -> Result<R, ComposeError> {
    match R::claim(layer.into()) {
        Claim::Absent => Ok(R::default()),
        Claim::Aggregate(root) => Ok(root),
        Claim::Raw(raw) => R::from_record(&raw.into_tree()?),
        Claim::Fragment(fragment) => Err(ComposeError::UnsupportedInput {
            root: R::NAME,
            kind: fragment.kind().type_name(),
        }),
        Claim::Foreign(kind) => Err(ComposeError::UnsupportedInput { root: R::NAME, kind }),
    }
}

/// The default aggregates every deployment target starts from.
///
/// Built once and shared read-only; composing a target never touches it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Baseline {
    pub features: FeaturesRoot,
    pub system: SystemRoot,
}

/// Both composed roots of one deployment target.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub features: FeaturesRoot,
    pub system: SystemRoot,
}

impl Baseline {
    /// Baseline from the declared defaults of both roots.
    pub fn declared() -> Self {
        Self::default()
    }

    /// Compose one target's features and system layers over this baseline.
    pub fn compose_target<F, S>(&self, features: F, system: S) -> Result<Target, ComposeError>
    where
        F: IntoIterator,
        F::Item: Into<Layer>,
        S: IntoIterator,
        S::Item: Into<Layer>,
    {
        Ok(Target {
            features: compose(&self.features, features)?,
            system: compose(&self.system, system)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::raw;
    use crate::fragments::{
        ContainersBackend, ContainersBackendType, ContainersRuntime, DnsMode, TorFragment,
        UsersFragment, WarpEngine, WarpEngineType, WarpFragment,
    };
    use crate::overrides::RawOverride;
    use crate::variants::FixedVariant;
    use serde_json::json;

    fn no_layers() -> Vec<Layer> {
        vec![]
    }

    #[test]
    fn no_layers_yields_the_base() {
        let base = FeaturesRoot::default();
        let composed = compose(&base, no_layers()).unwrap();
        assert_eq!(composed, base);
    }

    #[test]
    fn shared_base_is_never_mutated() {
        let baseline = Baseline::declared();
        let a = baseline
            .compose_target([raw(json!({"warp": {"install": true}}))], no_layers())
            .unwrap();
        let b = baseline.compose_target(no_layers(), no_layers()).unwrap();
        assert!(a.features.warp.install);
        assert!(!b.features.warp.install);
        assert!(!baseline.features.warp.install);
    }

    #[test]
    fn later_layer_wins() {
        let base = FeaturesRoot::default();
        let composed = compose(
            &base,
            [
                raw(json!({"users": {"name": "a"}})),
                raw(json!({"users": {"name": "b"}})),
            ],
        )
        .unwrap();
        assert_eq!(composed.users.name, "b");
    }

    #[test]
    fn repeating_a_layer_is_idempotent() {
        let base = FeaturesRoot::default();
        let tor = TorFragment {
            install: true,
            socks_port: 9150,
            ..TorFragment::default()
        };
        let once = compose(&base, [Layer::from(tor.clone())]).unwrap();
        let twice = compose(&base, [Layer::from(tor.clone()), Layer::from(tor)]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn absent_layers_are_skipped() {
        let base = FeaturesRoot::default();
        let composed = compose(
            &base,
            [
                Layer::Absent,
                raw(json!({"dns": {"ecs": true}})),
                Option::<UsersFragment>::None.into(),
            ],
        )
        .unwrap();
        assert!(composed.dns.ecs);
        assert_eq!(composed.users, base.users);
    }

    #[test]
    fn mixed_layer_kinds_merge_in_order() {
        let base = FeaturesRoot::default();
        let users = UsersFragment {
            name: "ops".into(),
            sudo: false,
            ..UsersFragment::default()
        };
        let composed = compose(
            &base,
            [
                raw(json!({"tor": {"install": true}})),
                Layer::from(users),
                Layer::from(ContainersBackend::resolve(ContainersBackendType::Podman)),
                Layer::from(WarpEngine::resolve(WarpEngineType::Wireguard)),
            ],
        )
        .unwrap();
        assert!(composed.tor.install);
        assert_eq!(composed.users.name, "ops");
        assert!(!composed.users.sudo);
        assert_eq!(composed.containers.backend().runtime(), ContainersRuntime::Crun);
        assert_eq!(composed.warp.engine().config_dir(), "/etc/wgcf");
    }

    #[test]
    fn raw_layer_resets_keys_it_does_not_name() {
        let base = FeaturesRoot::default();
        let warp = WarpFragment {
            install: true,
            ..WarpFragment::default()
        };
        let composed = compose(
            &base,
            [Layer::from(warp), raw(json!({"tor": {"install": true}}))],
        )
        .unwrap();
        assert!(composed.tor.install);
        assert!(!composed.warp.install);
    }

    #[test]
    fn later_raw_system_layer_drops_earlier_hostname() {
        let base = SystemRoot::default();
        let composed = compose(
            &base,
            [
                raw(json!({"hostname": "a.example.org"})),
                raw(json!({"timezone": "Europe/Amsterdam"})),
            ],
        )
        .unwrap();
        assert_eq!(composed.timezone, "Europe/Amsterdam");
        assert_eq!(composed.hostname, None);
    }

    #[test]
    fn a_typed_fragment_resets_its_whole_section() {
        let base = FeaturesRoot::default();
        let composed = compose(
            &base,
            [
                raw(json!({"users": {"name": "a"}})),
                Layer::from(UsersFragment::default()),
            ],
        )
        .unwrap();
        assert_eq!(composed.users.name, "core");
    }

    #[test]
    fn nested_null_overwrites() {
        let base = SystemRoot::default();
        let composed = compose(
            &base,
            [
                raw(json!({"hostname": "edge.example.org"})),
                raw(json!({"hostname": null})),
            ],
        )
        .unwrap();
        assert_eq!(composed.hostname, None);
    }

    #[test]
    fn null_over_a_required_field_fails_validation() {
        let base = FeaturesRoot::default();
        let err = compose(&base, [raw(json!({"dns": {"mode": null}}))]).unwrap_err();
        assert_eq!(err.paths(), vec!["dns.mode"]);
    }

    #[test]
    fn extra_keys_are_rejected_not_ignored() {
        let base = SystemRoot::default();
        let err = compose(&base, [raw(json!({"timezone": "UTC", "kernel": "lts"}))]).unwrap_err();
        assert_eq!(err.paths(), vec!["kernel"]);
        let base = FeaturesRoot::default();
        let layer = raw(json!({"tor": {"install": true, "bridges": []}}));
        let err = compose(&base, [layer]).unwrap_err();
        assert_eq!(err.paths(), vec!["tor.bridges"]);
    }

    #[test]
    fn composition_reports_every_offending_path() {
        let base = FeaturesRoot::default();
        let err = compose(
            &base,
            [raw(json!({
                "users": {"name": "-bad"},
                "netsec": {"ufw_allow": [22, 0]},
                "dns": {"upstreams": [{"protocol": "dou", "host": "1.1.1.1", "url": "x"}]},
            }))],
        )
        .unwrap_err();
        let paths = err.paths();
        assert!(paths.contains(&"users.name"), "{paths:?}");
        assert!(paths.contains(&"netsec.ufw_allow.1"), "{paths:?}");
        assert!(paths.contains(&"dns.upstreams.0.url"), "{paths:?}");
    }

    #[test]
    fn foreign_layer_kind_is_rejected() {
        let base = SystemRoot::default();
        let err = compose(&base, [Layer::from(UsersFragment::default())]).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownLayerKind { root: "system", .. }));
    }

    #[test]
    fn ensure_absent_is_the_declared_default() {
        let features: FeaturesRoot = ensure(Layer::Absent).unwrap();
        assert_eq!(features, FeaturesRoot::default());
        let system: SystemRoot = ensure(Option::<SystemRoot>::None).unwrap();
        assert_eq!(system, SystemRoot::default());
    }

    #[test]
    fn ensure_raw_override_changes_only_named_keys() {
        let features: FeaturesRoot = ensure(raw(json!({"dns": {"mode": "none"}}))).unwrap();
        let mut expected = FeaturesRoot::default();
        expected.dns.mode = DnsMode::None;
        assert_eq!(features, expected);
    }

    #[test]
    fn ensure_passes_typed_root_through() {
        let mut system = SystemRoot::default();
        system.timezone = "Europe/Amsterdam".into();
        let ensured: SystemRoot = ensure(system.clone()).unwrap();
        assert_eq!(ensured, system);
    }

    #[test]
    fn ensure_rejects_fragments_and_foreign_roots() {
        let err = ensure::<FeaturesRoot>(UsersFragment::default()).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::UnsupportedInput { root: "features", kind: "UsersFragment" }
        ));
        let err = ensure::<SystemRoot>(FeaturesRoot::default()).unwrap_err();
        assert!(matches!(err, ComposeError::UnsupportedInput { kind: "FeaturesRoot", .. }));
    }

    #[test]
    fn ensure_validates_raw_override() {
        let err = ensure::<SystemRoot>(RawOverride::new().set("timezone", " ")).unwrap_err();
        assert_eq!(err.paths(), vec!["timezone"]);
    }

    #[test]
    fn targets_compose_in_parallel_from_one_baseline() {
        let baseline = Baseline::declared();
        let names = ["alpha", "beta", "gamma", "delta"];
        let targets: Vec<Target> = std::thread::scope(|scope| {
            let handles: Vec<_> = names
                .iter()
                .map(|name| {
                    let baseline = &baseline;
                    scope.spawn(move || {
                        baseline
                            .compose_target(
                                [raw(json!({"users": {"name": name}}))],
                                [raw(json!({"hostname": format!("{name}.example.org")}))],
                            )
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (target, name) in targets.iter().zip(names) {
            assert_eq!(target.features.users.name, name);
            assert_eq!(target.system.hostname.as_deref(), Some(format!("{name}.example.org").as_str()));
        }
        assert_eq!(baseline, Baseline::declared());
    }
}
