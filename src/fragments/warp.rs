//! Cloudflare WARP tunnel settings.
//!
//! The engine is a fixed variant: choosing `masque` or `wireguard` pins the
//! binary, config directory, service unit and helper scripts. Derived paths
//! are formatted from the engine's config directory.

use std::fmt;

use confique::Config;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ComposeError;
use crate::validate::{Schema, Section, declared_defaults};
use crate::variants::{FixedVariant, Variant, validate_fixed};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WarpEngineType {
    Wireguard,
    Masque,
}

impl WarpEngineType {
    /// Every engine, in declaration order.
    pub const ALL: [WarpEngineType; 2] = [Self::Wireguard, Self::Masque];

    /// Serialized tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wireguard => "wireguard",
            Self::Masque => "masque",
        }
    }
}

impl fmt::Display for WarpEngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpEngine {
    #[serde(rename = "type")]
    kind: WarpEngineType,
    binary_path: &'static str,
    config_dir: &'static str,
    systemd_service_name: &'static str,
    policy_script: &'static str,
    health_check_script: &'static str,
}

const MASQUE: WarpEngine = WarpEngine {
    kind: WarpEngineType::Masque,
    binary_path: "/usr/local/bin/usque",
    config_dir: "/etc/usque",
    systemd_service_name: "cloudflare-warp",
    policy_script: "/etc/usque/warp-v6-policy.sh",
    health_check_script: "/etc/usque/warp-check.sh",
};

const WIREGUARD: WarpEngine = WarpEngine {
    kind: WarpEngineType::Wireguard,
    binary_path: "/usr/local/bin/wgcf",
    config_dir: "/etc/wgcf",
    systemd_service_name: "wg-quick@warp",
    policy_script: "",
    health_check_script: "",
};

impl WarpEngine {
    /// Path of the engine's client binary.
    pub const fn binary_path(&self) -> &'static str {
        self.binary_path
    }

    /// Directory holding the engine's configuration.
    pub const fn config_dir(&self) -> &'static str {
        self.config_dir
    }

    /// Systemd unit the engine runs under.
    pub const fn systemd_service_name(&self) -> &'static str {
        self.systemd_service_name
    }

    /// Empty for engines without a policy script.
    pub const fn policy_script(&self) -> &'static str {
        self.policy_script
    }

    /// Empty for engines without a health check.
    pub const fn health_check_script(&self) -> &'static str {
        self.health_check_script
    }

    /// `{config_dir}/config.json`.
    pub fn config_path(&self) -> String {
        format!("{}/config.json", self.config_dir)
    }

    /// `{config_dir}/wgcf-account.toml`.
    pub fn account_path(&self) -> String {
        format!("{}/wgcf-account.toml", self.config_dir)
    }

    /// `{config_dir}/warp.conf`.
    pub fn profile_path(&self) -> String {
        format!("{}/warp.conf", self.config_dir)
    }
}

impl Variant for WarpEngine {
    const FAMILY: &'static str = "WARP engine";
    const TAG_FIELD: &'static str = "type";

    fn validate_at(candidate: &Value, path: &str, issues: &mut Vec<ComposeError>) -> Option<Self> {
        validate_fixed(candidate, path, issues)
    }
}

impl FixedVariant for WarpEngine {
    type Tag = WarpEngineType;

    fn tag(&self) -> WarpEngineType {
        self.kind
    }

    fn resolve(tag: WarpEngineType) -> Self {
        match tag {
            WarpEngineType::Masque => MASQUE,
            WarpEngineType::Wireguard => WIREGUARD,
        }
    }
}

#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct WarpFragment {
    /// Whether to deploy WARP.
    #[config(default = false)]
    pub install: bool,

    /// The WARP engine to use (masque or wireguard).
    #[config(default = "masque")]
    pub engine_type: WarpEngineType,

    /// Name of the network interface created for WARP.
    #[config(default = "warp")]
    pub iface: String,

    /// Whether to enroll the tunnel into Cloudflare Zero Trust.
    #[config(default = false)]
    pub zero_trust: bool,
}

impl WarpFragment {
    /// The fixed engine selected by `engine_type`.
    pub fn engine(&self) -> WarpEngine {
        WarpEngine::resolve(self.engine_type)
    }
}

impl Default for WarpFragment {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for WarpFragment {
    fn read(section: &mut Section<'_, '_>) -> Self {
        let defaults = Self::default();
        let out = Self {
            install: section.field("install", defaults.install),
            engine_type: section.field("engine_type", defaults.engine_type),
            iface: section.field("iface", defaults.iface),
            zero_trust: section.field("zero_trust", defaults.zero_trust),
        };
        section.check("iface", validate_iface(&out.iface));
        // TODO: accept zero_trust once Zero Trust enrollment is implemented.
        if out.zero_trust {
            let path = section.key_path("zero_trust");
            section.reject(ComposeError::UnsupportedCombination {
                combination: format!("{path}=true (Zero Trust enrollment is not implemented)"),
            });
        }
        out
    }
}

fn validate_iface(iface: &str) -> Result<(), String> {
    if iface.is_empty() || iface.chars().any(char::is_whitespace) {
        return Err("iface must be a non-empty string without spaces".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masque_paths_derive_from_config_dir() {
        let engine = WarpEngine::resolve(WarpEngineType::Masque);
        assert_eq!(engine.binary_path(), "/usr/local/bin/usque");
        assert_eq!(engine.config_path(), "/etc/usque/config.json");
        assert_eq!(engine.account_path(), "/etc/usque/wgcf-account.toml");
        assert_eq!(engine.profile_path(), "/etc/usque/warp.conf");
        assert_eq!(engine.policy_script(), "/etc/usque/warp-v6-policy.sh");
    }

    #[test]
    fn wireguard_has_no_helper_scripts() {
        let engine = WarpEngine::resolve(WarpEngineType::Wireguard);
        assert_eq!(engine.config_dir(), "/etc/wgcf");
        assert_eq!(engine.profile_path(), "/etc/wgcf/warp.conf");
        assert_eq!(engine.policy_script(), "");
        assert_eq!(engine.health_check_script(), "");
    }

    #[test]
    fn every_engine_resolves_to_its_own_tag() {
        for tag in WarpEngineType::ALL {
            assert_eq!(WarpEngine::resolve(tag).tag(), tag);
        }
    }

    #[test]
    fn default_fragment_uses_masque() {
        let warp = WarpFragment::default();
        assert!(!warp.install);
        assert_eq!(warp.iface, "warp");
        assert_eq!(warp.engine().systemd_service_name(), "cloudflare-warp");
    }

    #[test]
    fn zero_trust_is_rejected() {
        use crate::fragments::FeaturesRoot;
        use crate::root::Root;

        let err = FeaturesRoot::from_tree(&serde_json::json!({"warp": {"zero_trust": true}}))
            .unwrap_err();
        match err {
            ComposeError::Invalid { issues, .. } => {
                assert_eq!(issues.len(), 1);
                assert!(issues[0].to_string().contains("warp.zero_trust"));
            }
            other => panic!("Expected Invalid, got: {other:?}"),
        }
    }

    #[test]
    fn iface_rule() {
        assert!(validate_iface("warp0").is_ok());
        assert!(validate_iface("").is_err());
        assert!(validate_iface("warp 0").is_err());
    }
}
