//! Firewall and kernel hardening settings.

use confique::Config;
use serde::Serialize;

use crate::validate::{Schema, Section, declared_defaults, non_empty, port};

#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct NetSecFragment {
    /// Whether to enable the UFW firewall.
    #[config(default = true)]
    pub ufw: bool,

    /// Inbound ports allowed through UFW.
    #[config(default = [22])]
    pub ufw_allow: Vec<u16>,

    /// Whether to apply sysctl network tuning.
    #[config(default = true)]
    pub sysctl_tuning: bool,
}

impl NetSecFragment {
    /// Return a copy that also allows `ports`, keeping first-seen order and
    /// dropping duplicates.
    pub fn with_ufw_allow(&self, ports: impl IntoIterator<Item = u16>) -> Self {
        let mut allowed = Vec::with_capacity(self.ufw_allow.len());
        for port in self.ufw_allow.iter().copied().chain(ports) {
            if !allowed.contains(&port) {
                allowed.push(port);
            }
        }
        Self {
            ufw_allow: allowed,
            ..self.clone()
        }
    }
}

impl Default for NetSecFragment {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for NetSecFragment {
    fn read(section: &mut Section<'_, '_>) -> Self {
        let defaults = Self::default();
        let out = Self {
            ufw: section.field("ufw", defaults.ufw),
            ufw_allow: section.field("ufw_allow", defaults.ufw_allow),
            sysctl_tuning: section.field("sysctl_tuning", defaults.sysctl_tuning),
        };
        section.check("ufw_allow", non_empty(&out.ufw_allow, "ufw_allow"));
        for (i, allowed) in out.ufw_allow.iter().enumerate() {
            section.check(&format!("ufw_allow.{i}"), port(*allowed));
        }
        out
    }
}
