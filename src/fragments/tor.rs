use confique::Config;
use serde::Serialize;

use crate::validate::{Schema, Section, declared_defaults, port};

/// Tor SOCKS proxy.
#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct TorFragment {
    /// Whether to install the Tor proxy.
    #[config(default = false)]
    pub install: bool,

    /// Port of the SOCKS listener.
    #[config(default = 9050)]
    pub socks_port: u16,

    /// Port of the DNS listener.
    #[config(default = 5353)]
    pub dns_port: u16,
}

impl Default for TorFragment {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for TorFragment {
    fn read(section: &mut Section<'_, '_>) -> Self {
        let defaults = Self::default();
        let out = Self {
            install: section.field("install", defaults.install),
            socks_port: section.field("socks_port", defaults.socks_port),
            dns_port: section.field("dns_port", defaults.dns_port),
        };
        section.check("socks_port", port(out.socks_port));
        section.check("dns_port", port(out.dns_port));
        out
    }
}
