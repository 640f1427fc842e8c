use confique::Config;
use serde::Serialize;

use crate::validate::{Schema, Section, declared_defaults};

/// HAProxy load balancer.
#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct HaproxyFragment {
    /// Whether to install HAProxy.
    #[config(default = false)]
    pub install: bool,

    /// Contents of the HAProxy configuration file.
    #[config(default = "")]
    pub config: String,
}

impl Default for HaproxyFragment {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for HaproxyFragment {
    fn read(section: &mut Section<'_, '_>) -> Self {
        let defaults = Self::default();
        Self {
            install: section.field("install", defaults.install),
            config: section.field("config", defaults.config),
        }
    }
}
