use confique::Config;
use serde::Serialize;

use crate::validate::{Schema, Section, declared_defaults};

/// Xray proxy core.
#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct XrayFragment {
    /// Whether to install Xray core.
    #[config(default = false)]
    pub install: bool,
}

impl Default for XrayFragment {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for XrayFragment {
    fn read(section: &mut Section<'_, '_>) -> Self {
        Self {
            install: section.field("install", Self::default().install),
        }
    }
}
