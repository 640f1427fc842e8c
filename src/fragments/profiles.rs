use confique::Config;
use serde::Serialize;

use crate::validate::{Schema, Section, declared_defaults};

/// Shell profile (dotfile) installation.
#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct ProfilesFragment {
    /// Whether to install the shell profiles.
    #[config(default = true)]
    pub install: bool,

    /// Install the profiles for root.
    #[config(default = true)]
    pub for_root: bool,

    /// Install the profiles for the managed user.
    #[config(default = false)]
    pub for_user: bool,
}

impl Default for ProfilesFragment {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for ProfilesFragment {
    fn read(section: &mut Section<'_, '_>) -> Self {
        let defaults = Self::default();
        Self {
            install: section.field("install", defaults.install),
            for_root: section.field("for_root", defaults.for_root),
            for_user: section.field("for_user", defaults.for_user),
        }
    }
}
