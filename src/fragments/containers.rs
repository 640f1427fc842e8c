//! Containers backend selection.

use std::fmt;

use confique::Config;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ComposeError;
use crate::validate::{Schema, Section, declared_defaults};
use crate::variants::{FixedVariant, Variant, validate_fixed};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContainersBackendType {
    Docker,
    Podman,
    Crio,
}

impl ContainersBackendType {
    /// Every backend, in declaration order.
    pub const ALL: [ContainersBackendType; 3] = [Self::Docker, Self::Podman, Self::Crio];

    /// Serialized tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
            Self::Crio => "crio",
        }
    }
}

impl fmt::Display for ContainersBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContainersRuntime {
    Default,
    Crun,
    Gvisor,
}

/// A resolved containers backend. Each backend runs exactly one runtime.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainersBackend {
    #[serde(rename = "type")]
    kind: ContainersBackendType,
    runtime: ContainersRuntime,
}

impl ContainersBackend {
    /// OCI runtime this backend always uses.
    pub const fn runtime(&self) -> ContainersRuntime {
        self.runtime
    }
}

impl Variant for ContainersBackend {
    const FAMILY: &'static str = "containers backend";
    const TAG_FIELD: &'static str = "type";

    fn validate_at(candidate: &Value, path: &str, issues: &mut Vec<ComposeError>) -> Option<Self> {
        validate_fixed(candidate, path, issues)
    }
}

impl FixedVariant for ContainersBackend {
    type Tag = ContainersBackendType;

    fn tag(&self) -> ContainersBackendType {
        self.kind
    }

    fn resolve(tag: ContainersBackendType) -> Self {
        let runtime = match tag {
            ContainersBackendType::Docker => ContainersRuntime::Gvisor,
            ContainersBackendType::Podman => ContainersRuntime::Crun,
            ContainersBackendType::Crio => ContainersRuntime::Default,
        };
        Self { kind: tag, runtime }
    }
}

#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct ContainersFragment {
    /// Whether to install a containers backend.
    #[config(default = false)]
    pub install: bool,

    /// Which containers backend to use (docker, podman or crio).
    #[config(default = "docker")]
    pub backend_type: ContainersBackendType,

    /// Whether to install skopeo alongside the backend.
    #[config(default = true)]
    pub skopeo: bool,
}

impl ContainersFragment {
    /// The fixed backend selected by `backend_type`.
    pub fn backend(&self) -> ContainersBackend {
        ContainersBackend::resolve(self.backend_type)
    }
}

impl Default for ContainersFragment {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for ContainersFragment {
    fn read(section: &mut Section<'_, '_>) -> Self {
        let defaults = Self::default();
        Self {
            install: section.field("install", defaults.install),
            backend_type: section.field("backend_type", defaults.backend_type),
            skopeo: section.field("skopeo", defaults.skopeo),
        }
    }
}
