//! Per-category fragment schemas and the features root that aggregates them.
//!
//! Each fragment is a `confique::Config` struct: `#[config(default)]` holds the
//! declared defaults, `///` docs feed the generated template, and the derived
//! `META` gives the section layout that layer coercion checks against.

pub mod containers;
pub mod dns;
pub mod haproxy;
pub mod netsec;
pub mod profiles;
pub mod system;
pub mod tor;
pub mod users;
pub mod warp;
pub mod xray;

use confique::Config;
use serde::Serialize;

use crate::validate::{Schema, Section, declared_defaults};

pub use containers::{ContainersBackend, ContainersBackendType, ContainersFragment, ContainersRuntime};
pub use dns::{DnsFragment, DnsMode, DnsProtocol, DnsProvider, DnsServer};
pub use haproxy::HaproxyFragment;
pub use netsec::NetSecFragment;
pub use profiles::ProfilesFragment;
pub use system::SystemRoot;
pub use tor::TorFragment;
pub use users::{Shell, UsersFragment};
pub use warp::{WarpEngine, WarpEngineType, WarpFragment};
pub use xray::XrayFragment;

/// Every functional category of a deployment target.
#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct FeaturesRoot {
    /// Containers backend.
    #[config(nested)]
    pub containers: ContainersFragment,

    /// DNS resolution.
    #[config(nested)]
    pub dns: DnsFragment,

    /// HAProxy load balancer.
    #[config(nested)]
    pub haproxy: HaproxyFragment,

    /// Firewall and network hardening.
    #[config(nested)]
    pub netsec: NetSecFragment,

    /// Shell profiles.
    #[config(nested)]
    pub profiles: ProfilesFragment,

    /// Tor proxy.
    #[config(nested)]
    pub tor: TorFragment,

    /// Managed login user.
    #[config(nested)]
    pub users: UsersFragment,

    /// Cloudflare WARP tunnel.
    #[config(nested)]
    pub warp: WarpFragment,

    /// Xray proxy core.
    #[config(nested)]
    pub xray: XrayFragment,
}

impl Default for FeaturesRoot {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for FeaturesRoot {
    fn read(section: &mut Section<'_, '_>) -> Self {
        Self {
            containers: section.nested("containers"),
            dns: section.nested("dns"),
            haproxy: section.nested("haproxy"),
            netsec: section.nested("netsec"),
            profiles: section.nested("profiles"),
            tor: section.nested("tor"),
            users: section.nested("users"),
            warp: section.nested("warp"),
            xray: section.nested("xray"),
        }
    }
}
