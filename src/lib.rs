//! Layered, validated configuration for server deployment targets.
//!
//! Every target starts from the same declared defaults and receives an
//! ordered list of override layers from its inventory. Nullforge merges the
//! layers over the defaults and hands back a typed, fully validated root, or
//! an error naming every offending field path.
//!
//! ```
//! use nullforge::{Baseline, DnsMode, Layer, RawOverride, WarpFragment};
//!
//! let baseline = Baseline::declared();
//! let warp = WarpFragment { install: true, ..WarpFragment::default() };
//! let target = baseline
//!     .compose_target(
//!         [RawOverride::new().dotted("dns.mode", "none").into(), Layer::from(warp)],
//!         [RawOverride::new().set("hostname", "edge-1.example.org")],
//!     )
//!     .unwrap();
//!
//! assert!(target.features.warp.install);
//! assert_eq!(target.features.dns.mode, DnsMode::None);
//! assert_eq!(target.system.hostname.as_deref(), Some("edge-1.example.org"));
//! assert!(!baseline.features.warp.install);
//! ```
//!
//! # Roots and fragments
//!
//! A target has two roots. [`FeaturesRoot`] holds one fragment per functional
//! category (containers, dns, haproxy, netsec, profiles, tor, users, warp,
//! xray). [`SystemRoot`] holds OS-level settings. Both are `confique::Config`
//! structs, so one definition supplies:
//!
//! - **`#[config(default = ...)]`**: the declared defaults every target
//!   starts from.
//! - **`///` doc comments**: the comments of the generated template and the
//!   doc lines returned by [`ops::get_value`].
//! - **`#[config(nested)]`**: the section layout that fragment layers are
//!   checked against.
//!
//! # Layer precedence
//!
//! ```text
//! Declared defaults     Baseline::declared()
//!        ↑ overridden by
//! Layer 1               first in the list
//!        ↑ overridden by
//! Layer N               last in the list wins
//! ```
//!
//! Records merge key by key. Sequences and scalars replace wholesale. An
//! explicit `null` overwrites what was below it, while an [`Layer::Absent`]
//! layer is skipped entirely.
//!
//! # Layer kinds
//!
//! Callers tag every input as a [`Layer`] before composing:
//!
//! - **`Absent`**: contributes nothing. `Option<T>` converts to it.
//! - **`Features` / `System`**: a complete typed root, dumped in full.
//! - **`Fragment`**: one typed category fragment, merged under its
//!   category's section. A resolved variant ([`ContainersBackend`],
//!   [`WarpEngine`]) sets its category's tag field.
//! - **`Raw`**: a [`RawOverride`], validated against the whole root schema
//!   and merged as a complete root. Keys it does not name return to their
//!   declared defaults, so a raw layer resets what earlier layers set there.
//!
//! # Variants
//!
//! Some settings are tagged unions whose fields follow from the tag. Picking
//! the `podman` backend always means the `crun` runtime; picking the
//! `wireguard` WARP engine always means `wgcf` under `/etc/wgcf`. These are
//! [`FixedVariant`]s: their values exist only through
//! [`FixedVariant::resolve`], and a structural candidate whose fields diverge
//! from its tag fails with [`ComposeError::VariantMismatch`].
//!
//! # Error handling
//!
//! All fallible operations return [`ComposeError`]. Validation runs in one
//! pass: [`ComposeError::Invalid`] carries every issue found, and
//! [`ComposeError::paths`] lists their dotted field paths. Unknown keys are
//! always rejected.

pub mod error;
pub mod fragments;
pub mod ops;
pub mod providers;
pub mod types;
pub mod variants;

mod coerce;
pub(crate) mod merge;
mod overrides;
mod resolve;
mod root;
mod validate;

#[cfg(test)]
mod fixtures;

pub use coerce::coerce;
pub use error::ComposeError;
pub use fragments::{
    ContainersBackend, ContainersBackendType, ContainersFragment, ContainersRuntime, DnsFragment,
    DnsMode, DnsProtocol, DnsProvider, DnsServer, FeaturesRoot, HaproxyFragment, NetSecFragment,
    ProfilesFragment, Shell, SystemRoot, TorFragment, UsersFragment, WarpEngine, WarpEngineType,
    WarpFragment, XrayFragment,
};
pub use merge::{Tree, deep_merge};
pub use ops::ConfigResult;
pub use overrides::{RawOverride, RawValue};
pub use resolve::{Baseline, Target, compose, ensure};
pub use root::{Claim, Root};
pub use types::{Fragment, FragmentKind, Layer};
pub use validate::{Schema, Section};
pub use variants::{FixedVariant, Variant};
