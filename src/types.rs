use serde_json::{Map, Value};

use crate::error::ComposeError;
use crate::fragments::{
    ContainersBackend, ContainersFragment, DnsFragment, FeaturesRoot, HaproxyFragment,
    NetSecFragment, ProfilesFragment, SystemRoot, TorFragment, UsersFragment, WarpEngine,
    WarpFragment, XrayFragment,
};
use crate::overrides::RawOverride;
use crate::variants::FixedVariant;

/// One override input, tagged by the caller before composition.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    /// Contributes nothing; skipped by the merge loop.
    Absent,
    /// A complete, already-typed features root.
    Features(Box<FeaturesRoot>),
    /// A complete, already-typed system root.
    System(Box<SystemRoot>),
    /// A single typed category fragment or variant.
    Fragment(Fragment),
    /// Untyped key/value overrides, validated against the full schema
    /// before they are merged.
    Raw(RawOverride),
}

impl Layer {
    /// Type name of the carried value, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Absent => "Absent",
            Layer::Features(_) => "FeaturesRoot",
            Layer::System(_) => "SystemRoot",
            Layer::Fragment(fragment) => fragment.kind().type_name(),
            Layer::Raw(_) => "RawOverride",
        }
    }
}

impl From<FeaturesRoot> for Layer {
    fn from(root: FeaturesRoot) -> Self {
        Layer::Features(Box::new(root))
    }
}

impl From<SystemRoot> for Layer {
    fn from(root: SystemRoot) -> Self {
        Layer::System(Box::new(root))
    }
}

impl From<Fragment> for Layer {
    fn from(fragment: Fragment) -> Self {
        Layer::Fragment(fragment)
    }
}

impl From<RawOverride> for Layer {
    fn from(raw: RawOverride) -> Self {
        Layer::Raw(raw)
    }
}

impl<T: Into<Layer>> From<Option<T>> for Layer {
    fn from(value: Option<T>) -> Self {
        value.map_or(Layer::Absent, Into::into)
    }
}

/// Which fragment a [`Fragment`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Containers,
    Dns,
    Haproxy,
    NetSec,
    Profiles,
    Tor,
    Users,
    Warp,
    Xray,
    ContainersBackend,
    WarpEngine,
}

impl FragmentKind {
    /// Every fragment kind, in table order.
    pub const ALL: [FragmentKind; 11] = [
        Self::Containers,
        Self::Dns,
        Self::Haproxy,
        Self::NetSec,
        Self::Profiles,
        Self::Tor,
        Self::Users,
        Self::Warp,
        Self::Xray,
        Self::ContainersBackend,
        Self::WarpEngine,
    ];

    /// Rust type name, as reported in errors.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Containers => "ContainersFragment",
            Self::Dns => "DnsFragment",
            Self::Haproxy => "HaproxyFragment",
            Self::NetSec => "NetSecFragment",
            Self::Profiles => "ProfilesFragment",
            Self::Tor => "TorFragment",
            Self::Users => "UsersFragment",
            Self::Warp => "WarpFragment",
            Self::Xray => "XrayFragment",
            Self::ContainersBackend => "ContainersBackend",
            Self::WarpEngine => "WarpEngine",
        }
    }

    /// Key of the [`FeaturesRoot`] section this kind belongs under. Must stay
    /// in lockstep with the root's field names; coercion rejects a key the
    /// root doesn't have.
    pub const fn category(self) -> &'static str {
        match self {
            Self::Containers | Self::ContainersBackend => "containers",
            Self::Dns => "dns",
            Self::Haproxy => "haproxy",
            Self::NetSec => "netsec",
            Self::Profiles => "profiles",
            Self::Tor => "tor",
            Self::Users => "users",
            Self::Warp | Self::WarpEngine => "warp",
            Self::Xray => "xray",
        }
    }
}

/// A single typed fragment, or a resolved variant standing in for its
/// category's tag field.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Containers(ContainersFragment),
    Dns(DnsFragment),
    Haproxy(HaproxyFragment),
    NetSec(NetSecFragment),
    Profiles(ProfilesFragment),
    Tor(TorFragment),
    Users(UsersFragment),
    Warp(WarpFragment),
    Xray(XrayFragment),
    ContainersBackend(ContainersBackend),
    WarpEngine(WarpEngine),
}

impl Fragment {
    /// Table entry for this fragment's type.
    pub fn kind(&self) -> FragmentKind {
        match self {
            Fragment::Containers(_) => FragmentKind::Containers,
            Fragment::Dns(_) => FragmentKind::Dns,
            Fragment::Haproxy(_) => FragmentKind::Haproxy,
            Fragment::NetSec(_) => FragmentKind::NetSec,
            Fragment::Profiles(_) => FragmentKind::Profiles,
            Fragment::Tor(_) => FragmentKind::Tor,
            Fragment::Users(_) => FragmentKind::Users,
            Fragment::Warp(_) => FragmentKind::Warp,
            Fragment::Xray(_) => FragmentKind::Xray,
            Fragment::ContainersBackend(_) => FragmentKind::ContainersBackend,
            Fragment::WarpEngine(_) => FragmentKind::WarpEngine,
        }
    }

    /// Structural dump of the carried value itself.
    pub fn dump(&self) -> Result<Value, ComposeError> {
        let value = match self {
            Fragment::Containers(f) => serde_json::to_value(f),
            Fragment::Dns(f) => serde_json::to_value(f),
            Fragment::Haproxy(f) => serde_json::to_value(f),
            Fragment::NetSec(f) => serde_json::to_value(f),
            Fragment::Profiles(f) => serde_json::to_value(f),
            Fragment::Tor(f) => serde_json::to_value(f),
            Fragment::Users(f) => serde_json::to_value(f),
            Fragment::Warp(f) => serde_json::to_value(f),
            Fragment::Xray(f) => serde_json::to_value(f),
            Fragment::ContainersBackend(v) => serde_json::to_value(v),
            Fragment::WarpEngine(v) => serde_json::to_value(v),
        }?;
        Ok(value)
    }

    /// What this fragment contributes inside its category section. A variant
    /// contributes only its tag; its fixed fields follow from the tag.
    pub(crate) fn section_value(&self) -> Result<Value, ComposeError> {
        match self {
            Fragment::ContainersBackend(backend) => Ok(tag_section("backend_type", backend.tag())?),
            Fragment::WarpEngine(engine) => Ok(tag_section("engine_type", engine.tag())?),
            other => other.dump(),
        }
    }
}

fn tag_section(field: &str, tag: impl serde::Serialize) -> Result<Value, serde_json::Error> {
    let mut section = Map::new();
    section.insert(field.to_string(), serde_json::to_value(tag)?);
    Ok(Value::Object(section))
}

macro_rules! fragment_conversions {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Fragment {
                fn from(value: $ty) -> Self {
                    Fragment::$variant(value)
                }
            }

            impl From<$ty> for Layer {
                fn from(value: $ty) -> Self {
                    Layer::Fragment(Fragment::$variant(value))
                }
            }
        )*
    };
}

fragment_conversions!(
    Containers(ContainersFragment),
    Dns(DnsFragment),
    Haproxy(HaproxyFragment),
    NetSec(NetSecFragment),
    Profiles(ProfilesFragment),
    Tor(TorFragment),
    Users(UsersFragment),
    Warp(WarpFragment),
    Xray(XrayFragment),
    ContainersBackend(ContainersBackend),
    WarpEngine(WarpEngine),
);
