//! DNS resolution settings and the DNS server variant family.

use std::fmt;

use confique::Config;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::ComposeError;
use crate::providers;
use crate::validate::{Schema, Section, declared_defaults, kind_of, non_blank, port};
use crate::variants::{Variant, join, read_tag};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DnsProtocol {
    Dou,
    Dot,
    Doh,
}

impl DnsProtocol {
    /// Every protocol, in declaration order.
    pub const ALL: [DnsProtocol; 3] = [Self::Dou, Self::Dot, Self::Doh];

    /// Serialized tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dou => "dou",
            Self::Dot => "dot",
            Self::Doh => "doh",
        }
    }

    /// Fields allowed for a server of this protocol, besides the tag.
    const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Dou => &["host", "port"],
            Self::Dot => &["host", "port", "sni"],
            Self::Doh => &["url"],
        }
    }
}

impl fmt::Display for DnsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DnsMode {
    Dou,
    DotResolved,
    DohResolved,
    DohRaw,
    None,
}

impl DnsMode {
    /// Serialized tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dou => "dou",
            Self::DotResolved => "dot_resolved",
            Self::DohResolved => "doh_resolved",
            Self::DohRaw => "doh_raw",
            Self::None => "none",
        }
    }
}

impl fmt::Display for DnsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DnsProvider {
    Cloudflare,
    Google,
    Quad9,
}

impl DnsProvider {
    /// Every provider, in declaration order.
    pub const ALL: [DnsProvider; 3] = [Self::Cloudflare, Self::Google, Self::Quad9];

    /// Serialized tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cloudflare => "cloudflare",
            Self::Google => "google",
            Self::Quad9 => "quad9",
        }
    }
}

impl fmt::Display for DnsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_dou_port() -> u16 {
    53
}

fn default_dot_port() -> u16 {
    853
}

/// Plain DNS over UDP.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DnsServerDou {
    /// Resolver hostname or IP.
    pub host: String,
    #[serde(default = "default_dou_port")]
    pub port: u16,
}

/// DNS over TLS.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DnsServerDot {
    /// Resolver hostname or IP.
    pub host: String,
    #[serde(default = "default_dot_port")]
    pub port: u16,
    /// Hostname presented for TLS verification.
    #[serde(default)]
    pub sni: Option<String>,
}

/// DNS over HTTPS (RFC 8484).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DnsServerDoh {
    pub url: Url,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum DnsServer {
    Dou(DnsServerDou),
    Dot(DnsServerDot),
    Doh(DnsServerDoh),
}

impl DnsServer {
    /// A plain DNS server on the default port 53.
    pub fn dou(host: impl Into<String>) -> Self {
        DnsServer::Dou(DnsServerDou {
            host: host.into(),
            port: default_dou_port(),
        })
    }

    /// A DoT server on the default port 853.
    pub fn dot(host: impl Into<String>, sni: Option<&str>) -> Self {
        DnsServer::Dot(DnsServerDot {
            host: host.into(),
            port: default_dot_port(),
            sni: sni.map(str::to_string),
        })
    }

    /// A DoH endpoint. Only `https` URLs are accepted.
    pub fn doh(url: &str) -> Result<Self, ComposeError> {
        let url = Url::parse(url)?;
        require_https(&url).map_err(|reason| ComposeError::violation("url", reason))?;
        Ok(DnsServer::Doh(DnsServerDoh { url }))
    }

    /// Protocol named by this server's tag.
    pub const fn protocol(&self) -> DnsProtocol {
        match self {
            DnsServer::Dou(_) => DnsProtocol::Dou,
            DnsServer::Dot(_) => DnsProtocol::Dot,
            DnsServer::Doh(_) => DnsProtocol::Doh,
        }
    }

    /// `host:port`, plus `#sni` for DoT. `None` for DoH.
    pub fn address(&self) -> Option<String> {
        match self {
            DnsServer::Dou(s) => Some(format!("{}:{}", s.host, s.port)),
            DnsServer::Dot(s) => Some(match &s.sni {
                Some(sni) => format!("{}:{}#{sni}", s.host, s.port),
                None => format!("{}:{}", s.host, s.port),
            }),
            DnsServer::Doh(_) => None,
        }
    }
}

fn require_https(url: &Url) -> Result<(), String> {
    if url.scheme() != "https" {
        return Err("DoH endpoint must use HTTPS".into());
    }
    Ok(())
}

fn parse_shape<T: DeserializeOwned>(
    record: &serde_json::Map<String, Value>,
    protocol: DnsProtocol,
    path: &str,
    issues: &mut Vec<ComposeError>,
) -> Option<T> {
    let mut ignored = Vec::new();
    let candidate = Value::Object(record.clone());
    let parsed: Result<T, _> =
        serde_ignored::deserialize(&candidate, |field| ignored.push(field.to_string()));
    for field in ignored {
        if field == DnsServer::TAG_FIELD {
            continue;
        }
        let field_path = join(path, &field);
        let foreign = DnsProtocol::ALL
            .iter()
            .any(|other| *other != protocol && other.fields().contains(&field.as_str()));
        if foreign {
            issues.push(ComposeError::VariantMismatch {
                path: field_path,
                tag: protocol.to_string(),
                field,
                reason: format!("not a field of {protocol} servers"),
            });
        } else {
            issues.push(ComposeError::violation(field_path, "unknown field"));
        }
    }
    match parsed {
        Ok(shape) => Some(shape),
        Err(e) => {
            issues.push(ComposeError::violation(
                if path.is_empty() { "<root>" } else { path },
                e.to_string(),
            ));
            None
        }
    }
}

impl Variant for DnsServer {
    const FAMILY: &'static str = "DNS server";
    const TAG_FIELD: &'static str = "protocol";

    fn validate_at(candidate: &Value, path: &str, issues: &mut Vec<ComposeError>) -> Option<Self> {
        let (protocol, record) = read_tag::<DnsProtocol>(candidate, Self::TAG_FIELD, path, issues)?;
        let before = issues.len();
        let server = match protocol {
            DnsProtocol::Dou => parse_shape(record, protocol, path, issues).map(DnsServer::Dou),
            DnsProtocol::Dot => parse_shape(record, protocol, path, issues).map(DnsServer::Dot),
            DnsProtocol::Doh => parse_shape(record, protocol, path, issues).map(DnsServer::Doh),
        };
        let rules = match &server {
            Some(DnsServer::Dou(s)) => vec![
                ("host", non_blank(&s.host, "host")),
                ("port", port(s.port)),
            ],
            Some(DnsServer::Dot(s)) => vec![
                ("host", non_blank(&s.host, "host")),
                ("port", port(s.port)),
            ],
            Some(DnsServer::Doh(s)) => vec![("url", require_https(&s.url))],
            None => vec![],
        };
        for (field, outcome) in rules {
            if let Err(reason) = outcome {
                issues.push(ComposeError::violation(join(path, field), reason));
            }
        }
        if issues.len() == before { server } else { None }
    }
}

/// Parse an optional list of servers, validating each entry as a variant.
fn read_servers(
    value: &Value,
    path: &str,
    issues: &mut Vec<ComposeError>,
) -> Option<Vec<DnsServer>> {
    match value {
        Value::Null => None,
        Value::Array(entries) => Some(
            entries
                .iter()
                .enumerate()
                .filter_map(|(i, entry)| {
                    DnsServer::validate_at(entry, &format!("{path}.{i}"), issues)
                })
                .collect(),
        ),
        other => {
            issues.push(ComposeError::violation(
                path,
                format!("expected a sequence of DNS servers, found {}", kind_of(other)),
            ));
            None
        }
    }
}

#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct DnsFragment {
    /// How DNS resolution is performed on the host
    /// (dou, dot_resolved, doh_resolved, doh_raw or none).
    #[config(default = "doh_resolved")]
    pub mode: DnsMode,

    /// Provider of the upstream servers (cloudflare, google or quad9).
    #[config(default = "cloudflare")]
    pub upstream_provider: DnsProvider,

    /// Use the ECS-enabled (EDNS Client Subnet) address set. Quad9 only.
    #[config(default = false)]
    pub ecs: bool,

    /// Primary upstream servers. Derived from provider and mode when unset.
    pub upstreams: Option<Vec<DnsServer>>,

    /// Fallback servers used when every upstream is unreachable.
    pub fallbacks: Option<Vec<DnsServer>>,
}

impl DnsFragment {
    /// Transport the configured mode resolves upstreams with, if any.
    pub const fn upstream_protocol(&self) -> Option<DnsProtocol> {
        match self.mode {
            DnsMode::DohResolved | DnsMode::DohRaw => Some(DnsProtocol::Doh),
            DnsMode::DotResolved => Some(DnsProtocol::Dot),
            DnsMode::Dou | DnsMode::None => None,
        }
    }

    /// URLs of the DoH upstreams, in order. Other protocols are skipped.
    pub fn upstream_dns(&self) -> Vec<String> {
        self.upstreams
            .iter()
            .flatten()
            .filter_map(|server| match server {
                DnsServer::Doh(doh) => Some(doh.url.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Comma-joined fallback addresses; DoH entries are skipped.
    pub fn fallback_dns(&self) -> String {
        self.fallbacks
            .iter()
            .flatten()
            .filter_map(DnsServer::address)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Return a copy with `upstreams` filled from the provider matrix, unless
    /// already set. This is the only post-composition change a DNS fragment
    /// sees, and it never touches `self`.
    pub fn with_resolved_upstreams(&self, ipv6: bool) -> Result<Self, ComposeError> {
        if self.mode == DnsMode::Dou {
            return Err(ComposeError::UnsupportedCombination {
                combination: "dns.mode=dou (DNS over UDP is not implemented)".into(),
            });
        }
        if self.upstreams.is_some() {
            return Ok(self.clone());
        }
        let Some(protocol) = self.upstream_protocol() else {
            return Ok(self.clone());
        };
        let upstreams = providers::upstreams(self.upstream_provider, protocol, ipv6, self.ecs)?;
        Ok(Self {
            upstreams: Some(upstreams),
            ..self.clone()
        })
    }
}

impl Default for DnsFragment {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for DnsFragment {
    fn read(section: &mut Section<'_, '_>) -> Self {
        let defaults = Self::default();
        Self {
            mode: section.field("mode", defaults.mode),
            upstream_provider: section.field("upstream_provider", defaults.upstream_provider),
            ecs: section.field("ecs", defaults.ecs),
            upstreams: section.field_with("upstreams", defaults.upstreams, read_servers),
            fallbacks: section.field_with("fallbacks", defaults.fallbacks, read_servers),
        }
    }
}
