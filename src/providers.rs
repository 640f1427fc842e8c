//! Provider × protocol compatibility matrix for DNS upstreams.
//!
//! Every supported pair maps to an address set: two IPv4 resolvers, two IPv6
//! resolvers that are only used when the host has IPv6, and the TLS name for
//! DoT. Quad9 additionally has an ECS-enabled address set.

use tracing::debug;

use crate::error::ComposeError;
use crate::fragments::dns::{DnsProtocol, DnsProvider, DnsServer};

struct AddressSet {
    ipv4: [&'static str; 2],
    ipv6: [&'static str; 2],
    sni: &'static str,
}

const CLOUDFLARE: AddressSet = AddressSet {
    ipv4: ["1.1.1.1", "1.0.0.1"],
    ipv6: ["2606:4700:4700::1111", "2606:4700:4700::1001"],
    sni: "cloudflare-dns.com",
};

const GOOGLE: AddressSet = AddressSet {
    ipv4: ["8.8.8.8", "8.8.4.4"],
    ipv6: ["2001:4860:4860::8888", "2001:4860:4860::8844"],
    sni: "dns.google",
};

const QUAD9: AddressSet = AddressSet {
    ipv4: ["9.9.9.10", "149.112.112.10"],
    ipv6: ["2620:fe::10", "2620:fe::fe:10"],
    sni: "dns10.quad9.net",
};

const QUAD9_ECS: AddressSet = AddressSet {
    ipv4: ["9.9.9.12", "149.112.112.12"],
    ipv6: ["2620:fe::12", "2620:fe::fe:12"],
    sni: "dns11.quad9.net",
};

/// Supported (provider, protocol) pairs. Pairs not listed have no behavior.
const MATRIX: &[(DnsProvider, DnsProtocol)] = &[
    (DnsProvider::Cloudflare, DnsProtocol::Doh),
    (DnsProvider::Cloudflare, DnsProtocol::Dot),
    (DnsProvider::Google, DnsProtocol::Doh),
    (DnsProvider::Google, DnsProtocol::Dot),
    (DnsProvider::Quad9, DnsProtocol::Doh),
    (DnsProvider::Quad9, DnsProtocol::Dot),
];

const fn address_set(provider: DnsProvider, alternate: bool) -> &'static AddressSet {
    match provider {
        DnsProvider::Cloudflare => &CLOUDFLARE,
        DnsProvider::Google => &GOOGLE,
        DnsProvider::Quad9 if alternate => &QUAD9_ECS,
        DnsProvider::Quad9 => &QUAD9,
    }
}

/// Whether the matrix has an entry for `provider` over `protocol`.
pub fn is_supported(provider: DnsProvider, protocol: DnsProtocol) -> bool {
    MATRIX.contains(&(provider, protocol))
}

/// Build the upstream servers for `provider` over `protocol`.
///
/// `ipv6` appends the provider's IPv6 resolvers after the IPv4 ones. `ecs`
/// selects Quad9's alternate address set and is ignored for other providers.
pub fn upstreams(
    provider: DnsProvider,
    protocol: DnsProtocol,
    ipv6: bool,
    ecs: bool,
) -> Result<Vec<DnsServer>, ComposeError> {
    if !is_supported(provider, protocol) {
        return Err(ComposeError::UnsupportedCombination {
            combination: format!("provider={provider}, protocol={protocol}"),
        });
    }

    let set = address_set(provider, ecs);
    let v6: &[&str] = if ipv6 { &set.ipv6 } else { &[] };

    let v4_servers = set.ipv4.iter().map(|host| server(protocol, host, false, set.sni));
    let v6_servers = v6.iter().map(|host| server(protocol, host, true, set.sni));
    let servers = v4_servers.chain(v6_servers).collect::<Result<Vec<_>, _>>()?;

    debug!(%provider, %protocol, ipv6, ecs, count = servers.len(), "built DNS upstreams");
    Ok(servers)
}

fn server(
    protocol: DnsProtocol,
    host: &str,
    ipv6: bool,
    sni: &str,
) -> Result<DnsServer, ComposeError> {
    match protocol {
        DnsProtocol::Doh if ipv6 => DnsServer::doh(&format!("https://[{host}]/dns-query")),
        DnsProtocol::Doh => DnsServer::doh(&format!("https://{host}/dns-query")),
        DnsProtocol::Dot => Ok(DnsServer::dot(host, Some(sni))),
        DnsProtocol::Dou => Ok(DnsServer::dou(host)),
    }
}
