//! OS-level settings: base packages, locales, timezone and hostname.

use confique::Config;
use serde::Serialize;

use crate::validate::{Schema, Section, declared_defaults, non_blank, non_empty};

#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct SystemRoot {
    /// System-wide base packages to install.
    #[config(default = [
        "locales", "zsh", "git", "wget", "unzip", "jq", "gcc", "g++", "gnupg",
        "apt-transport-https", "build-essential", "libevent-dev", "ncurses-dev",
        "bison", "pkg-config", "fontconfig", "acl", "whois", "iputils-ping",
        "net-tools", "dnsutils", "bind9-host", "mtr-tiny", "ipcalc", "nmap",
        "ncat", "ifupdown2", "aha", "xsel", "direnv", "zoxide", "btop", "bat"
    ])]
    pub packages_base: Vec<String>,

    /// Locales to generate.
    #[config(default = ["en_US.UTF-8 UTF-8"])]
    pub locales: Vec<String>,

    /// System timezone, e.g. "UTC" or "Europe/Amsterdam".
    #[config(default = "UTC")]
    pub timezone: String,

    /// Fully qualified hostname. Left unconfigured when unset.
    pub hostname: Option<String>,
}

impl Default for SystemRoot {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for SystemRoot {
    fn read(section: &mut Section<'_, '_>) -> Self {
        let defaults = Self::default();
        let out = Self {
            packages_base: section.field("packages_base", defaults.packages_base),
            locales: section.field("locales", defaults.locales),
            timezone: section.field("timezone", defaults.timezone),
            hostname: section.field("hostname", defaults.hostname),
        };
        section.check("packages_base", non_empty(&out.packages_base, "packages_base"));
        section.check("locales", non_empty(&out.locales, "locales"));
        section.check("timezone", non_blank(&out.timezone, "timezone"));
        if let Some(hostname) = &out.hostname {
            section.check("hostname", validate_hostname(hostname));
        }
        out
    }
}

fn validate_hostname(hostname: &str) -> Result<(), String> {
    if hostname.is_empty() || hostname.chars().count() > 253 {
        return Err("hostname must be between 1 and 253 characters".into());
    }
    if !hostname.contains('.') {
        return Err("hostname should be a FQDN (contain a dot)".into());
    }
    if !hostname
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(
            "hostname contains invalid characters (allowed: alphanumeric, dots, hyphens)".into(),
        );
    }
    if hostname.starts_with(['.', '-']) || hostname.ends_with(['.', '-']) {
        return Err("hostname cannot start or end with dot or hyphen".into());
    }
    Ok(())
}
