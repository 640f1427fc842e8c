use std::sync::LazyLock;

use confique::Config;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validate::{Schema, Section, declared_defaults};

/// Login shell. Inventories may name it either by tag or by path.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Shell {
    #[serde(alias = "/bin/bash")]
    Bash,
    #[serde(alias = "/bin/zsh")]
    Zsh,
    #[serde(alias = "/usr/bin/zsh")]
    ZshUser,
}

impl Shell {
    /// Absolute path of the shell binary.
    pub const fn path(self) -> &'static str {
        match self {
            Shell::Bash => "/bin/bash",
            Shell::Zsh => "/bin/zsh",
            Shell::ZshUser => "/usr/bin/zsh",
        }
    }
}

#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct UsersFragment {
    /// Whether to manage the login user at all.
    #[config(default = true)]
    pub manage: bool,

    /// Login name of the managed user.
    #[config(default = "core")]
    pub name: String,

    /// Password for the user. Key-only login when unset.
    pub password: Option<String>,

    /// Whether to add the user to the sudo group.
    #[config(default = true)]
    pub sudo: bool,

    /// Login shell (bash, zsh or zsh_user).
    #[config(default = "zsh")]
    pub shell: Shell,

    /// Whether to copy root's authorized SSH keys to the user.
    #[config(default = true)]
    pub copy_root_keys: bool,

    /// Whether root gets the same login shell as the user.
    #[config(default = true)]
    pub set_root_shell_like_user: bool,
}

impl UsersFragment {
    /// Absolute path of the configured login shell.
    pub fn shell_path(&self) -> &'static str {
        self.shell.path()
    }
}

impl Default for UsersFragment {
    fn default() -> Self {
        declared_defaults()
    }
}

impl Schema for UsersFragment {
    fn read(section: &mut Section<'_, '_>) -> Self {
        let defaults = Self::default();
        let out = Self {
            manage: section.field("manage", defaults.manage),
            name: section.field("name", defaults.name),
            password: section.field("password", defaults.password),
            sudo: section.field("sudo", defaults.sudo),
            shell: section.field("shell", defaults.shell),
            copy_root_keys: section.field("copy_root_keys", defaults.copy_root_keys),
            set_root_shell_like_user: section
                .field("set_root_shell_like_user", defaults.set_root_shell_like_user),
        };
        section.check("name", validate_name(&out.name));
        out
    }
}

/// POSIX portable filename character set.
static PORTABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("portable name pattern is valid"));

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".into());
    }
    if name.starts_with('-') {
        return Err("name cannot start with a hyphen".into());
    }
    if !PORTABLE_NAME.is_match(name) {
        return Err(
            "name must only contain characters from the portable filename character set".into(),
        );
    }
    Ok(())
}
