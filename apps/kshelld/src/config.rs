// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Load kshelld settings from TOML and layer overrides on top.
// Author: Lukas Bower

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::connection::ConnectionOptions;

/// Default listening socket.
pub const DEFAULT_SOCKET: &str = "/tmp/kshelld.sock";
/// Default scheme search path.
pub const DEFAULT_SCHEME_PATH: &str = "/etc/kshell;~/.kshell";
/// Default view sessions start in.
pub const DEFAULT_START_ENTRY: &str = "main";
/// Default cap on the declared frame length.
pub const DEFAULT_MAX_MESSAGE_LEN: u32 = 1024 * 1024;
/// Default poll timeout in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 100;

/// Effective daemon settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Unix socket to listen on.
    pub socket: PathBuf,
    /// Scheme files or directories, loaded in order.
    pub scheme_paths: Vec<PathBuf>,
    /// View every session starts in.
    pub start_entry: String,
    /// Whether clients must send AUTH before other requests.
    pub require_auth: bool,
    /// Largest declared frame length accepted.
    pub max_message_len: u32,
    /// Idle poll timeout; also paces process reaping.
    pub tick: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET),
            scheme_paths: split_scheme_paths(DEFAULT_SCHEME_PATH),
            start_entry: DEFAULT_START_ENTRY.to_owned(),
            require_auth: false,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            tick: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

/// Values layered over the file settings, typically from CLI and environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Override the socket path.
    pub socket: Option<PathBuf>,
    /// Replace the scheme path list when non-empty.
    pub scheme: Vec<String>,
    /// Override the start view.
    pub start_entry: Option<String>,
    /// Force authentication on.
    pub require_auth: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    socket: Option<PathBuf>,
    scheme: Option<SchemeSetting>,
    start_entry: Option<String>,
    require_auth: Option<bool>,
    max_message_len: Option<u32>,
    tick_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SchemeSetting {
    One(String),
    Many(Vec<String>),
}

impl DaemonConfig {
    /// Load settings from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read kshelld config {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("invalid kshelld config {}", path.display()))
    }

    /// Parse settings from TOML text, filling gaps with defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let parsed: ConfigToml = toml::from_str(text)?;
        let mut config = Self::default();
        if let Some(socket) = parsed.socket {
            config.socket = socket;
        }
        match parsed.scheme {
            Some(SchemeSetting::One(list)) => config.scheme_paths = split_scheme_paths(&list),
            Some(SchemeSetting::Many(entries)) => {
                config.scheme_paths = entries
                    .iter()
                    .flat_map(|entry| split_scheme_paths(entry))
                    .collect();
            }
            None => {}
        }
        if let Some(start_entry) = parsed.start_entry {
            config.start_entry = start_entry;
        }
        if let Some(require_auth) = parsed.require_auth {
            config.require_auth = require_auth;
        }
        if let Some(max_message_len) = parsed.max_message_len {
            config.max_message_len = max_message_len;
        }
        if let Some(tick_ms) = parsed.tick_ms {
            config.tick = Duration::from_millis(tick_ms);
        }
        validate_config(&config)?;
        Ok(config)
    }

    /// Apply overrides and return the updated settings.
    pub fn with_overrides(self, overrides: &ConfigOverrides) -> Result<Self> {
        let mut updated = self;
        if let Some(socket) = &overrides.socket {
            updated.socket = socket.clone();
        }
        if !overrides.scheme.is_empty() {
            updated.scheme_paths = overrides
                .scheme
                .iter()
                .flat_map(|entry| split_scheme_paths(entry))
                .collect();
        }
        if let Some(start_entry) = &overrides.start_entry {
            updated.start_entry = start_entry.clone();
        }
        if let Some(require_auth) = overrides.require_auth {
            updated.require_auth = require_auth;
        }
        validate_config(&updated)?;
        Ok(updated)
    }

    /// Per-connection settings derived from these settings.
    #[must_use]
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            start_entry: self.start_entry.clone(),
            require_auth: self.require_auth,
            max_message_len: self.max_message_len,
        }
    }
}

fn validate_config(config: &DaemonConfig) -> Result<()> {
    if config.start_entry.trim().is_empty() {
        return Err(anyhow!("start_entry must not be empty"));
    }
    if (config.max_message_len as usize) < kshell_wire::HEADER_LEN {
        return Err(anyhow!(
            "max_message_len {} cannot hold a {}-byte header",
            config.max_message_len,
            kshell_wire::HEADER_LEN
        ));
    }
    if config.tick.is_zero() {
        return Err(anyhow!("tick_ms must be greater than zero"));
    }
    if config.scheme_paths.is_empty() {
        return Err(anyhow!("at least one scheme path is required"));
    }
    Ok(())
}

/// Split a `:`/`;` separated path list, expanding a leading `~`.
#[must_use]
pub fn split_scheme_paths(list: &str) -> Vec<PathBuf> {
    list.split([':', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(expand_home)
        .collect()
}

fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return PathBuf::from(path),
    };
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest.trim_start_matches('/')),
        None => PathBuf::from(path),
    }
}
