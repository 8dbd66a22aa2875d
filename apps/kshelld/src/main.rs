// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point for the kshelld command engine daemon.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! CLI entry point for the kshelld command engine daemon.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, LevelFilter};

use kshelld::{load_scheme, ConfigOverrides, DaemonConfig, EventLoop, Interest, Listener};

/// kshelld command-line arguments.
#[derive(Debug, Parser)]
#[command(author = "Lukas Bower", version, about = "kshell command engine daemon", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Unix socket to listen on.
    #[arg(long, value_name = "PATH")]
    socket: Option<PathBuf>,

    /// Scheme file or directory; repeat or separate with ':' or ';'.
    #[arg(long = "scheme", value_name = "PATH")]
    scheme: Vec<String>,

    /// View new sessions start in.
    #[arg(long, value_name = "NAME")]
    start_entry: Option<String>,

    /// Require AUTH before any other request.
    #[arg(long)]
    require_auth: bool,

    /// Load and validate the scheme, print a summary and exit.
    #[arg(long)]
    check: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn env_string(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_owned()))
            }
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(anyhow!("failed to read {key}: {err}")),
    }
}

fn env_override(cli_value: Option<String>, key: &str) -> Result<Option<String>> {
    if cli_value.is_some() {
        return Ok(cli_value);
    }
    env_string(key)
}

fn build_overrides(cli: &Cli) -> Result<ConfigOverrides> {
    let socket = env_override(
        cli.socket.as_ref().map(|path| path.display().to_string()),
        "KSHELLD_SOCKET",
    )?;
    let scheme = if cli.scheme.is_empty() {
        env_string("KSHELLD_SCHEME")?.into_iter().collect()
    } else {
        cli.scheme.clone()
    };
    let start_entry = env_override(cli.start_entry.clone(), "KSHELLD_START_ENTRY")?;
    let require_auth = if cli.require_auth {
        Some(true)
    } else {
        env_string("KSHELLD_REQUIRE_AUTH")?
            .map(|value| {
                value
                    .parse::<bool>()
                    .map_err(|err| anyhow!("invalid KSHELLD_REQUIRE_AUTH value '{value}': {err}"))
            })
            .transpose()?
    };
    Ok(ConfigOverrides {
        socket: socket.map(PathBuf::from),
        scheme,
        start_entry,
        require_auth,
    })
}

fn resolve_config_path(cli_path: Option<PathBuf>) -> Result<Option<PathBuf>> {
    if cli_path.is_some() {
        return Ok(cli_path);
    }
    Ok(env_string("KSHELLD_CONFIG")?.map(PathBuf::from))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = resolve_config_path(cli.config.clone())?;
    let overrides = build_overrides(&cli)?;
    let config = DaemonConfig::load(config_path.as_deref())?
        .with_overrides(&overrides)
        .context("apply kshelld overrides")?;

    let scheme = load_scheme(&config.scheme_paths).context("load scheme")?;
    if scheme.view(&config.start_entry).is_none() {
        return Err(anyhow!(
            "start entry \"{}\" is not a view of the loaded scheme",
            config.start_entry
        ));
    }
    if cli.check {
        println!(
            "scheme ok: {} views, {} entries, start entry \"{}\"",
            scheme.views().len(),
            scheme.len(),
            config.start_entry
        );
        return Ok(());
    }

    let listener = Listener::bind(
        &config.socket,
        Arc::new(scheme),
        config.connection_options(),
    )
    .with_context(|| format!("bind {}", config.socket.display()))?;
    let mut eloop = EventLoop::new(config.tick);
    eloop.register(Box::new(listener), Interest::READ);
    info!("kshelld ready");
    eloop.run().context("event loop failed")?;
    Ok(())
}
