//! Layered settings for the `slotwatch` binary.
//!
//! Precedence, lowest first: built-in defaults, the optional config file,
//! `SLOTWATCH_*` environment variables, command-line flags.

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use slotwatch_monitor::{MonitorConfig, MonitorConfigPatch};

/// Prefix for environment overrides, e.g. `SLOTWATCH_RPC_ENDPOINT`.
pub const ENV_PREFIX: &str = "SLOTWATCH";

/// Load settings from `path` (if any) and the process environment, then
/// apply `cli` on top.
pub fn load(path: Option<&Path>, cli: MonitorConfigPatch) -> Result<MonitorConfig> {
    load_with_env(path, environment(), cli)
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

fn load_with_env(
    path: Option<&Path>,
    env: Environment,
    cli: MonitorConfigPatch,
) -> Result<MonitorConfig> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }

    let layered: MonitorConfigPatch = builder
        .add_source(env)
        .build()
        .context("failed to read settings")?
        .try_deserialize()
        .context("invalid settings")?;

    let config = MonitorConfig::from_patch(layered.merge(cli))?;
    Ok(config)
}
