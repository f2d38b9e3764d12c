pub mod config;

use clap::{Parser, Subcommand};

/// dmbridge: streams dialogue-manager turns to voice-agent platforms.
#[derive(Debug, Parser)]
#[command(name = "dmbridge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the bridge server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults and env overrides) as TOML.
    Show,
}

/// Load the config file named by `DM_CONFIG` (default `config.toml`) and
/// overlay environment overrides.  A missing file means all defaults.
pub fn load_config() -> anyhow::Result<(dm_domain::config::Config, String)> {
    let config_path =
        std::env::var("DM_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let mut config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        dm_domain::config::Config::default()
    };
    config.apply_env();

    Ok((config, config_path))
}
