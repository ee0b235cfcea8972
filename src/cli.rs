//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The extraction-service credential can come from a flag or the
//! `OPENAI_API_KEY` environment variable; everything else lives in the
//! configuration file.

use clap::Parser;

/// Command-line arguments for the outreach radar.
///
/// # Examples
///
/// ```sh
/// # Defaults: ./config.yaml and the store path it names
/// OPENAI_API_KEY=sk-... outreach_radar
///
/// # Explicit config and store override
/// outreach_radar --config ops/radar.yaml --data-path /var/lib/radar/data.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Override the store path from the configuration file
    #[arg(short, long)]
    pub data_path: Option<String>,

    /// Credential for the extraction service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}
