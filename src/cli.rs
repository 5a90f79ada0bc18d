//! Command-line entrypoint: flags for config path, bind address, log
//! format, and one-shot subcommands, mirroring the teacher's `cli.rs`
//! ergonomics (SPEC_FULL §A).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use rsearch_coord::cluster::topology::parse_topology;
use rsearch_coord::config::Config;

/// Distributed coordinator for a full-text and secondary-index query
/// engine.
#[derive(Parser, Debug)]
#[command(name = "rsearch-coord", version)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "rsearch-coord.toml")]
    pub config: PathBuf,

    /// Address to bind the coordinator's client listener to.
    #[arg(short, long, default_value = "0.0.0.0:7000")]
    pub bind: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the coordinator.
    Run,

    /// Parse and validate a topology file, printing a summary.
    ValidateTopology {
        /// Path to a topology text file in the §6 format.
        path: PathBuf,
    },

    /// Load the configuration file and print the effective configuration.
    PrintConfig,
}

pub fn validate_topology(path: &std::path::Path) -> Result<String, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let topology = parse_topology(&text)?;
    if !topology.is_valid() {
        return Err("topology failed validation (is_valid() returned false)".into());
    }
    Ok(format!(
        "valid topology: {} shards, {} slots, hash={:?}",
        topology.num_shards(),
        topology.num_slots,
        topology.hash_function
    ))
}

pub fn print_config(config: &Config) -> String {
    toml::to_string_pretty(config).unwrap_or_else(|e| format!("error rendering config: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn validate_topology_accepts_well_formed_text() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "MYID a HASHFUNC CRC16 NUMSLOTS 16384 RANGES 1\nSHARD s0 SLOTRANGE 0 16383 ADDR 127.0.0.1:7000 MASTER"
        )
        .unwrap();
        let out = validate_topology(f.path()).unwrap();
        assert!(out.contains("1 shards"));
    }

    #[test]
    fn validate_topology_rejects_malformed_text() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "NOT A TOPOLOGY").unwrap();
        assert!(validate_topology(f.path()).is_err());
    }

    #[test]
    fn print_config_round_trips_through_toml() {
        let c = Config::default();
        let s = print_config(&c);
        let parsed: Config = toml::from_str(&s).unwrap();
        assert_eq!(parsed.conn_per_shard, c.conn_per_shard);
    }
}
