//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// ip2loc - IP geolocation service backed by a MaxMind DB file
#[derive(Parser, Debug)]
#[command(name = "ip2loc")]
#[command(version)]
#[command(about = "IP geolocation service backed by a hot-reloadable MaxMind DB file", long_about = None)]
pub struct Cli {
    /// Configuration file path (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    /// Listen address, overrides server.host / server.port
    #[arg(long, global = true, value_name = "HOST:PORT")]
    pub addr: Option<String>,

    /// Database file path, overrides database.path
    #[arg(long, global = true, value_name = "PATH")]
    pub mmdb: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Look up one IP address and print JSON
    Lookup {
        /// Address to look up
        ip: String,

        /// Output language: zh-CN or en
        #[arg(long, default_value = "zh-CN")]
        lang: String,

        /// Print the undecoded database record
        #[arg(long)]
        raw: bool,
    },

    /// Print a sample configuration file
    Config,
}

/// Split `HOST:PORT`; IPv6 hosts may be bracketed (`[::1]:4000`)
pub fn parse_addr(addr: &str) -> Option<(String, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    let port = port.parse().ok()?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port))
}
