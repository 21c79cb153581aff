use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

use crate::resolver::{ResolverConfig, DEFAULT_ROOT};

#[derive(Parser, Debug)]
#[command(name = "dns-recursor")]
#[command(about = "A recursive DNS resolver written in Rust", long_about = None)]
pub struct Args {
    /// Address to listen on, of the form <ip>:<port>
    #[arg(short, long, default_value = "0.0.0.0:2053", value_parser = parse_socket_addr)]
    pub bind: SocketAddr,

    /// Root server every resolution starts at, of the form <ip>:<port>
    #[arg(short, long, default_value_t = DEFAULT_ROOT, value_parser = parse_socket_addr)]
    pub root: SocketAddr,

    /// Seconds to wait for each upstream reply
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,

    /// How deep name server lookups may nest
    #[arg(long, default_value_t = 16)]
    pub max_depth: usize,

    /// How many referrals a single lookup may follow
    #[arg(long, default_value_t = 32)]
    pub max_referrals: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value_t = Level::INFO)]
    pub log_level: Level,
}

fn parse_socket_addr(s: &str) -> Result<SocketAddr, String> {
    s.parse::<SocketAddr>().map_err(|_| {
        format!(
            "Invalid address format: '{}'. Expected format: <ip>:<port>",
            s
        )
    })
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            root: self.root,
            timeout: Duration::from_secs(self.timeout),
            max_depth: self.max_depth,
            max_referrals: self.max_referrals,
        }
    }
}
