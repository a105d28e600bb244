//! Proof-of-work ledger node CLI
//!
//! A command-line interface for running and exercising a ledger node.

use clap::{Parser, Subcommand};
use pow_ledger::cli;
use pow_ledger::mining::DEFAULT_DIFFICULTY;
use pow_ledger::network::NodeConfig;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pow-ledger")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A proof-of-work ledger node with longest-chain consensus", long_about = None)]
struct Cli {
    /// Mining difficulty (number of leading zero hex digits)
    #[arg(short, long, default_value_t = DEFAULT_DIFFICULTY, global = true)]
    difficulty: u32,

    /// Peers, comma-separated (e.g. http://127.0.0.1:5001)
    #[arg(long, global = true)]
    peers: Option<String>,

    /// Timeout for each peer chain fetch, in milliseconds
    #[arg(long, default_value = "5000", global = true)]
    peer_timeout_ms: u64,

    /// Give up mining a block after this many seconds
    #[arg(long, global = true)]
    mine_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Start {
        /// Port to listen on
        #[arg(short, long, default_value = "5000")]
        port: u16,
    },

    /// Mine blocks on an in-memory ledger
    Mine {
        /// Number of blocks to mine
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Poll peers once and report the longest valid chain
    Resolve,
}

impl Cli {
    fn node_config(&self) -> NodeConfig {
        let bootstrap_peers = self
            .peers
            .as_deref()
            .map(|p| {
                p.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        NodeConfig {
            difficulty: self.difficulty,
            peer_timeout: Duration::from_millis(self.peer_timeout_ms),
            mine_timeout: self.mine_timeout_secs.map(Duration::from_secs),
            bootstrap_peers,
            ..Default::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.node_config();

    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match cli.command {
            Commands::Start { port } => cli::cmd_start(NodeConfig { port, ..config }).await,
            Commands::Mine { count } => cli::cmd_mine(config, count).await,
            Commands::Resolve => cli::cmd_resolve(config).await,
        }
    })
}
