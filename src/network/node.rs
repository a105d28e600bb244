//! Ledger node
//!
//! The node owns the shared state (ledger, peer registry) and exposes the
//! operations an outer API layer calls: submit a transaction, mine, read
//! the chain, register peers and resolve conflicts.

use crate::core::{Block, ChainSnapshot, Ledger};
use crate::mining::{
    Miner, MiningError, MiningStats, PowError, ProofOfWork, DEFAULT_DIFFICULTY,
};
use crate::network::consensus::{ConsensusResolver, ResolveReport};
use crate::network::fetch::{ChainFetcher, HttpChainFetcher, DEFAULT_PEER_TIMEOUT};
use crate::network::registry::{PeerError, PeerRegistry};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Peer(#[from] PeerError),
    #[error(transparent)]
    Mining(#[from] MiningError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] PowError),
}

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Port the HTTP API listens on
    pub port: u16,
    /// Leading zero hex digits required by proof of work
    pub difficulty: u32,
    /// Bound on each peer chain fetch
    pub peer_timeout: Duration,
    /// Bound on a whole mining operation
    pub mine_timeout: Option<Duration>,
    /// Peers registered at startup
    pub bootstrap_peers: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            difficulty: DEFAULT_DIFFICULTY,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            mine_timeout: None,
            bootstrap_peers: Vec::new(),
        }
    }
}

/// The main ledger node
#[derive(Clone)]
pub struct Node {
    pub config: NodeConfig,
    node_id: String,
    pub ledger: Arc<RwLock<Ledger>>,
    pub peers: Arc<RwLock<PeerRegistry>>,
    resolver: ConsensusResolver,
    shutdown: CancellationToken,
}

impl Node {
    /// Create a node that talks to peers over HTTP
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let fetcher = Arc::new(HttpChainFetcher::new(config.peer_timeout));
        Self::with_fetcher(config, fetcher)
    }

    /// Create a node with a custom way of fetching peer chains
    pub fn with_fetcher(
        config: NodeConfig,
        fetcher: Arc<dyn ChainFetcher>,
    ) -> Result<Self, NodeError> {
        let pow = ProofOfWork::new(config.difficulty)?;

        let mut registry = PeerRegistry::new();
        if !config.bootstrap_peers.is_empty() {
            registry.register_all(&config.bootstrap_peers)?;
        }

        let node_id = generate_node_id();
        log::info!(
            "Node {} created (difficulty {}, {} bootstrap peers)",
            node_id,
            pow.difficulty(),
            registry.len()
        );

        Ok(Self {
            config,
            node_id,
            ledger: Arc::new(RwLock::new(Ledger::new(pow))),
            peers: Arc::new(RwLock::new(registry)),
            resolver: ConsensusResolver::new(fetcher),
            shutdown: CancellationToken::new(),
        })
    }

    /// Identifier credited with mining rewards
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Queue a transaction; returns the index of the block it will land in
    pub async fn submit_transaction(&self, sender: &str, recipient: &str, amount: u64) -> u64 {
        let index = self
            .ledger
            .write()
            .await
            .new_transaction(sender, recipient, amount);
        log::debug!(
            "Transaction {} -> {} ({}) queued for block {}",
            sender,
            recipient,
            amount,
            index
        );
        index
    }

    /// Solve the next proof and forge a block paying this node
    pub async fn mine(&self) -> Result<(Block, MiningStats), NodeError> {
        let mut miner = Miner::new(&self.node_id);
        if let Some(timeout) = self.config.mine_timeout {
            miner = miner.with_timeout(timeout);
        }
        Ok(miner.mine(&self.ledger, &self.shutdown).await?)
    }

    /// The full chain and its length
    pub async fn chain(&self) -> ChainSnapshot {
        self.ledger.read().await.snapshot()
    }

    /// Register a batch of peers; returns every known peer afterwards
    pub async fn register_nodes<S: AsRef<str>>(
        &self,
        addresses: &[S],
    ) -> Result<Vec<String>, NodeError> {
        let mut peers = self.peers.write().await;
        peers.register_all(addresses)?;
        Ok(peers.list())
    }

    /// Known peers in lexicographic order
    pub async fn peer_list(&self) -> Vec<String> {
        self.peers.read().await.list()
    }

    /// Poll every peer and adopt the longest valid chain
    pub async fn resolve(&self) -> ResolveReport {
        let peers = self.peer_list().await;
        self.resolver.resolve(&self.ledger, &peers).await
    }

    /// Cancel any in-flight proof search
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

fn generate_node_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
