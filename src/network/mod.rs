//! Peer networking module
//!
//! Provides what a node needs to agree with its peers on one chain.
//!
//! # Features
//! - Peer registry with address normalization
//! - Remote chain fetching (HTTP, bounded by a timeout)
//! - Longest-valid-chain conflict resolution
//! - The node handle tying ledger, registry and resolver together

pub mod consensus;
pub mod fetch;
pub mod node;
pub mod registry;

pub use consensus::{ConsensusResolver, Resolution, ResolveReport};
pub use fetch::{ChainFetcher, FetchError, HttpChainFetcher, DEFAULT_PEER_TIMEOUT};
pub use node::{Node, NodeConfig, NodeError};
pub use registry::{normalize_address, PeerError, PeerRegistry};
