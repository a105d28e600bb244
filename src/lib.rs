//! pow-ledger: a minimal proof-of-work ledger node
//!
//! This crate provides:
//! - An append-only, hash-linked chain with a canonical block digest
//! - A brute-force proof-of-work puzzle with a cancellable solver
//! - A mempool of pending transactions
//! - A peer registry and longest-valid-chain conflict resolution
//! - An axum HTTP API exposing the node's operations
//!
//! All state lives in memory; restarting a node starts a fresh chain.
//!
//! # Example
//!
//! ```rust
//! use pow_ledger::core::Ledger;
//! use pow_ledger::mining::ProofOfWork;
//!
//! let mut ledger = Ledger::new(ProofOfWork::new(2).unwrap());
//!
//! // Queue a transaction; it lands in block 2
//! assert_eq!(ledger.new_transaction("alice", "bob", 5), 2);
//!
//! // Mine it
//! let last = ledger.last_block().clone();
//! let proof = ledger.pow().solve(last.proof);
//! let block = ledger.new_block(proof, Ledger::hash(&last));
//!
//! assert_eq!(block.index, 2);
//! assert!(ledger.valid_chain(ledger.chain()));
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod network;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use core::{Block, ChainSnapshot, Ledger, Transaction, MINING_REWARD};
pub use mining::{Mempool, Miner, ProofOfWork, DEFAULT_DIFFICULTY};
pub use network::{ConsensusResolver, Node, NodeConfig, PeerRegistry, Resolution};
