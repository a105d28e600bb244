//! Block implementation for the ledger
//!
//! A block commits a batch of transactions together with the proof that
//! links it to its predecessor.

use crate::core::transaction::{json_string, Transaction};
use crate::crypto::sha256_hex;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Index of the first block in every chain
pub const GENESIS_INDEX: u64 = 1;

/// Proof stored in the genesis block
pub const GENESIS_PROOF: u64 = 100;

/// Placeholder predecessor hash of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// A block in the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, starting at 1
    pub index: u64,
    /// Creation time in seconds since the Unix epoch
    pub timestamp: f64,
    /// Transactions committed by this block
    pub transactions: Vec<Transaction>,
    /// Proof of work solved against the previous block's proof
    pub proof: u64,
    /// Hash of the previous block
    pub previous_hash: String,
}

impl Block {
    /// Create a block stamped with the current time
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: String,
    ) -> Self {
        Self {
            index,
            timestamp: now_seconds(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// The genesis block
    ///
    /// Every field is fixed so that all nodes start from an identical block.
    pub fn genesis() -> Self {
        Self {
            index: GENESIS_INDEX,
            timestamp: 0.0,
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    /// Canonical encoding of the block
    ///
    /// Keys are written in lexicographic order (`index`, `previous_hash`,
    /// `proof`, `timestamp`, `transactions`), independent of struct layout.
    pub fn canonical_json(&self) -> String {
        let transactions: Vec<String> = self
            .transactions
            .iter()
            .map(Transaction::canonical_json)
            .collect();

        format!(
            r#"{{"index":{},"previous_hash":{},"proof":{},"timestamp":{},"transactions":[{}]}}"#,
            self.index,
            json_string(&self.previous_hash),
            self.proof,
            json_number(self.timestamp),
            transactions.join(",")
        )
    }

    /// SHA-256 hex digest of the canonical encoding
    pub fn hash(&self) -> String {
        sha256_hex(self.canonical_json().as_bytes())
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Shortest round-trip float form; non-finite values encode as `null`
fn json_number(value: f64) -> String {
    serde_json::Number::from_f64(value)
        .map(|n| n.to_string())
        .unwrap_or_else(|| "null".to_string())
}
