//! Ledger implementation
//!
//! The ledger owns the chain and the mempool together. The chain only ever
//! grows through [`Ledger::new_block`] or is swapped wholesale through
//! [`Ledger::replace_chain`]; it is never empty.

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::mining::{Mempool, ProofOfWork};
use serde::{Deserialize, Serialize};

/// The chain of blocks plus pending transactions
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    mempool: Mempool,
    pow: ProofOfWork,
}

impl Ledger {
    /// Create a ledger holding only the genesis block
    pub fn new(pow: ProofOfWork) -> Self {
        Self {
            chain: vec![Block::genesis()],
            mempool: Mempool::new(),
            pow,
        }
    }

    /// Canonical digest of a block
    pub fn hash(block: &Block) -> String {
        block.hash()
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Queue a transaction and return the index of the block it will land in
    pub fn new_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> u64 {
        self.mempool.add(Transaction::new(sender, recipient, amount));
        self.next_index()
    }

    /// Forge a block from the whole mempool and append it
    ///
    /// The caller supplies `previous_hash`; on the mining path it must be
    /// `Ledger::hash(self.last_block())`.
    pub fn new_block(&mut self, proof: u64, previous_hash: String) -> Block {
        let block = Block::new(
            self.next_index(),
            self.mempool.drain(),
            proof,
            previous_hash,
        );

        log::info!(
            "Forged block {} with {} transactions (proof {})",
            block.index,
            block.tx_count(),
            block.proof
        );

        self.chain.push(block.clone());
        block
    }

    /// Get the latest block
    pub fn last_block(&self) -> &Block {
        // The chain is created with a genesis block and replacements are never empty.
        &self.chain[self.chain.len() - 1]
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: a ledger holds at least the genesis block
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Transactions waiting for the next block
    pub fn pending(&self) -> &[Transaction] {
        self.mempool.transactions()
    }

    /// Validate the linkage and proofs of a candidate chain
    ///
    /// The first block is taken as given; every later block must point at
    /// its predecessor's hash, carry a valid proof against the predecessor's
    /// proof, and have the next index.
    pub fn valid_chain(&self, candidate: &[Block]) -> bool {
        if candidate.is_empty() {
            log::debug!("Rejecting empty chain");
            return false;
        }

        for pair in candidate.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            if current.previous_hash != Self::hash(previous) {
                log::debug!("Block {}: previous hash mismatch", current.index);
                return false;
            }

            if !self.pow.validate(previous.proof, current.proof) {
                log::debug!("Block {}: invalid proof of work", current.index);
                return false;
            }

            if previous.index.checked_add(1) != Some(current.index) {
                log::debug!(
                    "Block {}: expected index {}",
                    current.index,
                    previous.index.saturating_add(1)
                );
                return false;
            }
        }

        true
    }

    /// Validate the local chain
    pub fn is_valid(&self) -> bool {
        self.chain[0] == Block::genesis() && self.valid_chain(&self.chain)
    }

    /// Overwrite the chain; the caller has already validated `candidate`
    pub fn replace_chain(&mut self, candidate: Vec<Block>) {
        if candidate.is_empty() {
            log::warn!("Refusing to replace chain with an empty one");
            return;
        }

        log::info!(
            "Replacing chain of length {} with chain of length {}",
            self.chain.len(),
            candidate.len()
        );
        self.chain = candidate;
    }

    /// Copy of the full chain with its length
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            chain: self.chain.clone(),
            length: self.chain.len(),
        }
    }

    /// Get chain statistics
    pub fn stats(&self) -> ChainStats {
        ChainStats {
            length: self.chain.len(),
            total_transactions: self.chain.iter().map(Block::tx_count).sum(),
            pending_transactions: self.mempool.size(),
            difficulty: self.pow.difficulty(),
            last_hash: Self::hash(self.last_block()),
        }
    }

    fn next_index(&self) -> u64 {
        self.chain.len() as u64 + 1
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(ProofOfWork::default())
    }
}

/// A full chain with its length, as served to clients and peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// Chain statistics
#[derive(Debug, Clone, Serialize)]
pub struct ChainStats {
    pub length: usize,
    pub total_transactions: usize,
    pub pending_transactions: usize,
    pub difficulty: u32,
    pub last_hash: String,
}
