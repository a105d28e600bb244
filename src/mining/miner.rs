//! Mining engine for the ledger
//!
//! The proof search runs on a blocking thread without holding the ledger
//! lock. Only the final reward-and-forge step takes the write lock, and it
//! re-checks that the chain tip is still the one the proof was solved for.

use crate::core::{Block, Ledger, Transaction};
use crate::mining::pow::PowError;
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum MiningError {
    #[error("Proof of work failed: {0}")]
    Pow(#[from] PowError),
    #[error("Mining timed out after {0}ms")]
    Timeout(u128),
    #[error("Mining task failed: {0}")]
    Join(String),
}

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts, summed over restarts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
    /// Times the search restarted because the chain tip moved
    pub restarts: u32,
}

/// Miner for creating new blocks
#[derive(Debug, Clone)]
pub struct Miner {
    /// Miner's address for receiving rewards
    pub address: String,
    /// Upper bound on the whole mining operation
    pub timeout: Option<Duration>,
}

impl Miner {
    /// Create a new miner
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Solve the next proof, reward this miner and forge the block
    ///
    /// Cancelling `cancel` (or exceeding the timeout) stops the search; the
    /// ledger is left untouched in that case.
    pub async fn mine(
        &self,
        ledger: &Arc<RwLock<Ledger>>,
        cancel: &CancellationToken,
    ) -> Result<(Block, MiningStats), MiningError> {
        let start = Instant::now();
        let search = cancel.child_token();
        // Stops the blocking search if this future is dropped mid-way
        let _guard = search.clone().drop_guard();

        let mut attempts = 0u64;
        let mut restarts = 0u32;

        loop {
            let (pow, last_proof, last_hash, next_index) = {
                let chain = ledger.read().await;
                let last = chain.last_block();
                (*chain.pow(), last.proof, Ledger::hash(last), chain.len() + 1)
            };

            info!(
                "Mining block {} with difficulty {}...",
                next_index,
                pow.difficulty()
            );

            let token = search.clone();
            let handle =
                tokio::task::spawn_blocking(move || pow.solve_cancellable(last_proof, &token));

            let solution = match self.remaining(start) {
                Some(remaining) => match tokio::time::timeout(remaining, handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        search.cancel();
                        return Err(MiningError::Timeout(start.elapsed().as_millis()));
                    }
                },
                None => handle.await,
            }
            .map_err(|e| MiningError::Join(e.to_string()))??;

            attempts += solution.attempts;

            let forged = {
                let mut chain = ledger.write().await;
                self.forge_on_tip(&mut chain, &last_hash, solution.proof)
            };
            let Some(block) = forged else {
                restarts += 1;
                debug!(
                    "Chain tip moved while solving block {}, restarting",
                    next_index
                );
                continue;
            };

            let elapsed = start.elapsed().as_millis();
            let hash_rate = if elapsed > 0 {
                (attempts as f64) / (elapsed as f64 / 1000.0)
            } else {
                attempts as f64
            };

            info!(
                "Block {} mined in {}ms ({} attempts, {:.2} H/s)",
                block.index, elapsed, attempts, hash_rate
            );

            return Ok((
                block,
                MiningStats {
                    hash_attempts: attempts,
                    time_ms: elapsed,
                    hash_rate,
                    restarts,
                },
            ));
        }
    }

    /// Reward this miner and append a block carrying `proof`
    ///
    /// Returns `None` without touching the ledger when its tip is no longer
    /// the block hashing to `tip_hash`.
    fn forge_on_tip(&self, chain: &mut Ledger, tip_hash: &str, proof: u64) -> Option<Block> {
        if Ledger::hash(chain.last_block()) != tip_hash {
            return None;
        }

        let reward = Transaction::reward(&self.address);
        chain.new_transaction(reward.sender, reward.recipient, reward.amount);
        Some(chain.new_block(proof, tip_hash.to_string()))
    }

    fn remaining(&self, start: Instant) -> Option<Duration> {
        self.timeout
            .map(|timeout| timeout.saturating_sub(start.elapsed()))
    }
}
