//! Proof-of-work puzzle
//!
//! Given the previous block's proof `p`, find the smallest `q ≥ 0` such that
//! the SHA-256 hex digest of the decimal concatenation `"{p}{q}"` starts with
//! `difficulty` zero digits. Solving is brute force; checking is one hash.

use crate::crypto::{has_leading_hex_zeros, sha256_hex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default number of leading zero hex digits
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Digits in a SHA-256 hex digest
pub const MAX_DIFFICULTY: u32 = 64;

/// Attempts between cancellation checks
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PowError {
    #[error("Proof search cancelled")]
    Cancelled,
    #[error("Difficulty too high: {0} (max: 64)")]
    DifficultyTooHigh(u32),
}

/// A solved puzzle with search statistics
#[derive(Debug, Clone, Copy)]
pub struct Solution {
    pub proof: u64,
    /// Number of candidates hashed, including the winning one
    pub attempts: u64,
    pub elapsed: Duration,
}

/// Puzzle definition at a fixed difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: u32,
}

impl ProofOfWork {
    pub fn new(difficulty: u32) -> Result<Self, PowError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(PowError::DifficultyTooHigh(difficulty));
        }
        Ok(Self { difficulty })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Check whether `proof` solves the puzzle posed by `last_proof`
    pub fn validate(&self, last_proof: u64, proof: u64) -> bool {
        let guess = format!("{}{}", last_proof, proof);
        has_leading_hex_zeros(&sha256_hex(guess.as_bytes()), self.difficulty)
    }

    /// Search for a proof without any way to stop early
    pub fn solve(&self, last_proof: u64) -> u64 {
        let mut proof = 0u64;
        while !self.validate(last_proof, proof) {
            proof += 1;
        }
        proof
    }

    /// Search for a proof, polling `cancel` every [`CANCEL_CHECK_INTERVAL`] attempts
    pub fn solve_cancellable(
        &self,
        last_proof: u64,
        cancel: &CancellationToken,
    ) -> Result<Solution, PowError> {
        let start = Instant::now();
        let mut proof = 0u64;

        loop {
            if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                log::debug!(
                    "Proof search for {} cancelled after {} attempts",
                    last_proof,
                    proof
                );
                return Err(PowError::Cancelled);
            }

            if self.validate(last_proof, proof) {
                return Ok(Solution {
                    proof,
                    attempts: proof + 1,
                    elapsed: start.elapsed(),
                });
            }

            proof += 1;
        }
    }
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
        }
    }
}
