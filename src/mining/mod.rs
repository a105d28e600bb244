//! Mining module for proof of work, block creation and transaction pooling

pub mod mempool;
pub mod miner;
pub mod pow;

pub use mempool::Mempool;
pub use miner::{Miner, MiningError, MiningStats};
pub use pow::{
    PowError, ProofOfWork, Solution, CANCEL_CHECK_INTERVAL, DEFAULT_DIFFICULTY, MAX_DIFFICULTY,
};
