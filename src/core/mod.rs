//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Transactions (unsigned transfers of whole coins)
//! - Blocks (with canonical hashing)
//! - Ledger (chain and mempool ownership, chain validation)

pub mod block;
pub mod ledger;
pub mod transaction;

pub use block::{Block, GENESIS_INDEX, GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
pub use ledger::{ChainSnapshot, ChainStats, Ledger};
pub use transaction::{Transaction, MINING_REWARD, REWARD_SENDER};
