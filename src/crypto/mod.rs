//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing
//! - Hex-digit difficulty checks for proof of work

pub mod hash;

pub use hash::{has_leading_hex_zeros, sha256, sha256_hex};
