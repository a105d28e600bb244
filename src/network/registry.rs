//! Peer registry
//!
//! Known peers are kept as normalized `http://host[:port]` strings in an
//! ordered set, so equivalent spellings collapse to one entry and listings
//! come out in lexicographic order. Peers are never removed.

use axum::http::Uri;
use std::collections::BTreeSet;
use thiserror::Error;

/// Port implied by the `http` scheme
const DEFAULT_HTTP_PORT: u16 = 80;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    #[error("Invalid peer address: {0}")]
    InvalidAddress(String),
    #[error("Unsupported scheme '{0}' (expected http)")]
    UnsupportedScheme(String),
    #[error("No peer addresses supplied")]
    EmptyBatch,
}

/// Parse a peer address and reduce it to its canonical form
///
/// Accepts `http://host[:port]` with an optional trailing `/`. The host is
/// lowercased and the default port is dropped.
pub fn normalize_address(address: &str) -> Result<String, PeerError> {
    let invalid = || PeerError::InvalidAddress(address.to_string());

    let uri: Uri = address.trim().parse().map_err(|_| invalid())?;

    let scheme = uri.scheme_str().ok_or_else(invalid)?;
    if !scheme.eq_ignore_ascii_case("http") {
        return Err(PeerError::UnsupportedScheme(scheme.to_string()));
    }

    let authority = uri.authority().ok_or_else(invalid)?;
    if authority.as_str().contains('@') || authority.host().is_empty() {
        return Err(invalid());
    }

    if let Some(path_and_query) = uri.path_and_query() {
        let path = path_and_query.path();
        if path_and_query.query().is_some() || !(path.is_empty() || path == "/") {
            return Err(invalid());
        }
    }

    let host = authority.host().to_ascii_lowercase();
    Ok(match authority.port_u16() {
        Some(port) if port != DEFAULT_HTTP_PORT => format!("http://{}:{}", host, port),
        _ => format!("http://{}", host),
    })
}

/// Set of known peers
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    nodes: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one peer, returning its normalized address
    pub fn register(&mut self, address: &str) -> Result<String, PeerError> {
        let normalized = normalize_address(address)?;
        if self.nodes.insert(normalized.clone()) {
            log::info!("Registered peer {}", normalized);
        }
        Ok(normalized)
    }

    /// Register a batch of peers
    ///
    /// The batch is all-or-nothing: if any entry is malformed nothing is
    /// inserted and the first error is returned.
    pub fn register_all<S: AsRef<str>>(
        &mut self,
        addresses: &[S],
    ) -> Result<Vec<String>, PeerError> {
        if addresses.is_empty() {
            return Err(PeerError::EmptyBatch);
        }

        let normalized = addresses
            .iter()
            .map(|address| normalize_address(address.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        for address in &normalized {
            if self.nodes.insert(address.clone()) {
                log::info!("Registered peer {}", address);
            }
        }

        Ok(normalized)
    }

    /// Known peers in lexicographic order
    pub fn list(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }

    pub fn contains(&self, address: &str) -> bool {
        normalize_address(address)
            .map(|normalized| self.nodes.contains(&normalized))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
