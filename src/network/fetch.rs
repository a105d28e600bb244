//! Remote chain retrieval
//!
//! [`ChainFetcher`] is the only way consensus talks to peers. The HTTP
//! implementation issues a plain `GET {peer}/chain` over a tokio TCP stream
//! and bounds the whole exchange with a timeout.

use crate::core::ChainSnapshot;
use futures::future::{BoxFuture, FutureExt};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default per-peer fetch timeout
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest response body accepted from a peer
pub const MAX_RESPONSE_SIZE: usize = 64 * 1024 * 1024;

/// Failures talking to a single peer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Peer {0} timed out")]
    Timeout(String),
    #[error("IO error talking to {0}: {1}")]
    Io(String, String),
    #[error("Peer {0} answered with HTTP status {1}")]
    Http(String, u16),
    #[error("Malformed response from {0}: {1}")]
    Malformed(String, String),
}

/// Capability to fetch a peer's current chain
pub trait ChainFetcher: Send + Sync {
    fn fetch_chain<'a>(
        &'a self,
        peer: &'a str,
    ) -> BoxFuture<'a, Result<ChainSnapshot, FetchError>>;
}

/// Fetches chains over HTTP/1.1 from `http://host[:port]` peers
#[derive(Debug, Clone)]
pub struct HttpChainFetcher {
    timeout: Duration,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn get_chain(&self, peer: &str) -> Result<ChainSnapshot, FetchError> {
        let io = |e: std::io::Error| FetchError::Io(peer.to_string(), e.to_string());
        let malformed = |msg: &str| FetchError::Malformed(peer.to_string(), msg.to_string());

        let host = peer
            .strip_prefix("http://")
            .ok_or_else(|| malformed("peer address is not http"))?
            .trim_end_matches('/');
        let has_port = host
            .rsplit_once(':')
            .map_or(false, |(_, port)| port.parse::<u16>().is_ok());
        let addr = if has_port {
            host.to_string()
        } else {
            format!("{}:80", host)
        };

        let mut stream = TcpStream::connect(&addr).await.map_err(io)?;

        let request = format!(
            "GET /chain HTTP/1.1\r\nHost: {}\r\nAccept: application/json\r\n\
             Connection: close\r\n\r\n",
            host
        );
        stream.write_all(request.as_bytes()).await.map_err(io)?;

        let mut response = Vec::new();
        (&mut stream)
            .take(MAX_RESPONSE_SIZE as u64 + 1)
            .read_to_end(&mut response)
            .await
            .map_err(io)?;
        if response.len() > MAX_RESPONSE_SIZE {
            return Err(malformed("response too large"));
        }

        let (status, chunked, body) =
            split_response(&response).ok_or_else(|| malformed("bad HTTP response"))?;
        if status != 200 {
            return Err(FetchError::Http(peer.to_string(), status));
        }

        let body = if chunked {
            decode_chunked(body).ok_or_else(|| malformed("bad chunked encoding"))?
        } else {
            body.to_vec()
        };

        serde_json::from_slice(&body).map_err(|e| malformed(&e.to_string()))
    }
}

impl Default for HttpChainFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_PEER_TIMEOUT)
    }
}

impl ChainFetcher for HttpChainFetcher {
    fn fetch_chain<'a>(
        &'a self,
        peer: &'a str,
    ) -> BoxFuture<'a, Result<ChainSnapshot, FetchError>> {
        async move {
            match tokio::time::timeout(self.timeout, self.get_chain(peer)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(peer.to_string())),
            }
        }
        .boxed()
    }
}

/// Split a raw response into status code, chunked flag and body
fn split_response(response: &[u8]) -> Option<(u16, bool, &[u8])> {
    let header_end = response.windows(4).position(|w| w == b"\r\n\r\n")?;
    let head = std::str::from_utf8(&response[..header_end]).ok()?;
    let body = &response[header_end + 4..];

    let mut lines = head.split("\r\n");
    let status = lines.next()?.split_whitespace().nth(1)?.parse().ok()?;

    let chunked = lines.any(|line| {
        line.split_once(':').map_or(false, |(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.to_ascii_lowercase().contains("chunked")
        })
    });

    Some((status, chunked, body))
}

fn decode_chunked(mut body: &[u8]) -> Option<Vec<u8>> {
    let mut decoded = Vec::new();

    loop {
        let line_end = body.windows(2).position(|w| w == b"\r\n")?;
        let size_line = std::str::from_utf8(&body[..line_end]).ok()?;
        let size_hex = size_line.split(';').next()?.trim();
        let size = usize::from_str_radix(size_hex, 16).ok()?;
        body = &body[line_end + 2..];

        if size == 0 {
            return Some(decoded);
        }
        if body.len() < size + 2 {
            return None;
        }
        decoded.extend_from_slice(&body[..size]);
        body = &body[size + 2..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Ledger;
    use tokio::net::TcpListener;

    async fn serve_once(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(&response).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}", addr)
    }

    fn http_ok(body: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_fetch_chain() {
        let snapshot = Ledger::default().snapshot();
        let body = serde_json::to_string(&snapshot).unwrap();
        let peer = serve_once(http_ok(&body)).await;

        let fetched = HttpChainFetcher::default().fetch_chain(&peer).await.unwrap();

        assert_eq!(fetched, snapshot);
    }

    #[tokio::test]
    async fn test_fetch_chunked_chain() {
        let snapshot = Ledger::default().snapshot();
        let body = serde_json::to_string(&snapshot).unwrap();
        let (first, second) = body.split_at(10);
        let response = format!(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n{}\r\n{:x}\r\n{}\r\n0\r\n\r\n",
            first.len(),
            first,
            second.len(),
            second
        );
        let peer = serve_once(response.into_bytes()).await;

        let fetched = HttpChainFetcher::default().fetch_chain(&peer).await.unwrap();

        assert_eq!(fetched, snapshot);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let response = b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n";
        let peer = serve_once(response.to_vec()).await;

        let result = HttpChainFetcher::default().fetch_chain(&peer).await;

        assert_eq!(result, Err(FetchError::Http(peer.clone(), 500)));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let peer = serve_once(http_ok("{\"chain\": 7}")).await;

        let result = HttpChainFetcher::default().fetch_chain(&peer).await;

        assert!(matches!(result, Err(FetchError::Malformed(_, _))));
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let peer = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let result = HttpChainFetcher::default().fetch_chain(&peer).await;

        assert!(matches!(result, Err(FetchError::Io(_, _))));
    }

    #[tokio::test]
    async fn test_slow_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let peer = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let fetcher = HttpChainFetcher::new(Duration::from_millis(100));
        let result = fetcher.fetch_chain(&peer).await;

        assert_eq!(result, Err(FetchError::Timeout(peer.clone())));
    }

    #[test]
    fn test_split_response() {
        let raw = b"HTTP/1.1 404 Not Found\r\nX: y\r\n\r\nbody";
        let (status, chunked, body) = split_response(raw).unwrap();
        assert_eq!(status, 404);
        assert!(!chunked);
        assert_eq!(body, b"body");
    }
}
