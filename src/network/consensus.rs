//! Longest-valid-chain consensus
//!
//! Every registered peer is polled in turn. A peer that cannot be reached
//! or answers with garbage is skipped; a peer whose chain fails validation
//! is ignored, as is one that does not start from our genesis block. The
//! longest valid chain strictly longer than ours wins, with ties going to
//! the peer seen first.

use crate::core::{Block, Ledger};
use crate::network::fetch::ChainFetcher;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of a resolution round
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The local chain was replaced by this one
    Replaced(Vec<Block>),
    /// No peer had a better chain; this is the local chain
    Authoritative(Vec<Block>),
}

impl Resolution {
    pub fn replaced(&self) -> bool {
        matches!(self, Resolution::Replaced(_))
    }

    pub fn chain(&self) -> &[Block] {
        match self {
            Resolution::Replaced(chain) | Resolution::Authoritative(chain) => chain,
        }
    }

    pub fn into_chain(self) -> Vec<Block> {
        match self {
            Resolution::Replaced(chain) | Resolution::Authoritative(chain) => chain,
        }
    }
}

/// What happened during a resolution round
#[derive(Debug, Clone)]
pub struct ResolveReport {
    pub resolution: Resolution,
    /// Peers polled, in order
    pub polled: usize,
    /// Peers that failed to answer or answered malformed data
    pub unreachable: Vec<String>,
    /// Peers whose longer chain failed validation or had a foreign genesis
    pub invalid: Vec<String>,
    /// Peer whose chain was adopted
    pub adopted_from: Option<String>,
}

/// Applies the longest-valid-chain rule across a set of peers
#[derive(Clone)]
pub struct ConsensusResolver {
    fetcher: Arc<dyn ChainFetcher>,
}

impl ConsensusResolver {
    pub fn new(fetcher: Arc<dyn ChainFetcher>) -> Self {
        Self { fetcher }
    }

    /// Poll `peers` and adopt the best qualifying chain, if any
    ///
    /// No lock is held while talking to peers. The final swap re-checks the
    /// length under the write lock, so a block mined meanwhile is never
    /// replaced by a chain that is no longer longer.
    pub async fn resolve(&self, ledger: &Arc<RwLock<Ledger>>, peers: &[String]) -> ResolveReport {
        let local_length = ledger.read().await.len();
        let mut best: Option<(String, Vec<Block>)> = None;
        let mut unreachable = Vec::new();
        let mut invalid = Vec::new();

        for peer in peers {
            let snapshot = match self.fetcher.fetch_chain(peer).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    log::warn!("Skipping peer {}: {}", peer, e);
                    unreachable.push(peer.clone());
                    continue;
                }
            };

            if snapshot.length != snapshot.chain.len() {
                log::warn!(
                    "Skipping peer {}: reported length {} but sent {} blocks",
                    peer,
                    snapshot.length,
                    snapshot.chain.len()
                );
                unreachable.push(peer.clone());
                continue;
            }

            let max_length = best
                .as_ref()
                .map_or(local_length, |(_, chain)| chain.len());
            if snapshot.length <= max_length {
                log::debug!(
                    "Peer {} chain of length {} is not longer than {}",
                    peer,
                    snapshot.length,
                    max_length
                );
                continue;
            }

            if snapshot.chain.first() != Some(&Block::genesis()) {
                log::warn!(
                    "Ignoring chain of length {} from {}: foreign genesis block",
                    snapshot.length,
                    peer
                );
                invalid.push(peer.clone());
                continue;
            }

            if !ledger.read().await.valid_chain(&snapshot.chain) {
                log::warn!(
                    "Ignoring invalid chain of length {} from {}",
                    snapshot.length,
                    peer
                );
                invalid.push(peer.clone());
                continue;
            }

            best = Some((peer.clone(), snapshot.chain));
        }

        let mut adopted_from = None;
        let resolution = {
            let mut chain = ledger.write().await;
            match best {
                Some((peer, candidate)) if candidate.len() > chain.len() => {
                    log::info!(
                        "Adopting chain of length {} from {}",
                        candidate.len(),
                        peer
                    );
                    chain.replace_chain(candidate);
                    adopted_from = Some(peer);
                    Resolution::Replaced(chain.chain().to_vec())
                }
                Some((peer, candidate)) => {
                    log::info!(
                        "Chain from {} (length {}) no longer longer than local {}",
                        peer,
                        candidate.len(),
                        chain.len()
                    );
                    Resolution::Authoritative(chain.chain().to_vec())
                }
                None => Resolution::Authoritative(chain.chain().to_vec()),
            }
        };

        ResolveReport {
            resolution,
            polled: peers.len(),
            unreachable,
            invalid,
            adopted_from,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::{ChainSnapshot, Transaction, MINING_REWARD, REWARD_SENDER};
    use crate::mining::ProofOfWork;
    use crate::network::fetch::FetchError;
    use futures::future::{BoxFuture, FutureExt};
    use std::collections::HashMap;

    /// Serves canned answers per peer
    #[derive(Default)]
    pub(crate) struct StaticFetcher {
        pub responses: HashMap<String, Result<ChainSnapshot, FetchError>>,
    }

    impl StaticFetcher {
        pub fn with(mut self, peer: &str, response: Result<ChainSnapshot, FetchError>) -> Self {
            self.responses.insert(peer.to_string(), response);
            self
        }
    }

    impl ChainFetcher for StaticFetcher {
        fn fetch_chain<'a>(
            &'a self,
            peer: &'a str,
        ) -> BoxFuture<'a, Result<ChainSnapshot, FetchError>> {
            let response = self
                .responses
                .get(peer)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Io(peer.to_string(), "refused".to_string())));
            async move { response }.boxed()
        }
    }

    pub(crate) fn pow() -> ProofOfWork {
        ProofOfWork::new(2).unwrap()
    }

    /// A valid ledger of `length` blocks; `tag` varies the transactions
    pub(crate) fn ledger_of_length(length: usize, tag: &str) -> Ledger {
        let mut ledger = Ledger::new(pow());
        while ledger.len() < length {
            ledger.new_transaction(tag, "B", ledger.len() as u64);
            let last = ledger.last_block().clone();
            let proof = ledger.pow().solve(last.proof);
            ledger.new_block(proof, Ledger::hash(&last));
        }
        ledger
    }

    fn shared(ledger: Ledger) -> Arc<RwLock<Ledger>> {
        Arc::new(RwLock::new(ledger))
    }

    fn invalid_snapshot(length: usize) -> ChainSnapshot {
        let mut snapshot = ledger_of_length(length, "forger").snapshot();
        snapshot.chain[1].transactions.push(Transaction::new("X", "Y", 1_000));
        snapshot
    }

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_replaces_with_longest_valid_chain() {
        let local = shared(ledger_of_length(2, "local"));
        let chain_a = ledger_of_length(4, "a").snapshot();
        let fetcher = StaticFetcher::default()
            .with("http://a", Ok(chain_a.clone()))
            .with("http://c", Ok(invalid_snapshot(5)));
        let resolver = ConsensusResolver::new(Arc::new(fetcher));

        let report = resolver
            .resolve(&local, &peers(&["http://a", "http://b", "http://c"]))
            .await;

        assert!(report.resolution.replaced());
        assert_eq!(report.resolution.chain(), chain_a.chain.as_slice());
        assert_eq!(report.unreachable, vec!["http://b"]);
        assert_eq!(report.invalid, vec!["http://c"]);
        assert_eq!(report.adopted_from.as_deref(), Some("http://a"));
        assert_eq!(local.read().await.chain(), chain_a.chain.as_slice());
    }

    #[tokio::test]
    async fn test_never_adopts_equal_or_shorter_chain() {
        let local = shared(ledger_of_length(3, "local"));
        let before = local.read().await.snapshot();
        let fetcher = StaticFetcher::default()
            .with("http://equal", Ok(ledger_of_length(3, "equal").snapshot()))
            .with("http://short", Ok(ledger_of_length(2, "short").snapshot()));
        let resolver = ConsensusResolver::new(Arc::new(fetcher));

        let report = resolver
            .resolve(&local, &peers(&["http://equal", "http://short"]))
            .await;

        assert!(!report.resolution.replaced());
        assert_eq!(local.read().await.snapshot(), before);
    }

    #[tokio::test]
    async fn test_never_adopts_invalid_chain() {
        let local = shared(ledger_of_length(1, "local"));
        let fetcher = StaticFetcher::default().with("http://liar", Ok(invalid_snapshot(6)));
        let resolver = ConsensusResolver::new(Arc::new(fetcher));

        let report = resolver.resolve(&local, &peers(&["http://liar"])).await;

        assert!(!report.resolution.replaced());
        assert_eq!(local.read().await.len(), 1);
        assert_eq!(report.invalid, vec!["http://liar"]);
    }

    #[tokio::test]
    async fn test_never_adopts_chain_with_foreign_genesis() {
        let local = shared(ledger_of_length(1, "local"));
        let root = Block {
            index: 50,
            timestamp: 0.0,
            transactions: Vec::new(),
            proof: 100,
            previous_hash: "elsewhere".to_string(),
        };
        let next = Block::new(51, Vec::new(), pow().solve(root.proof), root.hash());
        let rootless = vec![root, next];
        assert!(local.read().await.valid_chain(&rootless));
        let fetcher = StaticFetcher::default().with(
            "http://rootless",
            Ok(ChainSnapshot {
                length: rootless.len(),
                chain: rootless,
            }),
        );
        let resolver = ConsensusResolver::new(Arc::new(fetcher));

        let report = resolver.resolve(&local, &peers(&["http://rootless"])).await;

        assert!(!report.resolution.replaced());
        assert_eq!(report.invalid, vec!["http://rootless"]);
        assert_eq!(report.adopted_from, None);

        let mut chain = local.write().await;
        assert_eq!(chain.chain(), &[Block::genesis()]);
        let last = chain.last_block().clone();
        let proof = chain.pow().solve(last.proof);
        let block = chain.new_block(proof, Ledger::hash(&last));
        assert_eq!(block.index, 2);
        assert!(chain.is_valid());
    }

    /// Extends the local ledger while the peer is being fetched
    struct GrowingFetcher {
        local: Arc<RwLock<Ledger>>,
        blocks: usize,
        response: ChainSnapshot,
    }

    impl ChainFetcher for GrowingFetcher {
        fn fetch_chain<'a>(
            &'a self,
            _peer: &'a str,
        ) -> BoxFuture<'a, Result<ChainSnapshot, FetchError>> {
            async move {
                let mut ledger = self.local.write().await;
                for _ in 0..self.blocks {
                    ledger.new_transaction(REWARD_SENDER, "local-miner", MINING_REWARD);
                    let last = ledger.last_block().clone();
                    let proof = ledger.pow().solve(last.proof);
                    ledger.new_block(proof, Ledger::hash(&last));
                }
                Ok(self.response.clone())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_local_growth_during_fetch_keeps_local_chain() {
        let local = shared(ledger_of_length(1, "local"));
        let fetcher = GrowingFetcher {
            local: local.clone(),
            blocks: 2,
            response: ledger_of_length(3, "peer").snapshot(),
        };
        let resolver = ConsensusResolver::new(Arc::new(fetcher));

        let report = resolver.resolve(&local, &peers(&["http://racer"])).await;

        assert!(!report.resolution.replaced());
        assert_eq!(report.adopted_from, None);
        let chain = local.read().await;
        assert_eq!(chain.len(), 3);
        assert!(chain.is_valid());
        assert_eq!(report.resolution.chain(), chain.chain());
        assert!(chain.chain()[1..]
            .iter()
            .all(|block| block.transactions[0].recipient == "local-miner"));
    }

    #[tokio::test]
    async fn test_tie_keeps_first_peer() {
        let local = shared(ledger_of_length(1, "local"));
        let first = ledger_of_length(3, "first").snapshot();
        let fetcher = StaticFetcher::default()
            .with("http://first", Ok(first.clone()))
            .with("http://second", Ok(ledger_of_length(3, "second").snapshot()));
        let resolver = ConsensusResolver::new(Arc::new(fetcher));

        let report = resolver
            .resolve(&local, &peers(&["http://first", "http://second"]))
            .await;

        assert_eq!(report.adopted_from.as_deref(), Some("http://first"));
        assert_eq!(report.resolution.into_chain(), first.chain);
    }

    #[tokio::test]
    async fn test_later_longer_chain_wins() {
        let local = shared(ledger_of_length(1, "local"));
        let longer = ledger_of_length(4, "longer").snapshot();
        let fetcher = StaticFetcher::default()
            .with("http://short", Ok(ledger_of_length(2, "short").snapshot()))
            .with("http://long", Ok(longer.clone()));
        let resolver = ConsensusResolver::new(Arc::new(fetcher));

        let report = resolver
            .resolve(&local, &peers(&["http://short", "http://long"]))
            .await;

        assert_eq!(report.adopted_from.as_deref(), Some("http://long"));
        assert_eq!(local.read().await.len(), 4);
    }

    #[tokio::test]
    async fn test_length_mismatch_is_skipped() {
        let local = shared(ledger_of_length(1, "local"));
        let mut lying = ledger_of_length(3, "lying").snapshot();
        lying.length = 10;
        let fetcher = StaticFetcher::default().with("http://lying", Ok(lying));
        let resolver = ConsensusResolver::new(Arc::new(fetcher));

        let report = resolver.resolve(&local, &peers(&["http://lying"])).await;

        assert!(!report.resolution.replaced());
        assert_eq!(report.unreachable, vec!["http://lying"]);
    }

    #[tokio::test]
    async fn test_no_peers_is_authoritative() {
        let local = shared(ledger_of_length(2, "local"));
        let resolver = ConsensusResolver::new(Arc::new(StaticFetcher::default()));

        let report = resolver.resolve(&local, &[]).await;

        assert_eq!(report.polled, 0);
        assert_eq!(report.resolution.chain().len(), 2);
        assert!(!report.resolution.replaced());
    }
}
