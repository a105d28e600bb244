//! CLI commands for the ledger node
//!
//! Implements all command handlers for the CLI interface.

use crate::api::{create_router, ApiState};
use crate::network::{Node, NodeConfig};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Serve the HTTP API until Ctrl-C
pub async fn cmd_start(config: NodeConfig) -> CliResult<()> {
    let port = config.port;
    let node = Node::new(config)?;

    println!("🚀 Node {} starting", node.node_id());
    println!("   🔧 Difficulty: {}", node.config.difficulty);
    for peer in node.peer_list().await {
        println!("   🔗 Peer: {}", peer);
    }

    let app = create_router(ApiState::new(node.clone()));
    let addr = format!("0.0.0.0:{}", port);
    println!("🌐 API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            println!("\n📴 Shutting down API server...");
            node.shutdown();
        })
        .await?;

    Ok(())
}

/// Mine blocks on a fresh in-memory ledger and print them
pub async fn cmd_mine(config: NodeConfig, count: u32) -> CliResult<()> {
    let node = Node::new(config)?;

    println!("⛏️  Mining {} block(s) as node {}", count, node.node_id());
    println!("   Current difficulty: {}", node.config.difficulty);

    for _ in 0..count {
        let (block, stats) = node.mine().await?;

        println!("\n   Block {} mined!", block.index);
        println!("   ├─ Proof: {}", block.proof);
        println!("   ├─ Previous hash: {}", &block.previous_hash);
        println!("   ├─ Transactions: {}", block.tx_count());
        println!("   ├─ Time: {}ms", stats.time_ms);
        println!("   ├─ Attempts: {}", stats.hash_attempts);
        println!("   └─ Hash rate: {:.2} H/s", stats.hash_rate);
    }

    let ledger = node.ledger.read().await;
    let stats = ledger.stats();
    println!("\n📊 Chain length: {}", stats.length);
    println!("   Last hash: {}", stats.last_hash);
    if ledger.is_valid() {
        println!("✅ Chain is valid");
    } else {
        println!("❌ Chain is INVALID");
    }

    Ok(())
}

/// Poll peers once from a fresh node and report what consensus would do
pub async fn cmd_resolve(config: NodeConfig) -> CliResult<()> {
    if config.bootstrap_peers.is_empty() {
        println!("📭 No peers given. Pass them with --peers");
        return Ok(());
    }

    let node = Node::new(config)?;
    let report = node.resolve().await;

    println!("🔍 Polled {} peer(s)", report.polled);
    for peer in &report.unreachable {
        println!("   ⚠️  Unreachable: {}", peer);
    }
    for peer in &report.invalid {
        println!("   ❌ Invalid chain: {}", peer);
    }

    match &report.adopted_from {
        Some(peer) => println!(
            "✅ Longest valid chain ({} blocks) comes from {}",
            report.resolution.chain().len(),
            peer
        ),
        None => println!("✅ No peer has a longer valid chain"),
    }

    Ok(())
}
