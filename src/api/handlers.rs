//! REST API handlers for ledger operations

use crate::core::{Block, ChainSnapshot, Transaction};
use crate::mining::{MiningError, PowError};
use crate::network::{Node, NodeError, Resolution};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub node: Node,
}

impl ApiState {
    pub fn new(node: Node) -> Self {
        Self { node }
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
    pub attempts: u64,
    pub time_ms: u128,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub message: String,
    pub index: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_chain: Option<Vec<Block>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<Vec<Block>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub peers: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

// ============================================================================
// Request Types
// ============================================================================

/// Fields are optional so that absence is reported by the handler
#[derive(Debug, Default, Deserialize)]
pub struct NewTransactionRequest {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<u64>,
}

impl NewTransactionRequest {
    /// Check every required field is present
    pub fn validate(self) -> Result<Transaction, String> {
        let mut missing = Vec::new();
        if self.sender.is_none() {
            missing.push("sender");
        }
        if self.recipient.is_none() {
            missing.push("recipient");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }

        match (self.sender, self.recipient, self.amount) {
            (Some(sender), Some(recipient), Some(amount)) => {
                Ok(Transaction::new(sender, recipient, amount))
            }
            _ => Err(format!("Missing values: {}", missing.join(", "))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterNodesRequest {
    pub nodes: Option<Vec<String>>,
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.into(),
        }),
    )
}

fn node_error(e: NodeError) -> (StatusCode, Json<ApiError>) {
    let status = match &e {
        NodeError::Peer(_) => StatusCode::BAD_REQUEST,
        NodeError::Mining(MiningError::Timeout(_))
        | NodeError::Mining(MiningError::Pow(PowError::Cancelled)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ApiError {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Liveness and identity
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        node_id: state.node.node_id().to_string(),
        peers: state.node.peer_list().await.len(),
    })
}

/// GET /mine - Solve the next proof and forge a block
pub async fn mine(State(state): State<ApiState>) -> ApiResult<Json<MineResponse>> {
    let (block, stats) = state.node.mine().await.map_err(|e| {
        log::error!("Mining failed: {}", e);
        node_error(e)
    })?;

    Ok(Json(MineResponse {
        message: "New Block Forged".to_string(),
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
        attempts: stats.hash_attempts,
        time_ms: stats.time_ms,
    }))
}

/// POST /transactions/new - Queue a transaction for the next block
pub async fn new_transaction(
    State(state): State<ApiState>,
    Json(req): Json<NewTransactionRequest>,
) -> ApiResult<(StatusCode, Json<TransactionResponse>)> {
    let tx = req.validate().map_err(bad_request)?;

    let index = state
        .node
        .submit_transaction(&tx.sender, &tx.recipient, tx.amount)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse {
            message: format!("Transaction will be added to Block {}", index),
            index,
        }),
    ))
}

/// GET /chain - Full chain and its length
pub async fn full_chain(State(state): State<ApiState>) -> Json<ChainSnapshot> {
    Json(state.node.chain().await)
}

/// POST /nodes/register - Add peers
///
/// The whole batch is rejected if any address is malformed.
pub async fn register_nodes(
    State(state): State<ApiState>,
    Json(req): Json<RegisterNodesRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let nodes = match req.nodes {
        Some(nodes) if !nodes.is_empty() => nodes,
        _ => return Err(bad_request("Please supply a valid list of nodes")),
    };

    let total_nodes = state
        .node
        .register_nodes(&nodes)
        .await
        .map_err(node_error)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "New nodes have been added".to_string(),
            total_nodes,
        }),
    ))
}

/// GET /nodes/resolve - Run consensus against every known peer
pub async fn resolve(State(state): State<ApiState>) -> Json<ResolveResponse> {
    let report = state.node.resolve().await;

    Json(match report.resolution {
        Resolution::Replaced(chain) => ResolveResponse {
            message: "Our chain was replaced".to_string(),
            new_chain: Some(chain),
            chain: None,
        },
        Resolution::Authoritative(chain) => ResolveResponse {
            message: "Our chain is authoritative".to_string(),
            new_chain: None,
            chain: Some(chain),
        },
    })
}
