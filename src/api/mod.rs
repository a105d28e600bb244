//! REST API module
//!
//! Provides the HTTP boundary of a node. Request payloads are checked for
//! required fields here, before anything reaches the ledger.
//!
//! # Endpoints
//!
//! - `GET /health` - Node identity and peer count
//! - `GET /mine` - Mine a new block
//! - `POST /transactions/new` - Queue a transaction
//! - `GET /chain` - Full chain and its length
//! - `POST /nodes/register` - Register peers
//! - `GET /nodes/resolve` - Run longest-valid-chain consensus

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
