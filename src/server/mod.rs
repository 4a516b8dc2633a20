//! HTTP server for the companion backend.
//!
//! Serves the conversation CRUD API used by the chat client, the stateless
//! chat proxy, and the full-turn endpoint.
//!
//! # Endpoints
//!
//! - `GET  /health`                       - Liveness probe
//! - `/api/users`, `/api/conversations/*`  - Session storage
//! - `POST /api/chat`                     - Chat proxy
//! - `POST /api/conversations/:id/turn`   - One full conversation turn

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{app_router, AppState};
