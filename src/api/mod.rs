//! HTTP API for capturing and querying knowledge
//!
//! Provides:
//! - Item CRUD with filtering (`/items`, `/items/create`, `/items/:id`)
//! - Distinct tag listing (`/tags`)
//! - Conversational queries, private (`/query`) and public (`/public/brain/query`)
//! - Schema initialization (`/init-db`) and health (`/health`)

pub mod error;
pub mod items;
pub mod query;
pub mod server;

pub use error::ApiError;
pub use server::{ApiServer, ApiServerConfig, AppState};
