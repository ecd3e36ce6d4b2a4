//! Second Brain - personal knowledge capture with AI recall
//!
//! Stores notes, links and insights, optionally summarized and tagged by a
//! hosted language model, and answers questions about them by
//! retrieve-then-generate prompting.
//!
//! # Architecture
//!
//! The system is organized into layers, leaves first:
//! - **Types**: Core data structures (KnowledgeItem, ItemType, filters)
//! - **Storage**: libSQL persistence behind the `KnowledgeStore` trait
//! - **Services**: AI gateway (Gemini / Anthropic) and capture/query orchestration
//! - **API**: axum HTTP handlers
//!
//! # Example
//!
//! ```ignore
//! use second_brain::{AiGateway, BrainService, LibsqlStore, ConnectionMode, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load(None)?;
//!     let store = LibsqlStore::open_initialized(settings.database.connection_mode()?).await?;
//!     let brain = BrainService::new(
//!         std::sync::Arc::new(store),
//!         AiGateway::from_settings(&settings.ai),
//!         settings.public_base_url.clone(),
//!     );
//!
//!     let result = brain.ask("what did I learn about Rust?").await?;
//!     println!("{}", result.answer);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, AppState};
pub use config::Settings;
pub use error::{BrainError, Result};
pub use services::{AiGateway, BrainService, CaptureRequest, RetryPolicy};
pub use storage::{ConnectionMode, KnowledgeStore, LibsqlStore};
pub use types::{ItemFilter, ItemId, ItemType, ItemUpdate, KnowledgeItem, NewItem};
