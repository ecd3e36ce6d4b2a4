//! Storage layer for the Second Brain knowledge service
//!
//! Provides the persistence abstraction for knowledge items and its libSQL
//! implementation.

pub mod libsql;

use crate::error::Result;
use crate::types::{ItemFilter, ItemId, ItemUpdate, KnowledgeItem, NewItem};
use async_trait::async_trait;

pub use self::libsql::{ConnectionMode, LibsqlStore};

/// Storage backend trait defining all required operations
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Create the table and indexes if they are missing (idempotent)
    async fn init_schema(&self) -> Result<()>;

    /// List items matching every supplied filter, newest first
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<KnowledgeItem>>;

    /// Retrieve an item by ID
    async fn get_item(&self, id: &ItemId) -> Result<Option<KnowledgeItem>>;

    /// Store a new item, assigning id and timestamps
    async fn create_item(&self, item: NewItem) -> Result<KnowledgeItem>;

    /// Apply a partial update and return the stored result
    ///
    /// Fails with `NotFound` when the id does not exist.
    async fn update_item(&self, id: &ItemId, update: ItemUpdate) -> Result<KnowledgeItem>;

    /// Delete an item; returns whether a row was removed
    async fn delete_item(&self, id: &ItemId) -> Result<bool>;

    /// Every distinct tag in use, sorted
    async fn list_tags(&self) -> Result<Vec<String>>;

    /// Total number of stored items
    async fn count_items(&self) -> Result<usize>;
}
