//! LibSQL storage backend implementation
//!
//! Persists knowledge items in a single `knowledge_items` table on a local
//! libSQL file or a remote Turso database. Tags live in a JSON array column
//! and are matched with `json_each`; timestamps are fixed-width RFC 3339
//! text so that lexical and chronological order agree.
//!
//! SQLite's `LIKE` folds ASCII only, so search runs against lowercased
//! copies of title and content (`title_folded`, `content_folded`) kept in
//! step on every write.

use crate::error::{BrainError, Result};
use crate::storage::KnowledgeStore;
use crate::types::{ItemFilter, ItemId, ItemType, ItemUpdate, KnowledgeItem, NewItem};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use libsql::{params, Builder, Connection, Database, Value};
use tracing::{debug, info};

/// Schema for the one table plus its indexes
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS knowledge_items (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('NOTE', 'LINK', 'INSIGHT')),
    source_url TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    summary TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    title_folded TEXT,
    content_folded TEXT
);
CREATE INDEX IF NOT EXISTS idx_knowledge_items_type ON knowledge_items(type);
CREATE INDEX IF NOT EXISTS idx_knowledge_items_created_at ON knowledge_items(created_at DESC);
"#;

/// Column order used by every SELECT; `row_to_item` depends on it
const COLUMNS: &str =
    "id, title, content, type, source_url, tags, summary, created_at, updated_at";

/// Lowercased search copies, added to databases created before they existed
const FOLDED_COLUMNS: [&str; 2] = ["title_folded", "content_folded"];

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// Remote database (Turso Cloud)
    Remote { url: String, token: String },
}

impl ConnectionMode {
    /// Pick a mode from a database URL
    ///
    /// - "libsql://..." or "https://..." → Remote (token required)
    /// - "file:..." or a plain path → Local
    pub fn from_url(url: &str, token: Option<String>) -> Result<Self> {
        if url.starts_with("libsql://") || url.starts_with("https://") {
            let token = token.ok_or_else(|| {
                BrainError::Other(format!("Remote database {} requires an auth token", url))
            })?;
            Ok(ConnectionMode::Remote {
                url: url.to_string(),
                token,
            })
        } else {
            let path = url.strip_prefix("file:").unwrap_or(url);
            Ok(ConnectionMode::Local(path.to_string()))
        }
    }
}

/// LibSQL storage backend
pub struct LibsqlStore {
    db: Database,
}

impl LibsqlStore {
    /// Open (or create) the database; the schema is created separately by `init_schema`
    pub async fn open(mode: ConnectionMode) -> Result<Self> {
        info!("Connecting to LibSQL database: {}", describe(&mode));

        let db = match mode {
            ConnectionMode::Local(ref path) => {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            BrainError::Database(format!(
                                "Failed to create database directory {}: {}",
                                parent.display(),
                                e
                            ))
                        })?;
                    }
                }

                Builder::new_local(path).build().await.map_err(|e| {
                    BrainError::Database(format!("Failed to create local database: {}", e))
                })?
            }
            ConnectionMode::Remote { ref url, ref token } => {
                Builder::new_remote(url.clone(), token.clone())
                    .build()
                    .await
                    .map_err(|e| {
                        BrainError::Database(format!("Failed to create remote database: {}", e))
                    })?
            }
        };

        info!("LibSQL database connection established");
        Ok(Self { db })
    }

    /// Open the database and make sure the schema exists
    pub async fn open_initialized(mode: ConnectionMode) -> Result<Self> {
        let store = Self::open(mode).await?;
        store.init_schema().await?;
        Ok(store)
    }

    /// Get a connection from the database
    fn get_conn(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| BrainError::Database(format!("Failed to get connection: {}", e)))
    }

    /// Convert a libsql row (selected with `COLUMNS`) to a KnowledgeItem
    fn row_to_item(row: &libsql::Row) -> Result<KnowledgeItem> {
        let id: String = row.get(0)?;
        let title: String = row.get(1)?;
        let content: String = row.get(2)?;

        let type_str: String = row.get(3)?;
        let item_type = ItemType::parse(&type_str)
            .map_err(|_| BrainError::Database(format!("Unknown item type: {}", type_str)))?;

        let source_url: Option<String> = row.get(4)?;

        let tags_json: String = row.get(5)?;
        let tags: Vec<String> = serde_json::from_str(&tags_json)?;

        let summary: Option<String> = row.get(6)?;

        let created_at: String = row.get(7)?;
        let updated_at: String = row.get(8)?;

        Ok(KnowledgeItem {
            id: ItemId(id),
            title,
            content,
            item_type,
            source_url,
            tags,
            summary,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    /// Add and backfill the search columns on tables that predate them
    async fn ensure_folded_columns(conn: &Connection) -> Result<()> {
        let mut rows = conn
            .query("SELECT name FROM pragma_table_info('knowledge_items')", params![])
            .await?;
        let mut existing = Vec::new();
        while let Some(row) = rows.next().await? {
            existing.push(row.get::<String>(0)?);
        }
        drop(rows);

        for column in FOLDED_COLUMNS {
            if !existing.iter().any(|c| c == column) {
                info!("Adding {} column to knowledge_items", column);
                conn.execute(
                    &format!("ALTER TABLE knowledge_items ADD COLUMN {} TEXT", column),
                    params![],
                )
                .await
                .map_err(|e| {
                    BrainError::Migration(format!("Failed to add {}: {}", column, e))
                })?;
            }
        }

        let mut rows = conn
            .query(
                "SELECT id, title, content FROM knowledge_items \
                 WHERE title_folded IS NULL OR content_folded IS NULL",
                params![],
            )
            .await?;
        let mut pending = Vec::new();
        while let Some(row) = rows.next().await? {
            pending.push((
                row.get::<String>(0)?,
                row.get::<String>(1)?,
                row.get::<String>(2)?,
            ));
        }
        drop(rows);

        if !pending.is_empty() {
            info!("Backfilling search columns for {} items", pending.len());
        }
        for (id, title, content) in pending {
            conn.execute(
                "UPDATE knowledge_items SET title_folded = ?1, content_folded = ?2 WHERE id = ?3",
                params![title.to_lowercase(), content.to_lowercase(), id],
            )
            .await?;
        }
        Ok(())
    }

    async fn fetch_one(&self, conn: &Connection, id: &ItemId) -> Result<Option<KnowledgeItem>> {
        let sql = format!("SELECT {} FROM knowledge_items WHERE id = ?1", COLUMNS);
        let mut rows = conn.query(&sql, params![id.as_str()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_item(&row)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl KnowledgeStore for LibsqlStore {
    async fn init_schema(&self) -> Result<()> {
        info!("Ensuring knowledge_items schema exists");

        let conn = self.get_conn()?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| BrainError::Migration(format!("Failed to create schema: {}", e)))?;

        Self::ensure_folded_columns(&conn).await?;

        debug!("Schema ready");
        Ok(())
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<KnowledgeItem>> {
        debug!("Listing items with filter: {:?}", filter);

        let conn = self.get_conn()?;
        let (sql, values) = build_list_query(filter);

        let mut rows = conn.query(&sql, libsql::params_from_iter(values)).await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::row_to_item(&row)?);
        }

        debug!("Listed {} items", items.len());
        Ok(items)
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<KnowledgeItem>> {
        debug!("Fetching item: {}", id);
        let conn = self.get_conn()?;
        self.fetch_one(&conn, id).await
    }

    async fn create_item(&self, item: NewItem) -> Result<KnowledgeItem> {
        let now = now_micros();
        let created = KnowledgeItem {
            id: ItemId::new(),
            title: item.title,
            content: item.content,
            item_type: item.item_type,
            source_url: item.source_url,
            tags: item.tags,
            summary: item.summary,
            created_at: now,
            updated_at: now,
        };

        debug!("Storing item: {}", created.id);

        let conn = self.get_conn()?;
        let sql = format!(
            "INSERT INTO knowledge_items ({}, title_folded, content_folded) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            COLUMNS
        );
        conn.execute(
            &sql,
            params![
                created.id.as_str(),
                created.title.clone(),
                created.content.clone(),
                created.item_type.as_str(),
                created.source_url.clone(),
                serde_json::to_string(&created.tags)?,
                created.summary.clone(),
                format_timestamp(&created.created_at),
                format_timestamp(&created.updated_at),
                created.title.to_lowercase(),
                created.content.to_lowercase(),
            ],
        )
        .await?;

        info!("Created {} item {}", created.item_type, created.id);
        Ok(created)
    }

    async fn update_item(&self, id: &ItemId, update: ItemUpdate) -> Result<KnowledgeItem> {
        debug!("Updating item: {}", id);

        let conn = self.get_conn()?;
        let existing = self
            .fetch_one(&conn, id)
            .await?
            .ok_or_else(|| BrainError::NotFound(id.to_string()))?;

        let updated_at = next_update_timestamp(existing.updated_at);
        let (sql, values) = build_update_statement(id, &update, updated_at)?;

        conn.execute(&sql, libsql::params_from_iter(values)).await?;

        self.fetch_one(&conn, id)
            .await?
            .ok_or_else(|| BrainError::NotFound(id.to_string()))
    }

    async fn delete_item(&self, id: &ItemId) -> Result<bool> {
        debug!("Deleting item: {}", id);

        let conn = self.get_conn()?;
        let removed = conn
            .execute("DELETE FROM knowledge_items WHERE id = ?1", params![id.as_str()])
            .await?;

        if removed == 0 {
            debug!("Delete of {} matched no rows", id);
        }
        Ok(removed > 0)
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        let conn = self.get_conn()?;
        let mut rows = conn
            .query(
                "SELECT DISTINCT j.value \
                 FROM knowledge_items, json_each(knowledge_items.tags) AS j \
                 ORDER BY j.value",
                params![],
            )
            .await?;

        let mut tags = Vec::new();
        while let Some(row) = rows.next().await? {
            tags.push(row.get::<String>(0)?);
        }
        Ok(tags)
    }

    async fn count_items(&self) -> Result<usize> {
        let conn = self.get_conn()?;
        let mut rows = conn.query("SELECT COUNT(*) FROM knowledge_items", params![]).await?;

        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(count.max(0) as usize)
    }
}

/// Build the SELECT for `list_items`; each supplied filter adds one AND clause
fn build_list_query(filter: &ItemFilter) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT {} FROM knowledge_items WHERE 1=1", COLUMNS);
    let mut values: Vec<Value> = Vec::new();

    if let Some(item_type) = filter.item_type {
        values.push(Value::Text(item_type.as_str().to_string()));
        sql.push_str(&format!(" AND type = ?{}", values.len()));
    }

    if let Some(tag) = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        values.push(Value::Text(tag.to_lowercase()));
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM json_each(knowledge_items.tags) \
             WHERE json_each.value = ?{})",
            values.len()
        ));
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        values.push(Value::Text(format!("%{}%", escape_like(&search.to_lowercase()))));
        let n = values.len();
        sql.push_str(&format!(
            " AND (title_folded LIKE ?{n} ESCAPE '\\' OR content_folded LIKE ?{n} ESCAPE '\\')"
        ));
    }

    sql.push_str(" ORDER BY created_at DESC, rowid DESC");

    if let Some(limit) = filter.limit {
        values.push(Value::Integer(limit as i64));
        sql.push_str(&format!(" LIMIT ?{}", values.len()));
    }

    (sql, values)
}

/// Build the UPDATE for a partial change from (column, value) pairs of supplied fields
fn build_update_statement(
    id: &ItemId,
    update: &ItemUpdate,
    updated_at: DateTime<Utc>,
) -> Result<(String, Vec<Value>)> {
    let mut assignments: Vec<(&'static str, Value)> = Vec::new();

    if let Some(title) = &update.title {
        assignments.push(("title", Value::Text(title.clone())));
        assignments.push(("title_folded", Value::Text(title.to_lowercase())));
    }
    if let Some(content) = &update.content {
        assignments.push(("content", Value::Text(content.clone())));
        assignments.push(("content_folded", Value::Text(content.to_lowercase())));
    }
    if let Some(item_type) = update.item_type {
        assignments.push(("type", Value::Text(item_type.as_str().to_string())));
    }
    if let Some(source_url) = &update.source_url {
        assignments.push(("source_url", optional_text(source_url)));
    }
    if let Some(tags) = &update.tags {
        assignments.push(("tags", Value::Text(serde_json::to_string(tags)?)));
    }
    if let Some(summary) = &update.summary {
        assignments.push(("summary", optional_text(summary)));
    }
    assignments.push(("updated_at", Value::Text(format_timestamp(&updated_at))));

    let set_clause = assignments
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    let mut values: Vec<Value> = assignments.into_iter().map(|(_, v)| v).collect();
    values.push(Value::Text(id.as_str().to_string()));

    let sql = format!(
        "UPDATE knowledge_items SET {} WHERE id = ?{}",
        set_clause,
        values.len()
    );
    Ok((sql, values))
}

fn optional_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

/// Escape LIKE wildcards so user input matches literally (with `ESCAPE '\'`)
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Current time truncated to what the database stores
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// `updated_at` for a modification: now, but strictly after the previous value
fn next_update_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_micros();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BrainError::Database(format!("Invalid timestamp {}: {}", raw, e)))
}

fn describe(mode: &ConnectionMode) -> String {
    match mode {
        ConnectionMode::Local(path) => format!("local file {}", path),
        ConnectionMode::Remote { url, .. } => format!("remote {}", url),
    }
}
