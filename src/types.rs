//! Core data types for the Second Brain knowledge service
//!
//! This module defines the knowledge item record and the request-side shapes
//! used to create, patch and filter items. Field names serialize in camelCase
//! to match the JSON API.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BrainError, Result};

/// Characters that are not allowed inside a tag
static TAG_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("tag pattern is a valid regex"));

/// Unique identifier for knowledge items
///
/// Opaque text on the wire; freshly created items get a random UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create a new random item ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of knowledge item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    /// Free-form note
    Note,

    /// Saved link, usually with a source URL
    Link,

    /// Distilled insight or learning
    Insight,
}

impl ItemType {
    pub const ALL: [ItemType; 3] = [ItemType::Note, ItemType::Link, ItemType::Insight];

    /// Parse a type name case-insensitively ("note", "Note" and "NOTE" are all NOTE)
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_uppercase().as_str() {
            "NOTE" => Ok(ItemType::Note),
            "LINK" => Ok(ItemType::Link),
            "INSIGHT" => Ok(ItemType::Insight),
            _ => Err(BrainError::Validation(
                "Invalid type. Must be NOTE, LINK, or INSIGHT".to_string(),
            )),
        }
    }

    /// Canonical uppercase name, as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Note => "NOTE",
            ItemType::Link => "LINK",
            ItemType::Insight => "INSIGHT",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemType {
    type Err = BrainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A stored note, link or insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    /// Unique identifier, immutable once assigned
    pub id: ItemId,

    /// Short human title
    pub title: String,

    /// Full body text
    pub content: String,

    /// Item kind
    #[serde(rename = "type")]
    pub item_type: ItemType,

    /// Where the content came from, if anywhere
    pub source_url: Option<String>,

    /// Lowercase `[a-z0-9-]` tags, in insertion order
    pub tags: Vec<String>,

    /// AI-generated summary
    pub summary: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Fields for a brand new item; id and timestamps are assigned by storage
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub title: String,
    pub content: String,
    pub item_type: ItemType,
    pub source_url: Option<String>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
}

impl NewItem {
    /// Convenience constructor with no tags, source or summary
    pub fn new(title: impl Into<String>, content: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            item_type,
            source_url: None,
            tags: Vec::new(),
            summary: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

/// Partial update: `None` leaves a field untouched
///
/// `source_url` and `summary` are doubly optional so that an explicit
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub item_type: Option<ItemType>,
    pub source_url: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub summary: Option<Option<String>>,
}

impl ItemUpdate {
    /// True when no field was supplied
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.item_type.is_none()
            && self.source_url.is_none()
            && self.tags.is_none()
            && self.summary.is_none()
    }
}

/// Conjunctive filters for listing items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    /// Only items of this type
    pub item_type: Option<ItemType>,

    /// Only items carrying this tag
    pub tag: Option<String>,

    /// Case-insensitive substring of title or content
    pub search: Option<String>,

    /// Cap on the number of (newest) items returned
    pub limit: Option<usize>,
}

impl ItemFilter {
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }
}

/// Normalize one tag: lowercase and drop everything outside `[a-z0-9-]`
///
/// Returns `None` when nothing is left.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let cleaned = TAG_STRIP.replace_all(&lowered, "");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.into_owned())
    }
}

/// Normalize a tag list, keeping the first occurrence of duplicates
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        if let Some(tag) = normalize_tag(tag.as_ref()) {
            if !out.contains(&tag) {
                out.push(tag);
            }
        }
    }
    out
}
