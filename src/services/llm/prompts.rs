//! Prompt templates and text helpers for the AI gateway

use crate::types::KnowledgeItem;

/// Items rendered into the answer context
pub const MAX_CONTEXT_ITEMS: usize = 10;

/// Items reported back as relevant for an answer
pub const MAX_CITED_ITEMS: usize = 3;

/// Canned answer when there is nothing to search
pub const EMPTY_BRAIN_ANSWER: &str =
    "No knowledge items found in your brain yet. Add some notes to get started!";

const TAG_CONTENT_CHARS: usize = 500;
const CONTEXT_PREVIEW_CHARS: usize = 300;
const EXCERPT_CHARS: usize = 150;

pub fn summarize_prompt(content: &str) -> String {
    format!(
        "Summarize the following content in under 100 words, focusing on key insights:\n\n{}",
        content
    )
}

pub fn tag_prompt(title: &str, content: &str) -> String {
    format!(
        "Generate 3-5 relevant tags for this content. Return only the tags separated by commas, nothing else.\n\nTitle: {}\nContent: {}",
        title,
        truncate_chars(content, TAG_CONTENT_CHARS)
    )
}

/// Build the retrieve-then-generate prompt from the numbered context
pub fn answer_prompt(query: &str, items: &[KnowledgeItem]) -> String {
    format!(
        "You are a helpful AI assistant answering questions based on a user's personal knowledge base. \
Use the provided context to answer questions accurately. If the answer is not in the context, say so. \
Always cite which items you're referencing by their number [1], [2], etc.\n\n\
Context:\n{}\n\nQuestion: {}\n\nAnswer:",
        context_block(items),
        query
    )
}

/// `[n] title` followed by the summary or a content preview, one block per item
pub fn context_block(items: &[KnowledgeItem]) -> String {
    items
        .iter()
        .take(MAX_CONTEXT_ITEMS)
        .enumerate()
        .map(|(i, item)| {
            let body = match &item.summary {
                Some(summary) => summary.clone(),
                None => truncate_chars(&item.content, CONTEXT_PREVIEW_CHARS).to_string(),
            };
            format!("[{}] {}\n{}", i + 1, item.title, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Summary when present, otherwise the start of the content with an ellipsis
pub fn excerpt(item: &KnowledgeItem) -> String {
    match &item.summary {
        Some(summary) => summary.clone(),
        None => format!("{}...", truncate_chars(&item.content, EXCERPT_CHARS)),
    }
}

/// Prefix of at most `max` characters, never splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemId, ItemType};
    use chrono::Utc;

    fn item(title: &str, content: &str, summary: Option<&str>) -> KnowledgeItem {
        let now = Utc::now();
        KnowledgeItem {
            id: ItemId::new(),
            title: title.to_string(),
            content: content.to_string(),
            item_type: ItemType::Note,
            source_url: None,
            tags: vec![],
            summary: summary.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_tag_prompt_uses_first_500_chars() {
        let content = "a".repeat(800);
        let prompt = tag_prompt("Title", &content);
        assert!(prompt.contains("Title: Title"));
        assert!(prompt.ends_with(&"a".repeat(500)));
        assert!(!prompt.contains(&"a".repeat(501)));
    }

    #[test]
    fn test_context_block_prefers_summary() {
        let items = vec![
            item("First", "long body", Some("short summary")),
            item("Second", &"x".repeat(400), None),
        ];
        let block = context_block(&items);

        assert!(block.starts_with("[1] First\nshort summary"));
        assert!(block.contains("[2] Second\n"));
        assert!(block.contains(&"x".repeat(300)));
        assert!(!block.contains(&"x".repeat(301)));
    }

    #[test]
    fn test_context_block_caps_items() {
        let items: Vec<_> = (0..12).map(|i| item(&format!("T{}", i), "body", None)).collect();
        let block = context_block(&items);
        assert!(block.contains("[10] T9"));
        assert!(!block.contains("[11]"));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt(&item("t", "body", Some("sum"))), "sum");
        assert_eq!(excerpt(&item("t", "body", None)), "body...");
        let long = excerpt(&item("t", &"y".repeat(200), None));
        assert_eq!(long, format!("{}...", "y".repeat(150)));
    }

    #[test]
    fn test_answer_prompt_layout() {
        let prompt = answer_prompt("what is rust?", &[item("Rust", "A language", None)]);
        assert!(prompt.contains("Context:\n[1] Rust\nA language"));
        assert!(prompt.ends_with("Question: what is rust?\n\nAnswer:"));
    }
}
