//! Document knowledge base: uploaded text is chunked and indexed in memory,
//! then queried with keyword scoring to build prompt context.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

const CHUNK_SIZE_WORDS: usize = 500;
const CHUNK_OVERLAP_WORDS: usize = 50;
const TOP_K: usize = 5;
const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub user_id: String,
    pub filename: String,
    pub text_content: String,
    pub chunks: Vec<String>,
    pub summary: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Listing projection without the full text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub id: Uuid,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// One scored chunk returned from a query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMatch {
    pub document_id: Uuid,
    pub filename: String,
    pub snippet: String,
    pub relevance: u32,
    #[serde(skip)]
    pub text: String,
}

/// Shared in-memory index. Documents are scoped per user.
#[derive(Clone, Default)]
pub struct DocumentIndex {
    inner: Arc<RwLock<HashMap<Uuid, Document>>>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(
        &self,
        user_id: &str,
        filename: &str,
        text: &str,
        summary: Option<String>,
    ) -> DocumentMeta {
        let document = Document {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            filename: filename.to_string(),
            text_content: text.to_string(),
            chunks: chunk_text(text, CHUNK_SIZE_WORDS, CHUNK_OVERLAP_WORDS),
            summary,
            uploaded_at: Utc::now(),
        };
        let meta = meta_of(&document);
        info!(id = %document.id, filename, chunks = document.chunks.len(), "Document indexed");
        self.inner.write().await.insert(document.id, document);
        meta
    }

    pub async fn list(&self, user_id: &str) -> Vec<DocumentMeta> {
        let mut docs: Vec<DocumentMeta> = self
            .inner
            .read()
            .await
            .values()
            .filter(|d| d.user_id == user_id)
            .map(meta_of)
            .collect();
        docs.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        docs
    }

    /// Remove a document; true when the caller owned it and it existed.
    pub async fn remove(&self, user_id: &str, id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        match inner.get(&id) {
            Some(doc) if doc.user_id == user_id => {
                inner.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Score all chunks of the user's documents against the query and return
    /// the best matches, highest relevance first.
    pub async fn query(&self, user_id: &str, query: &str) -> Vec<ChunkMatch> {
        let query_lower = query.to_lowercase();
        let query_words: Vec<&str> = query_lower
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .collect();

        let inner = self.inner.read().await;
        let mut matches: Vec<ChunkMatch> = Vec::new();
        for doc in inner.values().filter(|d| d.user_id == user_id) {
            for chunk in &doc.chunks {
                let score = score_chunk(chunk, &query_lower, &query_words);
                if score > 0 {
                    matches.push(ChunkMatch {
                        document_id: doc.id,
                        filename: doc.filename.clone(),
                        snippet: snippet_of(chunk),
                        relevance: score,
                        text: chunk.clone(),
                    });
                }
            }
        }

        matches.sort_by(|a, b| b.relevance.cmp(&a.relevance));
        matches.truncate(TOP_K);
        matches
    }

    /// Build prompt context from the best matches, or None when nothing
    /// relevant is indexed.
    pub async fn context_for(&self, user_id: &str, query: &str) -> Option<String> {
        let matches = self.query(user_id, query).await;
        if matches.is_empty() {
            return None;
        }
        Some(
            matches
                .iter()
                .enumerate()
                .map(|(i, m)| format!("[Source {}: {}]\n{}", i + 1, m.filename, m.text))
                .collect::<Vec<_>>()
                .join("\n\n---\n\n"),
        )
    }
}

fn meta_of(doc: &Document) -> DocumentMeta {
    DocumentMeta {
        id: doc.id,
        filename: doc.filename.clone(),
        summary: doc.summary.clone(),
        size: doc.text_content.len(),
        uploaded_at: doc.uploaded_at,
    }
}

fn snippet_of(chunk: &str) -> String {
    if chunk.chars().count() <= SNIPPET_CHARS {
        chunk.to_string()
    } else {
        let head: String = chunk.chars().take(SNIPPET_CHARS).collect();
        format!("{head}...")
    }
}

/// Split text into overlapping word windows.
pub(crate) fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let stride = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += stride;
    }
    chunks
}

/// Keyword relevance: +10 for an exact phrase match, +2 per query word
/// present, +3 when the matched words fall within a 100-character span.
pub(crate) fn score_chunk(chunk: &str, query_lower: &str, query_words: &[&str]) -> u32 {
    let chunk_lower = chunk.to_lowercase();
    let mut score = 0;

    if chunk_lower.contains(query_lower) {
        score += 10;
    }

    for word in query_words {
        if chunk_lower.contains(word) {
            score += 2;
        }
    }

    let positions: Vec<usize> = query_words
        .iter()
        .filter_map(|w| chunk_lower.find(w))
        .collect();
    if positions.len() > 1 {
        let min = positions.iter().min().copied().unwrap_or(0);
        let max = positions.iter().max().copied().unwrap_or(0);
        if max - min < 100 {
            score += 3;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn indexed_document_is_listed_and_removable() {
        let index = DocumentIndex::new();
        let meta = index.add("user-1", "notes.txt", "quarterly revenue figures", None).await;

        let listed = index.list("user-1").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, meta.id);
        assert!(index.list("user-2").await.is_empty());

        assert!(!index.remove("user-2", meta.id).await, "other users cannot remove");
        assert!(index.remove("user-1", meta.id).await);
        assert!(index.list("user-1").await.is_empty());
    }

    #[tokio::test]
    async fn query_ranks_phrase_match_first() {
        let index = DocumentIndex::new();
        index
            .add("u", "a.txt", "the quarterly revenue report shows strong growth", None)
            .await;
        index.add("u", "b.txt", "unrelated holiday planning notes", None).await;

        let matches = index.query("u", "quarterly revenue").await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].filename, "a.txt");
        // Phrase (10) + both words (4) + proximity (3).
        assert_eq!(matches[0].relevance, 17);
    }

    #[tokio::test]
    async fn query_returns_at_most_five_matches() {
        let index = DocumentIndex::new();
        for i in 0..8 {
            index.add("u", &format!("doc{i}.txt"), "revenue growth numbers", None).await;
        }
        let matches = index.query("u", "revenue growth").await;
        assert_eq!(matches.len(), 5);
    }

    #[tokio::test]
    async fn context_joins_sources_with_separators() {
        let index = DocumentIndex::new();
        index.add("u", "a.txt", "alpha revenue data", None).await;
        index.add("u", "b.txt", "beta revenue data", None).await;

        let context = index.context_for("u", "revenue data").await.unwrap();
        assert!(context.contains("[Source 1:"));
        assert!(context.contains("[Source 2:"));
        assert!(context.contains("\n\n---\n\n"));
        assert!(index.context_for("u", "zzz").await.is_none());
    }

    #[test]
    fn chunking_overlaps_windows() {
        let words: Vec<String> = (0..1000).map(|i| format!("w{i}")).collect();
        let text = words.join(" ");
        let chunks = chunk_text(&text, 500, 50);
        // Windows start at 0, 450, 900.
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("w0 "));
        assert!(chunks[1].starts_with("w450 "));
        assert!(chunks[2].starts_with("w900 "));
        assert!(chunk_text("", 500, 50).is_empty());
    }

    #[test]
    fn short_query_words_are_ignored() {
        // Words of three characters or fewer do not contribute.
        let score = score_chunk("the cat sat", "the cat", &[]);
        assert_eq!(score, 10); // phrase match only
    }
}
