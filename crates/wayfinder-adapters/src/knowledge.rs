//! Local markdown knowledge base.
//!
//! Documents are split into chunks at markdown section boundaries and
//! paragraphs, and each chunk is indexed as a term-frequency vector.
//! [`KnowledgeBase::search_sync`] ranks chunks by cosine similarity to the
//! query, so results are deterministic for a given corpus.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{ProviderError, Result};
use crate::traits::{RetrievalService, Snippet};

/// Maximum characters per chunk.
pub const MAX_CHUNK_CHARS: usize = 1000;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "for", "from", "how",
        "i", "in", "is", "it", "me", "my", "of", "on", "or", "that", "the", "this", "to",
        "was", "what", "when", "where", "which", "who", "will", "with", "you", "your",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone)]
struct Chunk {
    source_id: String,
    text: String,
    terms: BTreeMap<String, f32>,
    norm: f32,
}

/// In-memory lexical index over markdown documents.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    chunks: Vec<Chunk>,
    sources: Vec<String>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.md` file under `dir`, recursively, in path order.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ProviderError::Knowledge {
                reason: format!("knowledge directory not found: {}", dir.display()),
            });
        }

        let mut files = Vec::new();
        collect_markdown(dir, &mut files)?;
        files.sort();

        let mut kb = Self::new();
        for path in &files {
            let text = std::fs::read_to_string(path)?;
            let source_id = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            kb.add_document(source_id, &text);
        }

        info!(
            dir = %dir.display(),
            files = kb.file_count(),
            chunks = kb.len(),
            "knowledge base loaded"
        );
        Ok(kb)
    }

    /// Chunk and index one document.
    pub fn add_document(&mut self, source_id: impl Into<String>, text: &str) {
        let source_id = source_id.into();
        let mut added = 0;
        for piece in chunk_markdown(text, MAX_CHUNK_CHARS) {
            let terms = term_frequencies(&piece);
            if terms.is_empty() {
                continue;
            }
            let norm = terms.values().map(|v| v * v).sum::<f32>().sqrt();
            self.chunks.push(Chunk {
                source_id: source_id.clone(),
                text: piece,
                terms,
                norm,
            });
            added += 1;
        }
        if added > 0 && !self.sources.contains(&source_id) {
            self.sources.push(source_id);
        }
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of distinct documents that contributed at least one chunk.
    pub fn file_count(&self) -> usize {
        self.sources.len()
    }

    /// Top `top_k` chunks by cosine similarity, highest first.
    ///
    /// Chunks with no term overlap are never returned.  Equal scores keep
    /// index order.
    pub fn search_sync(&self, query: &str, top_k: usize) -> Vec<Snippet> {
        let query_terms = term_frequencies(query);
        if query_terms.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let query_norm = query_terms.values().map(|v| v * v).sum::<f32>().sqrt();

        let mut scored: Vec<(f32, &Chunk)> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let dot: f32 = query_terms
                    .iter()
                    .filter_map(|(term, q)| chunk.terms.get(term).map(|c| q * c))
                    .sum();
                (dot > 0.0).then(|| (dot / (query_norm * chunk.norm), chunk))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(score, chunk)| {
                Snippet::new(chunk.text.clone(), chunk.source_id.clone(), score.clamp(0.0, 1.0))
            })
            .collect()
    }
}

#[async_trait]
impl RetrievalService for KnowledgeBase {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Snippet>> {
        let results = self.search_sync(query, top_k);
        debug!(query, hits = results.len(), "knowledge search");
        Ok(results)
    }
}

fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_markdown(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}

/// Split markdown into sections at `##`/`###` headings and `---` rules,
/// then pack paragraphs into chunks of at most `max_chars`.
///
/// A single paragraph longer than `max_chars` is split on whitespace.
fn chunk_markdown(text: &str, max_chars: usize) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        let boundary = trimmed.starts_with("## ")
            || trimmed.starts_with("### ")
            || trimmed.starts_with("---");
        if boundary && !current.trim().is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        if trimmed.starts_with("---") {
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        sections.push(current);
    }

    let mut chunks = Vec::new();
    for section in sections {
        let mut buf = String::new();
        for para in section.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            if !buf.is_empty() && buf.len() + para.len() + 2 > max_chars {
                chunks.push(std::mem::take(&mut buf));
            }
            if para.len() > max_chars {
                chunks.extend(split_words(para, max_chars));
                continue;
            }
            if !buf.is_empty() {
                buf.push_str("\n\n");
            }
            buf.push_str(para);
        }
        if !buf.is_empty() {
            chunks.push(buf);
        }
    }
    chunks
}

fn split_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    for word in text.split_whitespace() {
        if !buf.is_empty() && buf.len() + word.len() + 1 > max_chars {
            out.push(std::mem::take(&mut buf));
        }
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(word);
    }
    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

/// Lowercased alphanumeric tokens minus stop-words and single characters.
fn term_frequencies(text: &str) -> BTreeMap<String, f32> {
    let mut terms = BTreeMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(t.as_str()))
    {
        *terms.entry(token).or_insert(0.0) += 1.0;
    }
    terms
}
