//! Persistent row shapes (specification §3).

use crate::chunking::ChunkKind;

/// A codebase-scoped, repo-relative source file that has been indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFile {
    pub id: i64,
    pub codebase: String,
    pub repo: String,
    pub path: String,
    pub language: String,
    pub content_hash: String,
    pub size_bytes: i64,
    pub indexed_at: i64,
}

/// The fields the caller supplies to `upsert_file`; `id` and `indexed_at`
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewIndexedFile {
    pub codebase: String,
    pub repo: String,
    pub path: String,
    pub language: String,
    pub content_hash: String,
    pub size_bytes: i64,
}

/// One chunk as stored, owned by exactly one `IndexedFile`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub id: i64,
    pub file_id: i64,
    pub start_line: i64,
    pub end_line: i64,
    pub kind: ChunkKind,
    pub symbol: Option<String>,
    pub content: String,
    pub token_estimate: i64,
    pub created_at: i64,
}

/// The fields the caller supplies to `insert_chunk`.
#[derive(Debug, Clone)]
pub struct NewStoredChunk {
    pub start_line: i64,
    pub end_line: i64,
    pub kind: ChunkKind,
    pub symbol: Option<String>,
    pub content: String,
    pub token_estimate: i64,
}

/// One row of a `search_similar` result: the owning file, the chunk, and
/// the similarity scoring.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub file: IndexedFile,
    pub chunk: StoredChunk,
    pub distance: f32,
    pub similarity: f32,
}

/// Totals and per-codebase aggregates returned by `stats()`.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_files: i64,
    pub total_chunks: i64,
    pub per_codebase: Vec<CodebaseStats>,
}

#[derive(Debug, Clone)]
pub struct CodebaseStats {
    pub codebase: String,
    pub files: i64,
    pub chunks: i64,
}

/// An append-only observability row describing one `index_codebase` run.
#[derive(Debug, Clone)]
pub struct IndexJob {
    pub id: i64,
    pub codebase: String,
    pub status: JobStatus,
    pub files_total: i64,
    pub files_processed: i64,
    pub chunks_total: i64,
    pub chunks_embedded: i64,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }
}

/// Parse the chunk-kind label stored in the database back into a
/// `ChunkKind`. Storage round-trips through `Display`/this function rather
/// than `serde`, since the vocabulary is small and fixed.
pub fn parse_chunk_kind(s: &str) -> ChunkKind {
    use ChunkKind::*;
    match s {
        "function" => Function,
        "method" => Method,
        "class" => Class,
        "struct" => Struct,
        "interface" => Interface,
        "enum" => Enum,
        "trait" => Trait,
        "impl" => Impl,
        "module" => Module,
        "type" => Type,
        "const" => Const,
        "static" => Static,
        "var" => Var,
        "namespace" => Namespace,
        "constructor" => Constructor,
        "field" => Field,
        "property" => Property,
        "macro" => Macro,
        "decorated" => Decorated,
        "export" => Export,
        _ => Block,
    }
}
