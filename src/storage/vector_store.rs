//! Vector store abstraction (specification §4.4).
//!
//! A single trait, deliberately narrow: the operation set is exactly the
//! table in §4.4, nothing more. There is one implementation in this crate
//! (`SqliteVecStore`) but the trait exists so the indexer and searcher
//! depend on a capability, not a concrete backend.

use async_trait::async_trait;

use crate::error::Result;
use crate::storage::types::IndexJob;
use crate::storage::types::NewIndexedFile;
use crate::storage::types::NewStoredChunk;
use crate::storage::types::SearchHit;
use crate::storage::types::StoreStats;
use crate::storage::types::IndexedFile;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert-or-update on the natural key (codebase, repo, path). Always
    /// returns the durable surrogate id via lookup.
    async fn upsert_file(&self, file: NewIndexedFile) -> Result<i64>;

    async fn get_file_by_path(
        &self,
        codebase: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<IndexedFile>>;

    /// Removes all chunks (and their vectors) owned by `file_id`.
    async fn delete_file_chunks(&self, file_id: i64) -> Result<()>;

    /// Writes a chunk row, and a vector row iff `vector` is `Some` and
    /// non-empty. Returns the new chunk id.
    async fn insert_chunk(
        &self,
        file_id: i64,
        chunk: NewStoredChunk,
        vector: Option<&[f32]>,
    ) -> Result<i64>;

    /// Ordered ascending-distance k-NN, optionally filtered to one
    /// codebase. `k` is a query predicate, not a post-hoc limit.
    async fn search_similar(
        &self,
        query_vector: &[f32],
        k: usize,
        codebase: Option<&str>,
    ) -> Result<Vec<SearchHit>>;

    /// Removes all rows for `codebase`, transactionally.
    async fn delete_codebase(&self, codebase: &str) -> Result<()>;

    async fn stats(&self) -> Result<StoreStats>;

    async fn list_codebases(&self) -> Result<Vec<String>>;

    /// Deletes IndexedFile rows (and their cascaded chunks/vectors) whose
    /// (repo, path) pairs in `codebase` are not present in `still_present`.
    /// The sweep phase recommended, not mandated, by §9's open question on
    /// re-index garbage collection.
    async fn sweep_missing(
        &self,
        codebase: &str,
        still_present: &[(String, String)],
    ) -> Result<u64>;

    async fn record_job(&self, job: &IndexJob) -> Result<i64>;
    async fn update_job(&self, job: &IndexJob) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
