//! Searcher: the query-side dual of the indexer (specification §4.6).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::embeddings::Embedder;
use crate::error::Result;
use crate::storage::VectorStore;

/// One query's configuration. `From<&crate::config::SearchConfig>` seeds
/// the defaults; `codebase` is always per-query since it is not a static
/// tunable.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub limit: usize,
    pub codebase: Option<String>,
    pub min_score: f32,
    pub include_content: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            limit: 10,
            codebase: None,
            min_score: 0.0,
            include_content: false,
        }
    }
}

impl From<&crate::config::SearchConfig> for SearchRequest {
    fn from(cfg: &crate::config::SearchConfig) -> Self {
        Self {
            limit: cfg.limit,
            codebase: None,
            min_score: cfg.min_score,
            include_content: cfg.include_content,
        }
    }
}

/// One projected, ranked result.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub codebase: String,
    pub repo: String,
    pub path: String,
    pub start_line: i64,
    pub end_line: i64,
    pub score: f32,
    pub chunk_kind: String,
    pub symbol: Option<String>,
    pub language: String,
    pub content: Option<String>,
}

pub struct Searcher {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl Searcher {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Embed `query_text` as a single input, over-fetch `2 * limit` from
    /// the store so the `min_score` filter has room to discard without
    /// starving the limit, then project and truncate.
    pub async fn search(&self, query_text: &str, config: &SearchRequest) -> Result<Vec<SearchResult>> {
        let cancel = CancellationToken::new();
        let vector = self.embedder.embed(query_text, &cancel).await?;
        let over_fetch = config.limit.saturating_mul(2);

        let hits = self
            .store
            .search_similar(&vector, over_fetch, config.codebase.as_deref())
            .await?;

        let mut results = Vec::with_capacity(config.limit);
        for hit in hits {
            if hit.similarity < config.min_score {
                continue;
            }

            results.push(SearchResult {
                codebase: hit.file.codebase,
                repo: hit.file.repo,
                path: hit.file.path,
                start_line: hit.chunk.start_line,
                end_line: hit.chunk.end_line,
                score: hit.similarity,
                chunk_kind: hit.chunk.kind.to_string(),
                symbol: hit.chunk.symbol,
                language: hit.file.language,
                content: config.include_content.then_some(hit.chunk.content),
            });

            if results.len() >= config.limit {
                break;
            }
        }

        Ok(results)
    }

    /// Search using a file's own content as the query.
    pub async fn search_by_file(&self, path: &std::path::Path, config: &SearchRequest) -> Result<Vec<SearchResult>> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::error::RetrievalErr::io(path, e))?;
        self.search(&content, config).await
    }

    /// Search using a code snippet, prepending a language hint to bias the
    /// query embedding.
    pub async fn search_by_snippet(
        &self,
        snippet: &str,
        language: &str,
        config: &SearchRequest,
    ) -> Result<Vec<SearchResult>> {
        let query = format!("Language: {language}\n\n{snippet}");
        self.search(&query, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkKind;
    use crate::embeddings::Embedder;
    use crate::storage::IndexedFile;
    use crate::storage::SearchHit;
    use crate::storage::StoredChunk;
    use async_trait::async_trait;

    struct StubEmbedder;
    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_batch(&self, texts: &[String], _cancel: &CancellationToken) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
        fn dimension(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubStore {
        hits: Vec<SearchHit>,
    }
    #[async_trait]
    impl VectorStore for StubStore {
        async fn upsert_file(&self, _file: crate::storage::NewIndexedFile) -> Result<i64> {
            unimplemented!()
        }
        async fn get_file_by_path(&self, _c: &str, _r: &str, _p: &str) -> Result<Option<IndexedFile>> {
            unimplemented!()
        }
        async fn delete_file_chunks(&self, _file_id: i64) -> Result<()> {
            unimplemented!()
        }
        async fn insert_chunk(
            &self,
            _file_id: i64,
            _chunk: crate::storage::NewStoredChunk,
            _vector: Option<&[f32]>,
        ) -> Result<i64> {
            unimplemented!()
        }
        async fn search_similar(&self, _q: &[f32], _k: usize, _cb: Option<&str>) -> Result<Vec<SearchHit>> {
            Ok(self.hits.clone())
        }
        async fn delete_codebase(&self, _codebase: &str) -> Result<()> {
            unimplemented!()
        }
        async fn stats(&self) -> Result<crate::storage::StoreStats> {
            unimplemented!()
        }
        async fn list_codebases(&self) -> Result<Vec<String>> {
            unimplemented!()
        }
        async fn sweep_missing(&self, _codebase: &str, _still_present: &[(String, String)]) -> Result<u64> {
            unimplemented!()
        }
        async fn record_job(&self, _job: &crate::storage::IndexJob) -> Result<i64> {
            unimplemented!()
        }
        async fn update_job(&self, _job: &crate::storage::IndexJob) -> Result<()> {
            unimplemented!()
        }
        async fn close(&self) -> Result<()> {
            unimplemented!()
        }
    }

    fn hit(codebase: &str, similarity: f32) -> SearchHit {
        SearchHit {
            file: IndexedFile {
                id: 1,
                codebase: codebase.to_string(),
                repo: "r".into(),
                path: "a.go".into(),
                language: "go".into(),
                content_hash: "h".into(),
                size_bytes: 1,
                indexed_at: 0,
            },
            chunk: StoredChunk {
                id: 1,
                file_id: 1,
                start_line: 1,
                end_line: 2,
                kind: ChunkKind::Function,
                symbol: Some("f".into()),
                content: "fn f() {}".into(),
                token_estimate: 3,
                created_at: 0,
            },
            distance: 1.0 - similarity,
            similarity,
        }
    }

    #[tokio::test]
    async fn min_score_filters_low_similarity_hits() {
        let store = Arc::new(StubStore {
            hits: vec![hit("cb", 0.9), hit("cb", 0.1)],
        });
        let searcher = Searcher::new(store, Arc::new(StubEmbedder));
        let config = SearchRequest {
            min_score: 0.5,
            ..SearchRequest::default()
        };
        let results = searcher.search("query", &config).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].score >= 0.5);
    }

    #[tokio::test]
    async fn limit_truncates_results() {
        let store = Arc::new(StubStore {
            hits: (0..5).map(|_| hit("cb", 0.9)).collect(),
        });
        let searcher = Searcher::new(store, Arc::new(StubEmbedder));
        let config = SearchRequest {
            limit: 2,
            ..SearchRequest::default()
        };
        let results = searcher.search("query", &config).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
