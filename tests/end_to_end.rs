//! End-to-end scenarios driving the indexer and searcher against a real
//! `sqlite-vec` store with a deterministic stub embedder.

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use codevault::config::ChunkerConfig;
use codevault::config::IndexerConfig;
use codevault::error::Result;
use codevault::storage::DEFAULT_DIMENSION;
use codevault::storage::SqliteVecStore;
use codevault::Embedder;
use codevault::Indexer;
use codevault::Phase;
use codevault::SearchRequest;
use codevault::Searcher;
use codevault::VectorStore;

/// Deterministic stub: every input hashes to a one-hot-ish vector so that
/// distinct texts land at distinct points without requiring a real model.
struct StubEmbedder;

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_batch(&self, texts: &[String], _cancel: &CancellationToken) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; DEFAULT_DIMENSION];
                for (i, b) in t.bytes().enumerate() {
                    v[(b as usize + i) % DEFAULT_DIMENSION] += 1.0;
                }
                let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for x in &mut v {
                        *x /= norm;
                    }
                }
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DEFAULT_DIMENSION
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

fn write_workspace(root: &std::path::Path, repo: &str, files: &[(&str, &str)]) {
    let repo_dir = root.join("repos").join(repo);
    for (rel, content) in files {
        let path = repo_dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

async fn run_to_completion(indexer: &Arc<Indexer>, codebase: &str, workspace: &std::path::Path) -> codevault::ProgressEvent {
    let mut rx = indexer
        .clone()
        .index_codebase(codebase.to_string(), workspace.to_path_buf(), CancellationToken::new());
    let mut last = None;
    while let Some(event) = rx.recv().await {
        last = Some(event);
    }
    last.expect("indexer closed its progress stream without a terminal event")
}

#[tokio::test]
async fn incremental_reindex_skips_unchanged_files() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.db");
    write_workspace(
        dir.path(),
        "r1",
        &[("main.go", "package main\n\nfunc hello() {\n\tprintln(\"hi\")\n}\n")],
    );

    let store: Arc<dyn VectorStore> = Arc::new(SqliteVecStore::open(&db_path, DEFAULT_DIMENSION).unwrap());
    let indexer = Arc::new(Indexer::new(
        store.clone(),
        Arc::new(StubEmbedder),
        ChunkerConfig::default(),
        IndexerConfig::default(),
    ));

    let first = run_to_completion(&indexer, "cb", dir.path()).await;
    assert_eq!(first.phase, Phase::Complete);
    assert!(first.chunks_embedded > 0, "first run should embed at least one chunk");
    let total_after_first = first.chunks_total;

    let second = run_to_completion(&indexer, "cb", dir.path()).await;
    assert_eq!(second.phase, Phase::Complete);
    assert_eq!(second.chunks_embedded, 0, "unchanged workspace must not re-embed");

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_chunks, total_after_first as i64);
}

#[tokio::test]
async fn exclude_pattern_keeps_only_matching_files() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.db");
    write_workspace(
        dir.path(),
        "r1",
        &[
            ("main.go", "package main\n\nfunc hello() {}\n"),
            ("main_test.go", "package main\n\nfunc TestHello(t *testing.T) {}\n"),
        ],
    );

    let store: Arc<dyn VectorStore> = Arc::new(SqliteVecStore::open(&db_path, DEFAULT_DIMENSION).unwrap());
    let mut indexer_config = IndexerConfig::default();
    indexer_config.exclude_patterns = vec!["**/*_test.go".to_string()];
    let indexer = Arc::new(Indexer::new(
        store.clone(),
        Arc::new(StubEmbedder),
        ChunkerConfig::default(),
        indexer_config,
    ));

    let event = run_to_completion(&indexer, "cb", dir.path()).await;
    assert_eq!(event.phase, Phase::Complete);

    let file = store.get_file_by_path("cb", "r1", "main.go").await.unwrap();
    assert!(file.is_some());
    let excluded = store.get_file_by_path("cb", "r1", "main_test.go").await.unwrap();
    assert!(excluded.is_none());

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_files, 1);
}

#[tokio::test]
async fn knn_search_respects_codebase_filter() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.db");
    write_workspace(dir.path(), "r1", &[("main.go", "package main\n\nfunc hello() {}\n")]);

    let store: Arc<dyn VectorStore> = Arc::new(SqliteVecStore::open(&db_path, DEFAULT_DIMENSION).unwrap());
    let embedder: Arc<dyn Embedder> = Arc::new(StubEmbedder);
    let indexer = Arc::new(Indexer::new(
        store.clone(),
        embedder.clone(),
        ChunkerConfig::default(),
        IndexerConfig::default(),
    ));

    run_to_completion(&indexer, "codebase-a", dir.path()).await;
    run_to_completion(&indexer, "codebase-b", dir.path()).await;

    let searcher = Searcher::new(store, embedder);
    let request = SearchRequest {
        limit: 10,
        codebase: Some("codebase-a".to_string()),
        min_score: -1.0,
        include_content: false,
    };
    let results = searcher.search("func hello", &request).await.unwrap();

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.codebase == "codebase-a"));
}
