//! Indexer orchestration (specification §4.5, §5).
//!
//! `index_codebase` walks the workspace, runs a bounded pool of chunking
//! workers, batches the resulting chunks through the embedder, and
//! commits them to the store grouped by file. The three phases are
//! barriers, not a pipeline: all chunking finishes before embedding
//! begins, all embedding finishes before storing begins (§5).

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use sha2::Digest;
use sha2::Sha256;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chunking;
use crate::chunking::Chunk;
use crate::config::ChunkerConfig;
use crate::config::IndexerConfig;
use crate::embeddings::Embedder;
use crate::error::RetrievalErr;
use crate::indexing::progress::Phase;
use crate::indexing::progress::ProgressEvent;
use crate::indexing::scanner;
use crate::indexing::scanner::ScannedFile;
use crate::storage::IndexJob;
use crate::storage::JobStatus;
use crate::storage::NewIndexedFile;
use crate::storage::NewStoredChunk;
use crate::storage::VectorStore;

/// Orchestrates one `index_codebase` run against a shared store and embedder.
pub struct Indexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunker_config: ChunkerConfig,
    indexer_config: IndexerConfig,
}

struct ChunkedFile {
    scanned: ScannedFile,
    content_hash: String,
    chunks: Vec<Chunk>,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chunker_config: ChunkerConfig,
        indexer_config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            chunker_config,
            indexer_config,
        }
    }

    /// Run one indexing pass over `workspace_path/repos/*`, streaming
    /// progress events. The returned receiver closes after the terminal
    /// `complete` or `failed` event.
    pub fn index_codebase(
        self: Arc<Self>,
        codebase: String,
        workspace_path: PathBuf,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            self.run(codebase, workspace_path, cancel, tx).await;
        });
        rx
    }

    async fn run(
        &self,
        codebase: String,
        workspace_path: PathBuf,
        cancel: CancellationToken,
        tx: mpsc::Sender<ProgressEvent>,
    ) {
        let job_id = self
            .store
            .record_job(&IndexJob {
                id: 0,
                codebase: codebase.clone(),
                status: JobStatus::Running,
                files_total: 0,
                files_processed: 0,
                chunks_total: 0,
                chunks_embedded: 0,
                started_at: now(),
                ended_at: None,
                error: None,
            })
            .await
            .unwrap_or(0);

        let _ = tx.send(ProgressEvent::new(codebase.clone(), Phase::Scanning)).await;

        let scanned = match scanner::scan(&codebase, &workspace_path, &self.indexer_config) {
            Ok(files) => files,
            Err(e) => {
                self.finish_failed(job_id, &codebase, Phase::Scanning, &e.to_string(), &tx).await;
                return;
            }
        };

        if scanned.is_empty() {
            let mut event = ProgressEvent::new(codebase.clone(), Phase::Complete);
            self.store
                .update_job(&IndexJob {
                    id: job_id,
                    codebase: codebase.clone(),
                    status: JobStatus::Complete,
                    files_total: 0,
                    files_processed: 0,
                    chunks_total: 0,
                    chunks_embedded: 0,
                    started_at: 0,
                    ended_at: Some(now()),
                    error: None,
                })
                .await
                .ok();
            event.files_total = 0;
            let _ = tx.send(event).await;
            return;
        }

        // ---- Chunking phase: bounded worker pool, one task per file. ----
        let files_total = scanned.len();
        let chunker_config = self.chunker_config.clone();
        let semaphore = Arc::new(Semaphore::new(self.indexer_config.workers.max(1)));
        let mut handles = Vec::with_capacity(scanned.len());

        for file in scanned.clone() {
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let chunker_config = chunker_config.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                if cancel.is_cancelled() {
                    return None;
                }
                chunk_one_file(&file, &chunker_config, store.as_ref()).await
            }));
        }

        let mut chunked_files = Vec::new();
        let mut files_processed = 0usize;
        for handle in handles {
            files_processed += 1;
            match handle.await {
                Ok(Some(result)) => {
                    let path = result.scanned.repo_relative_path.clone();
                    chunked_files.push(result);
                    let mut event = ProgressEvent::new(codebase.clone(), Phase::Chunking);
                    event.files_total = files_total;
                    event.files_processed = files_processed;
                    event.current_file = Some(path);
                    let _ = tx.send(event).await;
                }
                Ok(None) => {
                    // chunking error or cancellation for this file: counted, not fatal.
                }
                Err(_join_err) => {}
            }
        }

        if cancel.is_cancelled() {
            self.finish_failed(job_id, &codebase, Phase::Chunking, "cancelled", &tx).await;
            return;
        }

        let files_with_new_chunks: Vec<&ChunkedFile> =
            chunked_files.iter().filter(|f| !f.chunks.is_empty()).collect();
        let total_new_chunks: usize = files_with_new_chunks.iter().map(|f| f.chunks.len()).sum();

        // ---- Embedding phase: batch barrier, aborts the run on error. ----
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(total_new_chunks);
        let mut flat_refs: Vec<(usize, usize)> = Vec::with_capacity(total_new_chunks); // (file idx, chunk idx)
        for (file_idx, file) in files_with_new_chunks.iter().enumerate() {
            for chunk_idx in 0..file.chunks.len() {
                flat_refs.push((file_idx, chunk_idx));
            }
        }

        let batch_size = self.indexer_config.batch_size.max(1);
        let mut chunks_embedded = 0usize;
        for batch in flat_refs.chunks(batch_size) {
            if cancel.is_cancelled() {
                self.finish_failed(job_id, &codebase, Phase::Embedding, "cancelled", &tx).await;
                return;
            }

            let texts: Vec<String> = batch
                .iter()
                .map(|(file_idx, chunk_idx)| {
                    embedding_text(files_with_new_chunks[*file_idx], &files_with_new_chunks[*file_idx].chunks[*chunk_idx])
                })
                .collect();

            let vectors = match self.embedder.embed_batch(&texts, &cancel).await {
                Ok(v) => v,
                Err(e) => {
                    self.finish_failed(job_id, &codebase, Phase::Embedding, &e.to_string(), &tx).await;
                    return;
                }
            };

            if vectors.len() != texts.len() {
                self.finish_failed(
                    job_id,
                    &codebase,
                    Phase::Embedding,
                    "embedder returned a vector count that does not match the request",
                    &tx,
                )
                .await;
                return;
            }

            chunks_embedded += vectors.len();
            embeddings.extend(vectors);

            let mut event = ProgressEvent::new(codebase.clone(), Phase::Embedding);
            event.files_total = files_total;
            event.chunks_total = total_new_chunks;
            event.chunks_embedded = chunks_embedded;
            let _ = tx.send(event).await;
        }

        // ---- Storing phase: grouped by file, single writer. ----
        let mut still_present: Vec<(String, String)> = scanned
            .iter()
            .map(|f| (f.repo.clone(), f.repo_relative_path.clone()))
            .collect();
        still_present.dedup();

        let mut cursor = 0usize;
        for (file_idx, file) in files_with_new_chunks.iter().enumerate() {
            let n = file.chunks.len();
            let file_vectors = &embeddings[cursor..cursor + n];
            cursor += n;

            if let Err(e) = self.store_file(&codebase, file, file_vectors).await {
                self.finish_failed(job_id, &codebase, Phase::Storing, &e.to_string(), &tx).await;
                return;
            }

            let mut event = ProgressEvent::new(codebase.clone(), Phase::Storing);
            event.files_total = files_total;
            event.files_processed = file_idx + 1;
            event.current_file = Some(file.scanned.repo_relative_path.clone());
            let _ = tx.send(event).await;
        }

        if self.indexer_config.sweep_missing {
            if let Err(e) = self.store.sweep_missing(&codebase, &still_present).await {
                self.finish_failed(job_id, &codebase, Phase::Storing, &e.to_string(), &tx).await;
                return;
            }
        }

        self.store
            .update_job(&IndexJob {
                id: job_id,
                codebase: codebase.clone(),
                status: JobStatus::Complete,
                files_total: files_total as i64,
                files_processed: files_processed as i64,
                chunks_total: total_new_chunks as i64,
                chunks_embedded: chunks_embedded as i64,
                started_at: 0,
                ended_at: Some(now()),
                error: None,
            })
            .await
            .ok();

        let mut event = ProgressEvent::new(codebase, Phase::Complete);
        event.files_total = files_total;
        event.files_processed = files_processed;
        event.chunks_total = total_new_chunks;
        event.chunks_embedded = chunks_embedded;
        let _ = tx.send(event).await;
    }

    async fn store_file(&self, codebase: &str, file: &ChunkedFile, vectors: &[Vec<f32>]) -> crate::error::Result<()> {
        // Re-read and rehash to tolerate races; this hash is the one written.
        let bytes = std::fs::read(&file.scanned.absolute_path)
            .map_err(|e| RetrievalErr::io(&file.scanned.absolute_path, e))?;
        let content_hash = sha256_hex(&bytes);

        let file_id = self
            .store
            .upsert_file(NewIndexedFile {
                codebase: codebase.to_string(),
                repo: file.scanned.repo.clone(),
                path: file.scanned.repo_relative_path.clone(),
                language: file.chunks.first().map(|c| c.language.clone()).unwrap_or_default(),
                content_hash,
                size_bytes: bytes.len() as i64,
            })
            .await?;

        self.store.delete_file_chunks(file_id).await?;

        for (chunk, vector) in file.chunks.iter().zip(vectors.iter()) {
            self.store
                .insert_chunk(
                    file_id,
                    NewStoredChunk {
                        start_line: chunk.start_line as i64,
                        end_line: chunk.end_line as i64,
                        kind: chunk.kind,
                        symbol: chunk.symbol.clone(),
                        content: chunk.content.clone(),
                        token_estimate: chunk.token_estimate as i64,
                    },
                    Some(vector.as_slice()),
                )
                .await?;
        }

        Ok(())
    }

    async fn finish_failed(
        &self,
        job_id: i64,
        codebase: &str,
        phase: Phase,
        error: &str,
        tx: &mpsc::Sender<ProgressEvent>,
    ) {
        self.store
            .update_job(&IndexJob {
                id: job_id,
                codebase: codebase.to_string(),
                status: JobStatus::Failed,
                files_total: 0,
                files_processed: 0,
                chunks_total: 0,
                chunks_embedded: 0,
                started_at: 0,
                ended_at: Some(now()),
                error: Some(error.to_string()),
            })
            .await
            .ok();
        let _ = tx.send(ProgressEvent::failed(codebase.to_string(), phase, error)).await;
    }
}

async fn chunk_one_file(
    file: &ScannedFile,
    chunker_config: &ChunkerConfig,
    store: &dyn VectorStore,
) -> Option<ChunkedFile> {
    let bytes = std::fs::read(&file.absolute_path).ok()?;
    let content_hash = sha256_hex(&bytes);

    if let Ok(Some(existing)) = store
        .get_file_by_path(&file.codebase, &file.repo, &file.repo_relative_path)
        .await
    {
        if existing.content_hash == content_hash {
            // Incremental skip: unchanged content, zero chunks emitted.
            return Some(ChunkedFile {
                scanned: file.clone(),
                content_hash,
                chunks: Vec::new(),
            });
        }
    }

    match chunking::chunk_file(&bytes, Path::new(&file.repo_relative_path), chunker_config) {
        Ok(chunks) => Some(ChunkedFile {
            scanned: file.clone(),
            content_hash,
            chunks,
        }),
        Err(_) => {
            // Chunking errors are counted but not fatal (§7); skip the file.
            None
        }
    }
}

/// `File: <path>\n<kind>: <symbol>\nLanguage: <lang>\n\n<content>` — the
/// sole retrieval-biasing mechanism (§4.5).
fn embedding_text(file: &ChunkedFile, chunk: &Chunk) -> String {
    let mut text = format!("File: {}\n", file.scanned.repo_relative_path);
    if let Some(symbol) = chunk.symbol.as_deref().filter(|s| !s.is_empty()) {
        text.push_str(&format!("{}: {}\n", chunk.kind, symbol));
    }
    text.push_str(&format!("Language: {}\n\n", chunk.language));
    text.push_str(&chunk.content);
    text
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkKind;

    #[test]
    fn embedding_text_omits_empty_symbol() {
        let file = ChunkedFile {
            scanned: ScannedFile {
                absolute_path: PathBuf::from("/x/a.go"),
                codebase: "cb".into(),
                repo: "r".into(),
                repo_relative_path: "a.go".into(),
                size_bytes: 1,
            },
            content_hash: "h".into(),
            chunks: Vec::new(),
        };
        let chunk = Chunk::new(1, 2, "x".into(), ChunkKind::Block, None, "go");
        let text = embedding_text(&file, &chunk);
        assert!(text.starts_with("File: a.go\n"));
        assert!(!text.contains("block:"));
        assert!(text.contains("Language: go"));
    }

    #[test]
    fn embedding_text_includes_kind_and_symbol() {
        let file = ChunkedFile {
            scanned: ScannedFile {
                absolute_path: PathBuf::from("/x/a.go"),
                codebase: "cb".into(),
                repo: "r".into(),
                repo_relative_path: "a.go".into(),
                size_bytes: 1,
            },
            content_hash: "h".into(),
            chunks: Vec::new(),
        };
        let chunk = Chunk::new(1, 2, "x".into(), ChunkKind::Function, Some("hello".into()), "go");
        let text = embedding_text(&file, &chunk);
        assert!(text.contains("function: hello\n"));
    }
}
