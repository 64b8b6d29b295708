//! SQLite + `sqlite-vec` backed [`VectorStore`] (specification §4.4, §6.1).
//!
//! A single on-disk file holds the relational schema (`indexed_files`,
//! `stored_chunks`, `index_jobs`) and a `vec0` virtual table keyed by
//! chunk id for k-NN search. WAL journalling and foreign keys are on;
//! there is exactly one writer, serialised by the connection mutex, and
//! readers are never blocked by it.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Once;

use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use zerocopy::AsBytes;

use crate::error::Result;
use crate::error::RetrievalErr;
use crate::storage::types::CodebaseStats;
use crate::storage::types::IndexJob;
use crate::storage::types::IndexedFile;
use crate::storage::types::JobStatus;
use crate::storage::types::NewIndexedFile;
use crate::storage::types::NewStoredChunk;
use crate::storage::types::SearchHit;
use crate::storage::types::StoreStats;
use crate::storage::types::StoredChunk;
use crate::storage::types::parse_chunk_kind;
use crate::storage::vector_store::VectorStore;

static REGISTER_EXTENSION: Once = Once::new();

/// Register the `sqlite-vec` loadable extension with SQLite's global
/// auto-extension list. The specification calls this out explicitly as
/// the one piece of unavoidable process-wide state (§9); `Once` makes the
/// registration idempotent regardless of how many stores are opened.
fn register_vec_extension() {
    REGISTER_EXTENSION.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    });
}

/// Pack float32 values little-endian, four bytes per element, no header —
/// exactly the layout the specification's vector serialisation requires.
fn pack_vector(v: &[f32]) -> Vec<u8> {
    v.as_bytes().to_vec()
}

fn unpack_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub struct SqliteVecStore {
    conn: Arc<Mutex<Connection>>,
    #[allow(dead_code)]
    path: PathBuf,
    dimension: usize,
}

impl SqliteVecStore {
    /// Open (creating if absent) a store at `path` with vector dimension
    /// `dimension`. Parent directories are created with mode 0755.
    pub fn open(path: &Path, dimension: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| RetrievalErr::io(parent, e))?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o755));
                }
            }
        }

        register_vec_extension();

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -4000;
             PRAGMA foreign_keys = ON;",
        )?;

        Self::validate_or_reset_dimension(&conn, dimension)?;
        Self::init_schema(&conn, dimension)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
            dimension,
        })
    }

    fn init_schema(conn: &Connection, dimension: usize) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);

             CREATE TABLE IF NOT EXISTS indexed_files (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 codebase TEXT NOT NULL,
                 repo TEXT NOT NULL,
                 path TEXT NOT NULL,
                 language TEXT NOT NULL,
                 content_hash TEXT NOT NULL,
                 size_bytes INTEGER NOT NULL,
                 indexed_at INTEGER NOT NULL,
                 UNIQUE(codebase, repo, path)
             );
             CREATE INDEX IF NOT EXISTS idx_files_codebase ON indexed_files(codebase);
             CREATE INDEX IF NOT EXISTS idx_files_hash ON indexed_files(content_hash);

             CREATE TABLE IF NOT EXISTS stored_chunks (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 file_id INTEGER NOT NULL REFERENCES indexed_files(id) ON DELETE CASCADE,
                 start_line INTEGER NOT NULL,
                 end_line INTEGER NOT NULL,
                 kind TEXT NOT NULL,
                 symbol TEXT,
                 content TEXT NOT NULL,
                 token_estimate INTEGER NOT NULL,
                 created_at INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_chunks_file ON stored_chunks(file_id);
             CREATE INDEX IF NOT EXISTS idx_chunks_symbol ON stored_chunks(symbol);
             CREATE INDEX IF NOT EXISTS idx_chunks_kind ON stored_chunks(kind);

             CREATE TABLE IF NOT EXISTS index_jobs (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 codebase TEXT NOT NULL,
                 status TEXT NOT NULL,
                 files_total INTEGER NOT NULL DEFAULT 0,
                 files_processed INTEGER NOT NULL DEFAULT 0,
                 chunks_total INTEGER NOT NULL DEFAULT 0,
                 chunks_embedded INTEGER NOT NULL DEFAULT 0,
                 started_at INTEGER NOT NULL,
                 ended_at INTEGER,
                 error TEXT
             );

             INSERT INTO schema_version (version) SELECT 1 WHERE NOT EXISTS (SELECT 1 FROM schema_version);",
        )?;

        let vec_sql = format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS chunk_vectors USING vec0(
                chunk_id INTEGER PRIMARY KEY,
                embedding float[{dimension}]
            )"
        );
        conn.execute_batch(&vec_sql)?;

        Ok(())
    }

    /// If a `chunk_vectors` table already exists with a different
    /// dimension than requested, drop it so `init_schema` recreates it.
    /// Vector dimension is immutable for the *life of a given dimension*,
    /// but a deliberate model switch is handled by the caller re-opening
    /// with the new dimension, per the store's documented migration path.
    fn validate_or_reset_dimension(conn: &Connection, dimension: usize) -> Result<()> {
        let create_sql: Option<String> = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type='table' AND name='chunk_vectors'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let Some(sql) = create_sql else {
            return Ok(());
        };

        if let Some(stored_dim) = parse_vec0_dimension(&sql) {
            if stored_dim != dimension {
                conn.execute_batch("DROP TABLE IF EXISTS chunk_vectors;")?;
            }
        }

        Ok(())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock().expect("sqlite connection mutex poisoned");
        f(&guard)
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<IndexedFile> {
        Ok(IndexedFile {
            id: row.get(0)?,
            codebase: row.get(1)?,
            repo: row.get(2)?,
            path: row.get(3)?,
            language: row.get(4)?,
            content_hash: row.get(5)?,
            size_bytes: row.get(6)?,
            indexed_at: row.get(7)?,
        })
    }

}

fn parse_vec0_dimension(create_sql: &str) -> Option<usize> {
    let start = create_sql.find("float[")? + "float[".len();
    let end = create_sql[start..].find(']')? + start;
    create_sql[start..end].parse().ok()
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl VectorStore for SqliteVecStore {
    async fn upsert_file(&self, file: NewIndexedFile) -> Result<i64> {
        let now_ts = now();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO indexed_files (codebase, repo, path, language, content_hash, size_bytes, indexed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(codebase, repo, path) DO UPDATE SET
                    language = excluded.language,
                    content_hash = excluded.content_hash,
                    size_bytes = excluded.size_bytes,
                    indexed_at = excluded.indexed_at",
                params![
                    file.codebase,
                    file.repo,
                    file.path,
                    file.language,
                    file.content_hash,
                    file.size_bytes,
                    now_ts
                ],
            )?;

            let id: i64 = conn.query_row(
                "SELECT id FROM indexed_files WHERE codebase = ?1 AND repo = ?2 AND path = ?3",
                params![file.codebase, file.repo, file.path],
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    async fn get_file_by_path(
        &self,
        codebase: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<IndexedFile>> {
        self.with_conn(|conn| {
            let file = conn
                .query_row(
                    "SELECT id, codebase, repo, path, language, content_hash, size_bytes, indexed_at
                     FROM indexed_files WHERE codebase = ?1 AND repo = ?2 AND path = ?3",
                    params![codebase, repo, path],
                    Self::row_to_file,
                )
                .optional()?;
            Ok(file)
        })
    }

    async fn delete_file_chunks(&self, file_id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM chunk_vectors WHERE chunk_id IN (SELECT id FROM stored_chunks WHERE file_id = ?1)",
                params![file_id],
            )?;
            tx.execute("DELETE FROM stored_chunks WHERE file_id = ?1", params![file_id])?;
            tx.commit()?;
            Ok(())
        })
    }

    async fn insert_chunk(
        &self,
        file_id: i64,
        chunk: NewStoredChunk,
        vector: Option<&[f32]>,
    ) -> Result<i64> {
        let now_ts = now();
        let dimension = self.dimension;
        let vector = vector.map(|v| v.to_vec());

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO stored_chunks (file_id, start_line, end_line, kind, symbol, content, token_estimate, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    file_id,
                    chunk.start_line,
                    chunk.end_line,
                    chunk.kind.to_string(),
                    chunk.symbol,
                    chunk.content,
                    chunk.token_estimate,
                    now_ts
                ],
            )?;
            let chunk_id = conn.last_insert_rowid();

            if let Some(vector) = vector {
                if !vector.is_empty() {
                    if vector.len() != dimension {
                        return Err(RetrievalErr::invariant(format!(
                            "vector dimension mismatch: expected {dimension}, got {}",
                            vector.len()
                        )));
                    }
                    let bytes = pack_vector(&vector);
                    conn.execute(
                        "INSERT INTO chunk_vectors (chunk_id, embedding) VALUES (?1, ?2)",
                        params![chunk_id, bytes],
                    )?;
                }
            }

            Ok(chunk_id)
        })
    }

    async fn search_similar(
        &self,
        query_vector: &[f32],
        k: usize,
        codebase: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_bytes = pack_vector(query_vector);
        let codebase = codebase.map(|s| s.to_string());

        self.with_conn(move |conn| {
            let sql = if codebase.is_some() {
                "SELECT f.id, f.codebase, f.repo, f.path, f.language, f.content_hash, f.size_bytes, f.indexed_at,
                        c.id, c.file_id, c.start_line, c.end_line, c.kind, c.symbol, c.content, c.token_estimate, c.created_at,
                        v.distance
                 FROM chunk_vectors v
                 JOIN stored_chunks c ON c.id = v.chunk_id
                 JOIN indexed_files f ON f.id = c.file_id
                 WHERE v.embedding MATCH ?1 AND k = ?2 AND f.codebase = ?3
                 ORDER BY v.distance ASC"
            } else {
                "SELECT f.id, f.codebase, f.repo, f.path, f.language, f.content_hash, f.size_bytes, f.indexed_at,
                        c.id, c.file_id, c.start_line, c.end_line, c.kind, c.symbol, c.content, c.token_estimate, c.created_at,
                        v.distance
                 FROM chunk_vectors v
                 JOIN stored_chunks c ON c.id = v.chunk_id
                 JOIN indexed_files f ON f.id = c.file_id
                 WHERE v.embedding MATCH ?1 AND k = ?2
                 ORDER BY v.distance ASC"
            };

            let mut stmt = conn.prepare(sql)?;

            let map_row = |row: &rusqlite::Row| -> rusqlite::Result<SearchHit> {
                let file = Self::row_to_file(row)?;
                let kind_str: String = row.get(12)?;
                let chunk = StoredChunk {
                    id: row.get(8)?,
                    file_id: row.get(9)?,
                    start_line: row.get(10)?,
                    end_line: row.get(11)?,
                    kind: parse_chunk_kind(&kind_str),
                    symbol: row.get(13)?,
                    content: row.get(14)?,
                    token_estimate: row.get(15)?,
                    created_at: row.get(16)?,
                };
                let distance: f32 = row.get(17)?;
                Ok(SearchHit {
                    file,
                    chunk,
                    distance,
                    similarity: 1.0 - distance,
                })
            };

            let rows = if let Some(codebase) = codebase {
                stmt.query_map(params![query_bytes, k as i64, codebase], map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            } else {
                stmt.query_map(params![query_bytes, k as i64], map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            };

            Ok(rows)
        })
    }

    async fn delete_codebase(&self, codebase: &str) -> Result<()> {
        let codebase = codebase.to_string();
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM chunk_vectors WHERE chunk_id IN (
                    SELECT c.id FROM stored_chunks c
                    JOIN indexed_files f ON f.id = c.file_id
                    WHERE f.codebase = ?1
                )",
                params![codebase],
            )?;
            tx.execute(
                "DELETE FROM stored_chunks WHERE file_id IN (SELECT id FROM indexed_files WHERE codebase = ?1)",
                params![codebase],
            )?;
            tx.execute("DELETE FROM indexed_files WHERE codebase = ?1", params![codebase])?;
            tx.commit()?;
            Ok(())
        })
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.with_conn(|conn| {
            let total_files: i64 = conn.query_row("SELECT COUNT(*) FROM indexed_files", [], |r| r.get(0))?;
            let total_chunks: i64 = conn.query_row("SELECT COUNT(*) FROM stored_chunks", [], |r| r.get(0))?;

            let mut stmt = conn.prepare(
                "SELECT f.codebase, COUNT(DISTINCT f.id), COUNT(c.id)
                 FROM indexed_files f
                 LEFT JOIN stored_chunks c ON c.file_id = f.id
                 GROUP BY f.codebase
                 ORDER BY f.codebase",
            )?;
            let per_codebase = stmt
                .query_map([], |row| {
                    Ok(CodebaseStats {
                        codebase: row.get(0)?,
                        files: row.get(1)?,
                        chunks: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(StoreStats {
                total_files,
                total_chunks,
                per_codebase,
            })
        })
    }

    async fn list_codebases(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT codebase FROM indexed_files ORDER BY codebase")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    async fn sweep_missing(&self, codebase: &str, still_present: &[(String, String)]) -> Result<u64> {
        let codebase = codebase.to_string();
        let still_present = still_present.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT id, repo, path FROM indexed_files WHERE codebase = ?1")?;
            let existing: Vec<(i64, String, String)> = stmt
                .query_map(params![codebase], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            drop(stmt);

            let to_remove: Vec<i64> = existing
                .into_iter()
                .filter(|(_, repo, path)| !still_present.iter().any(|(r, p)| r == repo && p == path))
                .map(|(id, _, _)| id)
                .collect();

            if to_remove.is_empty() {
                return Ok(0);
            }

            let tx = conn.unchecked_transaction()?;
            for id in &to_remove {
                tx.execute(
                    "DELETE FROM chunk_vectors WHERE chunk_id IN (SELECT id FROM stored_chunks WHERE file_id = ?1)",
                    params![id],
                )?;
                tx.execute("DELETE FROM stored_chunks WHERE file_id = ?1", params![id])?;
                tx.execute("DELETE FROM indexed_files WHERE id = ?1", params![id])?;
            }
            tx.commit()?;

            Ok(to_remove.len() as u64)
        })
    }

    async fn record_job(&self, job: &IndexJob) -> Result<i64> {
        let job = job.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO index_jobs (codebase, status, files_total, files_processed, chunks_total, chunks_embedded, started_at, ended_at, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    job.codebase,
                    job.status.as_str(),
                    job.files_total,
                    job.files_processed,
                    job.chunks_total,
                    job.chunks_embedded,
                    job.started_at,
                    job.ended_at,
                    job.error
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    async fn update_job(&self, job: &IndexJob) -> Result<()> {
        let job = job.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE index_jobs SET status = ?1, files_total = ?2, files_processed = ?3,
                    chunks_total = ?4, chunks_embedded = ?5, ended_at = ?6, error = ?7
                 WHERE id = ?8",
                params![
                    job.status.as_str(),
                    job.files_total,
                    job.files_processed,
                    job.chunks_total,
                    job.chunks_embedded,
                    job.ended_at,
                    job.error,
                    job.id
                ],
            )?;
            Ok(())
        })
    }

    async fn close(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkKind;
    use tempfile::tempdir;

    fn store(dim: usize) -> SqliteVecStore {
        let dir = tempdir().unwrap();
        let path = dir.into_path().join("store.db");
        SqliteVecStore::open(&path, dim).unwrap()
    }

    #[tokio::test]
    async fn upsert_file_is_idempotent() {
        let store = store(4);
        let f = NewIndexedFile {
            codebase: "cb".into(),
            repo: "repo".into(),
            path: "a.rs".into(),
            language: "rust".into(),
            content_hash: "h1".into(),
            size_bytes: 10,
        };
        let id1 = store.upsert_file(f.clone()).await.unwrap();
        let id2 = store.upsert_file(f).await.unwrap();
        assert_eq!(id1, id2);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_files, 1);
    }

    #[tokio::test]
    async fn insert_chunk_and_search() {
        let store = store(4);
        let file_id = store
            .upsert_file(NewIndexedFile {
                codebase: "cb".into(),
                repo: "repo".into(),
                path: "a.rs".into(),
                language: "rust".into(),
                content_hash: "h1".into(),
                size_bytes: 10,
            })
            .await
            .unwrap();

        let chunk = NewStoredChunk {
            start_line: 1,
            end_line: 3,
            kind: ChunkKind::Function,
            symbol: Some("foo".into()),
            content: "fn foo() {}".into(),
            token_estimate: 3,
        };
        store
            .insert_chunk(file_id, chunk, Some(&[1.0, 0.0, 0.0, 0.0]))
            .await
            .unwrap();

        let hits = store
            .search_similar(&[1.0, 0.0, 0.0, 0.0], 5, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.symbol.as_deref(), Some("foo"));
    }

    #[tokio::test]
    async fn search_k_zero_is_empty() {
        let store = store(4);
        let hits = store.search_similar(&[1.0, 0.0, 0.0, 0.0], 0, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn delete_codebase_zeroes_stats() {
        let store = store(4);
        store
            .upsert_file(NewIndexedFile {
                codebase: "cb".into(),
                repo: "repo".into(),
                path: "a.rs".into(),
                language: "rust".into(),
                content_hash: "h1".into(),
                size_bytes: 10,
            })
            .await
            .unwrap();
        store.delete_codebase("cb").await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.total_chunks, 0);
    }

    #[test]
    fn vec0_dimension_parses() {
        let sql = "CREATE VIRTUAL TABLE chunk_vectors USING vec0(chunk_id INTEGER PRIMARY KEY, embedding float[768])";
        assert_eq!(parse_vec0_dimension(sql), Some(768));
    }

    #[test]
    fn float_pack_unpack_round_trips() {
        let v = vec![1.0_f32, -2.5, 0.0, 3.25];
        let bytes = pack_vector(&v);
        assert_eq!(bytes.len(), v.len() * 4);
        assert_eq!(unpack_vector(&bytes), v);
    }
}
