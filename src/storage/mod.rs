//! Storage module: relational metadata plus vector search (specification §4.4).

pub mod sqlite_vec;
pub mod types;
pub mod vector_store;

pub use sqlite_vec::SqliteVecStore;
pub use types::CodebaseStats;
pub use types::IndexJob;
pub use types::IndexedFile;
pub use types::JobStatus;
pub use types::NewIndexedFile;
pub use types::NewStoredChunk;
pub use types::SearchHit;
pub use types::StoreStats;
pub use types::StoredChunk;
pub use vector_store::VectorStore;

/// The canonical dimension of the default embedding model, and the value
/// a store uses when the caller does not specify one explicitly.
pub const DEFAULT_DIMENSION: usize = 768;
