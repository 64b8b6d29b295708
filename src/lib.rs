//! codevault: local semantic code search.
//!
//! Given one or more local repositories, `codevault` walks the tree,
//! splits each supported source file into AST-scoped chunks, embeds
//! those chunks with a pluggable embedding backend, and stores both the
//! chunk text and its vector in a single SQLite database (via the
//! `sqlite-vec` extension) so that nearest-neighbour search can run
//! without a separate vector service.
//!
//! The crate is organized around the pipeline stages:
//!
//! - [`language`] — file-extension-to-language detection
//! - [`chunking`] — AST-driven chunk extraction with a line-window fallback
//! - [`embeddings`] — the [`embeddings::Embedder`] trait and an Ollama-backed client
//! - [`storage`] — the [`storage::VectorStore`] trait and its `sqlite-vec` implementation
//! - [`indexing`] — the scan/chunk/embed/store pipeline and its progress stream
//! - [`search`] — turning a query into ranked [`search::SearchResult`]s
//!
//! [`config::Config`] bundles the tunables for every stage; [`error::RetrievalErr`]
//! is the crate's single error type.

pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod indexing;
pub mod language;
pub mod logging;
pub mod search;
pub mod storage;

pub use config::Config;
pub use embeddings::Embedder;
pub use embeddings::OllamaEmbedder;
pub use error::Result;
pub use error::RetrievalErr;
pub use indexing::Indexer;
pub use indexing::Phase;
pub use indexing::ProgressEvent;
pub use search::SearchRequest;
pub use search::SearchResult;
pub use search::Searcher;
pub use storage::SqliteVecStore;
pub use storage::VectorStore;
