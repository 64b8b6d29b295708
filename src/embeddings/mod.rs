//! Embedder Client (specification §4.3, §6.2).

pub mod client;

pub use client::Embedder;
pub use client::OllamaEmbedder;
pub use client::model_dimension;
