//! Indexer: scan, chunk, embed, store (specification §4.5, §5).

pub mod exclude;
pub mod pipeline;
pub mod progress;
pub mod scanner;

pub use pipeline::Indexer;
pub use progress::Phase;
pub use progress::ProgressEvent;
pub use scanner::ScannedFile;
