//! Progress stream types (specification §4.5, §6.5).

/// `{scanning, chunking, embedding, storing, complete, failed}`, forming a
/// monotonic sequence within one `index_codebase` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scanning,
    Chunking,
    Embedding,
    Storing,
    Complete,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Scanning => "scanning",
            Phase::Chunking => "chunking",
            Phase::Embedding => "embedding",
            Phase::Storing => "storing",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
        }
    }
}

/// One event in the progress stream. The producer emits in-order and
/// closes the stream exactly once.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub codebase: String,
    pub phase: Phase,
    pub files_total: usize,
    pub files_processed: usize,
    pub chunks_total: usize,
    pub chunks_embedded: usize,
    pub current_file: Option<String>,
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn new(codebase: impl Into<String>, phase: Phase) -> Self {
        Self {
            codebase: codebase.into(),
            phase,
            files_total: 0,
            files_processed: 0,
            chunks_total: 0,
            chunks_embedded: 0,
            current_file: None,
            error: None,
        }
    }

    pub fn failed(codebase: impl Into<String>, phase: Phase, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(codebase, phase)
        }
    }
}
