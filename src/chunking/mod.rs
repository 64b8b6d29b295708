//! Language-aware chunk extraction (specification §4.2).
//!
//! `chunk()` is the chunker's entire public contract: given file bytes and
//! a filename, produce an ordered, deterministic sequence of chunks, or an
//! `unsupported-file-type` failure when the language detector rejects the
//! path outright. Everything past that point — AST success, AST failure,
//! unsupported language — resolves internally to either the AST pass or
//! the line-window fallback; neither is surfaced as an error.

pub mod ast;
pub mod fallback;
pub mod types;

use std::path::Path;

use crate::config::ChunkerConfig;
use crate::error::Result;
use crate::error::RetrievalErr;
use crate::language;

pub use types::Chunk;
pub use types::ChunkKind;
pub use types::estimate_tokens;

/// Chunk `content` taken from `filename`, using `config`'s size bounds.
///
/// Returns `unsupported-file-type` only when the language detector itself
/// rejects the filename; an unrecognised-but-detected language, or an AST
/// parse failure, both fall through to the line-window splitter.
pub fn chunk_file(content: &[u8], filename: &Path, config: &ChunkerConfig) -> Result<Vec<Chunk>> {
    let language = language::detect(filename)
        .ok_or_else(|| RetrievalErr::unsupported(format!("{}", filename.display())))?;

    if content.is_empty() {
        return Ok(Vec::new());
    }

    if language::has_ast_support(language) {
        if let Some(candidates) = ast::chunk(content, language) {
            return Ok(post_process(candidates, language, config));
        }
    }

    let text = String::from_utf8_lossy(content);
    Ok(fallback::split(
        &text,
        language,
        config.max_chunk_lines,
        config.min_chunk_lines,
        config.overlap_lines,
    ))
}

/// Apply the size-bound post-processing described in §4.2 to AST
/// candidates: drop anything under `min_chunk_lines`, keep anything in
/// range as-is, and split anything over `max_chunk_lines` into overlapping
/// windows that inherit the parent's kind, symbol, and language.
fn post_process(candidates: Vec<Chunk>, language: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let mut out = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let span = candidate.line_span();

        if span < config.min_chunk_lines {
            continue;
        }

        if span <= config.max_chunk_lines {
            out.push(candidate);
            continue;
        }

        out.extend(split_oversize(candidate, language, config));
    }

    out
}

fn split_oversize(candidate: Chunk, language: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let lines: Vec<&str> = candidate.content.lines().collect();
    let stride = config
        .max_chunk_lines
        .saturating_sub(config.overlap_lines)
        .max(1);

    let mut out = Vec::new();
    let mut window_start = 0usize; // 0-indexed into `lines`
    loop {
        let window_end = (window_start + config.max_chunk_lines).min(lines.len());
        let window_text = lines[window_start..window_end].join("\n");

        out.push(Chunk::new(
            candidate.start_line + window_start,
            candidate.start_line + window_end - 1,
            window_text,
            candidate.kind,
            candidate.symbol.clone(),
            language,
        ));

        if window_end >= lines.len() {
            break;
        }
        window_start += stride;
    }

    out
}
