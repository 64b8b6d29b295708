//! Shared chunk types.

use std::fmt;

/// Closed vocabulary of chunk-kind labels. `Static` is not named in the
/// narrative vocabulary but is required by the Rust AST table (`static_item`
/// → `static`); it is kept as its own variant for table fidelity rather than
/// folded into `Var`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Enum,
    Trait,
    Impl,
    Module,
    Type,
    Const,
    Static,
    Var,
    Namespace,
    Constructor,
    Field,
    Property,
    Macro,
    Decorated,
    Export,
    Block,
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChunkKind::Function => "function",
            ChunkKind::Method => "method",
            ChunkKind::Class => "class",
            ChunkKind::Struct => "struct",
            ChunkKind::Interface => "interface",
            ChunkKind::Enum => "enum",
            ChunkKind::Trait => "trait",
            ChunkKind::Impl => "impl",
            ChunkKind::Module => "module",
            ChunkKind::Type => "type",
            ChunkKind::Const => "const",
            ChunkKind::Static => "static",
            ChunkKind::Var => "var",
            ChunkKind::Namespace => "namespace",
            ChunkKind::Constructor => "constructor",
            ChunkKind::Field => "field",
            ChunkKind::Property => "property",
            ChunkKind::Macro => "macro",
            ChunkKind::Decorated => "decorated",
            ChunkKind::Export => "export",
            ChunkKind::Block => "block",
        };
        f.write_str(s)
    }
}

/// A contiguous byte range of a source file, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-indexed, inclusive.
    pub start_line: usize,
    /// 1-indexed, inclusive.
    pub end_line: usize,
    pub content: String,
    pub kind: ChunkKind,
    pub symbol: Option<String>,
    pub language: String,
    pub token_estimate: usize,
}

impl Chunk {
    pub fn new(
        start_line: usize,
        end_line: usize,
        content: String,
        kind: ChunkKind,
        symbol: Option<String>,
        language: impl Into<String>,
    ) -> Self {
        let token_estimate = estimate_tokens(content.as_bytes());
        Self {
            start_line,
            end_line,
            content,
            kind,
            symbol,
            language: language.into(),
            token_estimate,
        }
    }

    pub fn line_span(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// `ceil(byte_length / 4)`.
pub fn estimate_tokens(bytes: &[u8]) -> usize {
    bytes.len().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(b""), 0);
        assert_eq!(estimate_tokens(b"abc"), 1);
        assert_eq!(estimate_tokens(b"abcd"), 1);
        assert_eq!(estimate_tokens(b"abcde"), 2);
    }

    #[test]
    fn kind_display_matches_closed_vocabulary() {
        assert_eq!(ChunkKind::Function.to_string(), "function");
        assert_eq!(ChunkKind::Constructor.to_string(), "constructor");
        assert_eq!(ChunkKind::Block.to_string(), "block");
    }
}
