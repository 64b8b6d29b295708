//! AST-driven chunk extraction (specification §4.2, §6.4).
//!
//! Walks a tree-sitter parse tree in pre-order. When a node of an
//! "interesting" kind is found, it becomes a single chunk spanning the
//! node's source range and its children are *not* visited — they belong to
//! that chunk. Uninteresting nodes are recursed into. This table must be
//! reproduced exactly; it is not an implementation detail.

use tree_sitter::Node;
use tree_sitter::Parser;

use crate::chunking::types::Chunk;
use crate::chunking::types::ChunkKind;

/// Node-kind → chunk-kind mapping for one language. `None` when the
/// language has no AST support and must use the fallback splitter.
fn node_kind_table(language: &str) -> Option<&'static [(&'static str, ChunkKind)]> {
    use ChunkKind::*;
    Some(match language {
        "go" => &[
            ("function_declaration", Function),
            ("method_declaration", Method),
            ("type_declaration", Type),
            ("type_spec", Type),
            ("const_declaration", Const),
            ("var_declaration", Var),
        ],
        "python" => &[
            ("function_definition", Function),
            ("class_definition", Class),
            ("decorated_definition", Decorated),
        ],
        "javascript" | "typescript" => &[
            ("function_declaration", Function),
            ("function_expression", Function),
            ("arrow_function", Function),
            ("method_definition", Method),
            ("class_declaration", Class),
            ("export_statement", Export),
            ("lexical_declaration", Const),
            ("variable_declaration", Var),
            ("interface_declaration", Interface),
            ("type_alias_declaration", Type),
            ("enum_declaration", Enum),
        ],
        "rust" => &[
            ("function_item", Function),
            ("impl_item", Impl),
            ("struct_item", Struct),
            ("enum_item", Enum),
            ("trait_item", Trait),
            ("mod_item", Module),
            ("const_item", Const),
            ("static_item", Static),
            ("type_item", Type),
            ("macro_definition", Macro),
        ],
        "java" => &[
            ("method_declaration", Method),
            ("constructor_declaration", Constructor),
            ("class_declaration", Class),
            ("interface_declaration", Interface),
            ("enum_declaration", Enum),
            ("field_declaration", Field),
        ],
        "ruby" => &[
            ("method", Method),
            ("singleton_method", Method),
            ("class", Class),
            ("module", Module),
        ],
        "c" | "cpp" => &[
            ("function_definition", Function),
            ("struct_specifier", Struct),
            ("class_specifier", Class),
            ("enum_specifier", Enum),
            ("namespace_definition", Namespace),
        ],
        "csharp" => &[
            ("method_declaration", Method),
            ("constructor_declaration", Constructor),
            ("class_declaration", Class),
            ("interface_declaration", Interface),
            ("struct_declaration", Struct),
            ("enum_declaration", Enum),
            ("property_declaration", Property),
        ],
        _ => return None,
    })
}

fn chunk_kind_for(table: &[(&'static str, ChunkKind)], node_kind: &str) -> Option<ChunkKind> {
    table
        .iter()
        .find(|(kind, _)| *kind == node_kind)
        .map(|(_, chunk_kind)| *chunk_kind)
}

fn tree_sitter_language(language: &str) -> Option<tree_sitter::Language> {
    Some(match language {
        "go" => tree_sitter_go::LANGUAGE.into(),
        "python" => tree_sitter_python::LANGUAGE.into(),
        "javascript" => tree_sitter_javascript::LANGUAGE.into(),
        "typescript" => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        "rust" => tree_sitter_rust::LANGUAGE.into(),
        "ruby" => tree_sitter_ruby::LANGUAGE.into(),
        "java" => tree_sitter_java::LANGUAGE.into(),
        "c" => tree_sitter_c::LANGUAGE.into(),
        "cpp" => tree_sitter_cpp::LANGUAGE.into(),
        "csharp" => tree_sitter_c_sharp::LANGUAGE.into(),
        _ => return None,
    })
}

/// Recover the declared name of an interesting node, best-effort.
///
/// First consults the node's own field-name lookup for `identifier`, `name`,
/// `property_identifier`, `type_identifier`; if none match, walks immediate
/// children and returns the text of the first child whose kind is
/// `identifier` or `name`. Empty string (mapped to `None`) if neither
/// succeeds.
fn extract_symbol(node: Node, source: &[u8]) -> Option<String> {
    const FIELD_NAMES: &[&str] = &["identifier", "name", "property_identifier", "type_identifier"];
    for field in FIELD_NAMES {
        if let Some(child) = node.child_by_field_name(field) {
            if let Ok(text) = child.utf8_text(source) {
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "identifier" || child.kind() == "name" {
            if let Ok(text) = child.utf8_text(source) {
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }

    None
}

/// A chunk candidate straight out of the AST pass, before the size-based
/// post-processing described in §4.2 runs.
struct Candidate {
    start_line: usize,
    end_line: usize,
    content: String,
    kind: ChunkKind,
    symbol: Option<String>,
}

fn walk(node: Node, source: &[u8], table: &[(&'static str, ChunkKind)], out: &mut Vec<Candidate>) {
    if let Some(kind) = chunk_kind_for(table, node.kind()) {
        let start_line = node.start_position().row + 1;
        let end_line = node.end_position().row + 1;
        let content = node.utf8_text(source).unwrap_or_default().to_string();
        let symbol = extract_symbol(node, source);
        out.push(Candidate {
            start_line,
            end_line,
            content,
            kind,
            symbol,
        });
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, table, out);
    }
}

/// Attempt AST-based chunking for `language`. Returns `None` when the
/// language has no grammar, the source fails to parse, or the walk yields
/// no interesting nodes — all three are the normal "fall back to the
/// line-window splitter" path, not errors (§7).
pub fn chunk(source: &[u8], language: &str) -> Option<Vec<Chunk>> {
    let table = node_kind_table(language)?;
    let ts_language = tree_sitter_language(language)?;

    let mut parser = Parser::new();
    parser.set_language(&ts_language).ok()?;
    let tree = parser.parse(source, None)?;

    let mut candidates = Vec::new();
    walk(tree.root_node(), source, table, &mut candidates);

    if candidates.is_empty() {
        return None;
    }

    Some(
        candidates
            .into_iter()
            .map(|c| Chunk::new(c.start_line, c.end_line, c.content, c.kind, c.symbol, language))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_two_go_functions() {
        let src = b"package main\nimport \"fmt\"\n\nfunc hello() {\n\tfmt.Println(\"Hello\")\n}\n\nfunc world() {\n\tfmt.Println(\"World\")\n}\n";
        let chunks = chunk(src, "go").expect("go has ast support");
        let functions: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Function)
            .collect();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].symbol.as_deref(), Some("hello"));
        assert_eq!(functions[1].symbol.as_deref(), Some("world"));
    }

    #[test]
    fn python_class_is_not_rechunked_internally() {
        let src = b"import os\n\ndef greet(name):\n    print(name)\n\nclass User:\n    def __init__(self, name):\n        self.name = name\n\n    def say_hello(self):\n        print(self.name)\n";
        let chunks = chunk(src, "python").expect("python has ast support");
        let class_chunk = chunks
            .iter()
            .find(|c| c.kind == ChunkKind::Class)
            .expect("class chunk present");
        assert!(class_chunk.content.contains("__init__"));
        assert!(class_chunk.content.contains("say_hello"));
        // The class is one chunk: its methods are not separately emitted.
        assert!(!chunks.iter().any(|c| c.kind == ChunkKind::Method));
    }

    #[test]
    fn unsupported_language_yields_none() {
        assert!(chunk(b"select 1;", "sql").is_none());
    }

    #[test]
    fn rust_static_item_maps_to_static_kind() {
        let src = b"static FOO: i32 = 1;\n";
        let chunks = chunk(src, "rust").expect("rust has ast support");
        assert!(chunks.iter().any(|c| c.kind == ChunkKind::Static));
    }
}
