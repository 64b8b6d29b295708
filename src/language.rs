//! Language Detector.
//!
//! A pure function from filename to language label or "not indexable".
//! Drives both chunker dispatch and the indexer's scan-phase filtering.

use std::path::Path;

/// Compound suffixes for generated or minified artifacts, checked on the
/// full lowercased basename (not just the final extension).
const GENERATED_SUFFIXES: &[&str] = &[".min.js", ".min.css", ".d.ts", ".d.mts", ".d.cts"];

/// Extensions that are never source code, regardless of language tables.
const NON_CODE_EXTENSIONS: &[&str] = &[
    ".md", ".mdx", ".rst", ".txt", ".adoc", ".json", ".yaml", ".yml", ".toml", ".ini", ".cfg",
    ".conf", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".webp", ".bmp", ".ttf", ".otf",
    ".woff", ".woff2", ".eot", ".lock", ".log", ".env",
];

/// Well-known extensionless or dotfile-style filenames mapped by basename.
fn well_known_file(basename: &str) -> Option<&'static str> {
    match basename {
        "dockerfile" => Some("bash"),
        "makefile" | "gnumakefile" => Some("bash"),
        "cmakelists.txt" => Some("bash"),
        _ => None,
    }
}

/// Extension-to-language table. Extensions include the leading dot.
fn extension_language(ext: &str) -> Option<&'static str> {
    Some(match ext {
        ".go" => "go",
        ".py" | ".pyi" => "python",
        ".js" | ".mjs" | ".cjs" | ".jsx" => "javascript",
        ".ts" | ".tsx" | ".mts" | ".cts" => "typescript",
        ".rs" => "rust",
        ".rb" => "ruby",
        ".java" => "java",
        ".c" | ".h" => "c",
        ".cc" | ".cpp" | ".cxx" | ".hpp" | ".hh" | ".hxx" => "cpp",
        ".cs" => "csharp",
        ".sh" | ".bash" | ".zsh" => "bash",
        ".kt" | ".kts" => "kotlin",
        ".swift" => "swift",
        ".php" => "php",
        ".scala" => "scala",
        ".lua" => "lua",
        ".sql" => "sql",
        ".zig" => "zig",
        _ => return None,
    })
}

/// Resolve a filename to a language label, or `None` if the path is not
/// indexable at all (dotfile, generated artifact, non-code extension, or
/// an extension the detector does not recognise).
pub fn detect(path: &Path) -> Option<&'static str> {
    let basename = path.file_name()?.to_str()?;
    if basename.starts_with('.') {
        return None;
    }

    let lower = basename.to_lowercase();
    if GENERATED_SUFFIXES.iter().any(|suf| lower.ends_with(suf)) {
        return None;
    }

    if let Some(lang) = well_known_file(&lower) {
        return Some(lang);
    }

    let ext = match lower.rfind('.') {
        Some(idx) => &lower[idx..],
        None => return None,
    };

    if NON_CODE_EXTENSIONS.contains(&ext) {
        return None;
    }

    extension_language(ext)
}

/// True iff `detect` resolves this path to a language label.
pub fn is_indexable(path: &Path) -> bool {
    detect(path).is_some()
}

/// The closed vocabulary of languages the chunker's AST pass honours.
/// Anything outside this set — even if `detect` recognises it — routes to
/// the fallback line-window splitter.
pub fn has_ast_support(language: &str) -> bool {
    matches!(
        language,
        "go" | "python"
            | "javascript"
            | "typescript"
            | "rust"
            | "ruby"
            | "java"
            | "c"
            | "cpp"
            | "csharp"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn d(name: &str) -> Option<&'static str> {
        detect(&PathBuf::from(name))
    }

    #[test]
    fn recognises_common_languages() {
        assert_eq!(d("main.go"), Some("go"));
        assert_eq!(d("app.py"), Some("python"));
        assert_eq!(d("index.ts"), Some("typescript"));
        assert_eq!(d("lib.rs"), Some("rust"));
        assert_eq!(d("Dockerfile"), Some("bash"));
        assert_eq!(d("Makefile"), Some("bash"));
    }

    #[test]
    fn rejects_dotfiles() {
        assert_eq!(d(".gitignore"), None);
        assert_eq!(d(".env"), None);
    }

    #[test]
    fn rejects_generated_artifacts() {
        assert_eq!(d("bundle.min.js"), None);
        assert_eq!(d("index.d.ts"), None);
    }

    #[test]
    fn rejects_non_code_extensions() {
        assert_eq!(d("README.md"), None);
        assert_eq!(d("package-lock.json"), None);
        assert_eq!(d("logo.png"), None);
    }

    #[test]
    fn unknown_extension_is_not_indexable() {
        assert_eq!(d("notes.xyz"), None);
    }

    #[test]
    fn ast_support_matches_closed_vocabulary() {
        assert!(has_ast_support("rust"));
        assert!(has_ast_support("csharp"));
        assert!(!has_ast_support("kotlin"));
        assert!(!has_ast_support("sql"));
    }
}
