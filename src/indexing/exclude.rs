//! Exclude/include pattern matching (specification §6.3).
//!
//! A lightweight glob dialect: `**/X` and `X/**` are special-cased, and
//! everything else falls through to a standard shell glob matched against
//! both the absolute and repo-relative path. Matching is first-match-wins
//! across the configured pattern list.

use globset::Glob;

enum Pattern {
    /// `**/X`: `X` matched at any directory depth, `X` itself compiled as a
    /// glob (e.g. `**/*_test.go` excludes `main_test.go` and
    /// `internal/main_test.go` alike).
    AnySuffix(globset::GlobMatcher),
    /// `X/**`: `X` matched as a directory prefix, `X` itself compiled as a
    /// glob.
    AnyPrefix(globset::GlobMatcher),
    /// Anything else: a standard shell glob.
    Glob(globset::GlobMatcher),
}

pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new(raw_patterns: &[String]) -> Self {
        let patterns = raw_patterns
            .iter()
            .map(|p| Self::compile(p))
            .collect();
        Self { patterns }
    }

    fn compile(pattern: &str) -> Pattern {
        if let Some(suffix) = pattern.strip_prefix("**/") {
            return match Glob::new(&format!("**/{suffix}")) {
                Ok(glob) => Pattern::AnySuffix(glob.compile_matcher()),
                Err(_) => Self::unmatchable(),
            };
        }
        if let Some(prefix) = pattern.strip_suffix("/**") {
            return match Glob::new(&format!("{prefix}/**")) {
                Ok(glob) => Pattern::AnyPrefix(glob.compile_matcher()),
                Err(_) => Self::unmatchable(),
            };
        }
        match Glob::new(pattern) {
            Ok(glob) => Pattern::Glob(glob.compile_matcher()),
            // An unparsable pattern never matches, rather than failing the scan.
            Err(_) => Self::unmatchable(),
        }
    }

    fn unmatchable() -> Pattern {
        Pattern::Glob(
            Glob::new("\u{0}unmatchable\u{0}")
                .expect("literal NUL-delimited glob always compiles")
                .compile_matcher(),
        )
    }

    /// True if either `absolute` or `repo_relative` matches any configured
    /// pattern, first-match-wins (the winner does not change the boolean
    /// result, but mirrors the specification's described evaluation order).
    pub fn matches(&self, absolute: &str, repo_relative: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| Self::pattern_matches(p, absolute) || Self::pattern_matches(p, repo_relative))
    }

    fn pattern_matches(pattern: &Pattern, path: &str) -> bool {
        match pattern {
            Pattern::AnySuffix(matcher) => matcher.is_match(path),
            Pattern::AnyPrefix(matcher) => matcher.is_match(path),
            Pattern::Glob(matcher) => matcher.is_match(path),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_suffix_matches_nested_paths() {
        let set = PatternSet::new(&["**/*_test.go".to_string()]);
        assert!(set.matches("/abs/main_test.go", "main_test.go"));
        assert!(!set.matches("/abs/main.go", "main.go"));
    }

    #[test]
    fn any_prefix_matches_subtree() {
        let set = PatternSet::new(&["vendor/**".to_string()]);
        assert!(set.matches("vendor/pkg/a.go", "vendor/pkg/a.go"));
        assert!(!set.matches("src/vendor.go", "src/vendor.go"));
    }

    #[test]
    fn plain_glob_matches_both_paths() {
        let set = PatternSet::new(&["*.lock".to_string()]);
        assert!(set.matches("/abs/Cargo.lock", "Cargo.lock"));
    }
}
