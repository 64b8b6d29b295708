//! Scan phase (specification §4.5): walk `workspace_path/repos/*` and
//! collect indexable files.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::config::IndexerConfig;
use crate::error::Result;
use crate::error::RetrievalErr;
use crate::indexing::exclude::PatternSet;
use crate::language;

const SKIPPED_DIR_BASENAMES: &[&str] = &[
    "node_modules",
    "vendor",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "venv",
];

/// One indexable file discovered during the scan phase.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub absolute_path: PathBuf,
    pub codebase: String,
    pub repo: String,
    pub repo_relative_path: String,
    pub size_bytes: u64,
}

fn is_skipped_dir(basename: &str) -> bool {
    basename.starts_with('.') || SKIPPED_DIR_BASENAMES.contains(&basename)
}

/// Walk `workspace_path/repos/*`, one top-level entry per repo.
pub fn scan(codebase: &str, workspace_path: &Path, config: &IndexerConfig) -> Result<Vec<ScannedFile>> {
    let repos_dir = workspace_path.join("repos");
    let exclude = PatternSet::new(&config.exclude_patterns);
    let include = PatternSet::new(&config.include_patterns);

    let mut out = Vec::new();
    if !repos_dir.is_dir() {
        return Ok(out);
    }

    for entry in fs::read_dir(&repos_dir).map_err(|e| RetrievalErr::io(&repos_dir, e))? {
        let entry = entry.map_err(|e| RetrievalErr::io(&repos_dir, e))?;
        let repo_root = entry.path();
        if !repo_root.is_dir() {
            continue;
        }
        let repo_name = match repo_root.file_name().and_then(|n| n.to_str()) {
            Some(name) if !name.starts_with('.') => name.to_string(),
            _ => continue,
        };

        walk_repo(
            codebase,
            &repo_name,
            &repo_root,
            &repo_root,
            config,
            &exclude,
            &include,
            &mut out,
        )?;
    }

    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn walk_repo(
    codebase: &str,
    repo_name: &str,
    repo_root: &Path,
    dir: &Path,
    config: &IndexerConfig,
    exclude: &PatternSet,
    include: &PatternSet,
    out: &mut Vec<ScannedFile>,
) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| RetrievalErr::io(dir, e))? {
        let entry = entry.map_err(|e| RetrievalErr::io(dir, e))?;
        let path = entry.path();
        let basename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(_) => continue,
        };

        if metadata.is_dir() {
            if is_skipped_dir(&basename) {
                continue;
            }
            walk_repo(codebase, repo_name, repo_root, &path, config, exclude, include, out)?;
            continue;
        }

        if !language::is_indexable(&path) {
            continue;
        }

        let repo_relative = path
            .strip_prefix(repo_root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        let absolute = path.to_string_lossy().to_string();

        if exclude.matches(&absolute, &repo_relative) {
            continue;
        }
        if !include.is_empty() && !include.matches(&absolute, &repo_relative) {
            continue;
        }

        if metadata.len() > config.max_file_size {
            continue;
        }

        out.push(ScannedFile {
            absolute_path: path.clone(),
            codebase: codebase.to_string(),
            repo: repo_name.to_string(),
            repo_relative_path: repo_relative,
            size_bytes: metadata.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn skips_dotdirs_and_vendor_trees() {
        let root = tempdir().unwrap();
        let repos = root.path().join("repos").join("r1");
        fs::create_dir_all(repos.join("vendor")).unwrap();
        fs::create_dir_all(repos.join(".git")).unwrap();
        fs::write(repos.join("main.go"), "package main\n").unwrap();
        fs::write(repos.join("vendor").join("lib.go"), "package lib\n").unwrap();
        fs::write(repos.join(".git").join("config.go"), "package c\n").unwrap();

        let files = scan("cb", root.path(), &IndexerConfig::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].repo_relative_path, "main.go");
    }

    #[test]
    fn exclude_pattern_filters_test_files() {
        let root = tempdir().unwrap();
        let repos = root.path().join("repos").join("r1");
        fs::create_dir_all(&repos).unwrap();
        fs::write(repos.join("main.go"), "package main\n").unwrap();
        fs::write(repos.join("main_test.go"), "package main\n").unwrap();

        let mut config = IndexerConfig::default();
        config.exclude_patterns = vec!["**/*_test.go".to_string()];
        let files = scan("cb", root.path(), &config).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].repo_relative_path, "main.go");
    }

    #[test]
    fn oversize_file_is_skipped() {
        let root = tempdir().unwrap();
        let repos = root.path().join("repos").join("r1");
        fs::create_dir_all(&repos).unwrap();
        fs::write(repos.join("big.go"), vec![b'a'; 10]).unwrap();

        let mut config = IndexerConfig::default();
        config.max_file_size = 5;
        let files = scan("cb", root.path(), &config).unwrap();
        assert!(files.is_empty());
    }
}
