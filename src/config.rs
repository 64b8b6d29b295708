//! Tunables for every component, with the defaults the specification names.
//!
//! Loading these from a config file or CLI flags is explicitly out of
//! scope for the core; callers construct a [`Config`] however they like
//! (the crate provides `Config::from_toml_str` as a convenience since the
//! ambient stack otherwise carries `toml` for nothing).

use serde::Deserialize;
use serde::Serialize;

/// Top-level configuration bundle passed to the indexer and searcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunker: ChunkerConfig,
    pub indexer: IndexerConfig,
    pub embedder: EmbedderConfig,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            indexer: IndexerConfig::default(),
            embedder: EmbedderConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub max_chunk_lines: usize,
    pub min_chunk_lines: usize,
    pub overlap_lines: usize,
    pub include_imports: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_lines: 100,
            min_chunk_lines: 5,
            overlap_lines: 3,
            include_imports: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub batch_size: usize,
    pub workers: usize,
    pub max_file_size: u64,
    pub exclude_patterns: Vec<String>,
    pub include_patterns: Vec<String>,
    /// Delete IndexedFile rows whose paths are absent from the scan after
    /// a run completes. Recommended but not mandated by the specification
    /// (§9, "chunk uniqueness on re-index"); defaults on.
    pub sweep_missing: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            workers: 4,
            max_file_size: 1024 * 1024,
            exclude_patterns: Vec::new(),
            include_patterns: Vec::new(),
            sweep_missing: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub limit: usize,
    pub min_score: f32,
    pub include_content: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.0,
            include_content: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_specification() {
        let cfg = Config::default();
        assert_eq!(cfg.chunker.max_chunk_lines, 100);
        assert_eq!(cfg.chunker.min_chunk_lines, 5);
        assert_eq!(cfg.chunker.overlap_lines, 3);
        assert!(!cfg.chunker.include_imports);
        assert_eq!(cfg.indexer.batch_size, 50);
        assert_eq!(cfg.indexer.workers, 4);
        assert_eq!(cfg.indexer.max_file_size, 1024 * 1024);
        assert_eq!(cfg.search.limit, 10);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = Config::from_toml_str("[chunker]\nmax_chunk_lines = 50\n").unwrap();
        assert_eq!(cfg.chunker.max_chunk_lines, 50);
        assert_eq!(cfg.chunker.min_chunk_lines, 5);
        assert_eq!(cfg.indexer.workers, 4);
    }
}
