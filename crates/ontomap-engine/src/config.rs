//! Engine configuration.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Frontier size above which newly derived individuals are processed eagerly.
pub const DEFAULT_FRONTIER_THRESHOLD: usize = 50_000;

/// Configuration for rule selection, building and inference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Replace derivations that only assert a type with direct fact synthesis
    pub optimize_queries: bool,
    /// Eager frontier drain / cache clear threshold
    pub frontier_threshold: usize,
    /// Also tag each mapped IRI individual as `owl:NamedIndividual`
    pub declare_named_individuals: bool,
    /// Treat `BUILD_MISSED_OPTIONAL_ARG` as a hard build failure
    pub strict_optional_args: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            optimize_queries: true,
            frontier_threshold: DEFAULT_FRONTIER_THRESHOLD,
            declare_named_individuals: false,
            strict_optional_args: false,
        }
    }
}

impl MapConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid mapping configuration")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&text)
    }
}
