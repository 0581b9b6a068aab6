use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings fixed when an [`Index`](crate::Index) is built.
///
/// ```json
/// { "window_size": 3, "min_similarity_score": 0.5, "stream_buffer": 0, "normalize": false }
/// ```
/// Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Characters per shingle.
    pub window_size: usize,
    /// Floor used by queries that take no explicit threshold.
    pub min_similarity_score: f64,
    /// Capacity of the channel between a streaming search and its consumer; 0 hands off one result at a time.
    pub stream_buffer: usize,
    /// NFKC-normalize and lowercase text before windowing.
    pub normalize: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { window_size: 3, min_similarity_score: 0.0, stream_buffer: 0, normalize: false }
    }
}

impl IndexConfig {
    pub fn new(window_size: usize) -> Self {
        Self { window_size, ..Self::default() }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IndexConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let buf = fs::read_to_string(path)?;
        Self::from_json_str(&buf)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(Error::InvalidWindowSize(self.window_size));
        }
        check_score(self.min_similarity_score)
    }
}

pub(crate) fn check_score(score: f64) -> Result<()> {
    if (0.0..=1.0).contains(&score) {
        Ok(())
    } else {
        Err(Error::InvalidScore(score))
    }
}
