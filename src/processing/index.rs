//! Optional approximate candidate index over a corpus snapshot.
//!
//! The index only retrieves candidates; exact cosine scores and the
//! deterministic comparator in [`crate::processing::matcher`] still decide
//! the order actually returned to callers.

use thiserror::Error;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::domain::corpus::Corpus;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to build similarity index: {0}")]
    Build(String),

    #[error("similarity index search failed: {0}")]
    Search(String),
}

/// Cosine index keyed by corpus entry position, built once per snapshot.
pub struct CorpusIndex {
    index: Index,
}

impl CorpusIndex {
    pub fn build(corpus: &Corpus) -> Result<Self, IndexError> {
        let index = Index::new(&IndexOptions {
            dimensions: corpus.dimension(),
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            ..Default::default()
        })
        .map_err(|e| IndexError::Build(e.to_string()))?;

        index
            .reserve(corpus.len())
            .map_err(|e| IndexError::Build(e.to_string()))?;

        for (position, entry) in corpus.entries().iter().enumerate() {
            index
                .add(position as u64, &entry.embedding)
                .map_err(|e| IndexError::Build(e.to_string()))?;
        }

        Ok(Self { index })
    }

    /// Positions of the k nearest entries to the query vector.
    pub fn candidates(&self, query: &[f32], k: usize) -> Result<Vec<usize>, IndexError> {
        let neighbors = self
            .index
            .search(query, k)
            .map_err(|e| IndexError::Search(e.to_string()))?;

        Ok(neighbors
            .keys
            .iter()
            .map(|&key| key as usize)
            .collect())
    }
}
