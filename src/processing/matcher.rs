//! Cosine-similarity ranking over a corpus snapshot — the matching core.

use std::cmp::Ordering;

use thiserror::Error;

use crate::SCORE_EPSILON;
use crate::domain::corpus::{Corpus, CorpusEntry};
use crate::domain::profile::Profile;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("corpus is empty")]
    EmptyCorpus,

    #[error("query dimension {found} does not match corpus dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// One entry of a match result, ordered by descending score.
#[derive(Debug)]
pub struct RankedMatch<'a> {
    pub profile: &'a Profile,
    pub score: f32,
    pub rank: usize,
}

/// Compute cosine similarity between two vectors.
///
/// A zero-magnitude vector scores 0 rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Descending score; scores within [`SCORE_EPSILON`] are ties ordered by
/// ascending profile id, which keeps repeated runs reproducible.
fn compare_scored(a: &(&CorpusEntry, f32), b: &(&CorpusEntry, f32)) -> Ordering {
    let (entry_a, score_a) = a;
    let (entry_b, score_b) = b;
    if (score_a - score_b).abs() <= SCORE_EPSILON {
        entry_a.profile.id.cmp(&entry_b.profile.id)
    } else {
        score_b.partial_cmp(score_a).unwrap_or(Ordering::Equal)
    }
}

fn validate(query: &[f32], corpus: &Corpus, k: usize) -> Result<(), MatchError> {
    if k == 0 {
        return Err(MatchError::InvalidInput("k must be at least 1".to_string()));
    }
    if corpus.is_empty() {
        return Err(MatchError::EmptyCorpus);
    }
    if query.len() != corpus.dimension() {
        return Err(MatchError::DimensionMismatch {
            expected: corpus.dimension(),
            found: query.len(),
        });
    }
    Ok(())
}

fn rank<'a>(query: &[f32], entries: Vec<&'a CorpusEntry>, k: usize) -> Vec<RankedMatch<'a>> {
    let mut scored: Vec<(&CorpusEntry, f32)> = entries
        .into_iter()
        .map(|entry| (entry, cosine_similarity(query, &entry.embedding)))
        .collect();

    scored.sort_by(compare_scored);
    scored.truncate(k);

    scored
        .into_iter()
        .enumerate()
        .map(|(position, (entry, score))| RankedMatch {
            profile: &entry.profile,
            score,
            rank: position + 1,
        })
        .collect()
}

/// Rank every corpus entry against the query vector and return the top k.
///
/// When the corpus holds fewer than k entries, all of them are returned.
pub fn rank_top_k<'a>(
    query: &[f32],
    corpus: &'a Corpus,
    k: usize,
) -> Result<Vec<RankedMatch<'a>>, MatchError> {
    validate(query, corpus, k)?;
    Ok(rank(query, corpus.entries().iter().collect(), k))
}

/// Rank an explicit candidate subset with the same ordering rules.
///
/// Candidate positions index into the corpus entry slice; this is the seam
/// an approximate index plugs into without changing the match contract.
pub fn rank_subset<'a>(
    query: &[f32],
    corpus: &'a Corpus,
    positions: &[usize],
    k: usize,
) -> Result<Vec<RankedMatch<'a>>, MatchError> {
    validate(query, corpus, k)?;
    let entries = positions
        .iter()
        .filter_map(|&position| corpus.entries().get(position))
        .collect();
    Ok(rank(query, entries, k))
}
