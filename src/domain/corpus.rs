use thiserror::Error;

use crate::domain::profile::Profile;

/// Errors raised while assembling a [`Corpus`] from stored profiles.
///
/// Both variants abort the build: a corpus with a missing or mismatched
/// vector loads zero entries rather than serving a partially valid set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorpusError {
    #[error("profile {id} has no embedding; run a rebuild first")]
    MissingEmbedding { id: String },

    #[error("profile {id} has embedding dimension {found}, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
}

/// One profile paired with its embedding vector.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub profile: Profile,
    pub embedding: Vec<f32>,
}

/// Immutable snapshot of all profiles and their embeddings.
///
/// Entries are kept sorted by profile id so ranking output is reproducible.
/// A rebuild produces a fresh `Corpus` that replaces the previous snapshot;
/// the snapshot itself is never mutated.
#[derive(Debug, Clone)]
pub struct Corpus {
    dimension: usize,
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    /// Pair every profile with its embedding, validating the dimension
    /// invariant. The dimension is fixed by the first profile's vector.
    pub fn build(profiles: Vec<Profile>) -> Result<Self, CorpusError> {
        let mut entries: Vec<CorpusEntry> = Vec::with_capacity(profiles.len());
        let mut dimension = 0usize;

        for mut profile in profiles {
            let embedding = profile
                .embedding
                .take()
                .ok_or_else(|| CorpusError::MissingEmbedding {
                    id: profile.id.clone(),
                })?;

            if dimension == 0 {
                dimension = embedding.len();
            }
            if embedding.len() != dimension {
                return Err(CorpusError::DimensionMismatch {
                    id: profile.id.clone(),
                    expected: dimension,
                    found: embedding.len(),
                });
            }

            entries.push(CorpusEntry { profile, embedding });
        }

        entries.sort_by(|a, b| a.profile.id.cmp(&b.profile.id));

        Ok(Self {
            dimension,
            entries,
        })
    }

    /// Embedding dimension shared by every entry; 0 for an empty corpus.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending profile-id order.
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn get(&self, profile_id: &str) -> Option<&CorpusEntry> {
        self.entries
            .binary_search_by(|entry| entry.profile.id.as_str().cmp(profile_id))
            .ok()
            .map(|position| &self.entries[position])
    }
}
