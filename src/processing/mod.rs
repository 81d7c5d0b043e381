use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::DEFAULT_TOP_K;
use crate::domain::corpus::CorpusError;
use crate::domain::profile::Profile;
use crate::processing::embedding::EncodeError;
use crate::processing::explain::Explanation;
use crate::processing::index::IndexError;
use crate::processing::matcher::{MatchError, RankedMatch};
use crate::processing::snippet::summarize_description;
use crate::repository::errors::RepositoryError;

pub mod embedding;
pub mod engine;
pub mod explain;
pub mod index;
pub mod ingest;
pub mod matcher;
pub mod snippet;

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Requests accepted on the engine's REP socket.
#[derive(Serialize, Deserialize, Debug)]
pub enum EngineRequest {
    Match {
        query: String,
        #[serde(default = "default_top_k")]
        k: usize,
    },
    Explain {
        query: String,
        profile_id: String,
    },
    Ingest {
        path: String,
    },
    Rebuild,
}

/// Machine-readable error category mirrored to callers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    EmptyCorpus,
    DimensionMismatch,
    CorpusIntegrity,
    NotFound,
    Storage,
    Encoder,
    Internal,
}

/// One ranked match as rendered to the presentation layer.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MatchPayload {
    pub rank: usize,
    pub score: f32,
    pub id: String,
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub website: Option<String>,
    pub office: Option<String>,
    pub areas: Vec<String>,
    pub snippet: String,
}

impl MatchPayload {
    pub(crate) fn from_ranked(ranked: &RankedMatch<'_>, snippet_max_chars: usize) -> Self {
        let profile: &Profile = ranked.profile;
        Self {
            rank: ranked.rank,
            score: ranked.score,
            id: profile.id.clone(),
            name: profile.name.clone(),
            title: profile.title.clone(),
            email: profile.email.clone(),
            website: profile.website.clone(),
            office: profile.office.clone(),
            areas: profile.areas.clone(),
            snippet: summarize_description(&profile.description, snippet_max_chars),
        }
    }
}

/// Counters reported after a dataset ingest.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub read: usize,
    pub ingested: usize,
    pub skipped_empty_description: usize,
    pub skipped_duplicate_id: usize,
    pub dropped_invalid_website: usize,
}

/// Counters reported after an embedding rebuild.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct RebuildStats {
    pub profiles_loaded: usize,
    pub embeddings_generated: usize,
    pub embeddings_reused: usize,
    pub corpus_size: usize,
    pub dimension: usize,
}

/// Responses sent back on the REP socket.
#[derive(Serialize, Deserialize, Debug)]
pub enum EngineResponse {
    Matches {
        query: String,
        results: Vec<MatchPayload>,
    },
    Explanation {
        profile_id: String,
        explanation: Explanation,
    },
    Ingested(IngestStats),
    Rebuilt(RebuildStats),
    Error {
        kind: ErrorKind,
        message: String,
    },
}

/// Everything a handler can fail with, mapped onto [`ErrorKind`] at the
/// protocol boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("failed to read dataset {path}: {reason}")]
    Dataset { path: String, reason: String },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Match(MatchError::InvalidInput(_)) => ErrorKind::InvalidInput,
            Self::Match(MatchError::EmptyCorpus) => ErrorKind::EmptyCorpus,
            Self::Match(MatchError::DimensionMismatch { .. }) => ErrorKind::DimensionMismatch,
            Self::Encode(EncodeError::EmptyInput) => ErrorKind::InvalidInput,
            Self::Encode(EncodeError::Model(_)) => ErrorKind::Encoder,
            Self::Corpus(CorpusError::DimensionMismatch { .. }) => ErrorKind::DimensionMismatch,
            Self::Corpus(CorpusError::MissingEmbedding { .. }) => ErrorKind::CorpusIntegrity,
            Self::Repository(RepositoryError::NotFound(_)) => ErrorKind::NotFound,
            Self::Repository(_) => ErrorKind::Storage,
            Self::Index(_) => ErrorKind::Internal,
            Self::Dataset { .. } => ErrorKind::InvalidInput,
        }
    }
}
