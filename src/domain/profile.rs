use serde::Serialize;

/// A faculty/lab profile as served by the matching engine.
///
/// The `id` is the scraper-assigned identifier and is stable across runs;
/// it doubles as the deterministic tie-break key when similarity scores are
/// equal. Profiles are immutable once ingested — a re-ingest replaces the
/// whole set.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub website: Option<String>,
    pub office: Option<String>,
    pub description: String,
    pub areas: Vec<String>,
    pub embedding: Option<Vec<f32>>,
}

/// Insert shape for a profile; the embedding is generated later.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: String,
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub website: Option<String>,
    pub office: Option<String>,
    pub description: String,
    pub areas: Vec<String>,
}
