pub mod db;
pub mod domain;
pub mod models;
pub mod processing;
pub mod repository;
pub mod schema;

/// Scores closer than this are treated as ties and ordered by profile id.
pub const SCORE_EPSILON: f32 = 1e-6;

/// Number of results returned when a match request does not specify k.
pub const DEFAULT_TOP_K: usize = 5;
