//! Request handlers wired over the repository, encoder and explainer seams.

use std::path::Path;
use std::sync::Arc;

use crate::domain::corpus::Corpus;
use crate::models::config::ServerConfig;
use crate::processing::embedding::{
    TextEncoder, load_or_generate_embedding, profile_document, validate_text,
};
use crate::processing::explain::{Explanation, ExplanationProvider};
use crate::processing::index::CorpusIndex;
use crate::processing::ingest::ingest_dataset;
use crate::processing::matcher::{self, MatchError};
use crate::processing::{
    EngineError, EngineRequest, EngineResponse, IngestStats, MatchPayload, RebuildStats,
};
use crate::repository::{ProfileReader, ProfileWriter};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub use_ann_index: bool,
    pub snippet_max_chars: usize,
}

impl From<&ServerConfig> for EngineSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            use_ann_index: config.use_ann_index,
            snippet_max_chars: config.snippet_max_chars,
        }
    }
}

/// The matching engine behind the REP socket.
///
/// Holds the current corpus snapshot; queries share it read-only, and a
/// successful rebuild swaps in a fresh snapshot without touching the one
/// in flight.
pub struct MatchEngine<R, E, X> {
    repo: R,
    encoder: E,
    explainer: X,
    settings: EngineSettings,
    corpus: Option<Arc<Corpus>>,
    index: Option<CorpusIndex>,
}

impl<R, E, X> MatchEngine<R, E, X>
where
    R: ProfileReader + ProfileWriter,
    E: TextEncoder,
    X: ExplanationProvider,
{
    pub fn new(repo: R, encoder: E, explainer: X, settings: EngineSettings) -> Self {
        Self {
            repo,
            encoder,
            explainer,
            settings,
            corpus: None,
            index: None,
        }
    }

    /// Load the stored profiles into a fresh corpus snapshot.
    ///
    /// Fails without touching the current snapshot when any stored profile
    /// is missing its embedding or breaks the dimension invariant.
    pub fn reload_corpus(&mut self) -> Result<usize, EngineError> {
        let profiles = self.repo.list_profiles()?;
        let corpus = Corpus::build(profiles)?;
        Ok(self.swap_corpus(corpus))
    }

    fn swap_corpus(&mut self, corpus: Corpus) -> usize {
        self.index = if self.settings.use_ann_index && !corpus.is_empty() {
            match CorpusIndex::build(&corpus) {
                Ok(index) => Some(index),
                Err(e) => {
                    log::warn!("Falling back to exact search: {e}");
                    None
                }
            }
        } else {
            None
        };

        let size = corpus.len();
        self.corpus = Some(Arc::new(corpus));
        size
    }

    pub async fn handle(&mut self, request: EngineRequest) -> EngineResponse {
        match request {
            EngineRequest::Match { query, k } => {
                log::info!("Received match request (k={k})");
                match self.run_match(&query, k) {
                    Ok(results) => {
                        log::info!("Finished match request: {} results", results.len());
                        EngineResponse::Matches { query, results }
                    }
                    Err(e) => error_response("match", e),
                }
            }
            EngineRequest::Explain { query, profile_id } => {
                log::info!("Received explain request for profile {profile_id}");
                match self.run_explain(&query, &profile_id).await {
                    Ok(explanation) => {
                        log::info!("Finished explain request for profile {profile_id}");
                        EngineResponse::Explanation {
                            profile_id,
                            explanation,
                        }
                    }
                    Err(e) => error_response("explain", e),
                }
            }
            EngineRequest::Ingest { path } => {
                log::info!("Received ingest request: {path}");
                match self.run_ingest(&path) {
                    Ok(stats) => {
                        log::info!(
                            "Finished ingest: read={}, ingested={}, skipped_empty_description={}, skipped_duplicate_id={}, dropped_invalid_website={}",
                            stats.read,
                            stats.ingested,
                            stats.skipped_empty_description,
                            stats.skipped_duplicate_id,
                            stats.dropped_invalid_website
                        );
                        EngineResponse::Ingested(stats)
                    }
                    Err(e) => error_response("ingest", e),
                }
            }
            EngineRequest::Rebuild => {
                log::info!("Received rebuild request");
                match self.run_rebuild() {
                    Ok(stats) => {
                        log::info!(
                            "Finished rebuild: profiles_loaded={}, embeddings_generated={}, embeddings_reused={}, corpus_size={}, dimension={}",
                            stats.profiles_loaded,
                            stats.embeddings_generated,
                            stats.embeddings_reused,
                            stats.corpus_size,
                            stats.dimension
                        );
                        EngineResponse::Rebuilt(stats)
                    }
                    Err(e) => error_response("rebuild", e),
                }
            }
        }
    }

    fn run_match(&mut self, query: &str, k: usize) -> Result<Vec<MatchPayload>, EngineError> {
        if k == 0 {
            return Err(MatchError::InvalidInput("k must be at least 1".to_string()).into());
        }

        let corpus = self
            .corpus
            .clone()
            .filter(|corpus| !corpus.is_empty())
            .ok_or(MatchError::EmptyCorpus)?;

        let query_vec = self.encoder.encode(query)?;

        let ranked = match &self.index {
            Some(index) => {
                let positions = index.candidates(&query_vec, k)?;
                matcher::rank_subset(&query_vec, &corpus, &positions, k)?
            }
            None => matcher::rank_top_k(&query_vec, &corpus, k)?,
        };

        Ok(ranked
            .iter()
            .map(|ranked| MatchPayload::from_ranked(ranked, self.settings.snippet_max_chars))
            .collect())
    }

    async fn run_explain(
        &mut self,
        query: &str,
        profile_id: &str,
    ) -> Result<Explanation, EngineError> {
        let query = validate_text(query)?;
        let profile = self.repo.get_profile(profile_id)?;

        match self.explainer.explain(query, &profile).await {
            Ok(text) => Ok(Explanation::Available(text)),
            Err(e) => {
                log::warn!("Explanation unavailable for profile {profile_id}: {e}");
                Ok(Explanation::Unavailable)
            }
        }
    }

    fn run_ingest(&mut self, path: &str) -> Result<IngestStats, EngineError> {
        let stats = ingest_dataset(Path::new(path), &self.repo)?;
        log::info!("Stored profiles replaced; run a rebuild to serve the new set");
        Ok(stats)
    }

    fn run_rebuild(&mut self) -> Result<RebuildStats, EngineError> {
        let profiles = self.repo.list_profiles()?;
        let mut stats = RebuildStats {
            profiles_loaded: profiles.len(),
            ..Default::default()
        };

        let mut embedded = Vec::with_capacity(profiles.len());
        for mut profile in profiles {
            let document = profile_document(
                &profile.name,
                &profile.title,
                &profile.areas,
                &profile.description,
            );
            let (embedding, generated) = load_or_generate_embedding(
                profile.embedding.as_deref(),
                document,
                &mut self.encoder,
                |value| self.repo.set_profile_embedding(&profile.id, value),
            )?;

            if generated {
                stats.embeddings_generated += 1;
            } else {
                stats.embeddings_reused += 1;
            }
            profile.embedding = Some(embedding);
            embedded.push(profile);
        }

        let corpus = Corpus::build(embedded)?;
        stats.corpus_size = corpus.len();
        stats.dimension = corpus.dimension();
        self.swap_corpus(corpus);

        Ok(stats)
    }
}

fn error_response(operation: &str, error: EngineError) -> EngineResponse {
    log::error!("{operation} request failed: {error}");
    EngineResponse::Error {
        kind: error.kind(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{EngineSettings, MatchEngine};
    use crate::domain::profile::{NewProfile, Profile};
    use crate::processing::embedding::{EncodeError, TextEncoder, normalize_embedding};
    use crate::processing::explain::{ExplainError, Explanation, ExplanationProvider};
    use crate::processing::{EngineRequest, EngineResponse, ErrorKind, MatchPayload};
    use crate::repository::errors::{RepositoryError, RepositoryResult};
    use crate::repository::{ProfileReader, ProfileWriter};

    #[derive(Default)]
    struct FakeRepo {
        state: Mutex<Vec<Profile>>,
    }

    impl FakeRepo {
        fn seeded(profiles: Vec<Profile>) -> Self {
            Self {
                state: Mutex::new(profiles),
            }
        }
    }

    impl ProfileReader for FakeRepo {
        fn list_profiles(&self) -> RepositoryResult<Vec<Profile>> {
            Ok(self.state.lock().expect("state mutex poisoned").clone())
        }

        fn get_profile(&self, profile_id: &str) -> RepositoryResult<Profile> {
            self.state
                .lock()
                .expect("state mutex poisoned")
                .iter()
                .find(|profile| profile.id == profile_id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound(profile_id.to_string()))
        }
    }

    impl ProfileWriter for FakeRepo {
        fn replace_profiles(&self, profiles: &[NewProfile]) -> RepositoryResult<usize> {
            let mut state = self.state.lock().expect("state mutex poisoned");
            *state = profiles
                .iter()
                .map(|profile| Profile {
                    id: profile.id.clone(),
                    name: profile.name.clone(),
                    title: profile.title.clone(),
                    email: profile.email.clone(),
                    website: profile.website.clone(),
                    office: profile.office.clone(),
                    description: profile.description.clone(),
                    areas: profile.areas.clone(),
                    embedding: None,
                })
                .collect();
            Ok(state.len())
        }

        fn set_profile_embedding(
            &self,
            profile_id: &str,
            embedding: &[f32],
        ) -> RepositoryResult<usize> {
            let mut state = self.state.lock().expect("state mutex poisoned");
            let profile = state
                .iter_mut()
                .find(|profile| profile.id == profile_id)
                .ok_or_else(|| RepositoryError::NotFound(profile_id.to_string()))?;
            profile.embedding = Some(embedding.to_vec());
            Ok(1)
        }
    }

    /// Deterministic stand-in for the sentence encoder: one dimension per
    /// marker keyword, normalized, so related texts get related vectors.
    struct MarkerEncoder;

    const MARKERS: [&str; 3] = ["robotics", "biology", "systems"];

    impl TextEncoder for MarkerEncoder {
        fn dimension(&self) -> usize {
            MARKERS.len()
        }

        fn encode_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncodeError> {
            texts
                .iter()
                .map(|text| {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        return Err(EncodeError::EmptyInput);
                    }
                    let raw: Vec<f32> = MARKERS
                        .iter()
                        .map(|marker| if trimmed.contains(marker) { 1.0 } else { 0.0 })
                        .collect();
                    Ok(normalize_embedding(&raw))
                })
                .collect()
        }
    }

    struct FakeExplainer {
        fail: bool,
    }

    #[async_trait]
    impl ExplanationProvider for FakeExplainer {
        async fn explain(&self, query: &str, profile: &Profile) -> Result<String, ExplainError> {
            if self.fail {
                return Err(ExplainError::Timeout);
            }
            Ok(format!("{} overlaps with {query}", profile.name))
        }
    }

    fn profile(id: &str, description: &str) -> Profile {
        Profile {
            id: id.to_string(),
            name: format!("Prof. {id}"),
            title: "Professor".to_string(),
            email: None,
            website: None,
            office: None,
            description: description.to_string(),
            areas: vec![],
            embedding: None,
        }
    }

    fn engine(
        profiles: Vec<Profile>,
        fail_explainer: bool,
    ) -> MatchEngine<FakeRepo, MarkerEncoder, FakeExplainer> {
        MatchEngine::new(
            FakeRepo::seeded(profiles),
            MarkerEncoder,
            FakeExplainer {
                fail: fail_explainer,
            },
            EngineSettings {
                use_ann_index: false,
                snippet_max_chars: 220,
            },
        )
    }

    fn expect_matches(response: EngineResponse) -> Vec<MatchPayload> {
        match response {
            EngineResponse::Matches { results, .. } => results,
            other => panic!("expected match results, got {other:?}"),
        }
    }

    fn expect_error(response: EngineResponse) -> ErrorKind {
        match response {
            EngineResponse::Error { kind, .. } => kind,
            other => panic!("expected an error response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rebuild_generates_then_reuses_embeddings() {
        let mut engine = engine(
            vec![profile("a", "works on robotics"), profile("b", "marine biology")],
            false,
        );

        let first = match engine.handle(EngineRequest::Rebuild).await {
            EngineResponse::Rebuilt(stats) => stats,
            other => panic!("expected rebuild stats, got {other:?}"),
        };
        assert_eq!(first.profiles_loaded, 2);
        assert_eq!(first.embeddings_generated, 2);
        assert_eq!(first.embeddings_reused, 0);
        assert_eq!(first.corpus_size, 2);
        assert_eq!(first.dimension, 3);

        let second = match engine.handle(EngineRequest::Rebuild).await {
            EngineResponse::Rebuilt(stats) => stats,
            other => panic!("expected rebuild stats, got {other:?}"),
        };
        assert_eq!(second.embeddings_generated, 0);
        assert_eq!(second.embeddings_reused, 2);
    }

    #[tokio::test]
    async fn match_ranks_the_closest_profile_first() {
        let mut engine = engine(
            vec![profile("a", "works on robotics"), profile("b", "marine biology")],
            false,
        );
        engine.handle(EngineRequest::Rebuild).await;

        let results = expect_matches(
            engine
                .handle(EngineRequest::Match {
                    query: "robotics".to_string(),
                    k: 2,
                })
                .await,
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[0].rank, 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn matching_a_profiles_own_description_ranks_it_first() {
        let own_description = "deep work on robotics and systems";
        let mut engine = engine(
            vec![profile("a", own_description), profile("b", "marine biology")],
            false,
        );
        engine.handle(EngineRequest::Rebuild).await;

        let results = expect_matches(
            engine
                .handle(EngineRequest::Match {
                    query: own_description.to_string(),
                    k: 1,
                })
                .await,
        );

        assert_eq!(results[0].id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn identical_profiles_come_back_in_id_order_every_time() {
        let mut engine = engine(
            vec![profile("delta", "robotics"), profile("alpha", "robotics")],
            false,
        );
        engine.handle(EngineRequest::Rebuild).await;

        for _ in 0..3 {
            let results = expect_matches(
                engine
                    .handle(EngineRequest::Match {
                        query: "robotics".to_string(),
                        k: 2,
                    })
                    .await,
            );
            let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["alpha", "delta"]);
        }
    }

    #[tokio::test]
    async fn match_without_a_corpus_reports_empty_corpus() {
        let mut engine = engine(vec![], false);

        let kind = expect_error(
            engine
                .handle(EngineRequest::Match {
                    query: "robotics".to_string(),
                    k: 3,
                })
                .await,
        );

        assert_eq!(kind, ErrorKind::EmptyCorpus);
    }

    #[tokio::test]
    async fn zero_k_reports_invalid_input() {
        let mut engine = engine(vec![profile("a", "robotics")], false);
        engine.handle(EngineRequest::Rebuild).await;

        let kind = expect_error(
            engine
                .handle(EngineRequest::Match {
                    query: "robotics".to_string(),
                    k: 0,
                })
                .await,
        );

        assert_eq!(kind, ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn whitespace_query_reports_invalid_input() {
        let mut engine = engine(vec![profile("a", "robotics")], false);
        engine.handle(EngineRequest::Rebuild).await;

        let kind = expect_error(
            engine
                .handle(EngineRequest::Match {
                    query: "   ".to_string(),
                    k: 3,
                })
                .await,
        );

        assert_eq!(kind, ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn explainer_failure_degrades_without_touching_matches() {
        let mut engine = engine(
            vec![profile("a", "works on robotics"), profile("b", "marine biology")],
            true,
        );
        engine.handle(EngineRequest::Rebuild).await;

        let before = expect_matches(
            engine
                .handle(EngineRequest::Match {
                    query: "robotics".to_string(),
                    k: 2,
                })
                .await,
        );

        let explanation = match engine
            .handle(EngineRequest::Explain {
                query: "robotics".to_string(),
                profile_id: "a".to_string(),
            })
            .await
        {
            EngineResponse::Explanation { explanation, .. } => explanation,
            other => panic!("expected an explanation response, got {other:?}"),
        };
        assert_eq!(explanation, Explanation::Unavailable);

        let after = expect_matches(
            engine
                .handle(EngineRequest::Match {
                    query: "robotics".to_string(),
                    k: 2,
                })
                .await,
        );
        let ids = |results: &[MatchPayload]| {
            results
                .iter()
                .map(|r| (r.id.clone(), r.rank))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&before), ids(&after));
    }

    #[tokio::test]
    async fn explain_returns_text_when_the_provider_succeeds() {
        let mut engine = engine(vec![profile("a", "works on robotics")], false);

        let response = engine
            .handle(EngineRequest::Explain {
                query: "robotics".to_string(),
                profile_id: "a".to_string(),
            })
            .await;

        match response {
            EngineResponse::Explanation {
                profile_id,
                explanation: Explanation::Available(text),
            } => {
                assert_eq!(profile_id, "a");
                assert!(text.contains("Prof. a"));
            }
            other => panic!("expected an available explanation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn explain_for_unknown_profile_reports_not_found() {
        let mut engine = engine(vec![profile("a", "robotics")], false);

        let kind = expect_error(
            engine
                .handle(EngineRequest::Explain {
                    query: "robotics".to_string(),
                    profile_id: "missing".to_string(),
                })
                .await,
        );

        assert_eq!(kind, ErrorKind::NotFound);
    }
}
