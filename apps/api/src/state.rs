use std::sync::Arc;

use crate::applicants::github::RepositoryHost;
use crate::documents::TextExtractor;
use crate::events::EventSink;
use crate::llm_client::EvaluationOracle;
use crate::locks::CredentialLocks;
use crate::scoring::ScoringPolicy;
use crate::skills::DerivationPipeline;
use crate::storage::ResumeArchive;
use crate::store::SkillStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SkillStore>,
    /// Primary/fallback cascade for course evaluation, CGPA and test generation.
    pub oracle: Arc<dyn EvaluationOracle>,
    /// Longer cascade used by goal analysis.
    pub goal_oracle: Arc<dyn EvaluationOracle>,
    pub events: Arc<dyn EventSink>,
    pub pipeline: DerivationPipeline,
    pub extractor: Arc<dyn TextExtractor>,
    pub archive: Option<ResumeArchive>,
    pub locks: CredentialLocks,
    pub repositories: Arc<dyn RepositoryHost>,
    pub policy: Arc<ScoringPolicy>,
}
