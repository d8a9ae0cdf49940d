//! Turns one credential into its skill facts.
//!
//! Every certificate run goes `oracle → score → replace-set` and degrades to
//! the deterministic policy table whenever the oracle fails or returns
//! something unusable. Oracle problems are never surfaced to the caller; only
//! store failures are.
//!
//! Facts owned by a credential are always replaced wholesale through
//! `SkillStore::replace_credential_skills`. That call is not safe against a
//! concurrent re-derivation of the same credential, so callers must hold the
//! credential's lock (see `CredentialLocks`).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::events::{DomainEvent, EventSink, SkillDerived};
use crate::llm_client::{call_json, prompts::with_json_contract, EvaluationOracle};
use crate::locks::CredentialLocks;
use crate::models::applicant::ApplicantProfile;
use crate::models::credential::{Certificate, Credential, Repository};
use crate::models::skill::{normalize_skill_name, NewSkillFact, SkillFact, SkillSource};
use crate::scoring::confidence::{
    certificate_skill_confidence, course_final_score, days_since, decay_factor,
    fallback_certificate_skill, score_to_confidence,
};
use crate::scoring::ScoringPolicy;
use crate::skills::evaluation::CourseEvaluation;
use crate::skills::prompts::{course_evaluation_user, COURSE_EVALUATION_SYSTEM};
use crate::store::{SkillStore, StoreResult};

/// Outcome of re-deriving every certificate of one applicant.
#[derive(Debug, Serialize)]
pub struct ResyncReport {
    pub synced: usize,
    /// Certificates whose derivation failed outright. Their previous facts are
    /// left as they were.
    pub failed: Vec<Uuid>,
    pub skills: Vec<SkillFact>,
}

#[derive(Clone)]
pub struct DerivationPipeline {
    store: Arc<dyn SkillStore>,
    oracle: Arc<dyn EvaluationOracle>,
    events: Arc<dyn EventSink>,
    policy: Arc<ScoringPolicy>,
    resync_delay: Duration,
}

impl DerivationPipeline {
    pub fn new(
        store: Arc<dyn SkillStore>,
        oracle: Arc<dyn EvaluationOracle>,
        events: Arc<dyn EventSink>,
        policy: Arc<ScoringPolicy>,
        resync_delay: Duration,
    ) -> Self {
        Self {
            store,
            oracle,
            events,
            policy,
            resync_delay,
        }
    }

    /// Derives skill facts from any credential kind.
    pub async fn derive_skills(
        &self,
        profile: &ApplicantProfile,
        credential: &Credential,
    ) -> StoreResult<Vec<SkillFact>> {
        match credential {
            Credential::Certificate(certificate) => {
                self.derive_from_certificate(profile, certificate).await
            }
            Credential::Repository(repository) => {
                self.derive_from_repositories(profile, std::slice::from_ref(repository))
                    .await
            }
        }
    }

    /// Replaces the certificate's facts with a fresh derivation.
    pub async fn derive_from_certificate(
        &self,
        profile: &ApplicantProfile,
        certificate: &Certificate,
    ) -> StoreResult<Vec<SkillFact>> {
        let now = Utc::now();
        let facts = match self.evaluate(certificate).await {
            Some(evaluation) => self.ai_facts(profile, certificate, &evaluation, now),
            None => self.fallback_facts(profile, certificate),
        };

        let created = self
            .store
            .replace_credential_skills(certificate.id, facts)
            .await?;
        info!(
            certificate_id = %certificate.id,
            applicant_id = %profile.id,
            skills = created.len(),
            "Derived skills from certificate"
        );
        self.announce(profile, &created);
        Ok(created)
    }

    /// Creates one `repository` fact per language seen across `repositories`,
    /// skipping languages the applicant already holds from repositories.
    /// Confidence comes only from the most recent activity in that language.
    pub async fn derive_from_repositories(
        &self,
        profile: &ApplicantProfile,
        repositories: &[Repository],
    ) -> StoreResult<Vec<SkillFact>> {
        let now = Utc::now();
        let mut latest: HashMap<String, DateTime<Utc>> = HashMap::new();
        for repo in repositories {
            let Some(language) = repo.primary_language.as_deref() else {
                continue;
            };
            if language.trim().is_empty() {
                continue;
            }
            let entry = latest
                .entry(normalize_skill_name(language))
                .or_insert(repo.last_activity);
            if repo.last_activity > *entry {
                *entry = repo.last_activity;
            }
        }

        let mut languages: Vec<_> = latest.into_iter().collect();
        languages.sort_by(|a, b| a.0.cmp(&b.0));

        let mut created = Vec::new();
        for (language, last_activity) in languages {
            if self
                .store
                .find_skill(profile.id, &language, SkillSource::Repository)
                .await?
                .is_some()
            {
                debug!(applicant_id = %profile.id, language, "Language skill already present");
                continue;
            }
            let confidence = self
                .policy
                .repository_confidence(days_since(last_activity, now));
            let fact = self
                .store
                .create_skill(NewSkillFact {
                    applicant_id: profile.id,
                    name: language,
                    source: SkillSource::Repository,
                    confidence,
                    credential_id: None,
                })
                .await?;
            created.push(fact);
        }

        self.announce(profile, &created);
        Ok(created)
    }

    /// Re-derives every certificate of the applicant, one at a time, pausing
    /// `resync_delay` before each oracle round-trip. A credential that fails
    /// (store error, lock error, or panic) is logged and skipped. Repository
    /// language facts are not revisited.
    pub async fn resync_certificates(
        &self,
        profile: &ApplicantProfile,
        locks: &CredentialLocks,
    ) -> StoreResult<ResyncReport> {
        let certificates = self.store.list_certificates(profile.id).await?;
        info!(
            applicant_id = %profile.id,
            count = certificates.len(),
            "Re-syncing certificates"
        );

        let mut synced = 0;
        let mut failed = Vec::new();
        for certificate in certificates {
            tokio::time::sleep(self.resync_delay).await;

            let certificate_id = certificate.id;
            let pipeline = self.clone();
            let profile = profile.clone();
            let locks = locks.clone();
            let task = tokio::spawn(async move {
                locks
                    .run(
                        certificate.id,
                        pipeline.derive_from_certificate(&profile, &certificate),
                    )
                    .await
            });

            match task.await {
                Ok(Ok(Ok(_))) => synced += 1,
                Ok(Ok(Err(e))) => {
                    warn!(%certificate_id, "Certificate re-sync failed: {e}");
                    failed.push(certificate_id);
                }
                Ok(Err(e)) => {
                    warn!(%certificate_id, "Certificate re-sync could not lock: {e:#}");
                    failed.push(certificate_id);
                }
                Err(e) => {
                    error!(%certificate_id, "Certificate re-sync aborted: {e}");
                    failed.push(certificate_id);
                }
            }
        }

        let skills = self.store.list_skills(profile.id).await?;
        Ok(ResyncReport {
            synced,
            failed,
            skills,
        })
    }

    async fn evaluate(&self, certificate: &Certificate) -> Option<CourseEvaluation> {
        let system = with_json_contract(COURSE_EVALUATION_SYSTEM);
        let user = course_evaluation_user(certificate);
        match call_json::<CourseEvaluation>(self.oracle.as_ref(), &system, &user).await {
            Ok(evaluation) if evaluation.is_trustworthy() => {
                if let Some(notes) = &evaluation.evaluation_notes {
                    debug!(certificate_id = %certificate.id, notes, "Course evaluated");
                }
                Some(evaluation)
            }
            Ok(_) => {
                warn!(
                    certificate_id = %certificate.id,
                    "Course evaluation out of range or empty; using fallback scoring"
                );
                None
            }
            Err(e) => {
                warn!(
                    certificate_id = %certificate.id,
                    "Course evaluation unavailable, using fallback scoring: {e}"
                );
                None
            }
        }
    }

    fn ai_facts(
        &self,
        profile: &ApplicantProfile,
        certificate: &Certificate,
        evaluation: &CourseEvaluation,
        now: DateTime<Utc>,
    ) -> Vec<NewSkillFact> {
        let final_score = course_final_score(
            evaluation.overall_rating,
            evaluation.real_life_application,
            &evaluation.skill_ratings(),
        );
        let course_confidence = score_to_confidence(final_score);
        let decay = decay_factor(certificate.completed_on, now, &self.policy.decay);

        // One fact per normalized name; duplicates keep the higher confidence.
        let mut facts: Vec<NewSkillFact> = Vec::with_capacity(evaluation.skills.len());
        for skill in &evaluation.skills {
            let name = normalize_skill_name(&skill.skill_name);
            let confidence = certificate_skill_confidence(
                course_confidence,
                skill.skill_rating,
                decay,
                &self.policy,
            );
            match facts.iter_mut().find(|f| f.name == name) {
                Some(existing) => existing.confidence = existing.confidence.max(confidence),
                None => facts.push(NewSkillFact {
                    applicant_id: profile.id,
                    name,
                    source: SkillSource::CertificateAi,
                    confidence,
                    credential_id: Some(certificate.id),
                }),
            }
        }
        facts
    }

    fn fallback_facts(
        &self,
        profile: &ApplicantProfile,
        certificate: &Certificate,
    ) -> Vec<NewSkillFact> {
        let (name, confidence) = fallback_certificate_skill(
            &certificate.name,
            &certificate.platform,
            &certificate.company_name,
            &self.policy,
        );
        vec![NewSkillFact {
            applicant_id: profile.id,
            name,
            source: SkillSource::Certificate,
            confidence,
            credential_id: Some(certificate.id),
        }]
    }

    fn announce(&self, profile: &ApplicantProfile, facts: &[SkillFact]) {
        for fact in facts {
            self.events.emit(DomainEvent::SkillDerived(SkillDerived {
                user_id: profile.user_id,
                skill_name: fact.name.clone(),
                source: fact.source,
                confidence: fact.confidence,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, NaiveDate};

    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{seed_certificate, seed_profile, RecordingSink, Reply, ScriptedOracle};

    const EVALUATION: &str = r#"{"course_name": "ML", "overall_rating_R": 8,
        "real_life_application_A": 7,
        "skills": [
            {"skill_name": "Machine Learning", "skill_rating_Si": 8},
            {"skill_name": "Python", "skill_rating_Si": 6}
        ], "n": 2, "evaluation_notes": "solid"}"#;

    fn pipeline(
        store: Arc<MemoryStore>,
        oracle: ScriptedOracle,
        sink: Arc<RecordingSink>,
    ) -> DerivationPipeline {
        DerivationPipeline::new(
            store,
            Arc::new(oracle),
            sink,
            Arc::new(ScoringPolicy::default()),
            Duration::from_millis(2000),
        )
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[tokio::test]
    async fn test_ai_path_scores_and_blends_each_skill() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let profile = seed_profile(&store).await;
        let cert = seed_certificate(&store, &profile, "Machine Learning", "Coursera", "Stanford", None).await;
        let pipeline = pipeline(store.clone(), ScriptedOracle::replying(EVALUATION), sink.clone());

        let facts = pipeline.derive_from_certificate(&profile, &cert).await.unwrap();

        // final = 8 * 7 * (14 / 20) = 39.2 → course confidence 0.392
        let ml = facts.iter().find(|f| f.name == "machine-learning").unwrap();
        let py = facts.iter().find(|f| f.name == "python").unwrap();
        assert_close(ml.confidence, (0.392 + 0.8) / 2.0);
        assert_close(py.confidence, (0.392 + 0.6) / 2.0);
        assert!(facts.iter().all(|f| f.source == SkillSource::CertificateAi));
        assert!(facts.iter().all(|f| f.credential_id == Some(cert.id)));
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn test_ai_path_applies_decay_and_floor() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let profile = seed_profile(&store).await;
        let old = (Utc::now() - ChronoDuration::days(365 * 10)).date_naive();
        let cert = seed_certificate(&store, &profile, "Intro", "edX", "MIT", Some(old)).await;
        let weak = r#"{"overall_rating_R": 1, "real_life_application_A": 1,
            "skills": [{"skill_name": "Basics", "skill_rating_Si": 0}]}"#;
        let pipeline = pipeline(store, ScriptedOracle::replying(weak), sink);

        let facts = pipeline.derive_from_certificate(&profile, &cert).await.unwrap();

        assert_eq!(facts.len(), 1);
        assert_close(facts[0].confidence, 0.1);
    }

    #[tokio::test]
    async fn test_oracle_failure_falls_back_to_policy_table() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let profile = seed_profile(&store).await;
        let cert = seed_certificate(
            &store,
            &profile,
            "AWS Solutions Architect",
            "Udemy",
            "Stephane Maarek",
            None,
        )
        .await;
        let pipeline = pipeline(store, ScriptedOracle::failing(), sink.clone());

        let facts = pipeline.derive_from_certificate(&profile, &cert).await.unwrap();

        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].name, "aws");
        assert_eq!(facts[0].source, SkillSource::Certificate);
        assert_close(facts[0].confidence, 0.70);
        assert_eq!(
            sink.events(),
            vec![DomainEvent::SkillDerived(SkillDerived {
                user_id: profile.user_id,
                skill_name: "aws".to_string(),
                source: SkillSource::Certificate,
                confidence: 0.70,
            })]
        );
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let profile = seed_profile(&store).await;
        let cert = seed_certificate(&store, &profile, "Cooking 101", "Skillshare", "", None).await;
        let pipeline = pipeline(store, ScriptedOracle::replying("I cannot help with that."), sink);

        let facts = pipeline.derive_from_certificate(&profile, &cert).await.unwrap();

        assert_eq!(facts[0].name, "general-skills");
        assert_close(facts[0].confidence, 0.65);
    }

    #[tokio::test]
    async fn test_rederivation_replaces_previous_facts() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let profile = seed_profile(&store).await;
        let cert = seed_certificate(&store, &profile, "ML", "Coursera", "Google", None).await;
        let pipeline = pipeline(store.clone(), ScriptedOracle::replying(EVALUATION), sink);

        pipeline.derive_from_certificate(&profile, &cert).await.unwrap();
        pipeline.derive_from_certificate(&profile, &cert).await.unwrap();

        let mut names: Vec<_> = store
            .list_skills(profile.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["machine-learning", "python"]);
    }

    #[tokio::test]
    async fn test_duplicate_skill_names_keep_highest_confidence() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let profile = seed_profile(&store).await;
        let cert = seed_certificate(&store, &profile, "Py", "Udemy", "", None).await;
        let dupes = r#"{"overall_rating_R": 10, "real_life_application_A": 10,
            "skills": [{"skill_name": "Python", "skill_rating_Si": 4},
                       {"skill_name": "python ", "skill_rating_Si": 10}]}"#;
        let pipeline = pipeline(store, ScriptedOracle::replying(dupes), sink);

        let facts = pipeline.derive_from_certificate(&profile, &cert).await.unwrap();

        assert_eq!(facts.len(), 1);
        // final = 100 * 0.7 = 70 → 0.70; blended with 1.0 → 0.85
        assert_close(facts[0].confidence, 0.85);
    }

    #[tokio::test]
    async fn test_repository_languages_are_deduplicated() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let profile = seed_profile(&store).await;
        let now = Utc::now();
        let repo = |name: &str, lang: Option<&str>, days: i64| Repository {
            id: Uuid::new_v4(),
            applicant_id: profile.id,
            name: name.to_string(),
            url: format!("https://github.com/me/{name}"),
            primary_language: lang.map(str::to_string),
            last_activity: now - ChronoDuration::days(days),
            fetched_at: now,
        };
        let repos = vec![
            repo("api", Some("Rust"), 400),
            repo("cli", Some("Rust"), 10),
            repo("site", Some("TypeScript"), 100),
            repo("notes", None, 1),
        ];
        let pipeline = pipeline(store.clone(), ScriptedOracle::failing(), sink.clone());

        let first = pipeline.derive_from_repositories(&profile, &repos).await.unwrap();
        let second = pipeline.derive_from_repositories(&profile, &repos).await.unwrap();

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        let rust = first.iter().find(|f| f.name == "rust").unwrap();
        let ts = first.iter().find(|f| f.name == "typescript").unwrap();
        assert_close(rust.confidence, 0.90);
        assert_close(ts.confidence, 0.70);
        assert_eq!(store.list_skills(profile.id).await.unwrap().len(), 2);
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn test_derive_skills_dispatches_on_credential_kind() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let profile = seed_profile(&store).await;
        let repo = Repository {
            id: Uuid::new_v4(),
            applicant_id: profile.id,
            name: "old".to_string(),
            url: "https://github.com/me/old".to_string(),
            primary_language: Some("Go".to_string()),
            last_activity: Utc::now() - ChronoDuration::days(1000),
            fetched_at: Utc::now(),
        };
        let pipeline = pipeline(store, ScriptedOracle::failing(), sink);

        let facts = pipeline
            .derive_skills(&profile, &Credential::Repository(repo))
            .await
            .unwrap();

        assert_eq!(facts.len(), 1);
        assert_close(facts[0].confidence, 0.50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_isolates_failures_and_paces_calls() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let profile = seed_profile(&store).await;
        let today = NaiveDate::from_ymd_opt(2026, 1, 1);
        seed_certificate(&store, &profile, "Python Basics", "Udemy", "", today).await;
        let broken = seed_certificate(&store, &profile, "Explodes", "Udemy", "", today).await;
        seed_certificate(&store, &profile, "Docker Deep Dive", "Udemy", "", today).await;
        let oracle = ScriptedOracle::failing().when("Explodes", Reply::Panic);
        let pipeline = pipeline(store, oracle, sink);

        let started = tokio::time::Instant::now();
        let report = pipeline
            .resync_certificates(&profile, &CredentialLocks::local())
            .await
            .unwrap();

        assert_eq!(report.synced, 2);
        assert_eq!(report.failed, vec![broken.id]);
        let mut names: Vec<_> = report.skills.iter().map(|s| s.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["docker", "python"]);
        assert!(started.elapsed() >= Duration::from_millis(6000));
    }
}
