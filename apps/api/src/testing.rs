//! In-test fakes for the oracle and the event sink, plus small fixtures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::applicants::github::{GitHubError, RemoteRepository, RepositoryHost};
use crate::documents::PdfTextExtractor;
use crate::events::{DomainEvent, EventSink};
use crate::llm_client::{EvaluationOracle, LlmError};
use crate::locks::CredentialLocks;
use crate::models::applicant::{ApplicantProfile, NewApplicantProfile, NewResume, Resume};
use crate::models::credential::{Certificate, NewCertificate, NewRepository, Repository};
use crate::models::job::{JobFilter, JobPosting, NewJobPosting};
use crate::models::notification::{NewNotification, Notification};
use crate::models::skill::{NewSkillFact, SkillFact, SkillSource};
use crate::models::skill_test::{AnswerRecord, ConfidenceChange, NewSkillTestQuestion, SkillTest};
use crate::scoring::ScoringPolicy;
use crate::skills::DerivationPipeline;
use crate::state::AppState;
use crate::store::{ApplicantSkills, MemoryStore, SkillStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail,
    Panic,
}

/// Oracle whose answers are chosen by substring rules over the prompts.
pub struct ScriptedOracle {
    rules: Vec<(String, Reply)>,
    default: Reply,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn failing() -> Self {
        Self::with_default(Reply::Fail)
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_default(Reply::Text(text.into()))
    }

    fn with_default(default: Reply) -> Self {
        Self {
            rules: Vec::new(),
            default,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies with `reply` whenever either prompt contains `needle`.
    pub fn when(mut self, needle: impl Into<String>, reply: Reply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl EvaluationOracle for ScriptedOracle {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(user.to_string());
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| user.contains(needle.as_str()) || system.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default.clone());
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail => Err(LlmError::EmptyContent),
            Reply::Panic => panic!("scripted oracle panic"),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub async fn seed_profile(store: &MemoryStore) -> ApplicantProfile {
    store
        .create_profile(NewApplicantProfile {
            user_id: Uuid::new_v4(),
            bio: None,
            linked_in_url: None,
        })
        .await
        .unwrap()
}

pub async fn seed_certificate(
    store: &MemoryStore,
    profile: &ApplicantProfile,
    name: &str,
    platform: &str,
    company: &str,
    completed_on: Option<NaiveDate>,
) -> Certificate {
    store
        .create_certificate(NewCertificate {
            applicant_id: profile.id,
            name: name.to_string(),
            company_name: company.to_string(),
            platform: platform.to_string(),
            completed_on,
        })
        .await
        .unwrap()
}

pub fn shared_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// `MemoryStore` that can be told to fail individual operations.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_completion: AtomicBool,
    fail_skill_scan: AtomicBool,
}

impl FaultyStore {
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_completion(&self, fail: bool) {
        self.fail_completion.store(fail, Ordering::SeqCst);
    }

    pub fn fail_skill_scan(&self, fail: bool) {
        self.fail_skill_scan.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, operation: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt(format!("{operation} unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl SkillStore for FaultyStore {
    async fn create_profile(&self, new: NewApplicantProfile) -> StoreResult<ApplicantProfile> {
        self.inner.create_profile(new).await
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<ApplicantProfile>> {
        self.inner.find_profile_by_user(user_id).await
    }

    async fn replace_resume(&self, new: NewResume) -> StoreResult<Resume> {
        self.inner.replace_resume(new).await
    }

    async fn find_resume(&self, applicant_id: Uuid) -> StoreResult<Option<Resume>> {
        self.inner.find_resume(applicant_id).await
    }

    async fn update_resume_cgpa(&self, resume_id: Uuid, cgpa: &str) -> StoreResult<Resume> {
        self.inner.update_resume_cgpa(resume_id, cgpa).await
    }

    async fn create_certificate(&self, new: NewCertificate) -> StoreResult<Certificate> {
        self.inner.create_certificate(new).await
    }

    async fn find_certificate(
        &self,
        applicant_id: Uuid,
        certificate_id: Uuid,
    ) -> StoreResult<Option<Certificate>> {
        self.inner.find_certificate(applicant_id, certificate_id).await
    }

    async fn update_certificate(&self, certificate: &Certificate) -> StoreResult<Certificate> {
        self.inner.update_certificate(certificate).await
    }

    async fn list_certificates(&self, applicant_id: Uuid) -> StoreResult<Vec<Certificate>> {
        self.inner.list_certificates(applicant_id).await
    }

    async fn upsert_repository(&self, new: NewRepository) -> StoreResult<Repository> {
        self.inner.upsert_repository(new).await
    }

    async fn list_repositories(&self, applicant_id: Uuid) -> StoreResult<Vec<Repository>> {
        self.inner.list_repositories(applicant_id).await
    }

    async fn delete_repositories(&self, applicant_id: Uuid) -> StoreResult<u64> {
        self.inner.delete_repositories(applicant_id).await
    }

    async fn list_skills(&self, applicant_id: Uuid) -> StoreResult<Vec<SkillFact>> {
        self.inner.list_skills(applicant_id).await
    }

    async fn replace_credential_skills(
        &self,
        credential_id: Uuid,
        facts: Vec<NewSkillFact>,
    ) -> StoreResult<Vec<SkillFact>> {
        self.inner.replace_credential_skills(credential_id, facts).await
    }

    async fn find_skill(
        &self,
        applicant_id: Uuid,
        name: &str,
        source: SkillSource,
    ) -> StoreResult<Option<SkillFact>> {
        self.inner.find_skill(applicant_id, name, source).await
    }

    async fn create_skill(&self, new: NewSkillFact) -> StoreResult<SkillFact> {
        self.inner.create_skill(new).await
    }

    async fn list_applicant_skills(
        &self,
        any_of: Option<&[String]>,
    ) -> StoreResult<Vec<ApplicantSkills>> {
        Self::check(&self.fail_skill_scan, "skill scan")?;
        self.inner.list_applicant_skills(any_of).await
    }

    async fn create_job(&self, new: NewJobPosting) -> StoreResult<JobPosting> {
        self.inner.create_job(new).await
    }

    async fn find_job(&self, job_id: Uuid) -> StoreResult<Option<JobPosting>> {
        self.inner.find_job(job_id).await
    }

    async fn update_job(&self, job: &JobPosting) -> StoreResult<JobPosting> {
        self.inner.update_job(job).await
    }

    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<JobPosting>> {
        self.inner.list_jobs(filter).await
    }

    async fn create_test(
        &self,
        applicant_id: Uuid,
        questions: Vec<NewSkillTestQuestion>,
    ) -> StoreResult<SkillTest> {
        self.inner.create_test(applicant_id, questions).await
    }

    async fn find_test(&self, test_id: Uuid) -> StoreResult<Option<SkillTest>> {
        self.inner.find_test(test_id).await
    }

    async fn complete_test(
        &self,
        test_id: Uuid,
        answers: &[AnswerRecord],
        confidences: &[ConfidenceChange],
        summary: Value,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Self::check(&self.fail_completion, "test completion")?;
        self.inner
            .complete_test(test_id, answers, confidences, summary, completed_at)
            .await
    }

    async fn create_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        self.inner.create_notification(new).await
    }

    async fn list_notifications(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Notification>> {
        self.inner.list_notifications(user_id, limit).await
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> StoreResult<bool> {
        self.inner.mark_notification_read(user_id, notification_id).await
    }
}

/// Repository host serving a fixed set of repositories, or rejecting the token.
pub struct FakeRepositoryHost {
    repositories: Option<Vec<RemoteRepository>>,
}

impl FakeRepositoryHost {
    /// Two Rust repositories and one TypeScript repository, all recent.
    pub fn standard() -> Self {
        let repo = |name: &str, language: &str, days_ago: i64| RemoteRepository {
            name: name.to_string(),
            html_url: format!("https://github.com/octo/{name}"),
            updated_at: Utc::now() - chrono::Duration::days(days_ago),
            language: Some(language.to_string()),
        };
        Self {
            repositories: Some(vec![
                repo("engine", "Rust", 3),
                repo("cli", "Rust", 200),
                repo("web", "TypeScript", 40),
            ]),
        }
    }

    pub fn rejecting() -> Self {
        Self { repositories: None }
    }
}

#[async_trait]
impl RepositoryHost for FakeRepositoryHost {
    async fn recent_repositories(&self, _access_token: &str) -> Result<Vec<RemoteRepository>, GitHubError> {
        self.repositories.clone().ok_or(GitHubError::InvalidToken)
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub sink: Arc<RecordingSink>,
}

/// Full application state over an in-memory store, with `oracle` behind
/// every oracle seam and no resync delay.
pub fn test_state(oracle: ScriptedOracle) -> TestHarness {
    let store = shared_store();
    let sink = Arc::new(RecordingSink::default());
    let oracle: Arc<dyn EvaluationOracle> = Arc::new(oracle);
    let policy = Arc::new(ScoringPolicy::default());
    let pipeline = DerivationPipeline::new(
        store.clone(),
        oracle.clone(),
        sink.clone(),
        policy.clone(),
        Duration::ZERO,
    );
    let state = AppState {
        store: store.clone(),
        oracle: oracle.clone(),
        goal_oracle: oracle,
        events: sink.clone(),
        pipeline,
        extractor: Arc::new(PdfTextExtractor),
        archive: None,
        locks: CredentialLocks::local(),
        repositories: Arc::new(FakeRepositoryHost::standard()),
        policy,
    };
    TestHarness { state, store, sink }
}
