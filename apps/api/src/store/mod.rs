//! Persistence boundary. The engine only ever talks to `SkillStore`.
//!
//! `PgStore` is the production backend; `MemoryStore` keeps everything in an
//! in-process arena and is used when no database is configured (and in tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::applicant::{ApplicantProfile, NewApplicantProfile, NewResume, Resume};
use crate::models::credential::{Certificate, NewCertificate, NewRepository, Repository};
use crate::models::job::{JobFilter, JobPosting, NewJobPosting};
use crate::models::notification::{NewNotification, Notification};
use crate::models::skill::{NewSkillFact, SkillFact, SkillSource};
use crate::models::skill_test::{
    AnswerRecord, ConfidenceChange, NewSkillTestQuestion, SkillTest,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// An applicant together with every skill fact they hold.
#[derive(Debug, Clone)]
pub struct ApplicantSkills {
    pub profile: ApplicantProfile,
    pub skills: Vec<SkillFact>,
}

#[async_trait]
pub trait SkillStore: Send + Sync {
    // Profiles
    async fn create_profile(&self, new: NewApplicantProfile) -> StoreResult<ApplicantProfile>;
    async fn find_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<ApplicantProfile>>;

    // Resume
    /// Deletes any existing resume for the applicant, then stores `new`.
    async fn replace_resume(&self, new: NewResume) -> StoreResult<Resume>;
    async fn find_resume(&self, applicant_id: Uuid) -> StoreResult<Option<Resume>>;
    async fn update_resume_cgpa(&self, resume_id: Uuid, cgpa: &str) -> StoreResult<Resume>;

    // Certificates
    async fn create_certificate(&self, new: NewCertificate) -> StoreResult<Certificate>;
    async fn find_certificate(
        &self,
        applicant_id: Uuid,
        certificate_id: Uuid,
    ) -> StoreResult<Option<Certificate>>;
    async fn update_certificate(&self, certificate: &Certificate) -> StoreResult<Certificate>;
    async fn list_certificates(&self, applicant_id: Uuid) -> StoreResult<Vec<Certificate>>;

    // Repositories
    /// Inserts or refreshes by (applicant_id, name).
    async fn upsert_repository(&self, new: NewRepository) -> StoreResult<Repository>;
    async fn list_repositories(&self, applicant_id: Uuid) -> StoreResult<Vec<Repository>>;
    async fn delete_repositories(&self, applicant_id: Uuid) -> StoreResult<u64>;

    // Skill facts
    async fn list_skills(&self, applicant_id: Uuid) -> StoreResult<Vec<SkillFact>>;
    /// Replace-set: deletes every fact owned by `credential_id`, then inserts
    /// `facts`. Idempotent under retry.
    ///
    /// PRECONDITION: callers serialize invocations per credential id. Two
    /// concurrent replacements of the same credential can interleave their
    /// deletes and inserts and leave duplicates behind.
    async fn replace_credential_skills(
        &self,
        credential_id: Uuid,
        facts: Vec<NewSkillFact>,
    ) -> StoreResult<Vec<SkillFact>>;
    async fn find_skill(
        &self,
        applicant_id: Uuid,
        name: &str,
        source: SkillSource,
    ) -> StoreResult<Option<SkillFact>>;
    async fn create_skill(&self, new: NewSkillFact) -> StoreResult<SkillFact>;
    /// Every applicant with their skills. With `any_of`, only applicants
    /// holding at least one of those (lower-cased) skill names.
    async fn list_applicant_skills(
        &self,
        any_of: Option<&[String]>,
    ) -> StoreResult<Vec<ApplicantSkills>>;

    // Jobs
    async fn create_job(&self, new: NewJobPosting) -> StoreResult<JobPosting>;
    async fn find_job(&self, job_id: Uuid) -> StoreResult<Option<JobPosting>>;
    async fn update_job(&self, job: &JobPosting) -> StoreResult<JobPosting>;
    /// Newest first.
    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<JobPosting>>;

    // Skill tests
    async fn create_test(
        &self,
        applicant_id: Uuid,
        questions: Vec<NewSkillTestQuestion>,
    ) -> StoreResult<SkillTest>;
    async fn find_test(&self, test_id: Uuid) -> StoreResult<Option<SkillTest>>;
    /// Records answers, moves the test IN_PROGRESS → COMPLETED and applies
    /// `confidences` to the test owner's facts (stamping `last_tested_at`),
    /// all or nothing. Returns `false`, writing nothing, when the test was no
    /// longer in progress.
    async fn complete_test(
        &self,
        test_id: Uuid,
        answers: &[AnswerRecord],
        confidences: &[ConfidenceChange],
        summary: Value,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    // Notifications
    async fn create_notification(&self, new: NewNotification) -> StoreResult<Notification>;
    /// Newest first.
    async fn list_notifications(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(&self, user_id: Uuid, notification_id: Uuid)
        -> StoreResult<bool>;
}
