//! Job postings: validation, posting-time match notifications, and rankings.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::{DomainEvent, EventSink, JobMatch};
use crate::matching::engine::{match_score, skill_set, sort_by_score_desc, MatchResult};
use crate::models::applicant::ApplicantProfile;
use crate::models::job::{JobFilter, JobPosting, NewJobPosting, SkillWeight};
use crate::scoring::ScoringPolicy;
use crate::store::{SkillStore, StoreResult};

const UNKNOWN_HIRER: &str = "Unknown";

#[derive(Debug, Serialize)]
pub struct RankedJob {
    #[serde(flatten)]
    pub job: JobPosting,
    #[serde(flatten)]
    pub result: MatchResult,
}

#[derive(Debug, Serialize)]
pub struct RankedApplicant {
    pub applicant_id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub result: MatchResult,
}

pub fn validate_required_skills(skills: &[SkillWeight]) -> Result<(), AppError> {
    for skill in skills {
        if skill.name.trim().is_empty() {
            return Err(AppError::Validation("Skill names must not be empty".into()));
        }
        if !skill.weight.is_finite() || skill.weight < 0.0 {
            return Err(AppError::Validation(format!(
                "Weight for skill '{}' must be a non-negative number",
                skill.name
            )));
        }
    }
    Ok(())
}

pub fn validate_new_job(job: &NewJobPosting) -> Result<(), AppError> {
    if job.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }
    if job.role.trim().is_empty() {
        return Err(AppError::Validation("role is required".into()));
    }
    validate_required_skills(&job.required_skills)
}

/// Persists the job, then notifies strongly matching applicants. A failed
/// match scan is logged and does not fail the posting.
pub async fn create_job(
    store: &dyn SkillStore,
    events: &dyn EventSink,
    policy: &ScoringPolicy,
    new: NewJobPosting,
) -> Result<JobPosting, AppError> {
    validate_new_job(&new)?;
    let job = store.create_job(new).await?;
    match notify_matching_applicants(store, events, policy, &job).await {
        Ok(notified) => info!(job_id = %job.id, notified, "Job posted"),
        Err(e) => warn!(job_id = %job.id, "Job posted; match scan failed: {e}"),
    }
    Ok(job)
}

/// Emits `jobMatch` for every applicant who holds at least one required skill
/// and whose score exceeds the policy threshold. Returns how many were notified.
pub async fn notify_matching_applicants(
    store: &dyn SkillStore,
    events: &dyn EventSink,
    policy: &ScoringPolicy,
    job: &JobPosting,
) -> StoreResult<usize> {
    if job.required_skills.is_empty() {
        return Ok(0);
    }
    let names: Vec<String> = job
        .required_skills
        .iter()
        .map(|s| s.name.to_lowercase())
        .collect();
    let candidates = store.list_applicant_skills(Some(&names)).await?;

    let mut notified = 0;
    for candidate in candidates {
        let held = skill_set(candidate.skills.iter().map(|s| s.name.as_str()));
        let result = match_score(&held, &job.required_skills);
        if result.score > policy.job_match_threshold {
            events.emit(DomainEvent::JobMatch(JobMatch {
                user_id: candidate.profile.user_id,
                job_id: job.id,
                job_title: job.title.clone(),
                match_score: result.score,
                hirer_name: job
                    .hirer_name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_HIRER.to_string()),
            }));
            notified += 1;
        }
    }
    Ok(notified)
}

/// All active jobs scored against the applicant, best first.
pub async fn recommended_jobs(
    store: &dyn SkillStore,
    profile: &ApplicantProfile,
) -> StoreResult<Vec<RankedJob>> {
    let skills = store.list_skills(profile.id).await?;
    let held = skill_set(skills.iter().map(|s| s.name.as_str()));
    let jobs = store
        .list_jobs(&JobFilter {
            is_active: Some(true),
            ..JobFilter::default()
        })
        .await?;

    let mut ranked: Vec<RankedJob> = jobs
        .into_iter()
        .map(|job| {
            let result = match_score(&held, &job.required_skills);
            RankedJob { job, result }
        })
        .collect();
    sort_by_score_desc(&mut ranked, |r| r.result.score);
    Ok(ranked)
}

/// Applicants with a non-zero score for the hirer's job, best first.
pub async fn recommended_applicants(
    store: &dyn SkillStore,
    job_id: Uuid,
    hirer_id: Uuid,
) -> Result<Vec<RankedApplicant>, AppError> {
    let job = owned_job(store, job_id, hirer_id).await?;
    let applicants = store.list_applicant_skills(None).await?;

    let mut ranked: Vec<RankedApplicant> = applicants
        .into_iter()
        .filter_map(|entry| {
            let held = skill_set(entry.skills.iter().map(|s| s.name.as_str()));
            let result = match_score(&held, &job.required_skills);
            (result.score > 0.0).then(|| RankedApplicant {
                applicant_id: entry.profile.id,
                user_id: entry.profile.user_id,
                result,
            })
        })
        .collect();
    sort_by_score_desc(&mut ranked, |r| r.result.score);
    Ok(ranked)
}

/// Fields a hirer may change on an existing posting.
#[derive(Debug, Default)]
pub struct JobChanges {
    pub title: Option<String>,
    pub role: Option<String>,
    pub description: Option<String>,
    pub required_skills: Option<Vec<SkillWeight>>,
    pub job_type: Option<crate::models::job::JobType>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn update_job(
    store: &dyn SkillStore,
    job_id: Uuid,
    hirer_id: Uuid,
    changes: JobChanges,
) -> Result<JobPosting, AppError> {
    let mut job = owned_job(store, job_id, hirer_id).await?;

    if let Some(title) = changes.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        job.title = title;
    }
    if let Some(role) = changes.role {
        if role.trim().is_empty() {
            return Err(AppError::Validation("role must not be empty".into()));
        }
        job.role = role;
    }
    if let Some(skills) = changes.required_skills {
        validate_required_skills(&skills)?;
        job.required_skills = skills;
    }
    if changes.description.is_some() {
        job.description = changes.description;
    }
    if let Some(job_type) = changes.job_type {
        job.job_type = job_type;
    }
    if changes.location.is_some() {
        job.location = changes.location;
    }
    if changes.salary.is_some() {
        job.salary = changes.salary;
    }
    if let Some(active) = changes.is_active {
        job.is_active = active;
    }

    Ok(store.update_job(&job).await?)
}

/// Loads a job only if `hirer_id` owns it. Someone else's job looks missing.
async fn owned_job(
    store: &dyn SkillStore,
    job_id: Uuid,
    hirer_id: Uuid,
) -> Result<JobPosting, AppError> {
    store
        .find_job(job_id)
        .await?
        .filter(|job| job.hirer_id == hirer_id)
        .ok_or_else(|| AppError::NotFound("Job not found or not owned by this hirer".into()))
}
