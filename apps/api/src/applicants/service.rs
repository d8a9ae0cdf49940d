use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::applicants::github::GitHubError;
use crate::errors::AppError;
use crate::events::{DomainEvent, EventSink, ProfileComplete};
use crate::models::applicant::{ApplicantProfile, NewApplicantProfile, NewResume, Resume};
use crate::models::credential::{Certificate, Credential, NewCertificate, NewRepository, Repository};
use crate::models::skill::SkillFact;
use crate::skills::resume::extract_cgpa;
use crate::skills::ResyncReport;
use crate::state::AppState;
use crate::store::{SkillStore, StoreResult};

/// Loads the caller's profile or fails with 404.
pub async fn require_profile(
    store: &dyn SkillStore,
    user_id: Uuid,
) -> Result<ApplicantProfile, AppError> {
    store
        .find_profile_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found. Create a profile first.".into()))
}

pub async fn create_profile(
    store: &dyn SkillStore,
    new: NewApplicantProfile,
) -> Result<ApplicantProfile, AppError> {
    if store.find_profile_by_user(new.user_id).await?.is_some() {
        return Err(AppError::Validation("Profile already exists".into()));
    }
    let profile = store.create_profile(new).await?;
    info!(applicant_id = %profile.id, user_id = %profile.user_id, "Applicant profile created");
    Ok(profile)
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: ApplicantProfile,
    pub resume: Option<Resume>,
    pub certificates: Vec<Certificate>,
    pub repositories: Vec<Repository>,
    pub skills: Vec<SkillFact>,
}

pub async fn profile_view(store: &dyn SkillStore, user_id: Uuid) -> Result<ProfileView, AppError> {
    let profile = require_profile(store, user_id).await?;
    Ok(ProfileView {
        resume: store.find_resume(profile.id).await?,
        certificates: store.list_certificates(profile.id).await?,
        repositories: store.list_repositories(profile.id).await?,
        skills: store.list_skills(profile.id).await?,
        profile,
    })
}

/// A profile is complete once it has a resume, a certificate and a skill.
/// Emits `profileComplete` every time the check passes.
pub async fn check_profile_completion(
    store: &dyn SkillStore,
    events: &dyn EventSink,
    profile: &ApplicantProfile,
) -> StoreResult<bool> {
    let complete = store.find_resume(profile.id).await?.is_some()
        && !store.list_certificates(profile.id).await?.is_empty()
        && !store.list_skills(profile.id).await?.is_empty();
    if complete {
        events.emit(DomainEvent::ProfileComplete(ProfileComplete {
            user_id: profile.user_id,
            profile_id: profile.id,
        }));
    }
    Ok(complete)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertificateInput {
    pub name: String,
    pub company_name: String,
    pub platform: String,
    pub completed_on: Option<NaiveDate>,
}

/// Partial update. Blank strings count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificateChanges {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub platform: Option<String>,
    pub completed_on: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CertificateWithSkills {
    pub certificate: Certificate,
    pub skills: Vec<SkillFact>,
}

pub async fn add_certificate(
    state: &AppState,
    user_id: Uuid,
    input: CertificateInput,
) -> Result<CertificateWithSkills, AppError> {
    for (field, value) in [
        ("name", &input.name),
        ("company_name", &input.company_name),
        ("platform", &input.platform),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} is required")));
        }
    }
    let profile = require_profile(state.store.as_ref(), user_id).await?;
    let certificate = state
        .store
        .create_certificate(NewCertificate {
            applicant_id: profile.id,
            name: input.name.trim().to_string(),
            company_name: input.company_name.trim().to_string(),
            platform: input.platform.trim().to_string(),
            completed_on: input.completed_on,
        })
        .await?;

    let skills = derive_locked(state, &profile, &certificate).await?;
    check_profile_completion(state.store.as_ref(), state.events.as_ref(), &profile).await?;
    Ok(CertificateWithSkills {
        certificate,
        skills,
    })
}

/// Merges `changes` into the certificate and re-derives its skills.
pub async fn update_certificate(
    state: &AppState,
    user_id: Uuid,
    certificate_id: Uuid,
    changes: CertificateChanges,
) -> Result<CertificateWithSkills, AppError> {
    let profile = require_profile(state.store.as_ref(), user_id).await?;
    let mut certificate = state
        .store
        .find_certificate(profile.id, certificate_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Certificate not found".into()))?;

    let present = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    if let Some(name) = present(changes.name) {
        certificate.name = name;
    }
    if let Some(company_name) = present(changes.company_name) {
        certificate.company_name = company_name;
    }
    if let Some(platform) = present(changes.platform) {
        certificate.platform = platform;
    }
    if changes.completed_on.is_some() {
        certificate.completed_on = changes.completed_on;
    }

    let certificate = state.store.update_certificate(&certificate).await?;
    let skills = derive_locked(state, &profile, &certificate).await?;
    Ok(CertificateWithSkills {
        certificate,
        skills,
    })
}

async fn derive_locked(
    state: &AppState,
    profile: &ApplicantProfile,
    certificate: &Certificate,
) -> Result<Vec<SkillFact>, AppError> {
    let credential = Credential::Certificate(certificate.clone());
    let skills = state
        .locks
        .run(
            credential.id(),
            state.pipeline.derive_skills(profile, &credential),
        )
        .await??;
    Ok(skills)
}

pub async fn list_certificates(
    store: &dyn SkillStore,
    user_id: Uuid,
) -> Result<Vec<Certificate>, AppError> {
    let profile = require_profile(store, user_id).await?;
    Ok(store.list_certificates(profile.id).await?)
}

pub async fn list_skills(store: &dyn SkillStore, user_id: Uuid) -> Result<Vec<SkillFact>, AppError> {
    let profile = require_profile(store, user_id).await?;
    Ok(store.list_skills(profile.id).await?)
}

pub async fn sync_certificates(state: &AppState, user_id: Uuid) -> Result<ResyncReport, AppError> {
    let profile = require_profile(state.store.as_ref(), user_id).await?;
    let report = state
        .pipeline
        .resync_certificates(&profile, &state.locks)
        .await?;
    info!(
        applicant_id = %profile.id,
        synced = report.synced,
        failed = report.failed.len(),
        "Certificate re-sync finished"
    );
    Ok(report)
}

/// Stores a new resume in place of the old one. Text extraction and CGPA
/// lookup never block the upload; a resume without a readable CGPA is saved
/// with `cgpa = null`.
pub async fn upload_resume(
    state: &AppState,
    user_id: Uuid,
    filename: String,
    document: Bytes,
) -> Result<Resume, AppError> {
    if document.is_empty() {
        return Err(AppError::Validation("No file uploaded".into()));
    }
    let profile = require_profile(state.store.as_ref(), user_id).await?;

    let text = state.extractor.extract_text(document.clone()).await;
    let cgpa = extract_cgpa(state.oracle.as_ref(), &text).await;

    let storage_key = match &state.archive {
        Some(archive) => Some(
            archive
                .put_resume(profile.id, &filename, document)
                .await
                .map_err(AppError::Storage)?,
        ),
        None => None,
    };

    let resume = state
        .store
        .replace_resume(NewResume {
            applicant_id: profile.id,
            filename,
            storage_key,
            cgpa,
        })
        .await?;
    info!(
        applicant_id = %profile.id,
        cgpa_found = resume.cgpa.is_some(),
        "Resume uploaded"
    );
    check_profile_completion(state.store.as_ref(), state.events.as_ref(), &profile).await?;
    Ok(resume)
}

/// Manual CGPA override. Requires an uploaded resume.
pub async fn update_cgpa(store: &dyn SkillStore, user_id: Uuid, cgpa: &str) -> Result<Resume, AppError> {
    let cgpa = cgpa.trim();
    if cgpa.is_empty() {
        return Err(AppError::Validation("cgpa is required".into()));
    }
    let profile = require_profile(store, user_id).await?;
    let resume = store.find_resume(profile.id).await?.ok_or_else(|| {
        AppError::Validation("No resume found. Please upload a resume first.".into())
    })?;
    Ok(store.update_resume_cgpa(resume.id, cgpa).await?)
}

#[derive(Debug, Serialize)]
pub struct ConnectReport {
    pub repositories: usize,
    pub skills: Vec<SkillFact>,
}

/// Pulls the applicant's recent repositories and derives language skills.
pub async fn connect_repositories(
    state: &AppState,
    user_id: Uuid,
    access_token: &str,
) -> Result<ConnectReport, AppError> {
    if access_token.trim().is_empty() {
        return Err(AppError::Validation("access_token is required".into()));
    }
    let profile = require_profile(state.store.as_ref(), user_id).await?;

    let remote = state
        .repositories
        .recent_repositories(access_token.trim())
        .await
        .map_err(|e| match e {
            GitHubError::InvalidToken => AppError::Validation(e.to_string()),
            other => AppError::Internal(anyhow::anyhow!("Failed to fetch GitHub repositories: {other}")),
        })?;

    let mut stored = Vec::with_capacity(remote.len());
    for repo in remote {
        stored.push(
            state
                .store
                .upsert_repository(NewRepository {
                    applicant_id: profile.id,
                    name: repo.name,
                    url: repo.html_url,
                    primary_language: repo.language,
                    last_activity: repo.updated_at,
                })
                .await?,
        );
    }

    let skills = state
        .pipeline
        .derive_from_repositories(&profile, &stored)
        .await?;
    info!(
        applicant_id = %profile.id,
        repositories = stored.len(),
        new_skills = skills.len(),
        "Repositories connected"
    );
    Ok(ConnectReport {
        repositories: stored.len(),
        skills,
    })
}

pub async fn list_repositories(
    store: &dyn SkillStore,
    user_id: Uuid,
) -> Result<Vec<Repository>, AppError> {
    let profile = require_profile(store, user_id).await?;
    Ok(store.list_repositories(profile.id).await?)
}

/// Forgets the applicant's repositories. Language skills already derived
/// from them are kept.
pub async fn disconnect_repositories(store: &dyn SkillStore, user_id: Uuid) -> Result<u64, AppError> {
    let profile = require_profile(store, user_id).await?;
    let removed = store.delete_repositories(profile.id).await?;
    if removed == 0 {
        warn!(applicant_id = %profile.id, "No repositories to disconnect");
    }
    Ok(removed)
}
