use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::applicants::service::require_profile;
use crate::errors::AppError;
use crate::matching::jobs::{self, JobChanges, RankedApplicant, RankedJob};
use crate::models::job::{JobFilter, JobPosting, JobType, NewJobPosting, SkillWeight};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub hirer_id: Uuid,
    pub hirer_name: Option<String>,
    pub title: String,
    pub role: String,
    pub description: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<SkillWeight>,
    pub job_type: JobType,
    pub location: Option<String>,
    pub salary: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateJobRequest {
    pub hirer_id: Uuid,
    pub title: Option<String>,
    pub role: Option<String>,
    pub description: Option<String>,
    pub required_skills: Option<Vec<SkillWeight>>,
    pub job_type: Option<JobType>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct ListJobsQuery {
    pub job_type: Option<JobType>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct HirerIdQuery {
    pub hirer_id: Uuid,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobPosting>), AppError> {
    let new = NewJobPosting {
        hirer_id: req.hirer_id,
        hirer_name: req.hirer_name,
        title: req.title,
        role: req.role,
        description: req.description,
        required_skills: req.required_skills,
        job_type: req.job_type,
        location: req.location,
        salary: req.salary,
    };
    let job = jobs::create_job(
        state.store.as_ref(),
        state.events.as_ref(),
        &state.policy,
        new,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobPosting>>, AppError> {
    let filter = JobFilter {
        job_type: params.job_type,
        location: params.location.filter(|l| !l.trim().is_empty()),
        is_active: Some(params.is_active.unwrap_or(true)),
        hirer_id: None,
    };
    Ok(Json(state.store.list_jobs(&filter).await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobPosting>, AppError> {
    state
        .store
        .find_job(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Job not found".into()))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<JobPosting>, AppError> {
    let changes = JobChanges {
        title: req.title,
        role: req.role,
        description: req.description,
        required_skills: req.required_skills,
        job_type: req.job_type,
        location: req.location,
        salary: req.salary,
        is_active: req.is_active,
    };
    let job = jobs::update_job(state.store.as_ref(), id, req.hirer_id, changes).await?;
    Ok(Json(job))
}

/// GET /api/v1/jobs/recommended
pub async fn handle_recommended_jobs(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<RankedJob>>, AppError> {
    let profile = require_profile(state.store.as_ref(), params.user_id).await?;
    Ok(Json(jobs::recommended_jobs(state.store.as_ref(), &profile).await?))
}

/// GET /api/v1/jobs/:id/applicants
pub async fn handle_recommended_applicants(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<HirerIdQuery>,
) -> Result<Json<Vec<RankedApplicant>>, AppError> {
    let ranked = jobs::recommended_applicants(state.store.as_ref(), id, params.hirer_id).await?;
    Ok(Json(ranked))
}
