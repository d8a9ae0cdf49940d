use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::applicants::service::{
    self, CertificateChanges, CertificateInput, CertificateWithSkills, ConnectReport, ProfileView,
};
use crate::errors::AppError;
use crate::models::applicant::{ApplicantProfile, NewApplicantProfile, Resume};
use crate::models::credential::{Certificate, Repository};
use crate::models::skill::SkillFact;
use crate::skills::ResyncReport;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct UserIdBody {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreateProfileRequest {
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub linked_in_url: Option<String>,
}

#[derive(Deserialize)]
pub struct AddCertificateRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub certificate: CertificateInput,
}

#[derive(Deserialize)]
pub struct UpdateCertificateRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub changes: CertificateChanges,
}

#[derive(Deserialize)]
pub struct UpdateCgpaRequest {
    pub user_id: Uuid,
    pub cgpa: String,
}

#[derive(Deserialize)]
pub struct ConnectRepositoriesRequest {
    pub user_id: Uuid,
    pub access_token: String,
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub removed: u64,
}

/// POST /api/v1/applicants
pub async fn handle_create_profile(
    State(state): State<AppState>,
    Json(req): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ApplicantProfile>), AppError> {
    let profile = service::create_profile(
        state.store.as_ref(),
        NewApplicantProfile {
            user_id: req.user_id,
            bio: req.bio,
            linked_in_url: req.linked_in_url,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/v1/applicants/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ProfileView>, AppError> {
    Ok(Json(
        service::profile_view(state.store.as_ref(), params.user_id).await?,
    ))
}

/// GET /api/v1/applicants/skills
pub async fn handle_list_skills(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<SkillFact>>, AppError> {
    Ok(Json(
        service::list_skills(state.store.as_ref(), params.user_id).await?,
    ))
}

/// POST /api/v1/applicants/certificates
pub async fn handle_add_certificate(
    State(state): State<AppState>,
    Json(req): Json<AddCertificateRequest>,
) -> Result<(StatusCode, Json<CertificateWithSkills>), AppError> {
    let added = service::add_certificate(&state, req.user_id, req.certificate).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

/// PUT /api/v1/applicants/certificates/:id
pub async fn handle_update_certificate(
    State(state): State<AppState>,
    Path(certificate_id): Path<Uuid>,
    Json(req): Json<UpdateCertificateRequest>,
) -> Result<Json<CertificateWithSkills>, AppError> {
    Ok(Json(
        service::update_certificate(&state, req.user_id, certificate_id, req.changes).await?,
    ))
}

/// GET /api/v1/applicants/certificates
pub async fn handle_list_certificates(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<Certificate>>, AppError> {
    Ok(Json(
        service::list_certificates(state.store.as_ref(), params.user_id).await?,
    ))
}

/// POST /api/v1/applicants/certificates/sync
pub async fn handle_sync_certificates(
    State(state): State<AppState>,
    Json(req): Json<UserIdBody>,
) -> Result<Json<ResyncReport>, AppError> {
    Ok(Json(service::sync_certificates(&state, req.user_id).await?))
}

/// POST /api/v1/applicants/resume
/// Multipart form with a `user_id` text field and a PDF `file` field.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let mut user_id: Option<Uuid> = None;
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("user_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                user_id = Some(
                    raw.trim()
                        .parse()
                        .map_err(|_| AppError::Validation("user_id must be a UUID".into()))?,
                );
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("resume.pdf").to_string();
                let is_pdf = field.content_type() == Some("application/pdf")
                    || filename.to_ascii_lowercase().ends_with(".pdf");
                if !is_pdf {
                    return Err(AppError::Validation("Only PDF files are allowed".into()));
                }
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                upload = Some((filename, body));
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::Validation("user_id is required".into()))?;
    let (filename, body) = upload.ok_or_else(|| AppError::Validation("No file uploaded".into()))?;
    let resume = service::upload_resume(&state, user_id, filename, body).await?;
    Ok((StatusCode::CREATED, Json(resume)))
}

/// PUT /api/v1/applicants/resume/cgpa
pub async fn handle_update_cgpa(
    State(state): State<AppState>,
    Json(req): Json<UpdateCgpaRequest>,
) -> Result<Json<Resume>, AppError> {
    Ok(Json(
        service::update_cgpa(state.store.as_ref(), req.user_id, &req.cgpa).await?,
    ))
}

/// POST /api/v1/applicants/repositories/connect
pub async fn handle_connect_repositories(
    State(state): State<AppState>,
    Json(req): Json<ConnectRepositoriesRequest>,
) -> Result<Json<ConnectReport>, AppError> {
    Ok(Json(
        service::connect_repositories(&state, req.user_id, &req.access_token).await?,
    ))
}

/// GET /api/v1/applicants/repositories
pub async fn handle_list_repositories(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<Repository>>, AppError> {
    Ok(Json(
        service::list_repositories(state.store.as_ref(), params.user_id).await?,
    ))
}

/// DELETE /api/v1/applicants/repositories
pub async fn handle_disconnect_repositories(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<DisconnectResponse>, AppError> {
    let removed = service::disconnect_repositories(state.store.as_ref(), params.user_id).await?;
    Ok(Json(DisconnectResponse { removed }))
}
