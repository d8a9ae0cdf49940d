use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::applicants::service::require_profile;
use crate::assessment::generator::{generate_test, TestView};
use crate::assessment::grading::{submit_test, SubmittedAnswer, TestResult};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GenerateTestRequest {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct SubmitTestRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

/// POST /api/v1/tests
pub async fn handle_generate_test(
    State(state): State<AppState>,
    Json(req): Json<GenerateTestRequest>,
) -> Result<(StatusCode, Json<TestView>), AppError> {
    let profile = require_profile(state.store.as_ref(), req.user_id).await?;
    let test = generate_test(
        state.store.as_ref(),
        state.oracle.as_ref(),
        &state.policy.assessment.battery,
        &profile,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(TestView::from(&test))))
}

/// POST /api/v1/tests/:id/submit
pub async fn handle_submit_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    Json(req): Json<SubmitTestRequest>,
) -> Result<Json<TestResult>, AppError> {
    let profile = require_profile(state.store.as_ref(), req.user_id).await?;
    let result = submit_test(
        state.store.as_ref(),
        &state.policy.assessment,
        &profile,
        test_id,
        req.answers,
    )
    .await?;
    Ok(Json(result))
}
