use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::applicants::service::require_profile;
use crate::errors::AppError;
use crate::goals::{analyze_goals, GoalAnalysis};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AnalyzeGoalsRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub goals: Vec<String>,
}

/// POST /api/v1/applicants/goals/analyze
pub async fn handle_analyze_goals(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeGoalsRequest>,
) -> Result<Json<GoalAnalysis>, AppError> {
    let profile = require_profile(state.store.as_ref(), req.user_id).await?;
    let analysis = analyze_goals(
        state.store.as_ref(),
        state.goal_oracle.as_ref(),
        &profile,
        req.goals,
    )
    .await?;
    Ok(Json(analysis))
}
