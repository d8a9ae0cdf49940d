pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::applicants::handlers as applicants;
use crate::assessment::handlers as assessment;
use crate::events::handlers as notifications;
use crate::goals::handlers as goals;
use crate::matching::handlers as jobs;
use crate::state::AppState;

/// Resume uploads are the only large bodies.
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Applicants
        .route("/api/v1/applicants", post(applicants::handle_create_profile))
        .route("/api/v1/applicants/profile", get(applicants::handle_get_profile))
        .route("/api/v1/applicants/skills", get(applicants::handle_list_skills))
        .route(
            "/api/v1/applicants/certificates",
            post(applicants::handle_add_certificate).get(applicants::handle_list_certificates),
        )
        .route(
            "/api/v1/applicants/certificates/sync",
            post(applicants::handle_sync_certificates),
        )
        .route(
            "/api/v1/applicants/certificates/:id",
            put(applicants::handle_update_certificate),
        )
        .route(
            "/api/v1/applicants/resume",
            post(applicants::handle_upload_resume).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/applicants/resume/cgpa",
            put(applicants::handle_update_cgpa),
        )
        .route(
            "/api/v1/applicants/repositories",
            get(applicants::handle_list_repositories)
                .delete(applicants::handle_disconnect_repositories),
        )
        .route(
            "/api/v1/applicants/repositories/connect",
            post(applicants::handle_connect_repositories),
        )
        .route(
            "/api/v1/applicants/goals/analyze",
            post(goals::handle_analyze_goals),
        )
        // Assessment
        .route("/api/v1/tests", post(assessment::handle_generate_test))
        .route("/api/v1/tests/:id/submit", post(assessment::handle_submit_test))
        // Jobs
        .route(
            "/api/v1/jobs",
            post(jobs::handle_create_job).get(jobs::handle_list_jobs),
        )
        .route("/api/v1/jobs/recommended", get(jobs::handle_recommended_jobs))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job).put(jobs::handle_update_job),
        )
        .route(
            "/api/v1/jobs/:id/applicants",
            get(jobs::handle_recommended_applicants),
        )
        // Notifications
        .route(
            "/api/v1/notifications",
            get(notifications::handle_list_notifications),
        )
        .route(
            "/api/v1/notifications/:id/read",
            post(notifications::handle_mark_read),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::testing::{test_state, ScriptedOracle};

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state(ScriptedOracle::failing()).state);
        let (status, body) = call(app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "skillmatch-api");
    }

    #[tokio::test]
    async fn test_missing_profile_is_404_envelope() {
        let app = build_router(test_state(ScriptedOracle::failing()).state);
        let uri = format!("/api/v1/applicants/skills?user_id={}", Uuid::new_v4());
        let (status, body) = call(app, Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_profile_certificate_and_test_flow() {
        let harness = test_state(ScriptedOracle::failing());
        let app = build_router(harness.state.clone());
        let user_id = Uuid::new_v4();

        let (status, _) = call(
            app.clone(),
            post_json("/api/v1/applicants", json!({ "user_id": user_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            app.clone(),
            post_json(
                "/api/v1/applicants/certificates",
                json!({
                    "user_id": user_id,
                    "name": "Python for Everybody",
                    "company_name": "University of Michigan",
                    "platform": "Coursera",
                    "completed_on": null
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["skills"][0]["name"], "python");

        let (status, test) = call(
            app.clone(),
            post_json("/api/v1/tests", json!({ "user_id": user_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(test["questions"][0].get("correct_answer").is_none());
        let test_id = test["test_id"].as_str().unwrap().to_string();
        let question_id = test["questions"][0]["id"].clone();

        let submit = json!({
            "user_id": user_id,
            "answers": [{ "question_id": question_id, "answer": "Concept A" }]
        });
        let uri = format!("/api/v1/tests/{test_id}/submit");
        let (status, result) = call(app.clone(), post_json(&uri, submit.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["score"], 1);
        assert_eq!(result["skill_updates"][0]["skill"], "python");

        let (status, body) = call(app, post_json(&uri, submit)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_empty_goals_rejected() {
        let harness = test_state(ScriptedOracle::failing());
        let profile = crate::testing::seed_profile(&harness.store).await;
        let app = build_router(harness.state);

        let (status, body) = call(
            app,
            post_json(
                "/api/v1/applicants/goals/analyze",
                json!({ "user_id": profile.user_id, "goals": [] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
