use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicantProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub linked_in_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApplicantProfile {
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub linked_in_url: Option<String>,
}

/// The applicant's current resume. At most one exists per applicant; uploading
/// a new file replaces the previous row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resume {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub filename: String,
    /// Object key in the document archive, when archiving is configured.
    pub storage_key: Option<String>,
    /// Free-form as written on the resume ("9.1/10", "3.8", "85%").
    pub cgpa: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewResume {
    pub applicant_id: Uuid,
    pub filename: String,
    pub storage_key: Option<String>,
    pub cgpa: Option<String>,
}
