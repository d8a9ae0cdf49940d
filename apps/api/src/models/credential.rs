use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Certificate {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub name: String,
    pub company_name: String,
    pub platform: String,
    pub completed_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub applicant_id: Uuid,
    pub name: String,
    pub company_name: String,
    pub platform: String,
    pub completed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Repository {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub name: String,
    pub url: String,
    pub primary_language: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
}

/// Upserted by (applicant_id, name).
#[derive(Debug, Clone)]
pub struct NewRepository {
    pub applicant_id: Uuid,
    pub name: String,
    pub url: String,
    pub primary_language: Option<String>,
    pub last_activity: DateTime<Utc>,
}

/// Evidence an applicant supplies. Each credential owns the skill facts derived from it.
#[derive(Debug, Clone)]
pub enum Credential {
    Certificate(Certificate),
    Repository(Repository),
}

impl Credential {
    pub fn id(&self) -> Uuid {
        match self {
            Credential::Certificate(c) => c.id,
            Credential::Repository(r) => r.id,
        }
    }
}
