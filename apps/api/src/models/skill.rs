use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a skill fact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkillSource {
    /// Deterministic platform/provider heuristic (oracle unavailable).
    Certificate,
    CertificateAi,
    Repository,
    Resume,
}

impl SkillSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillSource::Certificate => "certificate",
            SkillSource::CertificateAi => "certificate-ai",
            SkillSource::Repository => "repository",
            SkillSource::Resume => "resume",
        }
    }
}

impl fmt::Display for SkillSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "certificate" => Ok(SkillSource::Certificate),
            "certificate-ai" => Ok(SkillSource::CertificateAi),
            "repository" => Ok(SkillSource::Repository),
            "resume" => Ok(SkillSource::Resume),
            other => Err(format!("unknown skill source '{other}'")),
        }
    }
}

/// A single derived skill attributed to one applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillFact {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub name: String,
    pub source: SkillSource,
    pub confidence: f64,
    pub credential_id: Option<Uuid>,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSkillFact {
    pub applicant_id: Uuid,
    pub name: String,
    pub source: SkillSource,
    pub confidence: f64,
    pub credential_id: Option<Uuid>,
}

/// Lower-cases a raw skill label and joins whitespace runs with hyphens:
/// "Machine  Learning" → "machine-learning".
pub fn normalize_skill_name(raw: &str) -> String {
    let joined = raw
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if joined.is_empty() {
        "unknown-skill".to_string()
    } else {
        joined
    }
}
