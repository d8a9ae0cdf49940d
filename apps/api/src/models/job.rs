use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One weighted requirement on a job posting. Weights are non-negative and need
/// not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillWeight {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
    Internship,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "FULL_TIME",
            JobType::PartTime => "PART_TIME",
            JobType::Contract => "CONTRACT",
            JobType::Freelance => "FREELANCE",
            JobType::Internship => "INTERNSHIP",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_TIME" => Ok(JobType::FullTime),
            "PART_TIME" => Ok(JobType::PartTime),
            "CONTRACT" => Ok(JobType::Contract),
            "FREELANCE" => Ok(JobType::Freelance),
            "INTERNSHIP" => Ok(JobType::Internship),
            other => Err(format!("unknown job type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub hirer_id: Uuid,
    pub hirer_name: Option<String>,
    pub title: String,
    pub role: String,
    pub description: Option<String>,
    pub required_skills: Vec<SkillWeight>,
    pub job_type: JobType,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJobPosting {
    pub hirer_id: Uuid,
    pub hirer_name: Option<String>,
    pub title: String,
    pub role: String,
    pub description: Option<String>,
    pub required_skills: Vec<SkillWeight>,
    pub job_type: JobType,
    pub location: Option<String>,
    pub salary: Option<String>,
}

/// Listing filter. `location` is a case-insensitive substring match.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub job_type: Option<JobType>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
    pub hirer_id: Option<Uuid>,
}

impl JobFilter {
    pub fn matches(&self, job: &JobPosting) -> bool {
        if let Some(job_type) = self.job_type {
            if job.job_type != job_type {
                return false;
            }
        }
        if let Some(active) = self.is_active {
            if job.is_active != active {
                return false;
            }
        }
        if let Some(hirer_id) = self.hirer_id {
            if job.hirer_id != hirer_id {
                return false;
            }
        }
        if let Some(needle) = &self.location {
            let needle = needle.to_lowercase();
            let found = job
                .location
                .as_deref()
                .map(|l| l.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !found {
                return false;
            }
        }
        true
    }
}
