use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// IN_PROGRESS → COMPLETED, once. COMPLETED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    InProgress,
    Completed,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::InProgress => "IN_PROGRESS",
            TestStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for TestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(TestStatus::InProgress),
            "COMPLETED" => Ok(TestStatus::Completed),
            other => Err(format!("unknown test status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    /// Case-insensitive; oracle output is not trusted to keep the casing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EASY" => Ok(Difficulty::Easy),
            "MEDIUM" => Ok(Difficulty::Medium),
            "HARD" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillTestQuestion {
    pub id: Uuid,
    pub test_id: Uuid,
    pub skill_name: String,
    pub difficulty: Difficulty,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub user_answer: Option<String>,
    /// `None` until graded, and for questions left unanswered.
    pub is_correct: Option<bool>,
}

/// New confidence for every fact the applicant holds under `skill`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceChange {
    pub skill: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSkillTestQuestion {
    pub skill_name: String,
    pub difficulty: Difficulty,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillTest {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub status: TestStatus,
    pub questions: Vec<SkillTestQuestion>,
    pub result_summary: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Recorded answer for one question at grading time.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question_id: Uuid,
    pub user_answer: Option<String>,
    pub is_correct: Option<bool>,
}
