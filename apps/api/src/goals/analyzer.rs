use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::goals::prompts::{goal_analysis_user, GOAL_ANALYSIS_SYSTEM};
use crate::llm_client::{call_json, prompts::with_json_contract, EvaluationOracle};
use crate::models::applicant::ApplicantProfile;
use crate::store::SkillStore;

const IMPROVE_BELOW: u32 = 70;
const IMPROVE_TARGET: u32 = 85;
const MAX_FALLBACK_IMPROVEMENTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CareerScope {
    Strong,
    Moderate,
    Risky,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalVerdict {
    pub goal_designation: String,
    pub career_scope: CareerScope,
    #[serde(default)]
    pub scope_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillToImprove {
    pub skill_name: String,
    pub current_rating: f64,
    pub target_rating: f64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillToLearn {
    pub skill_name: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeResource {
    pub platform: String,
    pub resource_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidResource {
    pub platform: String,
    pub course_name: String,
    #[serde(default)]
    pub cost_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningRecommendation {
    pub skill_name: String,
    #[serde(default)]
    pub free_resources: Vec<FreeResource>,
    #[serde(default)]
    pub paid_resources: Vec<PaidResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalAnalysis {
    #[serde(default)]
    pub goal_analysis: Vec<GoalVerdict>,
    #[serde(default)]
    pub skills_to_improve: Vec<SkillToImprove>,
    #[serde(default)]
    pub skills_to_learn: Vec<SkillToLearn>,
    #[serde(default)]
    pub learning_recommendations: Vec<LearningRecommendation>,
}

/// Never fails for oracle reasons: an unavailable or unparseable reply
/// degrades to [`fallback_analysis`].
pub async fn analyze_goals(
    store: &dyn SkillStore,
    oracle: &dyn EvaluationOracle,
    profile: &ApplicantProfile,
    goals: Vec<String>,
) -> Result<GoalAnalysis, AppError> {
    let goals: Vec<String> = goals
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();
    if goals.is_empty() {
        return Err(AppError::Validation(
            "Please provide at least one career goal".into(),
        ));
    }

    let ratings: Vec<(String, u32)> = store
        .list_skills(profile.id)
        .await?
        .into_iter()
        .map(|s| (s.name, (s.confidence * 100.0).round().clamp(0.0, 100.0) as u32))
        .collect();

    let system = with_json_contract(GOAL_ANALYSIS_SYSTEM);
    let user = goal_analysis_user(&ratings, &goals);
    match call_json::<GoalAnalysis>(oracle, &system, &user).await {
        Ok(analysis) => {
            info!(
                applicant_id = %profile.id,
                goals = analysis.goal_analysis.len(),
                to_improve = analysis.skills_to_improve.len(),
                to_learn = analysis.skills_to_learn.len(),
                "Goal analysis complete"
            );
            Ok(analysis)
        }
        Err(e) => {
            warn!(applicant_id = %profile.id, "Goal analysis unavailable, using fallback: {e}");
            Ok(fallback_analysis(&goals, &ratings))
        }
    }
}

pub fn fallback_analysis(goals: &[String], ratings: &[(String, u32)]) -> GoalAnalysis {
    GoalAnalysis {
        goal_analysis: goals
            .iter()
            .map(|goal| GoalVerdict {
                goal_designation: goal.clone(),
                career_scope: CareerScope::Moderate,
                scope_reason: "Analysis temporarily unavailable. Please try again later.".into(),
            })
            .collect(),
        skills_to_improve: ratings
            .iter()
            .filter(|(_, rating)| *rating < IMPROVE_BELOW)
            .take(MAX_FALLBACK_IMPROVEMENTS)
            .map(|(name, rating)| SkillToImprove {
                skill_name: name.clone(),
                current_rating: f64::from(*rating),
                target_rating: f64::from(IMPROVE_TARGET),
                reason: "Higher proficiency recommended for competitive roles".into(),
            })
            .collect(),
        skills_to_learn: vec![SkillToLearn {
            skill_name: "communication".into(),
            reason: "Essential for all professional roles".into(),
        }],
        learning_recommendations: Vec::new(),
    }
}
