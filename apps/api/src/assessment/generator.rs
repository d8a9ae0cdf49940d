use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::assessment::prompts::{battery_system, BATTERY_USER};
use crate::errors::AppError;
use crate::llm_client::{call_json, prompts::with_json_contract, EvaluationOracle};
use crate::models::applicant::ApplicantProfile;
use crate::models::skill_test::{Difficulty, NewSkillTestQuestion, SkillTest};
use crate::scoring::policy::BatteryShape;
use crate::store::SkillStore;

const OPTION_COUNT: usize = 4;

#[derive(Debug, Deserialize)]
struct GeneratedBattery {
    #[serde(default)]
    questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    #[serde(default)]
    skill: String,
    #[serde(default)]
    difficulty: String,
    #[serde(default)]
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answer: String,
}

/// Client view of a generated test. Correct answers are never included.
#[derive(Debug, Serialize)]
pub struct TestView {
    pub test_id: Uuid,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub skill: String,
    pub difficulty: Difficulty,
    pub question: String,
    pub options: Vec<String>,
}

impl From<&SkillTest> for TestView {
    fn from(test: &SkillTest) -> Self {
        TestView {
            test_id: test.id,
            questions: test
                .questions
                .iter()
                .map(|q| QuestionView {
                    id: q.id,
                    skill: q.skill_name.clone(),
                    difficulty: q.difficulty,
                    question: q.question_text.clone(),
                    options: q.options.clone(),
                })
                .collect(),
        }
    }
}

/// Builds and stores a new IN_PROGRESS test for the applicant.
pub async fn generate_test(
    store: &dyn SkillStore,
    oracle: &dyn EvaluationOracle,
    shape: &BatteryShape,
    profile: &ApplicantProfile,
) -> Result<SkillTest, AppError> {
    let facts = store.list_skills(profile.id).await?;
    let mut skills: Vec<String> = Vec::new();
    for fact in facts {
        if !skills.contains(&fact.name) {
            skills.push(fact.name);
        }
    }
    if skills.is_empty() {
        return Err(AppError::Validation("No skills found to test".into()));
    }

    let system = with_json_contract(&battery_system(&skills, shape));
    let questions = match call_json::<GeneratedBattery>(oracle, &system, BATTERY_USER).await {
        Ok(battery) => {
            let mut valid = validate_battery(battery, &skills, shape);
            let uncovered: Vec<String> = skills
                .iter()
                .filter(|s| !valid.iter().any(|q| q.skill_name == **s))
                .cloned()
                .collect();
            if !uncovered.is_empty() {
                warn!(
                    applicant_id = %profile.id,
                    uncovered = ?uncovered,
                    "Generated battery misses some skills; adding fallback questions"
                );
                valid.extend(fallback_battery(&uncovered));
            }
            valid
        }
        Err(e) => {
            warn!(applicant_id = %profile.id, "Test generation unavailable, using fallback: {e}");
            fallback_battery(&skills)
        }
    };

    let test = store.create_test(profile.id, questions).await?;
    info!(test_id = %test.id, questions = test.questions.len(), "Skill test created");
    Ok(test)
}

/// One EASY placeholder question per skill.
pub fn fallback_battery(skills: &[String]) -> Vec<NewSkillTestQuestion> {
    skills
        .iter()
        .map(|skill| NewSkillTestQuestion {
            skill_name: skill.clone(),
            difficulty: Difficulty::Easy,
            question_text: format!("What is a core concept of {skill}?"),
            options: ["Concept A", "Concept B", "Concept C", "Concept D"]
                .iter()
                .map(|o| o.to_string())
                .collect(),
            correct_answer: "Concept A".to_string(),
        })
        .collect()
}

/// Keeps questions that are well-formed and about one of `skills`. Skill
/// names are mapped back onto the applicant's spelling.
fn validate_battery(
    battery: GeneratedBattery,
    skills: &[String],
    shape: &BatteryShape,
) -> Vec<NewSkillTestQuestion> {
    let received = battery.questions.len();
    let valid: Vec<NewSkillTestQuestion> = battery
        .questions
        .into_iter()
        .filter_map(|q| {
            let skill = skills
                .iter()
                .find(|s| s.eq_ignore_ascii_case(q.skill.trim()))?;
            let difficulty: Difficulty = q.difficulty.parse().ok()?;
            let answer_listed = q.options.iter().any(|o| *o == q.correct_answer);
            if q.question.trim().is_empty() || q.options.len() != OPTION_COUNT || !answer_listed {
                return None;
            }
            Some(NewSkillTestQuestion {
                skill_name: skill.clone(),
                difficulty,
                question_text: q.question,
                options: q.options,
                correct_answer: q.correct_answer,
            })
        })
        .take(shape.total())
        .collect();

    if valid.len() != shape.total() {
        warn!(
            received,
            kept = valid.len(),
            expected = shape.total(),
            "Generated battery does not have the expected size"
        );
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::skill::{NewSkillFact, SkillSource};
    use crate::models::skill_test::TestStatus;
    use crate::scoring::policy::AssessmentPolicy;
    use crate::store::MemoryStore;
    use crate::testing::{seed_profile, ScriptedOracle};

    fn shape() -> BatteryShape {
        AssessmentPolicy::default().battery
    }

    async fn with_skills(store: &MemoryStore, names: &[&str]) -> ApplicantProfile {
        let profile = seed_profile(store).await;
        for name in names {
            store
                .create_skill(NewSkillFact {
                    applicant_id: profile.id,
                    name: name.to_string(),
                    source: SkillSource::Certificate,
                    confidence: 0.7,
                    credential_id: None,
                })
                .await
                .unwrap();
        }
        profile
    }

    fn question(skill: &str, difficulty: &str, answer: &str) -> String {
        format!(
            r#"{{"skill": "{skill}", "difficulty": "{difficulty}", "question": "Q about {skill}?",
                "options": ["a", "b", "c", "d"], "correct_answer": "{answer}"}}"#
        )
    }

    #[tokio::test]
    async fn test_no_skills_is_validation_error() {
        let store = MemoryStore::new();
        let profile = seed_profile(&store).await;
        let err = generate_test(&store, &ScriptedOracle::failing(), &shape(), &profile)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_oracle_failure_uses_fallback_battery() {
        let store = MemoryStore::new();
        // Same name from two sources is tested once.
        let profile = with_skills(&store, &["python", "sql", "python"]).await;

        let test = generate_test(&store, &ScriptedOracle::failing(), &shape(), &profile)
            .await
            .unwrap();

        assert_eq!(test.status, TestStatus::InProgress);
        assert_eq!(test.questions.len(), 2);
        assert_eq!(test.questions[0].question_text, "What is a core concept of python?");
        assert_eq!(test.questions[0].correct_answer, "Concept A");
        assert!(test.questions.iter().all(|q| q.difficulty == Difficulty::Easy));
    }

    #[tokio::test]
    async fn test_invalid_questions_are_dropped() {
        let store = MemoryStore::new();
        let profile = with_skills(&store, &["python"]).await;
        let reply = format!(
            r#"{{"questions": [{}, {}, {}]}}"#,
            question("Python", "medium", "b"),
            question("python", "easy", "not-an-option"),
            question("haskell", "hard", "a"),
        );

        let test = generate_test(&store, &ScriptedOracle::replying(reply), &shape(), &profile)
            .await
            .unwrap();

        assert_eq!(test.questions.len(), 1);
        assert_eq!(test.questions[0].skill_name, "python");
        assert_eq!(test.questions[0].difficulty, Difficulty::Medium);
    }

    #[tokio::test]
    async fn test_every_skill_gets_at_least_one_question() {
        let store = MemoryStore::new();
        let profile = with_skills(&store, &["python", "sql"]).await;
        let python_only: Vec<String> = (0..15).map(|_| question("python", "medium", "a")).collect();
        let reply = format!(r#"{{"questions": [{}]}}"#, python_only.join(", "));

        let test = generate_test(&store, &ScriptedOracle::replying(reply), &shape(), &profile)
            .await
            .unwrap();

        assert_eq!(test.questions.len(), 16);
        let sql: Vec<_> = test.questions.iter().filter(|q| q.skill_name == "sql").collect();
        assert_eq!(sql.len(), 1);
        assert_eq!(sql[0].difficulty, Difficulty::Easy);
        assert_eq!(sql[0].question_text, "What is a core concept of sql?");
    }

    #[tokio::test]
    async fn test_view_hides_correct_answers() {
        let store = MemoryStore::new();
        let profile = with_skills(&store, &["go"]).await;
        let test = generate_test(&store, &ScriptedOracle::failing(), &shape(), &profile)
            .await
            .unwrap();

        let json = serde_json::to_value(TestView::from(&test)).unwrap();
        assert!(json["questions"][0].get("correct_answer").is_none());
        assert_eq!(json["questions"][0]["skill"], "go");
    }
}
