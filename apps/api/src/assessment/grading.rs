use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::applicant::ApplicantProfile;
use crate::models::skill::SkillFact;
use crate::models::skill_test::{AnswerRecord, ConfidenceChange, SkillTestQuestion, TestStatus};
use crate::scoring::confidence::round2;
use crate::scoring::policy::AssessmentPolicy;
use crate::store::SkillStore;

const SCALE: f64 = 10.0;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub answer: String,
}

/// Per-skill outcome of one test, scores on the 0–10 scale rounded to 2 dp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillUpdate {
    pub skill: String,
    pub prev_score: f64,
    pub new_score: f64,
    pub delta: f64,
    #[serde(skip)]
    pub new_confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub test_id: Uuid,
    pub score: usize,
    pub total: usize,
    pub skill_updates: Vec<SkillUpdate>,
}

#[derive(Debug)]
pub struct Grading {
    pub answers: Vec<AnswerRecord>,
    pub correct: usize,
    pub updates: Vec<SkillUpdate>,
}

/// Grades `questions` against `answers` (keyed by question id).
///
/// Every delta is computed against the skill's score before the test: the
/// mean confidence of all facts with that name, times ten. Deltas are summed
/// per skill, capped, and the result is clamped to [0, 10].
pub fn grade(
    questions: &[SkillTestQuestion],
    answers: &HashMap<Uuid, String>,
    facts: &[SkillFact],
    policy: &AssessmentPolicy,
) -> Grading {
    let mut records = Vec::with_capacity(questions.len());
    let mut correct = 0;
    // Insertion order of skills is kept for a stable report.
    let mut accumulated: Vec<(String, f64, f64)> = Vec::new();

    for question in questions {
        let Some(answer) = answers.get(&question.id) else {
            records.push(AnswerRecord {
                question_id: question.id,
                user_answer: None,
                is_correct: None,
            });
            continue;
        };
        let is_correct = *answer == question.correct_answer;
        if is_correct {
            correct += 1;
        }
        records.push(AnswerRecord {
            question_id: question.id,
            user_answer: Some(answer.clone()),
            is_correct: Some(is_correct),
        });

        let Some(current) = current_score(facts, &question.skill_name) else {
            continue;
        };
        let delta = if is_correct {
            policy.correct_baseline.get(question.difficulty) * (1.0 - current / SCALE)
        } else {
            -policy.incorrect_baseline.get(question.difficulty) * (current / SCALE)
        };
        match accumulated.iter_mut().find(|(name, _, _)| *name == question.skill_name) {
            Some(entry) => entry.2 += delta,
            None => accumulated.push((question.skill_name.clone(), current, delta)),
        }
    }

    let updates = accumulated
        .into_iter()
        .map(|(skill, current, delta)| {
            let capped = delta.clamp(-policy.max_loss, policy.max_gain);
            let new_score = (current + capped).clamp(0.0, SCALE);
            SkillUpdate {
                skill,
                prev_score: round2(current),
                new_score: round2(new_score),
                delta: round2(capped),
                new_confidence: new_score / SCALE,
            }
        })
        .collect();

    Grading {
        answers: records,
        correct,
        updates,
    }
}

fn current_score(facts: &[SkillFact], skill: &str) -> Option<f64> {
    let matching: Vec<f64> = facts
        .iter()
        .filter(|f| f.name == skill)
        .map(|f| f.confidence)
        .collect();
    if matching.is_empty() {
        return None;
    }
    Some(matching.iter().sum::<f64>() / matching.len() as f64 * SCALE)
}

/// Grades a test once and applies the resulting confidence changes.
///
/// The answers, the IN_PROGRESS → COMPLETED transition and the skill writes
/// land in one store operation. A concurrent or repeated submission changes
/// nothing, and a failed write leaves the test open for another attempt.
pub async fn submit_test(
    store: &dyn SkillStore,
    policy: &AssessmentPolicy,
    profile: &ApplicantProfile,
    test_id: Uuid,
    submitted: Vec<SubmittedAnswer>,
) -> Result<TestResult, AppError> {
    let test = store
        .find_test(test_id)
        .await?
        .filter(|t| t.applicant_id == profile.id)
        .ok_or_else(|| AppError::NotFound("Test not found".into()))?;
    if test.status == TestStatus::Completed {
        return Err(AppError::Conflict("Test already completed".into()));
    }

    let answers: HashMap<Uuid, String> = submitted
        .into_iter()
        .map(|a| (a.question_id, a.answer))
        .collect();
    let facts = store.list_skills(profile.id).await?;
    let grading = grade(&test.questions, &answers, &facts, policy);

    let summary = serde_json::to_value(&grading.updates)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("result summary: {e}")))?;
    let confidences: Vec<ConfidenceChange> = grading
        .updates
        .iter()
        .map(|u| ConfidenceChange {
            skill: u.skill.clone(),
            confidence: u.new_confidence,
        })
        .collect();
    if !store
        .complete_test(test_id, &grading.answers, &confidences, summary, Utc::now())
        .await?
    {
        warn!(test_id = %test_id, "Test completed concurrently; discarding submission");
        return Err(AppError::Conflict("Test already completed".into()));
    }

    info!(
        test_id = %test_id,
        correct = grading.correct,
        total = test.questions.len(),
        "Skill test graded"
    );
    Ok(TestResult {
        test_id,
        score: grading.correct,
        total: test.questions.len(),
        skill_updates: grading.updates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::skill::{NewSkillFact, SkillSource};
    use crate::models::skill_test::{Difficulty, NewSkillTestQuestion};
    use crate::store::MemoryStore;
    use crate::testing::{seed_profile, FaultyStore};

    fn fact(name: &str, confidence: f64) -> SkillFact {
        SkillFact {
            id: Uuid::new_v4(),
            applicant_id: Uuid::nil(),
            name: name.to_string(),
            source: SkillSource::Certificate,
            confidence,
            credential_id: None,
            last_tested_at: None,
            created_at: Utc::now(),
        }
    }

    fn question(skill: &str, difficulty: Difficulty) -> SkillTestQuestion {
        SkillTestQuestion {
            id: Uuid::new_v4(),
            test_id: Uuid::nil(),
            skill_name: skill.to_string(),
            difficulty,
            question_text: format!("About {skill}?"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: "a".into(),
            user_answer: None,
            is_correct: None,
        }
    }

    fn answered(pairs: &[(&SkillTestQuestion, &str)]) -> HashMap<Uuid, String> {
        pairs.iter().map(|(q, a)| (q.id, a.to_string())).collect()
    }

    #[test]
    fn test_mixed_answers_accumulate_per_skill() {
        let policy = AssessmentPolicy::default();
        let hard1 = question("python", Difficulty::Hard);
        let hard2 = question("python", Difficulty::Hard);
        let easy = question("python", Difficulty::Easy);
        let questions = vec![hard1.clone(), hard2.clone(), easy.clone()];
        let answers = answered(&[(&hard1, "a"), (&hard2, "a"), (&easy, "b")]);

        let grading = grade(&questions, &answers, &[fact("python", 0.7)], &policy);

        // 2 × 0.25 × 0.3 − 0.03 × 0.7 = 0.129
        assert_eq!(grading.correct, 2);
        assert_eq!(grading.updates.len(), 1);
        let update = &grading.updates[0];
        assert_eq!(update.prev_score, 7.0);
        assert_eq!(update.delta, 0.13);
        assert_eq!(update.new_score, 7.13);
        assert!((update.new_confidence - 0.7129).abs() < 1e-9);
    }

    #[test]
    fn test_one_correct_easy_answer_at_seventy_percent() {
        let policy = AssessmentPolicy::default();
        let q = question("python", Difficulty::Easy);
        let answers = answered(&[(&q, "a")]);

        let grading = grade(&[q], &answers, &[fact("python", 0.70)], &policy);

        // 0.05 × (1 − 0.7) = 0.015 on the 0–10 scale
        let update = &grading.updates[0];
        assert_eq!(update.prev_score, 7.0);
        assert!((update.new_confidence - 0.7015).abs() < 1e-9);
    }

    #[test]
    fn test_mean_of_sources_is_the_baseline() {
        let policy = AssessmentPolicy::default();
        let q = question("sql", Difficulty::Medium);
        let answers = answered(&[(&q, "a")]);
        let facts = [fact("sql", 0.5), fact("sql", 0.9)];

        let grading = grade(&[q], &answers, &facts, &policy);

        // current 7.0: 0.12 × 0.3
        let update = &grading.updates[0];
        assert_eq!(update.prev_score, 7.0);
        assert!((update.new_confidence - 0.7036).abs() < 1e-9);
    }

    #[test]
    fn test_loss_is_capped() {
        let policy = AssessmentPolicy::default();
        let questions: Vec<_> = (0..15).map(|_| question("rust", Difficulty::Hard)).collect();
        let answers: HashMap<_, _> = questions.iter().map(|q| (q.id, "d".to_string())).collect();

        let grading = grade(&questions, &answers, &[fact("rust", 1.0)], &policy);

        assert_eq!(grading.correct, 0);
        assert_eq!(grading.updates[0].delta, -0.4);
        assert!((grading.updates[0].new_confidence - 0.96).abs() < 1e-9);
    }

    #[test]
    fn test_gain_is_capped() {
        let policy = AssessmentPolicy::default();
        let questions: Vec<_> = (0..15).map(|_| question("go", Difficulty::Hard)).collect();
        let answers: HashMap<_, _> = questions.iter().map(|q| (q.id, "a".to_string())).collect();

        let grading = grade(&questions, &answers, &[fact("go", 0.0)], &policy);

        assert_eq!(grading.updates[0].delta, 0.6);
        assert!((grading.updates[0].new_confidence - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_unanswered_and_unknown_skills_are_skipped() {
        let policy = AssessmentPolicy::default();
        let unanswered = question("python", Difficulty::Hard);
        let unknown = question("cobol", Difficulty::Easy);
        let answers = answered(&[(&unknown, "a")]);

        let grading = grade(
            &[unanswered.clone(), unknown],
            &answers,
            &[fact("python", 0.5)],
            &policy,
        );

        assert!(grading.updates.is_empty());
        assert_eq!(grading.correct, 1);
        assert_eq!(grading.answers[0].user_answer, None);
        assert_eq!(grading.answers[0].is_correct, None);
        assert_eq!(grading.answers[1].is_correct, Some(true));
    }

    async fn seeded_test(store: &MemoryStore) -> (ApplicantProfile, crate::models::skill_test::SkillTest) {
        let profile = seed_profile(store).await;
        store
            .create_skill(NewSkillFact {
                applicant_id: profile.id,
                name: "python".into(),
                source: SkillSource::CertificateAi,
                confidence: 0.7,
                credential_id: None,
            })
            .await
            .unwrap();
        let test = store
            .create_test(
                profile.id,
                vec![NewSkillTestQuestion {
                    skill_name: "python".into(),
                    difficulty: Difficulty::Hard,
                    question_text: "GIL?".into(),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer: "a".into(),
                }],
            )
            .await
            .unwrap();
        (profile, test)
    }

    #[tokio::test]
    async fn test_second_submission_is_rejected_and_changes_nothing() {
        let store = MemoryStore::new();
        let policy = AssessmentPolicy::default();
        let (profile, test) = seeded_test(&store).await;
        let answers = vec![SubmittedAnswer {
            question_id: test.questions[0].id,
            answer: "a".into(),
        }];

        let result = submit_test(&store, &policy, &profile, test.id, answers.clone())
            .await
            .unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total, 1);
        let after_first = store.list_skills(profile.id).await.unwrap();
        assert!((after_first[0].confidence - 0.7075).abs() < 1e-9);
        assert!(after_first[0].last_tested_at.is_some());

        let err = submit_test(&store, &policy, &profile, test.id, answers)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let after_second = store.list_skills(profile.id).await.unwrap();
        assert_eq!(after_first[0].confidence, after_second[0].confidence);

        let stored = store.find_test(test.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TestStatus::Completed);
        assert_eq!(stored.questions[0].is_correct, Some(true));
    }

    #[tokio::test]
    async fn test_other_applicants_test_is_not_found() {
        let store = MemoryStore::new();
        let policy = AssessmentPolicy::default();
        let (_, test) = seeded_test(&store).await;
        let stranger = seed_profile(&store).await;

        let err = submit_test(&store, &policy, &stranger, test.id, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_completion_leaves_test_open_and_skills_untouched() {
        let store = FaultyStore::default();
        let policy = AssessmentPolicy::default();
        let (profile, test) = seeded_test(store.inner()).await;
        let answers = vec![SubmittedAnswer {
            question_id: test.questions[0].id,
            answer: "a".into(),
        }];

        store.fail_completion(true);
        let err = submit_test(&store, &policy, &profile, test.id, answers.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        let stored = store.find_test(test.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TestStatus::InProgress);
        let skills = store.list_skills(profile.id).await.unwrap();
        assert_eq!(skills[0].confidence, 0.7);
        assert!(skills[0].last_tested_at.is_none());

        store.fail_completion(false);
        let result = submit_test(&store, &policy, &profile, test.id, answers)
            .await
            .unwrap();
        assert_eq!(result.score, 1);
        let skills = store.list_skills(profile.id).await.unwrap();
        assert!((skills[0].confidence - 0.7075).abs() < 1e-9);
    }
}
