use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;

use crate::models::job::SkillWeight;
use crate::scoring::confidence::round2;

/// Ephemeral result of scoring one skill set against one requirement set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub score: f64,
    /// Required skill names (as written on the job) the applicant holds.
    pub matched_skills: Vec<String>,
    pub total_weight: f64,
    pub matched_weight: f64,
}

/// Lower-cased set of skill names for case-insensitive lookups.
pub fn skill_set<'a, I>(names: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().map(str::to_lowercase).collect()
}

/// `round2(matched_weight / total_weight)`, or 0 when nothing is required.
///
/// Matching is exact on lower-cased names: no fuzzy or synonym matching. The
/// same arithmetic ranks jobs for an applicant and applicants for a job; only
/// the caller decides which side is "required".
pub fn match_score(possessed: &HashSet<String>, required: &[SkillWeight]) -> MatchResult {
    let total_weight: f64 = required.iter().map(|s| s.weight).sum();
    let mut matched_weight = 0.0;
    let mut matched_skills = Vec::new();

    for skill in required {
        if possessed.contains(&skill.name.to_lowercase()) {
            matched_weight += skill.weight;
            matched_skills.push(skill.name.clone());
        }
    }

    let score = if total_weight > 0.0 {
        round2(matched_weight / total_weight)
    } else {
        0.0
    };

    MatchResult {
        score,
        matched_skills,
        total_weight,
        matched_weight,
    }
}

/// Sorts scored items best first. Ties keep their input order.
pub fn sort_by_score_desc<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal));
}
