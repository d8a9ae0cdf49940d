use chrono::{DateTime, NaiveDate, Utc};

use crate::scoring::policy::{DecayPolicy, ScoringPolicy};

const DAYS_PER_YEAR: f64 = 365.0;

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Course final score on a 0–100 scale:
/// `(R × A) × (ΣSᵢ / (n × 10))`, rounded to 2 dp. No skills ⇒ 0.
///
/// A course strong on depth and application but teaching few or weak skills is
/// pulled down by the skill factor.
pub fn course_final_score(overall_r: f64, application_a: f64, skill_ratings: &[f64]) -> f64 {
    let n = skill_ratings.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = skill_ratings.iter().sum();
    let skill_factor = sum / (n as f64 * 10.0);
    round2(overall_r * application_a * skill_factor)
}

/// Maps a 0–100 final score onto a confidence, capped at 0.99.
pub fn score_to_confidence(final_score: f64) -> f64 {
    (final_score / 100.0).clamp(0.0, 0.99)
}

/// Arithmetic mean of the course-level confidence and the individual skill
/// rating (0–10) when one is present and positive.
pub fn blend_skill_confidence(course_confidence: f64, skill_rating: Option<f64>) -> f64 {
    match skill_rating {
        Some(rating) if rating > 0.0 => (course_confidence + rating / 10.0) / 2.0,
        _ => course_confidence,
    }
}

/// Retained-value factor for a credential completed on `completed_on`.
/// Exactly 1.0 inside the grace window, then linear loss down to the floor.
pub fn decay_factor(completed_on: Option<NaiveDate>, now: DateTime<Utc>, policy: &DecayPolicy) -> f64 {
    let Some(completed_on) = completed_on else {
        return 1.0;
    };
    let age_days = (now.date_naive() - completed_on).num_days() as f64;
    let years = age_days / DAYS_PER_YEAR;
    if years <= policy.grace_years {
        return 1.0;
    }
    (1.0 - (years - policy.grace_years) * policy.yearly_rate).max(policy.floor)
}

/// Final confidence for one oracle-rated skill of a certificate.
pub fn certificate_skill_confidence(
    course_confidence: f64,
    skill_rating: Option<f64>,
    decay: f64,
    policy: &ScoringPolicy,
) -> f64 {
    let blended = blend_skill_confidence(course_confidence, skill_rating);
    (blended * decay).clamp(policy.ai_floor, policy.ai_ceiling)
}

/// Heuristic used when the oracle is unavailable: platform base plus provider
/// bonus, capped by the fallback ceiling, with the skill name taken from the
/// first title keyword (or the generic skill). Always yields exactly one skill.
pub fn fallback_certificate_skill(
    title: &str,
    platform: &str,
    provider: &str,
    policy: &ScoringPolicy,
) -> (String, f64) {
    let confidence = (policy.platform_confidence(platform) + policy.provider_bonus(provider))
        .min(policy.fallback_ceiling);
    let skill = policy
        .keyword_skill(title)
        .unwrap_or(policy.generic_skill.as_str())
        .to_string();
    (skill, confidence)
}

/// Whole days elapsed since `last_activity`, never negative.
pub fn days_since(last_activity: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last_activity).num_days().max(0)
}
