use serde::Deserialize;

const RATING_RANGE: std::ops::RangeInclusive<f64> = 0.0..=10.0;

/// Course evaluation as returned by the oracle. Echoed identity fields
/// (`course_name`, `platform`, `provider`, `n`) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseEvaluation {
    #[serde(rename = "overall_rating_R")]
    pub overall_rating: f64,
    #[serde(rename = "real_life_application_A")]
    pub real_life_application: f64,
    #[serde(default)]
    pub skills: Vec<RatedSkill>,
    #[serde(default)]
    pub evaluation_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatedSkill {
    #[serde(default)]
    pub skill_name: String,
    #[serde(rename = "skill_rating_Si", default)]
    pub skill_rating: Option<f64>,
}

impl CourseEvaluation {
    /// An evaluation is usable only when it names at least one skill and every
    /// rating it carries lies on the 0–10 scale. Anything else is treated like
    /// an oracle failure.
    pub fn is_trustworthy(&self) -> bool {
        let in_range = |v: f64| v.is_finite() && RATING_RANGE.contains(&v);
        !self.skills.is_empty()
            && in_range(self.overall_rating)
            && in_range(self.real_life_application)
            && self
                .skills
                .iter()
                .all(|s| s.skill_rating.map_or(true, in_range))
    }

    pub fn skill_ratings(&self) -> Vec<f64> {
        self.skills
            .iter()
            .map(|s| s.skill_rating.unwrap_or(0.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::parse_json_reply;

    #[test]
    fn test_parses_renamed_fields() {
        let raw = r#"Sure! {"course_name": "ML", "overall_rating_R": 8, "real_life_application_A": 7.5,
            "skills": [{"skill_name": "Python", "skill_rating_Si": 9}], "n": 1}"#;
        let eval: CourseEvaluation = parse_json_reply(raw).unwrap();
        assert_eq!(eval.overall_rating, 8.0);
        assert_eq!(eval.real_life_application, 7.5);
        assert_eq!(eval.skills[0].skill_rating, Some(9.0));
        assert!(eval.is_trustworthy());
    }

    #[test]
    fn test_out_of_range_rating_is_untrustworthy() {
        let raw = r#"{"overall_rating_R": 80, "real_life_application_A": 7,
            "skills": [{"skill_name": "Python", "skill_rating_Si": 9}]}"#;
        let eval: CourseEvaluation = parse_json_reply(raw).unwrap();
        assert!(!eval.is_trustworthy());
    }

    #[test]
    fn test_empty_skill_list_is_untrustworthy() {
        let raw = r#"{"overall_rating_R": 8, "real_life_application_A": 7, "skills": []}"#;
        let eval: CourseEvaluation = parse_json_reply(raw).unwrap();
        assert!(!eval.is_trustworthy());
    }

    #[test]
    fn test_missing_skill_rating_counts_as_zero() {
        let raw = r#"{"overall_rating_R": 8, "real_life_application_A": 7,
            "skills": [{"skill_name": "SQL"}, {"skill_name": "Go", "skill_rating_Si": 6}]}"#;
        let eval: CourseEvaluation = parse_json_reply(raw).unwrap();
        assert!(eval.is_trustworthy());
        assert_eq!(eval.skill_ratings(), vec![0.0, 6.0]);
    }
}
