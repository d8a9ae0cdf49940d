//! Scoring policy: every hand-tuned constant the engine uses, in one place.
//!
//! Loaded once at startup from an optional JSON file (`SCORING_POLICY_PATH`).
//! Missing fields fall back to the built-in defaults, so a file only needs to
//! carry the entries it overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::skill_test::Difficulty;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub platform: String,
    pub base_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub provider: String,
    pub bonus: f64,
}

/// Substring of a credential title → canonical skill name. Order matters:
/// the first matching keyword wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub skill: String,
}

/// A repository active within `max_days` gets `confidence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencyTier {
    pub max_days: i64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayPolicy {
    /// No decay inside this window.
    pub grace_years: f64,
    /// Linear loss per year past the grace window.
    pub yearly_rate: f64,
    /// Lowest retained-value factor.
    pub floor: f64,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            grace_years: 1.0,
            yearly_rate: 0.1,
            floor: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTable {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
}

impl DifficultyTable {
    pub fn get(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryShape {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl BatteryShape {
    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }
}

/// Adaptive-test constants. Scores here are on the 0–10 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentPolicy {
    pub battery: BatteryShape,
    pub correct_baseline: DifficultyTable,
    pub incorrect_baseline: DifficultyTable,
    /// Per-test, per-skill cap on the summed delta.
    pub max_gain: f64,
    pub max_loss: f64,
}

impl Default for AssessmentPolicy {
    fn default() -> Self {
        Self {
            battery: BatteryShape {
                easy: 7,
                medium: 5,
                hard: 3,
            },
            correct_baseline: DifficultyTable {
                easy: 0.05,
                medium: 0.12,
                hard: 0.25,
            },
            incorrect_baseline: DifficultyTable {
                easy: 0.03,
                medium: 0.07,
                hard: 0.12,
            },
            max_gain: 0.6,
            max_loss: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub platforms: Vec<PlatformEntry>,
    pub default_platform_confidence: f64,
    pub providers: Vec<ProviderEntry>,
    pub keywords: Vec<KeywordEntry>,
    /// Emitted when no keyword matches a credential title.
    pub generic_skill: String,
    /// Ceiling on heuristic (oracle-free) certificate confidence.
    pub fallback_ceiling: f64,
    /// Clamp for oracle-assisted certificate confidence.
    pub ai_floor: f64,
    pub ai_ceiling: f64,
    pub decay: DecayPolicy,
    /// Checked in order; first tier whose `max_days` covers the age wins.
    pub repository_tiers: Vec<RecencyTier>,
    pub repository_floor: f64,
    /// A posting notifies applicants whose score is strictly above this.
    pub job_match_threshold: f64,
    pub assessment: AssessmentPolicy,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        let platforms = [
            ("coursera", 0.85),
            ("udemy", 0.70),
            ("linkedin learning", 0.75),
            ("edx", 0.85),
            ("udacity", 0.80),
            ("pluralsight", 0.75),
        ];
        let providers = [
            ("google", 0.10),
            ("deeplearning.ai", 0.10),
            ("meta", 0.08),
            ("microsoft", 0.10),
            ("aws", 0.10),
            ("ibm", 0.08),
            ("stanford", 0.10),
        ];
        let keywords = [
            ("python", "python"),
            ("javascript", "javascript"),
            ("typescript", "typescript"),
            ("react", "react"),
            ("node", "nodejs"),
            ("machine learning", "machine-learning"),
            ("deep learning", "deep-learning"),
            ("data science", "data-science"),
            ("aws", "aws"),
            ("cloud", "cloud-computing"),
            ("docker", "docker"),
            ("kubernetes", "kubernetes"),
            ("sql", "sql"),
            ("java", "java"),
        ];

        Self {
            platforms: platforms
                .iter()
                .map(|(platform, base)| PlatformEntry {
                    platform: platform.to_string(),
                    base_confidence: *base,
                })
                .collect(),
            default_platform_confidence: 0.65,
            providers: providers
                .iter()
                .map(|(provider, bonus)| ProviderEntry {
                    provider: provider.to_string(),
                    bonus: *bonus,
                })
                .collect(),
            keywords: keywords
                .iter()
                .map(|(keyword, skill)| KeywordEntry {
                    keyword: keyword.to_string(),
                    skill: skill.to_string(),
                })
                .collect(),
            generic_skill: "general-skills".to_string(),
            fallback_ceiling: 0.98,
            ai_floor: 0.1,
            ai_ceiling: 0.99,
            decay: DecayPolicy::default(),
            repository_tiers: vec![
                RecencyTier { max_days: 30, confidence: 0.90 },
                RecencyTier { max_days: 90, confidence: 0.80 },
                RecencyTier { max_days: 180, confidence: 0.70 },
                RecencyTier { max_days: 365, confidence: 0.60 },
            ],
            repository_floor: 0.50,
            job_match_threshold: 0.7,
            assessment: AssessmentPolicy::default(),
        }
    }
}

impl ScoringPolicy {
    /// Reads a JSON policy file, or returns the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scoring policy {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid scoring policy {}", path.display()))
    }

    pub fn platform_confidence(&self, platform: &str) -> f64 {
        let platform = platform.trim();
        self.platforms
            .iter()
            .find(|p| p.platform.eq_ignore_ascii_case(platform))
            .map(|p| p.base_confidence)
            .unwrap_or(self.default_platform_confidence)
    }

    pub fn provider_bonus(&self, provider: &str) -> f64 {
        let provider = provider.trim();
        self.providers
            .iter()
            .find(|p| p.provider.eq_ignore_ascii_case(provider))
            .map(|p| p.bonus)
            .unwrap_or(0.0)
    }

    /// Canonical skill for a credential title, by first matching keyword.
    pub fn keyword_skill(&self, title: &str) -> Option<&str> {
        let title = title.to_lowercase();
        self.keywords
            .iter()
            .find(|k| title.contains(&k.keyword.to_lowercase()))
            .map(|k| k.skill.as_str())
    }

    pub fn repository_confidence(&self, days_since_activity: i64) -> f64 {
        self.repository_tiers
            .iter()
            .find(|tier| days_since_activity <= tier.max_days)
            .map(|tier| tier.confidence)
            .unwrap_or(self.repository_floor)
    }
}
