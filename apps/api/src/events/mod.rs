//! Domain events and the sink they are emitted through.
//!
//! The engine never delivers notifications itself. Components receive an
//! `Arc<dyn EventSink>` and emit fire-and-forget events; the production sink is
//! [`NotificationDispatcher`], which persists each event as a notification row.

pub mod dispatcher;
pub mod handlers;

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::models::notification::{NewNotification, NotificationKind};
use crate::models::skill::SkillSource;

pub use dispatcher::NotificationDispatcher;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillDerived {
    pub user_id: Uuid,
    pub skill_name: String,
    pub source: SkillSource,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobMatch {
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub match_score: f64,
    pub hirer_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileComplete {
    pub user_id: Uuid,
    pub profile_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DomainEvent {
    SkillDerived(SkillDerived),
    JobMatch(JobMatch),
    ProfileComplete(ProfileComplete),
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::SkillDerived(_) => "skillDerived",
            DomainEvent::JobMatch(_) => "jobMatch",
            DomainEvent::ProfileComplete(_) => "profileComplete",
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            DomainEvent::SkillDerived(e) => e.user_id,
            DomainEvent::JobMatch(e) => e.user_id,
            DomainEvent::ProfileComplete(e) => e.user_id,
        }
    }

    /// Renders the user-facing notification for this event.
    pub fn to_notification(&self) -> NewNotification {
        match self {
            DomainEvent::SkillDerived(e) => NewNotification {
                user_id: e.user_id,
                kind: NotificationKind::SkillDerived,
                title: "New Skill Derived!".to_string(),
                message: format!(
                    "Skill \"{}\" derived from {} with {}% confidence",
                    e.skill_name,
                    e.source,
                    percent(e.confidence)
                ),
                metadata: json!({
                    "skill": e.skill_name,
                    "source": e.source,
                    "confidence": e.confidence,
                }),
            },
            DomainEvent::JobMatch(e) => NewNotification {
                user_id: e.user_id,
                kind: NotificationKind::JobMatch,
                title: "New Job Match Found!".to_string(),
                message: format!(
                    "You matched {}% with \"{}\" at {}",
                    percent(e.match_score),
                    e.job_title,
                    e.hirer_name
                ),
                metadata: json!({
                    "job_id": e.job_id,
                    "match_score": e.match_score,
                }),
            },
            DomainEvent::ProfileComplete(e) => NewNotification {
                user_id: e.user_id,
                kind: NotificationKind::ProfileComplete,
                title: "Profile Complete!".to_string(),
                message: "Your applicant profile is now complete. You can now receive job recommendations."
                    .to_string(),
                metadata: json!({ "profile_id": e.profile_id }),
            },
        }
    }
}

fn percent(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Receives domain events. Emission never fails from the caller's point of view.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_derived_notification_rounds_percent() {
        let user_id = Uuid::new_v4();
        let event = DomainEvent::SkillDerived(SkillDerived {
            user_id,
            skill_name: "python".to_string(),
            source: SkillSource::CertificateAi,
            confidence: 0.666,
        });

        let n = event.to_notification();
        assert_eq!(n.user_id, user_id);
        assert_eq!(n.kind, NotificationKind::SkillDerived);
        assert_eq!(
            n.message,
            "Skill \"python\" derived from certificate-ai with 67% confidence"
        );
        assert_eq!(n.metadata["source"], "certificate-ai");
    }

    #[test]
    fn test_job_match_notification_carries_job_metadata() {
        let job_id = Uuid::new_v4();
        let event = DomainEvent::JobMatch(JobMatch {
            user_id: Uuid::new_v4(),
            job_id,
            job_title: "Backend Engineer".to_string(),
            match_score: 0.75,
            hirer_name: "Acme".to_string(),
        });

        let n = event.to_notification();
        assert_eq!(n.kind, NotificationKind::JobMatch);
        assert!(n.message.contains("75%"));
        assert_eq!(n.metadata["job_id"], job_id.to_string());
        assert_eq!(event.name(), "jobMatch");
    }
}
