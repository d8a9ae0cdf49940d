use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::applicant::{ApplicantProfile, NewApplicantProfile, NewResume, Resume};
use crate::models::credential::{Certificate, NewCertificate, NewRepository, Repository};
use crate::models::job::{JobFilter, JobPosting, NewJobPosting};
use crate::models::notification::{NewNotification, Notification};
use crate::models::skill::{NewSkillFact, SkillFact, SkillSource};
use crate::models::skill_test::{
    AnswerRecord, ConfidenceChange, NewSkillTestQuestion, SkillTest, SkillTestQuestion,
    TestStatus,
};
use crate::store::{ApplicantSkills, SkillStore, StoreError, StoreResult};

#[derive(Default)]
struct Arena {
    profiles: Vec<ApplicantProfile>,
    resumes: Vec<Resume>,
    certificates: Vec<Certificate>,
    repositories: Vec<Repository>,
    skills: Vec<SkillFact>,
    jobs: Vec<JobPosting>,
    tests: HashMap<Uuid, SkillTest>,
    notifications: Vec<Notification>,
}

/// In-process store. A single write lock covers each operation, so every
/// replace-set is atomic with respect to readers.
#[derive(Default)]
pub struct MemoryStore {
    arena: RwLock<Arena>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn materialize(new: NewSkillFact, now: DateTime<Utc>) -> SkillFact {
    SkillFact {
        id: Uuid::new_v4(),
        applicant_id: new.applicant_id,
        name: new.name,
        source: new.source,
        confidence: new.confidence,
        credential_id: new.credential_id,
        last_tested_at: None,
        created_at: now,
    }
}

#[async_trait]
impl SkillStore for MemoryStore {
    async fn create_profile(&self, new: NewApplicantProfile) -> StoreResult<ApplicantProfile> {
        let profile = ApplicantProfile {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            bio: new.bio,
            linked_in_url: new.linked_in_url,
            created_at: Utc::now(),
        };
        self.arena.write().await.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<ApplicantProfile>> {
        let arena = self.arena.read().await;
        Ok(arena.profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn replace_resume(&self, new: NewResume) -> StoreResult<Resume> {
        let resume = Resume {
            id: Uuid::new_v4(),
            applicant_id: new.applicant_id,
            filename: new.filename,
            storage_key: new.storage_key,
            cgpa: new.cgpa,
            created_at: Utc::now(),
        };
        let mut arena = self.arena.write().await;
        arena.resumes.retain(|r| r.applicant_id != resume.applicant_id);
        arena.resumes.push(resume.clone());
        Ok(resume)
    }

    async fn find_resume(&self, applicant_id: Uuid) -> StoreResult<Option<Resume>> {
        let arena = self.arena.read().await;
        Ok(arena.resumes.iter().find(|r| r.applicant_id == applicant_id).cloned())
    }

    async fn update_resume_cgpa(&self, resume_id: Uuid, cgpa: &str) -> StoreResult<Resume> {
        let mut arena = self.arena.write().await;
        let resume = arena
            .resumes
            .iter_mut()
            .find(|r| r.id == resume_id)
            .ok_or_else(|| StoreError::Corrupt(format!("resume {resume_id} vanished")))?;
        resume.cgpa = Some(cgpa.to_string());
        Ok(resume.clone())
    }

    async fn create_certificate(&self, new: NewCertificate) -> StoreResult<Certificate> {
        let certificate = Certificate {
            id: Uuid::new_v4(),
            applicant_id: new.applicant_id,
            name: new.name,
            company_name: new.company_name,
            platform: new.platform,
            completed_on: new.completed_on,
            created_at: Utc::now(),
        };
        self.arena.write().await.certificates.push(certificate.clone());
        Ok(certificate)
    }

    async fn find_certificate(
        &self,
        applicant_id: Uuid,
        certificate_id: Uuid,
    ) -> StoreResult<Option<Certificate>> {
        let arena = self.arena.read().await;
        Ok(arena
            .certificates
            .iter()
            .find(|c| c.id == certificate_id && c.applicant_id == applicant_id)
            .cloned())
    }

    async fn update_certificate(&self, certificate: &Certificate) -> StoreResult<Certificate> {
        let mut arena = self.arena.write().await;
        let slot = arena
            .certificates
            .iter_mut()
            .find(|c| c.id == certificate.id)
            .ok_or_else(|| StoreError::Corrupt(format!("certificate {} vanished", certificate.id)))?;
        *slot = certificate.clone();
        Ok(slot.clone())
    }

    async fn list_certificates(&self, applicant_id: Uuid) -> StoreResult<Vec<Certificate>> {
        let arena = self.arena.read().await;
        Ok(arena
            .certificates
            .iter()
            .filter(|c| c.applicant_id == applicant_id)
            .cloned()
            .collect())
    }

    async fn upsert_repository(&self, new: NewRepository) -> StoreResult<Repository> {
        let now = Utc::now();
        let mut arena = self.arena.write().await;
        if let Some(existing) = arena
            .repositories
            .iter_mut()
            .find(|r| r.applicant_id == new.applicant_id && r.name == new.name)
        {
            existing.url = new.url;
            existing.primary_language = new.primary_language;
            existing.last_activity = new.last_activity;
            existing.fetched_at = now;
            return Ok(existing.clone());
        }
        let repository = Repository {
            id: Uuid::new_v4(),
            applicant_id: new.applicant_id,
            name: new.name,
            url: new.url,
            primary_language: new.primary_language,
            last_activity: new.last_activity,
            fetched_at: now,
        };
        arena.repositories.push(repository.clone());
        Ok(repository)
    }

    async fn list_repositories(&self, applicant_id: Uuid) -> StoreResult<Vec<Repository>> {
        let arena = self.arena.read().await;
        Ok(arena
            .repositories
            .iter()
            .filter(|r| r.applicant_id == applicant_id)
            .cloned()
            .collect())
    }

    async fn delete_repositories(&self, applicant_id: Uuid) -> StoreResult<u64> {
        let mut arena = self.arena.write().await;
        let before = arena.repositories.len();
        arena.repositories.retain(|r| r.applicant_id != applicant_id);
        Ok((before - arena.repositories.len()) as u64)
    }

    async fn list_skills(&self, applicant_id: Uuid) -> StoreResult<Vec<SkillFact>> {
        let arena = self.arena.read().await;
        Ok(arena
            .skills
            .iter()
            .filter(|s| s.applicant_id == applicant_id)
            .cloned()
            .collect())
    }

    async fn replace_credential_skills(
        &self,
        credential_id: Uuid,
        facts: Vec<NewSkillFact>,
    ) -> StoreResult<Vec<SkillFact>> {
        let now = Utc::now();
        let mut arena = self.arena.write().await;
        arena.skills.retain(|s| s.credential_id != Some(credential_id));
        let created: Vec<SkillFact> = facts
            .into_iter()
            .map(|new| {
                materialize(
                    NewSkillFact {
                        credential_id: Some(credential_id),
                        ..new
                    },
                    now,
                )
            })
            .collect();
        arena.skills.extend(created.iter().cloned());
        Ok(created)
    }

    async fn find_skill(
        &self,
        applicant_id: Uuid,
        name: &str,
        source: SkillSource,
    ) -> StoreResult<Option<SkillFact>> {
        let arena = self.arena.read().await;
        Ok(arena
            .skills
            .iter()
            .find(|s| s.applicant_id == applicant_id && s.name == name && s.source == source)
            .cloned())
    }

    async fn create_skill(&self, new: NewSkillFact) -> StoreResult<SkillFact> {
        let fact = materialize(new, Utc::now());
        self.arena.write().await.skills.push(fact.clone());
        Ok(fact)
    }

    async fn list_applicant_skills(
        &self,
        any_of: Option<&[String]>,
    ) -> StoreResult<Vec<ApplicantSkills>> {
        let arena = self.arena.read().await;
        let result = arena
            .profiles
            .iter()
            .map(|profile| ApplicantSkills {
                profile: profile.clone(),
                skills: arena
                    .skills
                    .iter()
                    .filter(|s| s.applicant_id == profile.id)
                    .cloned()
                    .collect(),
            })
            .filter(|entry| match any_of {
                Some(names) => entry
                    .skills
                    .iter()
                    .any(|s| names.iter().any(|n| n.eq_ignore_ascii_case(&s.name))),
                None => true,
            })
            .collect();
        Ok(result)
    }

    async fn create_job(&self, new: NewJobPosting) -> StoreResult<JobPosting> {
        let job = JobPosting {
            id: Uuid::new_v4(),
            hirer_id: new.hirer_id,
            hirer_name: new.hirer_name,
            title: new.title,
            role: new.role,
            description: new.description,
            required_skills: new.required_skills,
            job_type: new.job_type,
            location: new.location,
            salary: new.salary,
            is_active: true,
            created_at: Utc::now(),
        };
        self.arena.write().await.jobs.push(job.clone());
        Ok(job)
    }

    async fn find_job(&self, job_id: Uuid) -> StoreResult<Option<JobPosting>> {
        let arena = self.arena.read().await;
        Ok(arena.jobs.iter().find(|j| j.id == job_id).cloned())
    }

    async fn update_job(&self, job: &JobPosting) -> StoreResult<JobPosting> {
        let mut arena = self.arena.write().await;
        let slot = arena
            .jobs
            .iter_mut()
            .find(|j| j.id == job.id)
            .ok_or_else(|| StoreError::Corrupt(format!("job {} vanished", job.id)))?;
        *slot = job.clone();
        Ok(slot.clone())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<JobPosting>> {
        let arena = self.arena.read().await;
        let mut jobs: Vec<JobPosting> = arena
            .jobs
            .iter()
            .filter(|j| filter.matches(j))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn create_test(
        &self,
        applicant_id: Uuid,
        questions: Vec<NewSkillTestQuestion>,
    ) -> StoreResult<SkillTest> {
        let test_id = Uuid::new_v4();
        let test = SkillTest {
            id: test_id,
            applicant_id,
            status: TestStatus::InProgress,
            questions: questions
                .into_iter()
                .map(|q| SkillTestQuestion {
                    id: Uuid::new_v4(),
                    test_id,
                    skill_name: q.skill_name,
                    difficulty: q.difficulty,
                    question_text: q.question_text,
                    options: q.options,
                    correct_answer: q.correct_answer,
                    user_answer: None,
                    is_correct: None,
                })
                .collect(),
            result_summary: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.arena.write().await.tests.insert(test_id, test.clone());
        Ok(test)
    }

    async fn find_test(&self, test_id: Uuid) -> StoreResult<Option<SkillTest>> {
        Ok(self.arena.read().await.tests.get(&test_id).cloned())
    }

    async fn complete_test(
        &self,
        test_id: Uuid,
        answers: &[AnswerRecord],
        confidences: &[ConfidenceChange],
        summary: Value,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut guard = self.arena.write().await;
        let arena = &mut *guard;
        let Some(test) = arena.tests.get_mut(&test_id) else {
            return Ok(false);
        };
        if test.status != TestStatus::InProgress {
            return Ok(false);
        }
        for answer in answers {
            if let Some(q) = test.questions.iter_mut().find(|q| q.id == answer.question_id) {
                q.user_answer = answer.user_answer.clone();
                q.is_correct = answer.is_correct;
            }
        }
        test.status = TestStatus::Completed;
        test.result_summary = Some(summary);
        test.completed_at = Some(completed_at);

        let applicant_id = test.applicant_id;
        for change in confidences {
            for fact in arena
                .skills
                .iter_mut()
                .filter(|s| s.applicant_id == applicant_id && s.name == change.skill)
            {
                fact.confidence = change.confidence;
                fact.last_tested_at = Some(completed_at);
            }
        }
        Ok(true)
    }

    async fn create_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            metadata: new.metadata,
            is_read: false,
            created_at: Utc::now(),
        };
        self.arena.write().await.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Notification>> {
        let arena = self.arena.read().await;
        // Insertion order is creation order; newest first.
        Ok(arena
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> StoreResult<bool> {
        let mut arena = self.arena.write().await;
        match arena
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
        {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
