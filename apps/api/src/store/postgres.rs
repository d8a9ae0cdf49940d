use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::applicant::{ApplicantProfile, NewApplicantProfile, NewResume, Resume};
use crate::models::credential::{Certificate, NewCertificate, NewRepository, Repository};
use crate::models::job::{JobFilter, JobPosting, NewJobPosting, SkillWeight};
use crate::models::notification::{NewNotification, Notification};
use crate::models::skill::{NewSkillFact, SkillFact, SkillSource};
use crate::models::skill_test::{
    AnswerRecord, ConfidenceChange, NewSkillTestQuestion, SkillTest, SkillTestQuestion,
    TestStatus,
};
use crate::store::{ApplicantSkills, SkillStore, StoreError, StoreResult};

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn parse_column<T>(raw: &str) -> StoreResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(StoreError::Corrupt)
}

// ---------------------------------------------------------------------------
// Row types. Enum columns are stored as TEXT and parsed on the way out.
// ---------------------------------------------------------------------------

#[derive(FromRow)]
struct SkillFactRow {
    id: Uuid,
    applicant_id: Uuid,
    name: String,
    source: String,
    confidence: f64,
    credential_id: Option<Uuid>,
    last_tested_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SkillFactRow> for SkillFact {
    type Error = StoreError;

    fn try_from(row: SkillFactRow) -> StoreResult<Self> {
        Ok(SkillFact {
            id: row.id,
            applicant_id: row.applicant_id,
            name: row.name,
            source: parse_column(&row.source)?,
            confidence: row.confidence,
            credential_id: row.credential_id,
            last_tested_at: row.last_tested_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct JobPostingRow {
    id: Uuid,
    hirer_id: Uuid,
    hirer_name: Option<String>,
    title: String,
    role: String,
    description: Option<String>,
    required_skills: Json<Vec<SkillWeight>>,
    job_type: String,
    location: Option<String>,
    salary: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobPostingRow> for JobPosting {
    type Error = StoreError;

    fn try_from(row: JobPostingRow) -> StoreResult<Self> {
        Ok(JobPosting {
            id: row.id,
            hirer_id: row.hirer_id,
            hirer_name: row.hirer_name,
            title: row.title,
            role: row.role,
            description: row.description,
            required_skills: row.required_skills.0,
            job_type: parse_column(&row.job_type)?,
            location: row.location,
            salary: row.salary,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    title: String,
    message: String,
    metadata: Value,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> StoreResult<Self> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind: parse_column(&row.kind)?,
            title: row.title,
            message: row.message,
            metadata: row.metadata,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct SkillTestRow {
    id: Uuid,
    applicant_id: Uuid,
    status: String,
    result_summary: Option<Value>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    test_id: Uuid,
    skill_name: String,
    difficulty: String,
    question_text: String,
    options: Vec<String>,
    correct_answer: String,
    user_answer: Option<String>,
    is_correct: Option<bool>,
}

impl TryFrom<QuestionRow> for SkillTestQuestion {
    type Error = StoreError;

    fn try_from(row: QuestionRow) -> StoreResult<Self> {
        Ok(SkillTestQuestion {
            id: row.id,
            test_id: row.test_id,
            skill_name: row.skill_name,
            difficulty: parse_column(&row.difficulty)?,
            question_text: row.question_text,
            options: row.options,
            correct_answer: row.correct_answer,
            user_answer: row.user_answer,
            is_correct: row.is_correct,
        })
    }
}

/// Makes `%`, `_` and `\` match themselves inside a LIKE pattern.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const SKILL_COLUMNS: &str =
    "id, applicant_id, name, source, confidence, credential_id, last_tested_at, created_at";

#[async_trait]
impl SkillStore for PgStore {
    async fn create_profile(&self, new: NewApplicantProfile) -> StoreResult<ApplicantProfile> {
        Ok(sqlx::query_as::<_, ApplicantProfile>(
            r#"
            INSERT INTO applicant_profiles (id, user_id, bio, linked_in_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.bio)
        .bind(new.linked_in_url)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<ApplicantProfile>> {
        Ok(
            sqlx::query_as::<_, ApplicantProfile>(
                "SELECT * FROM applicant_profiles WHERE user_id = $1",
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    async fn replace_resume(&self, new: NewResume) -> StoreResult<Resume> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM resumes WHERE applicant_id = $1")
            .bind(new.applicant_id)
            .execute(&mut *tx)
            .await?;
        let resume = sqlx::query_as::<_, Resume>(
            r#"
            INSERT INTO resumes (id, applicant_id, filename, storage_key, cgpa)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.applicant_id)
        .bind(new.filename)
        .bind(new.storage_key)
        .bind(new.cgpa)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(resume)
    }

    async fn find_resume(&self, applicant_id: Uuid) -> StoreResult<Option<Resume>> {
        Ok(
            sqlx::query_as::<_, Resume>("SELECT * FROM resumes WHERE applicant_id = $1")
                .bind(applicant_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_resume_cgpa(&self, resume_id: Uuid, cgpa: &str) -> StoreResult<Resume> {
        Ok(sqlx::query_as::<_, Resume>(
            "UPDATE resumes SET cgpa = $2 WHERE id = $1 RETURNING *",
        )
        .bind(resume_id)
        .bind(cgpa)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn create_certificate(&self, new: NewCertificate) -> StoreResult<Certificate> {
        Ok(sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (id, applicant_id, name, company_name, platform, completed_on)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.applicant_id)
        .bind(new.name)
        .bind(new.company_name)
        .bind(new.platform)
        .bind(new.completed_on)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_certificate(
        &self,
        applicant_id: Uuid,
        certificate_id: Uuid,
    ) -> StoreResult<Option<Certificate>> {
        Ok(sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE id = $1 AND applicant_id = $2",
        )
        .bind(certificate_id)
        .bind(applicant_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_certificate(&self, certificate: &Certificate) -> StoreResult<Certificate> {
        Ok(sqlx::query_as::<_, Certificate>(
            r#"
            UPDATE certificates
            SET name = $2, company_name = $3, platform = $4, completed_on = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(certificate.id)
        .bind(&certificate.name)
        .bind(&certificate.company_name)
        .bind(&certificate.platform)
        .bind(certificate.completed_on)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_certificates(&self, applicant_id: Uuid) -> StoreResult<Vec<Certificate>> {
        Ok(sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE applicant_id = $1 ORDER BY created_at ASC",
        )
        .bind(applicant_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn upsert_repository(&self, new: NewRepository) -> StoreResult<Repository> {
        Ok(sqlx::query_as::<_, Repository>(
            r#"
            INSERT INTO repositories (id, applicant_id, name, url, primary_language, last_activity)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (applicant_id, name) DO UPDATE
            SET url = EXCLUDED.url,
                primary_language = EXCLUDED.primary_language,
                last_activity = EXCLUDED.last_activity,
                fetched_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.applicant_id)
        .bind(new.name)
        .bind(new.url)
        .bind(new.primary_language)
        .bind(new.last_activity)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_repositories(&self, applicant_id: Uuid) -> StoreResult<Vec<Repository>> {
        Ok(sqlx::query_as::<_, Repository>(
            "SELECT * FROM repositories WHERE applicant_id = $1 ORDER BY last_activity DESC",
        )
        .bind(applicant_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_repositories(&self, applicant_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM repositories WHERE applicant_id = $1")
            .bind(applicant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_skills(&self, applicant_id: Uuid) -> StoreResult<Vec<SkillFact>> {
        let rows = sqlx::query_as::<_, SkillFactRow>(&format!(
            "SELECT {SKILL_COLUMNS} FROM skill_facts WHERE applicant_id = $1 ORDER BY created_at ASC"
        ))
        .bind(applicant_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn replace_credential_skills(
        &self,
        credential_id: Uuid,
        facts: Vec<NewSkillFact>,
    ) -> StoreResult<Vec<SkillFact>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM skill_facts WHERE credential_id = $1")
            .bind(credential_id)
            .execute(&mut *tx)
            .await?;

        let mut created = Vec::with_capacity(facts.len());
        for fact in facts {
            let row = sqlx::query_as::<_, SkillFactRow>(&format!(
                r#"
                INSERT INTO skill_facts (id, applicant_id, name, source, confidence, credential_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {SKILL_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4())
            .bind(fact.applicant_id)
            .bind(fact.name)
            .bind(fact.source.as_str())
            .bind(fact.confidence)
            .bind(credential_id)
            .fetch_one(&mut *tx)
            .await?;
            created.push(SkillFact::try_from(row)?);
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn find_skill(
        &self,
        applicant_id: Uuid,
        name: &str,
        source: SkillSource,
    ) -> StoreResult<Option<SkillFact>> {
        let row = sqlx::query_as::<_, SkillFactRow>(&format!(
            "SELECT {SKILL_COLUMNS} FROM skill_facts WHERE applicant_id = $1 AND name = $2 AND source = $3 LIMIT 1"
        ))
        .bind(applicant_id)
        .bind(name)
        .bind(source.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(SkillFact::try_from).transpose()
    }

    async fn create_skill(&self, new: NewSkillFact) -> StoreResult<SkillFact> {
        let row = sqlx::query_as::<_, SkillFactRow>(&format!(
            r#"
            INSERT INTO skill_facts (id, applicant_id, name, source, confidence, credential_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SKILL_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.applicant_id)
        .bind(new.name)
        .bind(new.source.as_str())
        .bind(new.confidence)
        .bind(new.credential_id)
        .fetch_one(&self.pool)
        .await?;
        SkillFact::try_from(row)
    }

    async fn list_applicant_skills(
        &self,
        any_of: Option<&[String]>,
    ) -> StoreResult<Vec<ApplicantSkills>> {
        let profiles = match any_of {
            Some(names) => {
                let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
                sqlx::query_as::<_, ApplicantProfile>(
                    r#"
                    SELECT p.* FROM applicant_profiles p
                    WHERE EXISTS (
                        SELECT 1 FROM skill_facts s
                        WHERE s.applicant_id = p.id AND LOWER(s.name) = ANY($1)
                    )
                    "#,
                )
                .bind(lowered)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ApplicantProfile>("SELECT * FROM applicant_profiles")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let ids: Vec<Uuid> = profiles.iter().map(|p| p.id).collect();
        let rows = sqlx::query_as::<_, SkillFactRow>(&format!(
            "SELECT {SKILL_COLUMNS} FROM skill_facts WHERE applicant_id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let facts: Vec<SkillFact> = convert_all(rows)?;

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let skills = facts
                    .iter()
                    .filter(|f| f.applicant_id == profile.id)
                    .cloned()
                    .collect();
                ApplicantSkills { profile, skills }
            })
            .collect())
    }

    async fn create_job(&self, new: NewJobPosting) -> StoreResult<JobPosting> {
        let row = sqlx::query_as::<_, JobPostingRow>(
            r#"
            INSERT INTO job_postings
                (id, hirer_id, hirer_name, title, role, description,
                 required_skills, job_type, location, salary)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.hirer_id)
        .bind(new.hirer_name)
        .bind(new.title)
        .bind(new.role)
        .bind(new.description)
        .bind(Json(new.required_skills))
        .bind(new.job_type.as_str())
        .bind(new.location)
        .bind(new.salary)
        .fetch_one(&self.pool)
        .await?;
        JobPosting::try_from(row)
    }

    async fn find_job(&self, job_id: Uuid) -> StoreResult<Option<JobPosting>> {
        let row = sqlx::query_as::<_, JobPostingRow>("SELECT * FROM job_postings WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(JobPosting::try_from).transpose()
    }

    async fn update_job(&self, job: &JobPosting) -> StoreResult<JobPosting> {
        let row = sqlx::query_as::<_, JobPostingRow>(
            r#"
            UPDATE job_postings
            SET hirer_name = $2, title = $3, role = $4, description = $5,
                required_skills = $6, job_type = $7, location = $8, salary = $9,
                is_active = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(&job.hirer_name)
        .bind(&job.title)
        .bind(&job.role)
        .bind(&job.description)
        .bind(Json(&job.required_skills))
        .bind(job.job_type.as_str())
        .bind(&job.location)
        .bind(&job.salary)
        .bind(job.is_active)
        .fetch_one(&self.pool)
        .await?;
        JobPosting::try_from(row)
    }

    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<JobPosting>> {
        let rows = sqlx::query_as::<_, JobPostingRow>(
            r#"
            SELECT * FROM job_postings
            WHERE ($1::TEXT IS NULL OR job_type = $1)
              AND ($2::TEXT IS NULL OR location ILIKE '%' || $2 || '%' ESCAPE '\')
              AND ($3::BOOLEAN IS NULL OR is_active = $3)
              AND ($4::UUID IS NULL OR hirer_id = $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.job_type.map(|t| t.as_str()))
        .bind(filter.location.as_deref().map(escape_like))
        .bind(filter.is_active)
        .bind(filter.hirer_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn create_test(
        &self,
        applicant_id: Uuid,
        questions: Vec<NewSkillTestQuestion>,
    ) -> StoreResult<SkillTest> {
        let mut tx = self.pool.begin().await?;
        let test = sqlx::query_as::<_, SkillTestRow>(
            r#"
            INSERT INTO skill_tests (id, applicant_id, status)
            VALUES ($1, $2, $3)
            RETURNING id, applicant_id, status, result_summary, created_at, completed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(applicant_id)
        .bind(TestStatus::InProgress.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut stored = Vec::with_capacity(questions.len());
        for (position, q) in questions.into_iter().enumerate() {
            let row = sqlx::query_as::<_, QuestionRow>(
                r#"
                INSERT INTO skill_test_questions
                    (id, test_id, position, skill_name, difficulty, question_text,
                     options, correct_answer)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id, test_id, skill_name, difficulty, question_text,
                          options, correct_answer, user_answer, is_correct
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(test.id)
            .bind(position as i32)
            .bind(q.skill_name)
            .bind(q.difficulty.as_str())
            .bind(q.question_text)
            .bind(q.options)
            .bind(q.correct_answer)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(SkillTestQuestion::try_from(row)?);
        }
        tx.commit().await?;

        Ok(SkillTest {
            id: test.id,
            applicant_id: test.applicant_id,
            status: parse_column(&test.status)?,
            questions: stored,
            result_summary: test.result_summary,
            created_at: test.created_at,
            completed_at: test.completed_at,
        })
    }

    async fn find_test(&self, test_id: Uuid) -> StoreResult<Option<SkillTest>> {
        let Some(test) = sqlx::query_as::<_, SkillTestRow>(
            r#"
            SELECT id, applicant_id, status, result_summary, created_at, completed_at
            FROM skill_tests WHERE id = $1
            "#,
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, test_id, skill_name, difficulty, question_text,
                   options, correct_answer, user_answer, is_correct
            FROM skill_test_questions WHERE test_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(SkillTest {
            id: test.id,
            applicant_id: test.applicant_id,
            status: parse_column(&test.status)?,
            questions: convert_all(rows)?,
            result_summary: test.result_summary,
            created_at: test.created_at,
            completed_at: test.completed_at,
        }))
    }

    async fn complete_test(
        &self,
        test_id: Uuid,
        answers: &[AnswerRecord],
        confidences: &[ConfidenceChange],
        summary: Value,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let owner: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE skill_tests
            SET status = $4, result_summary = $2, completed_at = $3
            WHERE id = $1 AND status = $5
            RETURNING applicant_id
            "#,
        )
        .bind(test_id)
        .bind(summary)
        .bind(completed_at)
        .bind(TestStatus::Completed.as_str())
        .bind(TestStatus::InProgress.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(applicant_id) = owner else {
            tx.rollback().await?;
            return Ok(false);
        };

        for answer in answers {
            sqlx::query(
                r#"
                UPDATE skill_test_questions SET user_answer = $3, is_correct = $4
                WHERE id = $1 AND test_id = $2
                "#,
            )
            .bind(answer.question_id)
            .bind(test_id)
            .bind(&answer.user_answer)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }
        for change in confidences {
            sqlx::query(
                r#"
                UPDATE skill_facts SET confidence = $3, last_tested_at = $4
                WHERE applicant_id = $1 AND name = $2
                "#,
            )
            .bind(applicant_id)
            .bind(&change.skill)
            .bind(change.confidence)
            .bind(completed_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn create_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, message, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.kind.as_str())
        .bind(new.title)
        .bind(new.message)
        .bind(new.metadata)
        .fetch_one(&self.pool)
        .await?;
        Notification::try_from(row)
    }

    async fn list_notifications(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(notification_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
