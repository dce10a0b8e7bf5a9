use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::store::{ExamStore, ProgressFn};
use crate::error::{Error, Result};
use crate::models::attempt::{Answer, Attempt};
use crate::models::content::Content;
use crate::models::exam::Exam;
use crate::models::grade::LetterGrade;
use crate::models::progress::ProgressRecord;
use crate::models::question::{Question, QuestionPayload};
use crate::models::result::ExamResult;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ContentRow {
    id: Uuid,
    student_id: Uuid,
    title: String,
    kind: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for Content {
    type Error = Error;

    fn try_from(row: ContentRow) -> Result<Self> {
        Ok(Content {
            id: row.id,
            student_id: row.student_id,
            title: row.title,
            kind: row.kind.parse()?,
            body: row.body,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ExamRow {
    id: Uuid,
    title: String,
    student_id: Uuid,
    question_type: String,
    difficulty: String,
    num_questions: i32,
    marks_per_question: i32,
    total_marks: i32,
    time_limit: Option<i32>,
    language: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ExamRow> for Exam {
    type Error = Error;

    fn try_from(row: ExamRow) -> Result<Self> {
        Ok(Exam {
            id: row.id,
            title: row.title,
            student_id: row.student_id,
            question_type: row.question_type.parse()?,
            difficulty: row.difficulty.parse()?,
            num_questions: row.num_questions,
            marks_per_question: row.marks_per_question,
            total_marks: row.total_marks,
            time_limit: row.time_limit,
            language: row.language,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    exam_id: Uuid,
    position: i32,
    question_type: String,
    statement: String,
    marks: i32,
    payload: JsonValue,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = Error;

    fn try_from(row: QuestionRow) -> Result<Self> {
        let payload: QuestionPayload = serde_json::from_value(row.payload)?;
        Question::from_parts(
            row.id,
            row.exam_id,
            row.position,
            row.question_type.parse()?,
            row.statement,
            row.marks,
            payload,
            row.created_at,
        )
    }
}

#[derive(FromRow)]
struct ResultRow {
    id: Uuid,
    attempt_id: Uuid,
    student_id: Uuid,
    exam_title: String,
    total_marks: i32,
    obtained_marks: i32,
    percentage: f64,
    grade: String,
    feedback: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_grade(raw: &str) -> Result<LetterGrade> {
    raw.parse().map_err(Error::Internal)
}

impl TryFrom<ResultRow> for ExamResult {
    type Error = Error;

    fn try_from(row: ResultRow) -> Result<Self> {
        Ok(ExamResult {
            id: row.id,
            attempt_id: row.attempt_id,
            student_id: row.student_id,
            exam_title: row.exam_title,
            total_marks: row.total_marks,
            obtained_marks: row.obtained_marks,
            percentage: row.percentage,
            grade: parse_grade(&row.grade)?,
            feedback: row.feedback,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ProgressRow {
    id: Uuid,
    student_id: Uuid,
    recorded_at: DateTime<Utc>,
    last_exam_score: i32,
    total_exams_taken: i32,
    exams_passed: i32,
    exams_failed: i32,
    total_points: i64,
    overall_percentage: f64,
    overall_grade: Option<String>,
}

impl TryFrom<ProgressRow> for ProgressRecord {
    type Error = Error;

    fn try_from(row: ProgressRow) -> Result<Self> {
        Ok(ProgressRecord {
            id: row.id,
            student_id: row.student_id,
            recorded_at: row.recorded_at,
            last_exam_score: row.last_exam_score,
            total_exams_taken: row.total_exams_taken,
            exams_passed: row.exams_passed,
            exams_failed: row.exams_failed,
            total_points: row.total_points,
            overall_percentage: row.overall_percentage,
            overall_grade: row.overall_grade.as_deref().map(parse_grade).transpose()?,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl ExamStore for PgStore {
    async fn create_content(&self, content: &Content) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO contents (id, student_id, title, kind, body, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(content.id)
        .bind(content.student_id)
        .bind(&content.title)
        .bind(content.kind.as_str())
        .bind(&content.body)
        .bind(content.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_content(&self, id: Uuid) -> Result<Content> {
        let row = sqlx::query_as::<_, ContentRow>(r#"SELECT * FROM contents WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("content {} not found", id)))?;
        row.try_into()
    }

    async fn contents_by_ids(&self, student_id: Uuid, ids: &[Uuid]) -> Result<Vec<Content>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            r#"SELECT c.* FROM contents c
               JOIN UNNEST($1::uuid[]) WITH ORDINALITY AS req(id, ord) ON req.id = c.id
               WHERE c.student_id = $2
               ORDER BY req.ord"#,
        )
        .bind(ids)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn create_exam(&self, exam: &Exam, questions: &[Question]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO exams (
                id, title, student_id, question_type, difficulty, num_questions,
                marks_per_question, total_marks, time_limit, language, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(exam.id)
        .bind(&exam.title)
        .bind(exam.student_id)
        .bind(exam.question_type.as_str())
        .bind(exam.difficulty.as_str())
        .bind(exam.num_questions)
        .bind(exam.marks_per_question)
        .bind(exam.total_marks)
        .bind(exam.time_limit)
        .bind(&exam.language)
        .bind(exam.created_at)
        .execute(&mut *tx)
        .await?;

        for question in questions {
            sqlx::query(
                r#"INSERT INTO questions (
                    id, exam_id, position, question_type, statement, marks, payload, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
            )
            .bind(question.id)
            .bind(question.exam_id)
            .bind(question.position)
            .bind(question.question_type.as_str())
            .bind(&question.statement)
            .bind(question.marks)
            .bind(serde_json::to_value(&question.payload)?)
            .bind(question.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_exam(&self, id: Uuid) -> Result<Exam> {
        let row = sqlx::query_as::<_, ExamRow>(r#"SELECT * FROM exams WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("exam {} not found", id)))?;
        row.try_into()
    }

    async fn list_exams(&self, student_id: Uuid) -> Result<Vec<Exam>> {
        let rows = sqlx::query_as::<_, ExamRow>(
            r#"SELECT * FROM exams WHERE student_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn list_questions(&self, exam_id: Uuid) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"SELECT * FROM questions WHERE exam_id = $1 ORDER BY position"#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn find_or_create_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Attempt> {
        let exists: bool = sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM exams WHERE id = $1)"#)
            .bind(exam_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(Error::NotFound(format!("exam {} not found", exam_id)));
        }

        let fresh = Attempt::new(exam_id, student_id);
        sqlx::query(
            r#"INSERT INTO attempts (id, exam_id, student_id, completed, submitted_at, created_at)
               VALUES ($1, $2, $3, FALSE, NULL, $4)
               ON CONFLICT (exam_id, student_id) DO NOTHING"#,
        )
        .bind(fresh.id)
        .bind(exam_id)
        .bind(student_id)
        .bind(fresh.created_at)
        .execute(&self.pool)
        .await?;

        let attempt = sqlx::query_as::<_, Attempt>(
            r#"SELECT * FROM attempts WHERE exam_id = $1 AND student_id = $2"#,
        )
        .bind(exam_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn find_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Option<Attempt>> {
        let attempt = sqlx::query_as::<_, Attempt>(
            r#"SELECT * FROM attempts WHERE exam_id = $1 AND student_id = $2"#,
        )
        .bind(exam_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn get_attempt(&self, id: Uuid) -> Result<Attempt> {
        sqlx::query_as::<_, Attempt>(r#"SELECT * FROM attempts WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("attempt {} not found", id)))
    }

    async fn insert_answers(&self, attempt_id: Uuid, answers: &[Answer]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let completed: Option<bool> =
            sqlx::query_scalar(r#"SELECT completed FROM attempts WHERE id = $1 FOR UPDATE"#)
                .bind(attempt_id)
                .fetch_optional(&mut *tx)
                .await?;
        match completed {
            None => return Err(Error::NotFound(format!("attempt {} not found", attempt_id))),
            Some(true) => {
                return Err(Error::Conflict(format!(
                    "attempt {} is already completed",
                    attempt_id
                )))
            }
            Some(false) => {}
        }

        for answer in answers {
            let inserted = sqlx::query(
                r#"INSERT INTO answers (id, attempt_id, question_id, response, created_at)
                   VALUES ($1, $2, $3, $4, $5)
                   ON CONFLICT (attempt_id, question_id) DO NOTHING"#,
            )
            .bind(answer.id)
            .bind(attempt_id)
            .bind(answer.question_id)
            .bind(&answer.response)
            .bind(answer.created_at)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                return Err(Error::Conflict(format!(
                    "question {} has already been answered",
                    answer.question_id
                )));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<Answer>> {
        let answers = sqlx::query_as::<_, Answer>(
            r#"SELECT * FROM answers WHERE attempt_id = $1 ORDER BY created_at"#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn complete_attempt(&self, attempt_id: Uuid, at: DateTime<Utc>) -> Result<Attempt> {
        let updated = sqlx::query_as::<_, Attempt>(
            r#"UPDATE attempts SET completed = TRUE, submitted_at = $2
               WHERE id = $1 AND completed = FALSE
               RETURNING *"#,
        )
        .bind(attempt_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(attempt) => Ok(attempt),
            None => {
                self.get_attempt(attempt_id).await?;
                Err(Error::Conflict(format!(
                    "attempt {} is already completed",
                    attempt_id
                )))
            }
        }
    }

    async fn record_result(
        &self,
        result: &ExamResult,
        progress: ProgressFn<'_>,
    ) -> Result<ProgressRecord> {
        let mut tx = self.pool.begin().await?;

        // Serializes snapshot derivation per student.
        sqlx::query(r#"SELECT pg_advisory_xact_lock(hashtext($1::text))"#)
            .bind(result.student_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"INSERT INTO results (
                id, attempt_id, student_id, exam_title, total_marks, obtained_marks,
                percentage, grade, feedback, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(result.id)
        .bind(result.attempt_id)
        .bind(result.student_id)
        .bind(&result.exam_title)
        .bind(result.total_marks)
        .bind(result.obtained_marks)
        .bind(result.percentage)
        .bind(result.grade.as_str())
        .bind(&result.feedback)
        .bind(result.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| match Error::from(err) {
            Error::Conflict(_) => Error::Conflict(format!(
                "a result already exists for attempt {}",
                result.attempt_id
            )),
            other => other,
        })?;

        let prior: Option<ProgressRecord> = sqlx::query_as::<_, ProgressRow>(
            r#"SELECT * FROM progress_records WHERE student_id = $1
               ORDER BY recorded_at DESC LIMIT 1"#,
        )
        .bind(result.student_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(ProgressRecord::try_from)
        .transpose()?;

        let history_rows = sqlx::query_as::<_, ResultRow>(
            r#"SELECT * FROM results WHERE student_id = $1 ORDER BY created_at, id"#,
        )
        .bind(result.student_id)
        .fetch_all(&mut *tx)
        .await?;
        let history: Vec<ExamResult> = convert_all(history_rows)?;

        let record = progress(prior.as_ref(), &history);

        sqlx::query(
            r#"INSERT INTO progress_records (
                id, student_id, recorded_at, last_exam_score, total_exams_taken, exams_passed,
                exams_failed, total_points, overall_percentage, overall_grade
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(record.id)
        .bind(record.student_id)
        .bind(record.recorded_at)
        .bind(record.last_exam_score)
        .bind(record.total_exams_taken)
        .bind(record.exams_passed)
        .bind(record.exams_failed)
        .bind(record.total_points)
        .bind(record.overall_percentage)
        .bind(record.overall_grade.map(|g| g.as_str()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn get_result(&self, id: Uuid) -> Result<ExamResult> {
        let row = sqlx::query_as::<_, ResultRow>(r#"SELECT * FROM results WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("result {} not found", id)))?;
        row.try_into()
    }

    async fn find_result_for_attempt(&self, attempt_id: Uuid) -> Result<Option<ExamResult>> {
        sqlx::query_as::<_, ResultRow>(r#"SELECT * FROM results WHERE attempt_id = $1"#)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?
            .map(ExamResult::try_from)
            .transpose()
    }

    async fn list_results(&self, student_id: Uuid) -> Result<Vec<ExamResult>> {
        let rows = sqlx::query_as::<_, ResultRow>(
            r#"SELECT * FROM results WHERE student_id = $1 ORDER BY created_at, id"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn latest_progress(&self, student_id: Uuid) -> Result<Option<ProgressRecord>> {
        sqlx::query_as::<_, ProgressRow>(
            r#"SELECT * FROM progress_records WHERE student_id = $1
               ORDER BY recorded_at DESC LIMIT 1"#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?
        .map(ProgressRecord::try_from)
        .transpose()
    }

    async fn list_progress(&self, student_id: Uuid) -> Result<Vec<ProgressRecord>> {
        let rows = sqlx::query_as::<_, ProgressRow>(
            r#"SELECT * FROM progress_records WHERE student_id = $1 ORDER BY recorded_at"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }
}
