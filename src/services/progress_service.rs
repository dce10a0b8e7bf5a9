use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::ExamStore;
use crate::error::Result;
use crate::models::progress::ProgressRecord;
use crate::models::result::ExamResult;
use crate::services::grade_scale::grade_for;

/// Folds `latest` into the student's running totals.
///
/// Counters advance from `prior`. The overall percentage and grade are
/// recomputed from `history`, which must hold every result of the student
/// (including `latest`); results with nothing to score are ignored there.
pub fn record_progress(
    student_id: Uuid,
    latest: &ExamResult,
    prior: Option<&ProgressRecord>,
    history: &[ExamResult],
) -> ProgressRecord {
    let failed = latest.grade.is_failing();
    let (taken, passed, failed_count, points) = prior
        .map(|p| {
            (
                p.total_exams_taken,
                p.exams_passed,
                p.exams_failed,
                p.total_points,
            )
        })
        .unwrap_or_default();

    let (obtained, possible) = history
        .iter()
        .filter(|r| r.total_marks > 0)
        .fold((0i64, 0i64), |(o, p), r| {
            (o + i64::from(r.obtained_marks), p + i64::from(r.total_marks))
        });
    let (overall_percentage, overall_grade) = if possible > 0 {
        let pct = obtained as f64 / possible as f64 * 100.0;
        (pct, Some(grade_for(pct)))
    } else {
        (0.0, None)
    };

    ProgressRecord {
        id: Uuid::new_v4(),
        student_id,
        recorded_at: Utc::now(),
        last_exam_score: latest.obtained_marks,
        total_exams_taken: taken + 1,
        exams_passed: passed + i32::from(!failed),
        exams_failed: failed_count + i32::from(failed),
        total_points: points + i64::from(latest.obtained_marks),
        overall_percentage,
        overall_grade,
    }
}

#[derive(Clone)]
pub struct ProgressService {
    store: Arc<dyn ExamStore>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    pub async fn latest(&self, student_id: Uuid) -> Result<Option<ProgressRecord>> {
        self.store.latest_progress(student_id).await
    }

    pub async fn history(&self, student_id: Uuid) -> Result<Vec<ProgressRecord>> {
        self.store.list_progress(student_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grade::LetterGrade;

    fn result(student_id: Uuid, obtained: i32, total: i32) -> ExamResult {
        let percentage = if total > 0 {
            f64::from(obtained) / f64::from(total) * 100.0
        } else {
            0.0
        };
        ExamResult {
            id: Uuid::new_v4(),
            attempt_id: Uuid::new_v4(),
            student_id,
            exam_title: "Quiz".into(),
            total_marks: total,
            obtained_marks: obtained,
            percentage,
            grade: grade_for(percentage),
            feedback: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_result_starts_history() {
        let student = Uuid::new_v4();
        let latest = result(student, 8, 10);
        let record = record_progress(student, &latest, None, std::slice::from_ref(&latest));

        assert_eq!(record.total_exams_taken, 1);
        assert_eq!(record.total_points, 8);
        assert_eq!(record.overall_percentage, 80.0);
        assert_eq!(record.overall_grade, Some(LetterGrade::AMinus));
        assert_eq!(record.exams_passed, 1);
        assert_eq!(record.exams_failed, 0);
        assert_eq!(record.last_exam_score, 8);
    }

    #[test]
    fn failing_result_advances_failed_counter_and_overall_is_recomputed() {
        let student = Uuid::new_v4();
        let first = result(student, 8, 10);
        let prior = record_progress(student, &first, None, std::slice::from_ref(&first));

        let second = result(student, 2, 30);
        assert_eq!(second.grade, LetterGrade::F);
        let history = vec![first, second.clone()];
        let record = record_progress(student, &second, Some(&prior), &history);

        assert_eq!(record.total_exams_taken, 2);
        assert_eq!(record.exams_passed, 1);
        assert_eq!(record.exams_failed, 1);
        assert_eq!(record.total_points, 10);
        assert_eq!(record.overall_percentage, 25.0);
        assert_eq!(record.overall_grade, Some(LetterGrade::F));
        assert_ne!(record.id, prior.id);
    }

    #[test]
    fn incomplete_counts_as_failed() {
        let student = Uuid::new_v4();
        let mut latest = result(student, 0, 10);
        latest.grade = LetterGrade::Incomplete;
        let record = record_progress(student, &latest, None, std::slice::from_ref(&latest));
        assert_eq!(record.exams_failed, 1);
        assert_eq!(record.exams_passed, 0);
    }

    #[test]
    fn results_without_marks_are_left_out_of_the_overall() {
        let student = Uuid::new_v4();
        let empty = result(student, 0, 0);
        let record = record_progress(student, &empty, None, std::slice::from_ref(&empty));
        assert_eq!(record.overall_percentage, 0.0);
        assert_eq!(record.overall_grade, None);
        assert_eq!(record.total_exams_taken, 1);
    }
}
