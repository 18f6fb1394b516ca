// src/models/participation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

use crate::grading::is_attempted;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

/// One graded answer, embedded in the participation's JSON answer array.
/// A participation holds at most one answer per question; resubmission
/// replaces the entry in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,

    /// The raw submitted response. Blank means unattempted.
    pub answer: String,

    pub is_correct: bool,

    /// May be negative for a wrong choice answer under negative marking.
    pub marks_obtained: f64,

    /// References to uploaded attachments (e.g. written-answer photos).
    #[serde(default)]
    pub media: Vec<String>,

    pub answered_at: DateTime<Utc>,
}

/// Represents the 'participations' table in the database.
/// One row per (user, quiz) pair; the answer set is embedded as JSONB.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Participation {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,

    /// Lifecycle status: 'pending', 'completed' or 'failed'.
    pub status: String,

    pub answers: Json<Vec<Answer>>,

    // Derived counters, recomputed from the answer set on every mutation.
    pub attempted_questions: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    pub obtained_marks: f64,

    pub total_marks: f64,
    pub total_questions: i64,

    /// Wall-clock seconds between start and completion.
    pub time_spent: Option<i64>,

    /// 1-based standing within the quiz; unset until the first ranking pass.
    pub rank: Option<i64>,

    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,

    /// Optimistic-concurrency counter, checked and incremented on every
    /// full-document save. Rank writes bypass it.
    pub version: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Derived counters over an answer set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnswerStats {
    pub attempted_questions: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    pub obtained_marks: f64,
}

/// Recomputes the counters from scratch. A blank response counts as
/// unattempted and never as wrong; the marks sum is not clamped and may go
/// negative under negative marking.
pub fn compute_stats(answers: &[Answer]) -> AnswerStats {
    AnswerStats {
        attempted_questions: answers.iter().filter(|a| is_attempted(&a.answer)).count() as i64,
        correct_answers: answers.iter().filter(|a| a.is_correct).count() as i64,
        wrong_answers: answers
            .iter()
            .filter(|a| !a.is_correct && is_attempted(&a.answer))
            .count() as i64,
        obtained_marks: answers.iter().map(|a| a.marks_obtained).sum(),
    }
}

impl Participation {
    /// Replaces the existing answer for the question in place, keeping its
    /// position, or appends a new one.
    pub fn upsert_answer(&mut self, answer: Answer) {
        match self
            .answers
            .iter()
            .position(|a| a.question_id == answer.question_id)
        {
            Some(idx) => self.answers.0[idx] = answer,
            None => self.answers.0.push(answer),
        }
    }

    pub fn recompute_stats(&mut self) {
        let stats = compute_stats(&self.answers);
        self.attempted_questions = stats.attempted_questions;
        self.correct_answers = stats.correct_answers;
        self.wrong_answers = stats.wrong_answers;
        self.obtained_marks = stats.obtained_marks;
    }

    /// Completion transition: stamps end/submission times, computes elapsed
    /// time, and re-derives the final marks total from the answer set.
    pub fn finalize(&mut self, now: DateTime<Utc>) {
        self.status = STATUS_COMPLETED.to_string();
        self.end_time = Some(now);
        self.submitted_at = Some(now);
        self.time_spent = Some((now - self.start_time).num_seconds().max(0));
        self.total_marks = self.answers.iter().map(|a| a.marks_obtained).sum();
    }

    pub fn summary(&self) -> ParticipationSummary {
        ParticipationSummary {
            id: self.id,
            user_id: self.user_id,
            quiz_id: self.quiz_id,
            status: self.status.clone(),
            attempted_questions: self.attempted_questions,
            correct_answers: self.correct_answers,
            wrong_answers: self.wrong_answers,
            obtained_marks: self.obtained_marks,
            total_marks: self.total_marks,
            total_questions: self.total_questions,
            time_spent: self.time_spent,
            rank: self.rank,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Compact snapshot returned alongside per-answer results.
#[derive(Debug, Serialize)]
pub struct ParticipationSummary {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub status: String,
    pub attempted_questions: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub total_questions: i64,
    pub time_spent: Option<i64>,
    pub rank: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// DTO for creating a participation, optionally with a full answer batch.
#[derive(Debug, Deserialize)]
pub struct CreateParticipationRequest {
    pub user: Option<i64>,
    pub quiz: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub answers: Option<Vec<IncomingAnswer>>,
    /// Explicit override for the computed obtained marks.
    pub total_score: Option<f64>,
}

/// One raw answer inside a bulk submission.
#[derive(Debug, Deserialize)]
pub struct IncomingAnswer {
    pub question_id: i64,
    #[serde(default)]
    pub selected_option: Option<String>,
    #[serde(default)]
    pub media: Vec<String>,
}

/// DTO for the duplicate-participation check.
#[derive(Debug, Deserialize)]
pub struct CheckParticipationRequest {
    pub user: Option<i64>,
    pub quiz: Option<i64>,
}

/// DTO for submitting one answer.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub media: Vec<String>,
}

/// DTO for the manual-review update. Both fields are optional; status is
/// recomputed against the quiz's passing marks either way.
#[derive(Debug, Deserialize)]
pub struct UpdateParticipationRequest {
    pub answers: Option<Vec<Answer>>,
    pub obtained_marks: Option<f64>,
}

/// Query filters for listing participations.
#[derive(Debug, Deserialize)]
pub struct ParticipationListParams {
    pub user: Option<i64>,
    pub quiz: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}

/// One leaderboard row, joined with the user's display fields.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub contact: String,
    pub role: String,
    pub status: String,
    pub obtained_marks: f64,
    pub time_spent: i64,
    pub rank: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(question_id: i64, response: &str, is_correct: bool, marks: f64) -> Answer {
        Answer {
            question_id,
            answer: response.to_string(),
            is_correct,
            marks_obtained: marks,
            media: Vec::new(),
            answered_at: Utc::now(),
        }
    }

    fn participation() -> Participation {
        Participation {
            id: 1,
            user_id: 10,
            quiz_id: 20,
            status: STATUS_PENDING.to_string(),
            answers: Json(Vec::new()),
            attempted_questions: 0,
            correct_answers: 0,
            wrong_answers: 0,
            obtained_marks: 0.0,
            total_marks: 0.0,
            total_questions: 0,
            time_spent: None,
            rank: None,
            start_time: Utc::now(),
            end_time: None,
            submitted_at: None,
            version: 0,
            created_at: None,
        }
    }

    #[test]
    fn resubmission_replaces_in_place() {
        let mut p = participation();
        p.upsert_answer(answer(1, "A", false, 0.0));
        p.upsert_answer(answer(2, "B", true, 2.0));
        p.upsert_answer(answer(1, "C", true, 2.0));

        assert_eq!(p.answers.len(), 2);
        // Position of the replaced answer is preserved.
        assert_eq!(p.answers[0].question_id, 1);
        assert_eq!(p.answers[0].answer, "C");
        assert!(p.answers[0].is_correct);
    }

    #[test]
    fn blank_responses_are_unattempted_not_wrong() {
        let stats = compute_stats(&[
            answer(1, "B", true, 2.0),
            answer(2, "", false, 0.0),
            answer(3, "   ", false, 0.0),
            answer(4, "C", false, -0.5),
        ]);

        assert_eq!(stats.attempted_questions, 2);
        assert_eq!(stats.correct_answers, 1);
        assert_eq!(stats.wrong_answers, 1);
        assert_eq!(stats.obtained_marks, 1.5);
    }

    #[test]
    fn obtained_marks_may_go_negative() {
        let stats = compute_stats(&[
            answer(1, "A", false, -0.5),
            answer(2, "B", false, -0.5),
        ]);

        assert_eq!(stats.obtained_marks, -1.0);
        assert_eq!(stats.wrong_answers, 2);
    }

    #[test]
    fn finalize_stamps_times_and_totals() {
        let mut p = participation();
        p.start_time = Utc::now() - chrono::Duration::seconds(90);
        p.upsert_answer(answer(1, "B", true, 2.0));
        p.upsert_answer(answer(2, "C", false, -0.5));
        p.recompute_stats();

        let now = Utc::now();
        p.finalize(now);

        assert_eq!(p.status, STATUS_COMPLETED);
        assert_eq!(p.end_time, Some(now));
        assert_eq!(p.submitted_at, Some(now));
        assert!(p.time_spent.unwrap() >= 90);
        assert_eq!(p.total_marks, 1.5);
    }

    #[test]
    fn finalize_clamps_clock_skew_to_zero() {
        let mut p = participation();
        p.start_time = Utc::now() + chrono::Duration::seconds(60);
        p.finalize(Utc::now());
        assert_eq!(p.time_spent, Some(0));
    }
}
