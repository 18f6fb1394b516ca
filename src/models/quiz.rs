// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    pub title: String,

    pub description: Option<String>,

    /// Allowed duration in minutes. Informational; enforcement is client-side.
    pub duration_minutes: Option<i64>,

    /// Declared question count, used as a fallback when the question bank
    /// for this quiz is empty at participation time.
    pub total_questions: Option<i64>,

    /// Declared total marks. When absent, total marks are derived as
    /// total_questions * marks_per_question.
    pub total_marks: Option<f64>,

    pub marks_per_question: Option<f64>,

    /// Minimum obtained marks to count a reviewed participation as passed.
    /// A quiz without passing marks treats every score as passing.
    pub passing_marks: Option<f64>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 characters."
    ))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = 0))]
    pub total_questions: Option<i64>,
    #[validate(range(min = 0.0))]
    pub total_marks: Option<f64>,
    #[validate(range(min = 0.0))]
    pub marks_per_question: Option<f64>,
    #[validate(range(min = 0.0))]
    pub passing_marks: Option<f64>,
}
