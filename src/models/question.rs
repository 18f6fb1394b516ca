// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Question kinds the grader understands. Stored as plain text in the
/// database; anything unparseable is treated as not auto-gradable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    MultipleChoice,
    FillInTheBlank,
    Essay,
    TrueFalse,
}

impl QuestionType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "multiple-choice" => Some(Self::MultipleChoice),
            "fill-in-the-blank" => Some(Self::FillInTheBlank),
            "essay" => Some(Self::Essay),
            "true-false" => Some(Self::TrueFalse),
            _ => None,
        }
    }
}

/// One selectable option of a choice-type question.
/// The `is_correct` flag never leaves the server (see `PublicQuestion`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub quiz_id: i64,

    pub question_text: String,

    /// Question type: 'multiple-choice', 'fill-in-the-blank', 'essay' or
    /// 'true-false'. Mapped from the database column 'type' since `type`
    /// is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub question_type: String,

    /// Options with correct-answer flags, stored as a JSON array.
    /// Empty for fill-in-the-blank and essay questions.
    pub options: Json<Vec<QuestionOption>>,

    /// Literal expected answer for fill-in-the-blank questions.
    pub correct_answer: Option<String>,

    /// Marks awarded for a correct answer.
    pub marks: f64,

    /// Penalty subtracted for a wrong (not blank) choice answer.
    /// Stored non-negative; zero means no penalty.
    pub negative_marks: f64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    /// The designated correct option's value, if any option is flagged.
    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .iter()
            .find(|opt| opt.is_correct)
            .map(|opt| opt.text.as_str())
    }
}

/// DTO for sending a question to participants (excludes answer data).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub quiz_id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub marks: f64,
    pub negative_marks: f64,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            quiz_id: q.quiz_id,
            question_type: q.question_type,
            question_text: q.question_text,
            options: q.options.0.into_iter().map(|opt| opt.text).collect(),
            marks: q.marks,
            negative_marks: q.negative_marks,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub quiz_id: i64,
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(length(min = 1, max = 30))]
    pub question_type: String,
    #[serde(default)]
    #[validate(custom(function = validate_options))]
    pub options: Vec<QuestionOption>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: Option<String>,
    #[validate(range(min = 0.5, message = "Marks must be at least 0.5."))]
    pub marks: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Negative marks cannot be negative."))]
    pub negative_marks: f64,
}

fn validate_options(options: &[QuestionOption]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.text.is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.text.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
