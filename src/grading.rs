// src/grading.rs

use crate::models::question::{Question, QuestionType};

/// Result of grading one raw response against one question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeOutcome {
    pub is_correct: bool,
    pub marks_obtained: f64,
}

impl GradeOutcome {
    fn unattempted() -> Self {
        GradeOutcome {
            is_correct: false,
            marks_obtained: 0.0,
        }
    }
}

/// A blank or whitespace-only response counts as unattempted, which is
/// distinct from wrong: it earns no marks and no penalty.
pub fn is_attempted(response: &str) -> bool {
    !response.trim().is_empty()
}

/// Grades a raw response. Pure: identical inputs yield identical outcomes.
///
/// * Choice types (multiple-choice, true-false) match the flagged option by
///   value. Wrong answers are penalized with the question's negative marks.
/// * Fill-in-the-blank compares trimmed, case-insensitive.
/// * Essays are never auto-graded; manual review adjusts marks later.
pub fn grade(question: &Question, response: &str) -> GradeOutcome {
    if !is_attempted(response) {
        return GradeOutcome::unattempted();
    }

    match QuestionType::parse(&question.question_type) {
        Some(QuestionType::MultipleChoice) | Some(QuestionType::TrueFalse) => {
            let is_correct = question
                .correct_option()
                .is_some_and(|correct| correct == response.trim());
            let marks_obtained = if is_correct {
                question.marks
            } else {
                -question.negative_marks
            };
            GradeOutcome {
                is_correct,
                marks_obtained,
            }
        }
        Some(QuestionType::FillInTheBlank) => {
            let is_correct = question
                .correct_answer
                .as_deref()
                .is_some_and(|expected| {
                    expected.trim().to_lowercase() == response.trim().to_lowercase()
                });
            GradeOutcome {
                is_correct,
                marks_obtained: if is_correct { question.marks } else { 0.0 },
            }
        }
        // Essays and unknown types fall through to manual review.
        Some(QuestionType::Essay) | None => GradeOutcome {
            is_correct: false,
            marks_obtained: 0.0,
        },
    }
}
