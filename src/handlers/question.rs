// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as Jsonb};
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, PublicQuestion, Question, QuestionType},
};

const QUESTION_COLUMNS: &str =
    "id, quiz_id, question_text, type, options, correct_answer, marks, negative_marks, created_at";

/// Creates a question for a quiz.
pub async fn create_question(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question_type = QuestionType::parse(&payload.question_type).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Unknown question type '{}'",
            payload.question_type
        ))
    })?;

    match question_type {
        QuestionType::MultipleChoice | QuestionType::TrueFalse => {
            if !payload.options.iter().any(|opt| opt.is_correct) {
                return Err(AppError::BadRequest(
                    "Choice questions need an option flagged as correct".to_string(),
                ));
            }
        }
        QuestionType::FillInTheBlank => {
            if payload.correct_answer.is_none() {
                return Err(AppError::BadRequest(
                    "Fill-in-the-blank questions need a correct answer".to_string(),
                ));
            }
        }
        QuestionType::Essay => {}
    }

    let quiz_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1")
        .bind(payload.quiz_id)
        .fetch_optional(&pool)
        .await?;
    if quiz_exists.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO questions (quiz_id, question_text, type, options, correct_answer, marks, \
         negative_marks) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(payload.quiz_id)
    .bind(&payload.question_text)
    .bind(&payload.question_type)
    .bind(Jsonb(&payload.options))
    .bind(&payload.correct_answer)
    .bind(payload.marks)
    .bind(payload.negative_marks)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Lists a quiz's questions in the participant-facing shape, without the
/// answer key.
pub async fn list_questions_by_quiz(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = $1 ORDER BY id");
    let questions: Vec<Question> = sqlx::query_as(&sql)
        .bind(quiz_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let public: Vec<PublicQuestion> = questions.into_iter().map(PublicQuestion::from).collect();
    Ok(Json(public))
}

/// Fetches one question including the answer key. Meant for grading and
/// admin tooling, not for participants.
pub async fn get_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");
    let question = sqlx::query_as::<_, Question>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Question deleted" })))
}
