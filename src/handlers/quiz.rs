// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{CreateQuizRequest, Quiz},
};

const QUIZ_COLUMNS: &str = "id, title, description, duration_minutes, total_questions, \
    total_marks, marks_per_question, passing_marks, created_at";

pub async fn create_quiz(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO quizzes (title, description, duration_minutes, total_questions, \
         total_marks, marks_per_question, passing_marks) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.duration_minutes)
    .bind(payload.total_questions)
    .bind(payload.total_marks)
    .bind(payload.marks_per_question)
    .bind(payload.passing_marks)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

pub async fn list_quizzes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {QUIZ_COLUMNS} FROM quizzes ORDER BY id DESC");
    let quizzes: Vec<Quiz> = sqlx::query_as(&sql).fetch_all(&pool).await.map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1");
    let quiz = sqlx::query_as::<_, Quiz>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}
