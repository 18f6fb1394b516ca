// src/handlers/participation.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as Jsonb};

use crate::{
    config::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT},
    error::AppError,
    grading,
    models::{
        participation::{
            Answer, CheckParticipationRequest, CreateParticipationRequest, LeaderboardEntry,
            LeaderboardParams, Participation, ParticipationListParams, STATUS_COMPLETED,
            STATUS_FAILED, STATUS_PENDING, SubmitAnswerRequest, UpdateParticipationRequest,
            compute_stats,
        },
        question::Question,
        quiz::Quiz,
    },
    ranking,
};

const PARTICIPATION_COLUMNS: &str = "id, user_id, quiz_id, status, answers, \
    attempted_questions, correct_answers, wrong_answers, obtained_marks, total_marks, \
    total_questions, time_spent, rank, start_time, end_time, submitted_at, version, created_at";

const QUESTION_COLUMNS: &str =
    "id, quiz_id, question_text, type, options, correct_answer, marks, negative_marks, created_at";

async fn fetch_participation(pool: &PgPool, id: i64) -> Result<Participation, AppError> {
    let sql = format!("SELECT {PARTICIPATION_COLUMNS} FROM participations WHERE id = $1");
    sqlx::query_as::<_, Participation>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Participation not found".to_string()))
}

async fn fetch_quiz(pool: &PgPool, id: i64) -> Result<Option<Quiz>, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        "SELECT id, title, description, duration_minutes, total_questions, total_marks, \
         marks_per_question, passing_marks, created_at FROM quizzes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(quiz)
}

async fn fetch_existing(
    pool: &PgPool,
    user_id: i64,
    quiz_id: i64,
) -> Result<Option<Participation>, AppError> {
    let sql = format!(
        "SELECT {PARTICIPATION_COLUMNS} FROM participations WHERE user_id = $1 AND quiz_id = $2"
    );
    let existing = sqlx::query_as::<_, Participation>(&sql)
        .bind(user_id)
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?;
    Ok(existing)
}

/// Persists the full participation document behind an optimistic version
/// check. A concurrent writer that got there first makes this save affect
/// zero rows, which surfaces as a retryable 409 instead of silently losing
/// the other write. Rank is deliberately absent from the column list; the
/// ranking engine owns it.
async fn store_participation(pool: &PgPool, p: &mut Participation) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE participations SET status = $1, answers = $2, attempted_questions = $3, \
         correct_answers = $4, wrong_answers = $5, obtained_marks = $6, total_marks = $7, \
         total_questions = $8, time_spent = $9, end_time = $10, submitted_at = $11, \
         version = version + 1 WHERE id = $12 AND version = $13",
    )
    .bind(&p.status)
    .bind(Jsonb(&*p.answers))
    .bind(p.attempted_questions)
    .bind(p.correct_answers)
    .bind(p.wrong_answers)
    .bind(p.obtained_marks)
    .bind(p.total_marks)
    .bind(p.total_questions)
    .bind(p.time_spent)
    .bind(p.end_time)
    .bind(p.submitted_at)
    .bind(p.id)
    .bind(p.version)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store participation {}: {:?}", p.id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(
            "Participation was modified concurrently, please retry".to_string(),
        ));
    }
    p.version += 1;
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    let msg = err.to_string();
    msg.contains("unique constraint") || msg.contains("23505")
}

/// Creates a participation, grading a full answer batch when one is
/// supplied.
///
/// * Rejects missing user/quiz ids before touching the database.
/// * A duplicate (user, quiz) pair returns 400 with the existing record.
/// * Unresolvable question ids inside the batch are skipped and reported
///   in the `warnings` array of the 201 response.
pub async fn create_participation(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateParticipationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(user_id), Some(quiz_id)) = (payload.user, payload.quiz) else {
        return Err(AppError::BadRequest(
            "User ID and Quiz ID are required".to_string(),
        ));
    };

    if let Some(existing) = fetch_existing(&pool, user_id, quiz_id).await? {
        tracing::info!(
            "Duplicate participation attempt: user {} quiz {}",
            user_id,
            quiz_id
        );
        return Err(AppError::AlreadyParticipated(Box::new(existing)));
    }

    let quiz = fetch_quiz(&pool, quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let question_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&pool)
            .await?;
    let total_questions = if question_count > 0 {
        question_count
    } else {
        quiz.total_questions.unwrap_or(0)
    };

    // Grade the batch, skipping answers whose question does not resolve.
    let mut answers: Vec<Answer> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    if let Some(incoming) = &payload.answers {
        if !incoming.is_empty() {
            let mut query_builder = QueryBuilder::<Postgres>::new(format!(
                "SELECT {QUESTION_COLUMNS} FROM questions WHERE id IN ("
            ));
            let mut separated = query_builder.separated(",");
            for item in incoming {
                separated.push_bind(item.question_id);
            }
            separated.push_unseparated(")");

            let questions: Vec<Question> = query_builder
                .build_query_as()
                .fetch_all(&pool)
                .await
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;
            let by_id: HashMap<i64, Question> =
                questions.into_iter().map(|q| (q.id, q)).collect();

            let now = Utc::now();
            for item in incoming {
                let Some(question) = by_id.get(&item.question_id) else {
                    warnings.push(format!(
                        "Question {} not found, answer skipped",
                        item.question_id
                    ));
                    continue;
                };
                let response = item.selected_option.clone().unwrap_or_default();
                let outcome = grading::grade(question, &response);
                answers.push(Answer {
                    question_id: item.question_id,
                    answer: response,
                    is_correct: outcome.is_correct,
                    marks_obtained: outcome.marks_obtained,
                    media: item.media.clone(),
                    answered_at: now,
                });
            }
        }
    }

    let stats = compute_stats(&answers);
    let obtained_marks = payload.total_score.unwrap_or(stats.obtained_marks);
    let total_marks = quiz
        .total_marks
        .unwrap_or(total_questions as f64 * quiz.marks_per_question.unwrap_or(1.0));
    let status = if answers.is_empty() {
        STATUS_PENDING
    } else {
        STATUS_COMPLETED
    };
    let start_time = payload.start_time.unwrap_or_else(Utc::now);

    let sql = format!(
        "INSERT INTO participations (user_id, quiz_id, status, answers, attempted_questions, \
         correct_answers, wrong_answers, obtained_marks, total_marks, total_questions, start_time) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {PARTICIPATION_COLUMNS}"
    );
    let inserted = match sqlx::query_as::<_, Participation>(&sql)
        .bind(user_id)
        .bind(quiz_id)
        .bind(status)
        .bind(Jsonb(&answers))
        .bind(stats.attempted_questions)
        .bind(stats.correct_answers)
        .bind(stats.wrong_answers)
        .bind(obtained_marks)
        .bind(total_marks)
        .bind(total_questions)
        .bind(start_time)
        .fetch_one(&pool)
        .await
    {
        Ok(p) => p,
        // Lost the race to another create between the check and the insert.
        Err(e) if is_unique_violation(&e) => {
            let existing = fetch_existing(&pool, user_id, quiz_id).await?.ok_or_else(|| {
                AppError::InternalServerError("Duplicate participation vanished".to_string())
            })?;
            return Err(AppError::AlreadyParticipated(Box::new(existing)));
        }
        Err(e) => {
            tracing::error!("Failed to create participation: {:?}", e);
            return Err(AppError::InternalServerError(e.to_string()));
        }
    };

    ranking::recompute_ranks(&pool, quiz_id).await?;
    let participation = fetch_participation(&pool, inserted.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "participation": participation,
            "warnings": warnings,
        })),
    ))
}

/// Lists participations, optionally filtered by user, quiz and status.
pub async fn get_participations(
    State(pool): State<PgPool>,
    Query(params): Query<ParticipationListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut query_builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {PARTICIPATION_COLUMNS} FROM participations WHERE 1 = 1"
    ));
    if let Some(user_id) = params.user {
        query_builder.push(" AND user_id = ");
        query_builder.push_bind(user_id);
    }
    if let Some(quiz_id) = params.quiz {
        query_builder.push(" AND quiz_id = ");
        query_builder.push_bind(quiz_id);
    }
    if let Some(status) = params.status {
        query_builder.push(" AND status = ");
        query_builder.push_bind(status);
    }
    query_builder.push(" ORDER BY created_at DESC");

    let participations: Vec<Participation> = query_builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list participations: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(participations))
}

pub async fn get_participation_by_id(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let participation = fetch_participation(&pool, id).await?;
    Ok(Json(participation))
}

/// Reports whether a (user, quiz) pair already has a participation.
pub async fn check_participation(
    State(pool): State<PgPool>,
    Json(payload): Json<CheckParticipationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(user_id), Some(quiz_id)) = (payload.user, payload.quiz) else {
        return Err(AppError::BadRequest(
            "User ID and Quiz ID are required".to_string(),
        ));
    };

    let participation = fetch_existing(&pool, user_id, quiz_id).await?;
    let status = participation.as_ref().map(|p| p.status.clone());

    Ok(Json(serde_json::json!({
        "has_participated": participation.is_some(),
        "status": status,
        "participation": participation,
    })))
}

/// Grades one answer and upserts it into the participation.
/// Resubmitting a question replaces the stored answer in place.
pub async fn submit_answer(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut participation = fetch_participation(&pool, id).await?;

    let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");
    let question = sqlx::query_as::<_, Question>(&sql)
        .bind(payload.question_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let response = payload.answer.unwrap_or_default();
    let outcome = grading::grade(&question, &response);

    participation.upsert_answer(Answer {
        question_id: payload.question_id,
        answer: response,
        is_correct: outcome.is_correct,
        marks_obtained: outcome.marks_obtained,
        media: payload.media,
        answered_at: Utc::now(),
    });
    participation.recompute_stats();

    store_participation(&pool, &mut participation).await?;

    Ok(Json(serde_json::json!({
        "is_correct": outcome.is_correct,
        "marks_obtained": outcome.marks_obtained,
        "participation": participation.summary(),
    })))
}

/// Finalizes the attempt and rewrites the quiz's ranking before returning.
pub async fn complete_participation(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut participation = fetch_participation(&pool, id).await?;

    participation.finalize(Utc::now());
    store_participation(&pool, &mut participation).await?;

    ranking::recompute_ranks(&pool, participation.quiz_id).await?;

    let participation = fetch_participation(&pool, id).await?;
    Ok(Json(participation))
}

/// Manual-review update: wholesale answer-set and/or marks replacement,
/// with status recomputed against the quiz's passing marks.
pub async fn update_participation(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateParticipationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut participation = fetch_participation(&pool, id).await?;

    if let Some(answers) = payload.answers {
        participation.answers = Jsonb(answers);
    }
    if let Some(obtained_marks) = payload.obtained_marks {
        participation.obtained_marks = obtained_marks;
    }

    // A quiz without passing marks passes everything.
    let passing_marks = fetch_quiz(&pool, participation.quiz_id)
        .await?
        .and_then(|q| q.passing_marks)
        .unwrap_or(0.0);
    participation.status = if participation.obtained_marks >= passing_marks {
        STATUS_COMPLETED.to_string()
    } else {
        STATUS_FAILED.to_string()
    };

    store_participation(&pool, &mut participation).await?;

    Ok(Json(participation))
}

/// Lists one quiz's participations, best score first.
pub async fn get_participations_by_quiz(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        "SELECT {PARTICIPATION_COLUMNS} FROM participations WHERE quiz_id = $1 \
         ORDER BY obtained_marks DESC"
    );
    let participations: Vec<Participation> = sqlx::query_as(&sql)
        .bind(quiz_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list quiz participations: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(participations))
}

/// Returns the quiz leaderboard, recomputing ranks first so the view is
/// fresh as of the start of this call.
pub async fn get_leaderboard(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    ranking::recompute_ranks(&pool, quiz_id).await?;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    let entries: Vec<LeaderboardEntry> = sqlx::query_as(
        "SELECT p.id, p.user_id, u.full_name, u.contact, u.role, p.status, \
         p.obtained_marks, COALESCE(p.time_spent, 0) AS time_spent, p.rank \
         FROM participations p JOIN users u ON u.id = p.user_id \
         WHERE p.quiz_id = $1 \
         ORDER BY p.obtained_marks DESC, COALESCE(p.time_spent, 0) ASC \
         LIMIT $2",
    )
    .bind(quiz_id)
    .bind(limit)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(entries))
}
