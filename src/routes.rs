// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{participation, question, quiz, user},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (users, quizzes, questions, participations).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins: [HeaderValue; 2] = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let user_routes = Router::new()
        .route("/", post(user::create_user).get(user::list_users))
        .route("/{id}", get(user::get_user));

    let quiz_routes = Router::new()
        .route("/", post(quiz::create_quiz).get(quiz::list_quizzes))
        .route("/{id}", get(quiz::get_quiz));

    let question_routes = Router::new()
        .route("/", post(question::create_question))
        .route("/quiz/{quiz_id}", get(question::list_questions_by_quiz))
        .route(
            "/{id}",
            get(question::get_question).delete(question::delete_question),
        );

    let participation_routes = Router::new()
        .route(
            "/",
            post(participation::create_participation).get(participation::get_participations),
        )
        .route("/check", post(participation::check_participation))
        .route(
            "/quiz/{quiz_id}",
            get(participation::get_participations_by_quiz),
        )
        .route(
            "/quiz/{quiz_id}/leaderboard",
            get(participation::get_leaderboard),
        )
        .route(
            "/{id}",
            get(participation::get_participation_by_id)
                .put(participation::update_participation)
                .patch(participation::update_participation),
        )
        .route("/{id}/submit-answer", post(participation::submit_answer))
        .route("/{id}/complete", post(participation::complete_participation));

    Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/participations", participation_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
