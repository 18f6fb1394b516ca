// tests/participation_api.rs

use quiz_backend::{config::Config, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL, or None when DATABASE_URL is not set so the suite
/// can run without a database available.
async fn spawn_app() -> Option<String> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping integration test");
            return None;
        }
    };

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        rust_log: "error".to_string(),
    };

    let state = AppState { pool, config };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(address)
}

async fn create_user(client: &reqwest::Client, address: &str) -> i64 {
    let unique = &uuid::Uuid::new_v4().to_string()[..8];
    let response = client
        .post(format!("{}/api/users", address))
        .json(&json!({
            "full_name": format!("Student {}", unique),
            "contact": format!("{}@example.com", unique),
        }))
        .send()
        .await
        .expect("Failed to create user");
    assert_eq!(response.status().as_u16(), 201);
    response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
}

async fn create_quiz(client: &reqwest::Client, address: &str, passing_marks: f64) -> i64 {
    let response = client
        .post(format!("{}/api/quizzes", address))
        .json(&json!({
            "title": format!("Quiz {}", &uuid::Uuid::new_v4().to_string()[..8]),
            "marks_per_question": 2.0,
            "passing_marks": passing_marks,
        }))
        .send()
        .await
        .expect("Failed to create quiz");
    assert_eq!(response.status().as_u16(), 201);
    response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
}

async fn create_question(client: &reqwest::Client, address: &str, body: Value) -> i64 {
    let response = client
        .post(format!("{}/api/questions", address))
        .json(&body)
        .send()
        .await
        .expect("Failed to create question");
    assert_eq!(response.status().as_u16(), 201);
    response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
}

fn choice_question(quiz_id: i64, correct: &str) -> Value {
    json!({
        "quiz_id": quiz_id,
        "question_text": "Pick the right option",
        "question_type": "multiple-choice",
        "options": ["A", "B", "C", "D"].iter().map(|text| json!({
            "text": text,
            "is_correct": *text == correct,
        })).collect::<Vec<_>>(),
        "marks": 2.0,
        "negative_marks": 0.5,
    })
}

fn blank_question(quiz_id: i64, expected: &str) -> Value {
    json!({
        "quiz_id": quiz_id,
        "question_text": "Fill in the blank",
        "question_type": "fill-in-the-blank",
        "correct_answer": expected,
        "marks": 2.0,
    })
}

#[tokio::test]
async fn unknown_route_is_404() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn create_without_ids_is_rejected() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/participations", address))
        .json(&json!({ "user": 1 }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn bulk_creation_grades_and_reports_skipped_questions() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let quiz_id = create_quiz(&client, &address, 3.0).await;
    let q1 = create_question(&client, &address, choice_question(quiz_id, "B")).await;
    let q2 = create_question(&client, &address, blank_question(quiz_id, "Paris")).await;
    create_question(
        &client,
        &address,
        json!({
            "quiz_id": quiz_id,
            "question_text": "Explain your reasoning",
            "question_type": "essay",
            "marks": 2.0,
        }),
    )
    .await;
    let user_id = create_user(&client, &address).await;

    let response = client
        .post(format!("{}/api/participations", address))
        .json(&json!({
            "user": user_id,
            "quiz": quiz_id,
            "answers": [
                { "question_id": q1, "selected_option": "B" },
                { "question_id": q2, "selected_option": " paris " },
                { "question_id": 99999999, "selected_option": "A" },
            ],
        }))
        .send()
        .await
        .expect("Failed to create participation");

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();

    // The unresolvable question id lands in warnings, not in the answers.
    assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
    let participation = &body["participation"];
    assert_eq!(participation["status"], "completed");
    assert_eq!(participation["attempted_questions"], 2);
    assert_eq!(participation["correct_answers"], 2);
    assert_eq!(participation["wrong_answers"], 0);
    assert_eq!(participation["obtained_marks"], 4.0);
    assert_eq!(participation["total_questions"], 3);
    assert_eq!(participation["total_marks"], 6.0);
    assert_eq!(participation["rank"], 1);

    // A second participation for the same pair is rejected with the
    // existing record attached.
    let duplicate = client
        .post(format!("{}/api/participations", address))
        .json(&json!({ "user": user_id, "quiz": quiz_id }))
        .send()
        .await
        .expect("Failed to execute duplicate request");

    assert_eq!(duplicate.status().as_u16(), 400);
    let dup_body: Value = duplicate.json().await.unwrap();
    assert_eq!(dup_body["participation"]["id"], participation["id"]);

    // The check endpoint agrees.
    let check = client
        .post(format!("{}/api/participations/check", address))
        .json(&json!({ "user": user_id, "quiz": quiz_id }))
        .send()
        .await
        .expect("Failed to check participation")
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(check["has_participated"], true);
    assert_eq!(check["status"], "completed");
}

#[tokio::test]
async fn answer_flow_replaces_resubmissions_and_ranks_the_quiz() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let quiz_id = create_quiz(&client, &address, 0.0).await;
    let q1 = create_question(&client, &address, choice_question(quiz_id, "B")).await;
    let q2 = create_question(&client, &address, blank_question(quiz_id, "Paris")).await;
    let user_a = create_user(&client, &address).await;
    let user_b = create_user(&client, &address).await;

    let mut participations = Vec::new();
    for user in [user_a, user_b] {
        let response = client
            .post(format!("{}/api/participations", address))
            .json(&json!({ "user": user, "quiz": quiz_id }))
            .send()
            .await
            .expect("Failed to create participation");
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["participation"]["status"], "pending");
        participations.push(body["participation"]["id"].as_i64().unwrap());
    }
    let (p_a, p_b) = (participations[0], participations[1]);

    let submit = |participation: i64, question: i64, answer: &str| {
        let client = client.clone();
        let address = address.clone();
        let answer = answer.to_string();
        async move {
            client
                .post(format!(
                    "{}/api/participations/{}/submit-answer",
                    address, participation
                ))
                .json(&json!({ "question_id": question, "answer": answer }))
                .send()
                .await
                .expect("Failed to submit answer")
                .json::<Value>()
                .await
                .unwrap()
        }
    };

    // Correct, then replaced by a wrong answer with a penalty.
    let first = submit(p_a, q1, "B").await;
    assert_eq!(first["is_correct"], true);
    assert_eq!(first["marks_obtained"], 2.0);

    let second = submit(p_a, q1, "C").await;
    assert_eq!(second["is_correct"], false);
    assert_eq!(second["marks_obtained"], -0.5);
    assert_eq!(second["participation"]["wrong_answers"], 1);
    assert_eq!(second["participation"]["obtained_marks"], -0.5);

    // A blank resubmission is unattempted, not wrong.
    let third = submit(p_a, q1, "").await;
    assert_eq!(third["participation"]["attempted_questions"], 0);
    assert_eq!(third["participation"]["wrong_answers"], 0);
    assert_eq!(third["participation"]["obtained_marks"], 0.0);

    // Settle on the correct answers; still a single entry per question.
    submit(p_a, q1, "B").await;
    submit(p_a, q2, "PARIS").await;

    let stored: Value = client
        .get(format!("{}/api/participations/{}", address, p_a))
        .send()
        .await
        .expect("Failed to fetch participation")
        .json()
        .await
        .unwrap();
    assert_eq!(stored["answers"].as_array().unwrap().len(), 2);
    assert_eq!(stored["obtained_marks"], 4.0);

    // Player B answers only one question.
    submit(p_b, q1, "B").await;

    for participation in [p_a, p_b] {
        let response = client
            .post(format!(
                "{}/api/participations/{}/complete",
                address, participation
            ))
            .send()
            .await
            .expect("Failed to complete participation");
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "completed");
    }

    let leaderboard: Value = client
        .get(format!(
            "{}/api/participations/quiz/{}/leaderboard",
            address, quiz_id
        ))
        .send()
        .await
        .expect("Failed to fetch leaderboard")
        .json()
        .await
        .unwrap();

    let entries = leaderboard.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["user_id"], user_a);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["obtained_marks"], 4.0);
    assert_eq!(entries[1]["user_id"], user_b);
    assert_eq!(entries[1]["rank"], 2);
    assert_eq!(entries[1]["obtained_marks"], 2.0);
    assert!(entries[0]["full_name"].as_str().unwrap().starts_with("Student"));
}

#[tokio::test]
async fn manual_review_recomputes_status_against_passing_marks() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let quiz_id = create_quiz(&client, &address, 5.0).await;
    let q1 = create_question(
        &client,
        &address,
        json!({
            "quiz_id": quiz_id,
            "question_text": "Describe the water cycle",
            "question_type": "essay",
            "marks": 10.0,
        }),
    )
    .await;
    let user_id = create_user(&client, &address).await;

    let created: Value = client
        .post(format!("{}/api/participations", address))
        .json(&json!({
            "user": user_id,
            "quiz": quiz_id,
            "answers": [{ "question_id": q1, "selected_option": "Rain falls, evaporates..." }],
        }))
        .send()
        .await
        .expect("Failed to create participation")
        .json()
        .await
        .unwrap();
    let id = created["participation"]["id"].as_i64().unwrap();
    // Essays are not auto-graded.
    assert_eq!(created["participation"]["obtained_marks"], 0.0);

    // Manual grading below the passing marks fails the attempt.
    let failed: Value = client
        .put(format!("{}/api/participations/{}", address, id))
        .json(&json!({ "obtained_marks": 4.0 }))
        .send()
        .await
        .expect("Failed to update participation")
        .json()
        .await
        .unwrap();
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["obtained_marks"], 4.0);

    // And at or above it, the attempt completes.
    let passed: Value = client
        .put(format!("{}/api/participations/{}", address, id))
        .json(&json!({ "obtained_marks": 8.0 }))
        .send()
        .await
        .expect("Failed to update participation")
        .json()
        .await
        .unwrap();
    assert_eq!(passed["status"], "completed");
}
