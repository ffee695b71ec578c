//! High-score API scenarios over an in-memory database: submit several
//! finished games through the REST surface and read back the ranked
//! leaderboard.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use updown::highscore::repo::HighScoreRepo;
use updown::highscore::routes::{build_router, ServiceState};
use updown::highscore::HistoryCounts;
use updown::types::{GuessDirection, PriceGuessRecord, PriceObservation};

async fn test_app() -> axum::Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let repo = HighScoreRepo::new(pool, "BTC").await.unwrap();
    build_router(Arc::new(ServiceState { repo }))
}

async fn post_score(app: &axum::Router, username: &str, serialized: &str) -> StatusCode {
    let body = format!(r#"{{"username":"{username}","serializedHistory":"{serialized}"}}"#);
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/highscores")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    resp.status()
}

async fn leaderboard(app: &axum::Router) -> Vec<serde_json::Value> {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/highscores")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_leaderboard_ranks_submissions() {
    let app = test_app().await;

    assert_eq!(post_score(&app, "alice", "C5,W1,N0").await, StatusCode::CREATED); // 4
    assert_eq!(post_score(&app, "bob", "C1,W3,N2").await, StatusCode::CREATED); // -2
    assert_eq!(post_score(&app, "carol", "C7,W0,N1").await, StatusCode::CREATED); // 7
    // Submission dates carry millisecond precision; step past it so the
    // tie between alice and dave has a strict order.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert_eq!(post_score(&app, "dave", "C5,W1,N4").await, StatusCode::CREATED); // 4, newer

    let scores = leaderboard(&app).await;
    let usernames: Vec<&str> = scores
        .iter()
        .map(|s| s["username"].as_str().unwrap())
        .collect();
    // Highest score first; among the two fours the newer submission
    // (dave) outranks the older (alice).
    assert_eq!(usernames, vec!["carol", "dave", "alice", "bob"]);

    let values: Vec<i64> = scores.iter().map(|s| s["score"].as_i64().unwrap()).collect();
    assert_eq!(values, vec![7, 4, 4, -2]);
}

#[tokio::test]
async fn test_rejected_submission_never_lands_on_the_board() {
    let app = test_app().await;

    let status = post_score(&app, "mallory", "C999").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(leaderboard(&app).await.is_empty());
}

#[tokio::test]
async fn test_engine_history_round_trips_through_the_api() {
    // A finished game: two correct guesses. Its serialization must be
    // exactly C2,W0,N0 (not C2,W1,N0) and its score exactly 2.
    let history = vec![
        PriceGuessRecord::reconciled(
            PriceObservation {
                symbol: "BTC".to_string(),
                amount: 102.0,
                timestamp_ms: 3,
            },
            Some(GuessDirection::Up),
            GuessDirection::Up,
        ),
        PriceGuessRecord::reconciled(
            PriceObservation {
                symbol: "BTC".to_string(),
                amount: 101.0,
                timestamp_ms: 2,
            },
            Some(GuessDirection::Down),
            GuessDirection::Down,
        ),
    ];
    let counts = HistoryCounts::of(&history);
    assert_eq!(counts.correct, 2);
    assert_eq!(counts.wrong, 0);
    assert_eq!(counts.no_guess, 0);
    let serialized = counts.to_string();
    assert_eq!(serialized, "C2,W0,N0");

    let app = test_app().await;
    assert_eq!(post_score(&app, "winner", &serialized).await, StatusCode::CREATED);

    let scores = leaderboard(&app).await;
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0]["score"], 2);
    assert_eq!(scores[0]["serializedHistory"], "C2,W0,N0");
}
