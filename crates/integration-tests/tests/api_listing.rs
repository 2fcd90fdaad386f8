mod support;

use axum::http::StatusCode;
use kate_core::traits::{InsultRepo, UserRepo};
use serde_json::json;
use support::TestApp;

#[tokio::test]
async fn categories_are_listed_by_key() {
    let app = TestApp::new().await;
    app.store.create_category("xInsults").await.unwrap();

    let (status, body) = app.get_json("/get-categories").await;
    assert_eq!(status, StatusCode::OK);

    let mut categories: Vec<String> = serde_json::from_value(body["categories"].clone()).unwrap();
    categories.sort();
    assert_eq!(categories, vec!["pingInsults", "xInsults"]);
}

#[tokio::test]
async fn leaderboard_honours_the_limit() {
    let app = TestApp::new().await;
    for (user, count) in [("alice", 5), ("bob", 3), ("carol", 3)] {
        for _ in 0..count {
            app.store.increment_submissions(user).await.unwrap();
        }
    }

    let (status, body) = app.get_json("/leaderboard?limit=2").await;
    assert_eq!(status, StatusCode::OK);

    let rows = body["leaderboard"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], json!({ "username": "alice", "submissions": 5 }));
    // Ties have no defined order.
    assert_eq!(rows[1]["submissions"], 3);
    assert!(["bob", "carol"].contains(&rows[1]["username"].as_str().unwrap()));
}

#[tokio::test]
async fn leaderboard_defaults_to_ten_rows() {
    let app = TestApp::new().await;
    for i in 0..12 {
        app.store
            .increment_submissions(&format!("user{i}"))
            .await
            .unwrap();
    }

    let (_, body) = app.get_json("/leaderboard").await;
    assert_eq!(body["leaderboard"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn empty_leaderboard_is_an_empty_list() {
    let app = TestApp::new().await;
    let (status, body) = app.get_json("/leaderboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "leaderboard": [] }));
}

#[tokio::test]
async fn index_page_links_the_static_assets() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);

    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("id=\"submission-form\""));
    assert!(page.contains("/static/style.css"));
    assert!(page.contains("/static/script.js"));
}

#[tokio::test]
async fn static_assets_are_served() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/static/script.js").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("/submit-insult"));
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;
    let (status, body) = app.get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn no_pending_submissions_at_start() {
    let app = TestApp::new().await;
    let (_, body) = app.get_json("/pending-submissions").await;
    assert_eq!(body, json!({ "pending": [] }));
}
