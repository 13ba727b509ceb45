//! Checkout initiation tests. Only the paths short of the outbound Stripe
//! call are exercised here; the session-creation call itself needs a live
//! key and is covered by the provider's own test mode in staging.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use common::*;
use tower::ServiceExt;

async fn post_checkout(state: &AppState, form_body: &str) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/checkout")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form_body.to_string()))
        .unwrap();
    app(state.clone()).oneshot(request).await.unwrap()
}

#[tokio::test]
async fn missing_user_id_returns_400() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        create_test_course(&conn, 2500);
        create_test_student(&conn, "u1");
    }

    let response = post_checkout(&state, "user_id=&email=u1%40example.com").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_email_returns_400() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        create_test_course(&conn, 2500);
        create_test_student(&conn, "u1");
    }

    let response = post_checkout(&state, "user_id=u1&email=not-an-email").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn no_course_returns_404() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        create_test_student(&conn, "u1");
    }

    let response = post_checkout(&state, "user_id=u1&email=u1%40example.com").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_student_returns_404_without_provider_call() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        create_test_course(&conn, 2500);
    }

    // No secret key is configured, so reaching the provider call would be a
    // 500; a clean 404 proves the handler bailed out before it.
    let response = post_checkout(&state, "user_id=ghost&email=ghost%40example.com").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn price_below_minimum_returns_500_without_provider_call() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        create_test_course(&conn, 10);
        create_test_student(&conn, "u1");
    }

    let response = post_checkout(&state, "user_id=u1&email=u1%40example.com").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Invalid pricing");
}
