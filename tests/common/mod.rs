//! Test utilities and fixtures for onecourse integration tests

#![allow(dead_code)]

use axum::Router;
use hmac::{Hmac, Mac};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use sha2::Sha256;

pub use onecourse::db::{init_db, queries, AppState, DbPool};
pub use onecourse::handlers;
pub use onecourse::models::*;
pub use onecourse::payments::{StripeClient, StripeConfig};

/// Webhook secret used for signing test deliveries.
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// In-memory pool where all pooled connections see the same database.
/// Plain `:memory:` would give every pooled connection its own database.
pub fn setup_test_pool() -> DbPool {
    let name = format!(
        "file:testdb_{}?mode=memory&cache=shared",
        uuid::Uuid::new_v4().simple()
    );
    let manager = SqliteConnectionManager::file(name)
        .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .expect("Failed to create test pool");
    {
        let conn = pool.get().expect("Failed to get test connection");
        init_db(&conn).expect("Failed to initialize schema");
    }
    pool
}

/// Create an AppState for testing: in-memory database, no Stripe secret key
/// (tests never make outbound calls), signing secret for webhooks, no video
/// client.
pub fn create_test_app_state() -> AppState {
    create_test_app_state_with_stripe(StripeConfig {
        secret_key: None,
        webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
    })
}

pub fn create_test_app_state_with_stripe(stripe: StripeConfig) -> AppState {
    AppState {
        db: setup_test_pool(),
        base_url: "http://localhost:3000".to_string(),
        stripe: StripeClient::new(&stripe),
        video: None,
    }
}

/// Full application router over the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(handlers::router())
        .merge(handlers::webhooks::router())
        .with_state(state)
}

/// Create a test course at the given price
pub fn create_test_course(conn: &Connection, price_cents: i64) -> Course {
    let input = CreateCourse {
        title: "Test Course".to_string(),
        description: "A course for testing".to_string(),
        price_cents,
        currency: None,
        thumbnail_url: None,
        creator_id: Some("instructor-1".to_string()),
    };
    queries::create_course(conn, &input, None, None).expect("Failed to create test course")
}

/// Create a test student with default values
pub fn create_test_student(conn: &Connection, user_id: &str) -> Student {
    let input = CreateStudent {
        user_id: user_id.to_string(),
        email: format!("{}@example.com", user_id),
        name: format!("Test Student {}", user_id),
    };
    queries::create_student(conn, &input).expect("Failed to create test student")
}

/// Create a test lesson with an already-resolved playback id
pub fn create_test_lesson(conn: &Connection, course_id: &str, title: &str, position: i32) -> Lesson {
    let input = CreateLesson {
        course_id: course_id.to_string(),
        title: title.to_string(),
        description: format!("{} description", title),
        position,
        video_asset_id: "asset_test".to_string(),
    };
    queries::create_lesson(conn, &input, "pb_test", Some(300))
        .expect("Failed to create test lesson")
}

/// Get the current timestamp
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Sign a webhook body the way Stripe does, with a caller-chosen timestamp.
pub fn stripe_signature_at(body: &str, timestamp: i64) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(TEST_WEBHOOK_SECRET.as_bytes())
        .expect("Failed to create HMAC");
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// Sign a webhook body with a fresh timestamp.
pub fn stripe_signature(body: &str) -> String {
    stripe_signature_at(body, now())
}

/// JSON body for a `checkout.session.completed` event.
pub fn completed_event(user_id: &str, payment_intent: &str, amount_cents: i64) -> String {
    serde_json::json!({
        "id": "evt_test_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_1",
                "payment_intent": payment_intent,
                "payment_status": "paid",
                "amount_total": amount_cents,
                "currency": "eur",
                "customer_email": format!("{}@example.com", user_id),
                "metadata": {
                    "user_id": user_id,
                    "course_id": "course_test_1"
                }
            }
        }
    })
    .to_string()
}

/// JSON body for a `payment_intent.payment_failed` event.
pub fn failed_event(user_id: &str) -> String {
    serde_json::json!({
        "id": "evt_test_2",
        "type": "payment_intent.payment_failed",
        "data": {
            "object": {
                "id": "pi_test_failed",
                "metadata": {
                    "user_id": user_id,
                    "course_id": "course_test_1"
                }
            }
        }
    })
    .to_string()
}
