mod checkout;
mod courses;
mod lessons;
mod progress;
mod students;

pub mod webhooks;

pub use checkout::*;
pub use courses::*;
pub use lessons::*;
pub use progress::*;
pub use students::*;

use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Checkout: browser form POST, answers with a 303 to the hosted page
        .route("/checkout", post(initiate_checkout))
        // Course (singleton)
        .route("/courses", post(create_course))
        .route("/course", get(get_course))
        .route("/courses/{id}/price", patch(update_course_price))
        // Lessons
        .route("/lessons", post(create_lesson))
        .route("/courses/{course_id}/lessons", get(list_lessons))
        .route("/lessons/{id}", patch(update_lesson).delete(delete_lesson))
        // Students and entitlement
        .route("/students", post(create_student))
        .route("/students/{user_id}", get(get_student))
        .route("/students/{user_id}/access", get(get_student_access))
        // Progress
        .route("/progress/complete", post(mark_lesson_complete))
        .route("/progress/{user_id}", get(get_progress))
}
