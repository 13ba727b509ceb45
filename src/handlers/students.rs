use axum::extract::State;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::{CreateStudent, Student};

/// Enroll a student, or return the existing row for this identity.
///
/// Called on first site visit, so it has to be safe to call repeatedly for
/// the same user.
pub async fn create_student(
    State(state): State<AppState>,
    Json(input): Json<CreateStudent>,
) -> Result<Json<Student>> {
    input.validate()?;

    let conn = state.db.get()?;

    if let Some(existing) = queries::get_student_by_user_id(&conn, &input.user_id)? {
        return Ok(Json(existing));
    }

    let student = queries::create_student(&conn, &input)?;
    tracing::info!("Student enrolled: {} ({})", student.user_id, student.email);
    Ok(Json(student))
}

pub async fn get_student(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Student>> {
    let conn = state.db.get()?;
    let student = queries::get_student_by_user_id(&conn, &user_id)?
        .or_not_found(&format!("No student record for user {}", user_id))?;
    Ok(Json(student))
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub user_id: String,
    pub has_access: bool,
}

/// Entitlement check for downstream content pages. An unknown identity is
/// simply not entitled; this is not a 404.
pub async fn get_student_access(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<AccessResponse>> {
    let conn = state.db.get()?;
    let has_access = queries::student_has_paid(&conn, &user_id)?;
    Ok(Json(AccessResponse { user_id, has_access }))
}
