use axum::extract::State;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{AppError, OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::{LessonProgress, MarkComplete};

/// Record a lesson completion. Marking an already-completed lesson is a
/// no-op that returns the existing row.
pub async fn mark_lesson_complete(
    State(state): State<AppState>,
    Json(input): Json<MarkComplete>,
) -> Result<Json<LessonProgress>> {
    input.validate()?;

    let conn = state.db.get()?;

    let lesson = queries::get_lesson_by_id(&conn, &input.lesson_id)?.or_not_found("No such lesson")?;
    if lesson.course_id != input.course_id {
        return Err(AppError::Validation(
            "lesson does not belong to this course".into(),
        ));
    }
    if !queries::student_exists(&conn, &input.user_id)? {
        return Err(AppError::NotFound(format!(
            "No student record for user {}",
            input.user_id
        )));
    }

    let progress = queries::mark_lesson_complete(&conn, &input)?;
    Ok(Json(progress))
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub user_id: String,
    pub completed_lesson_ids: Vec<String>,
}

/// Completed lessons for a student, oldest first. Empty array when the
/// student has completed nothing (or doesn't exist).
pub async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProgressResponse>> {
    let conn = state.db.get()?;
    let completed_lesson_ids = queries::completed_lesson_ids(&conn, &user_id)?;
    Ok(Json(ProgressResponse {
        user_id,
        completed_lesson_ids,
    }))
}
