use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::db::{queries, AppState};
use crate::error::{AppError, OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::{CreateLesson, Lesson, UpdateLesson};

/// Add a lesson to the course.
///
/// The instructor submits the video platform's asset id (or the upload id,
/// right after uploading). If the video is still transcoding the handler
/// answers 202 and the instructor retries; nothing is persisted until a
/// playback id exists.
pub async fn create_lesson(
    State(state): State<AppState>,
    Json(input): Json<CreateLesson>,
) -> Result<Response> {
    input.validate()?;

    let conn = state.db.get()?;

    queries::get_course_by_id(&conn, &input.course_id)?.or_not_found("No such course")?;

    let video = state
        .video
        .as_ref()
        .ok_or_else(|| AppError::Configuration("MUX_TOKEN_ID / MUX_TOKEN_SECRET not set".into()))?;

    let asset = match video.resolve_video(&input.video_asset_id).await? {
        crate::video::VideoResolution::Ready(asset) => asset,
        crate::video::VideoResolution::Processing => {
            return Ok((
                StatusCode::ACCEPTED,
                axum::Json(json!({
                    "status": "processing",
                    "message": "video is still transcoding, retry shortly",
                })),
            )
                .into_response());
        }
    };

    let lesson = queries::create_lesson(&conn, &input, &asset.playback_id, asset.duration_secs)?;
    tracing::info!("Lesson created: {} ({})", lesson.title, lesson.id);
    Ok((StatusCode::CREATED, Json(lesson)).into_response())
}

/// Lessons for a course in display order. An existing course with no
/// lessons yet answers with an empty array, never null.
pub async fn list_lessons(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<Lesson>>> {
    let conn = state.db.get()?;

    if queries::get_course_by_id(&conn, &course_id)?.is_none() {
        return Err(AppError::NotFound("No such course".into()));
    }

    let lessons = queries::list_lessons(&conn, &course_id)?;
    Ok(Json(lessons))
}

pub async fn update_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateLesson>,
) -> Result<Json<Lesson>> {
    input.validate()?;

    let conn = state.db.get()?;
    let lesson = queries::update_lesson(&conn, &id, &input)?.or_not_found("No such lesson")?;
    Ok(Json(lesson))
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let conn = state.db.get()?;

    if !queries::delete_lesson(&conn, &id)? {
        return Err(AppError::NotFound("No such lesson".into()));
    }

    tracing::info!("Lesson deleted: {}", id);
    Ok(StatusCode::NO_CONTENT)
}
