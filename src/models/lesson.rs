use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: String,
    /// Display position within the course (lessons are listed in this order).
    pub position: i32,
    /// Video platform playback id (resolved from the uploaded asset).
    pub playback_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateLesson {
    pub course_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub position: i32,
    /// Video asset id (or pending upload id) from the video platform.
    pub video_asset_id: String,
}

impl CreateLesson {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".into()));
        }
        if self.course_id.trim().is_empty() {
            return Err(AppError::Validation("course_id is required".into()));
        }
        if self.video_asset_id.trim().is_empty() {
            return Err(AppError::Validation("video_asset_id is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLesson {
    pub title: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
}

impl UpdateLesson {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref title) = self.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("title must not be empty".into()));
            }
        }
        Ok(())
    }
}
