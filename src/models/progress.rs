use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// One row per (student, lesson) completion. Marking twice is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonProgress {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub lesson_id: String,
    pub completed_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkComplete {
    pub user_id: String,
    pub course_id: String,
    pub lesson_id: String,
}

impl MarkComplete {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty()
            || self.course_id.trim().is_empty()
            || self.lesson_id.trim().is_empty()
        {
            return Err(AppError::Validation(
                "user_id, course_id and lesson_id are required".into(),
            ));
        }
        Ok(())
    }
}
