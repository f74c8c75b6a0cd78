use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::repo_types::CourseChapter;
use crate::audit::Audit;

/// Body of both create and edit; edit replaces every field.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CourseChapterRequest {
    #[validate(required(message = "Instructor id is required"))]
    pub instructor_id: Option<Uuid>,
    #[validate(required(message = "Course id is required"))]
    pub course_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: i32,
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

impl CourseChapterRequest {
    /// Call after `validate`; the required ids are present by then.
    pub fn into_chapter(self, id: Uuid, audit: Audit) -> CourseChapter {
        CourseChapter {
            id,
            instructor_id: self.instructor_id.unwrap_or_default(),
            course_id: self.course_id.unwrap_or_default(),
            title: self.title,
            order: self.order,
            status: self.status,
            audit,
        }
    }
}
