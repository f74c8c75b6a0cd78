use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::repo_types::ChapterLesson;
use crate::audit::Audit;

/// Body of both create and edit; edit replaces every field.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ChapterLessonRequest {
    #[validate(required(message = "Instructor id is required"))]
    pub instructor_id: Option<Uuid>,
    #[validate(required(message = "Course id is required"))]
    pub course_id: Option<Uuid>,
    pub chapter_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order_lesson: i32,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub file_path: Option<String>,
    pub storage_lesson: Option<String>,
    pub lesson_type: Option<String>,
    pub volume: Option<String>,
    pub duration: Option<String>,
    pub file_type: Option<String>,
    pub downloadable: Option<bool>,
    pub is_preview: Option<bool>,
    pub status: Option<String>,
}

impl ChapterLessonRequest {
    pub fn into_lesson(self, id: Uuid, audit: Audit) -> ChapterLesson {
        ChapterLesson {
            id,
            instructor_id: self.instructor_id.unwrap_or_default(),
            course_id: self.course_id.unwrap_or_default(),
            chapter_id: self.chapter_id,
            title: self.title,
            order_lesson: self.order_lesson,
            slug: self.slug,
            description: self.description,
            file_path: self.file_path,
            storage_lesson: self.storage_lesson,
            lesson_type: self.lesson_type,
            volume: self.volume,
            duration: self.duration,
            file_type: self.file_type,
            downloadable: self.downloadable,
            is_preview: self.is_preview,
            status: self.status,
            audit,
        }
    }
}
