use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    audit::{non_empty, Audit},
    db::{Entity, PgQuery},
    field_mask::AllowList,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChapterLesson {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub course_id: Uuid,
    pub chapter_id: Option<Uuid>,
    pub title: String,
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
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(default)]
#[sqlx(default)]
pub struct ChapterLessonView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_lesson: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_lesson: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloadable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_preview: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
}

impl Entity for ChapterLesson {
    type View = ChapterLessonView;

    const TABLE: &'static str = "course_chapter_lessons";
    const ALLOW_LIST: AllowList = AllowList::new(&[
        "id",
        "instructor_id",
        "course_id",
        "chapter_id",
        "title",
        "order_lesson",
        "slug",
        "description",
        "file_path",
        "storage_lesson",
        "lesson_type",
        "volume",
        "duration",
        "file_type",
        "downloadable",
        "is_preview",
        "status",
        "created_at",
        "created_by",
        "updated_at",
        "updated_by",
        "deleted_at",
        "deleted_by",
    ]);
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "id",
        "instructor_id",
        "course_id",
        "chapter_id",
        "title",
        "order_lesson",
        "slug",
        "description",
        "file_path",
        "storage_lesson",
        "lesson_type",
        "volume",
        "duration",
        "file_type",
        "downloadable",
        "is_preview",
        "status",
        "created_at",
        "created_by",
    ];
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "instructor_id",
        "course_id",
        "chapter_id",
        "title",
        "order_lesson",
        "slug",
        "description",
        "file_path",
        "storage_lesson",
        "lesson_type",
        "volume",
        "duration",
        "file_type",
        "downloadable",
        "is_preview",
        "status",
        "updated_at",
        "updated_by",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn bind_insert<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        self.bind_mutable(query.bind(self.id))
            .bind(self.audit.created_at)
            .bind(&self.audit.created_by)
    }

    fn bind_update<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        self.bind_mutable(query)
            .bind(self.audit.updated_at)
            .bind(&self.audit.updated_by)
    }

    fn normalize_view(view: ChapterLessonView) -> ChapterLessonView {
        ChapterLessonView {
            title: non_empty(view.title),
            slug: non_empty(view.slug),
            description: non_empty(view.description),
            file_path: non_empty(view.file_path),
            storage_lesson: non_empty(view.storage_lesson),
            lesson_type: non_empty(view.lesson_type),
            volume: non_empty(view.volume),
            duration: non_empty(view.duration),
            file_type: non_empty(view.file_type),
            status: non_empty(view.status),
            created_by: non_empty(view.created_by),
            updated_by: non_empty(view.updated_by),
            deleted_by: non_empty(view.deleted_by),
            ..view
        }
    }
}

impl ChapterLesson {
    fn bind_mutable<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.instructor_id)
            .bind(self.course_id)
            .bind(self.chapter_id)
            .bind(&self.title)
            .bind(self.order_lesson)
            .bind(&self.slug)
            .bind(&self.description)
            .bind(&self.file_path)
            .bind(&self.storage_lesson)
            .bind(&self.lesson_type)
            .bind(&self.volume)
            .bind(&self.duration)
            .bind(&self.file_type)
            .bind(self.downloadable)
            .bind(self.is_preview)
            .bind(&self.status)
    }
}
