use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    audit::{non_empty, Audit},
    db::{Entity, PgQuery},
    field_mask::AllowList,
};

/// Chapter of a course. `order` is a display position; duplicates are allowed
/// and ties sort by `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CourseChapter {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub order: i32,
    pub status: String,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(default)]
#[sqlx(default)]
pub struct CourseChapterView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
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

impl Entity for CourseChapter {
    type View = CourseChapterView;

    const TABLE: &'static str = "course_chapters";
    const ALLOW_LIST: AllowList = AllowList::new(&[
        "id",
        "instructor_id",
        "course_id",
        "title",
        "order",
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
        "title",
        "order",
        "status",
        "created_at",
        "created_by",
    ];
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "instructor_id",
        "course_id",
        "title",
        "order",
        "status",
        "updated_at",
        "updated_by",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn bind_insert<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(self.instructor_id)
            .bind(self.course_id)
            .bind(&self.title)
            .bind(self.order)
            .bind(&self.status)
            .bind(self.audit.created_at)
            .bind(&self.audit.created_by)
    }

    fn bind_update<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.instructor_id)
            .bind(self.course_id)
            .bind(&self.title)
            .bind(self.order)
            .bind(&self.status)
            .bind(self.audit.updated_at)
            .bind(&self.audit.updated_by)
    }

    fn normalize_view(view: CourseChapterView) -> CourseChapterView {
        CourseChapterView {
            title: non_empty(view.title),
            status: non_empty(view.status),
            created_by: non_empty(view.created_by),
            updated_by: non_empty(view.updated_by),
            deleted_by: non_empty(view.deleted_by),
            ..view
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::assert_entity_columns;

    #[test]
    fn column_lists_match_row_fields() {
        let chapter = CourseChapter {
            id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Ownership".into(),
            order: 1,
            status: "active".into(),
            audit: Audit::created_now("Owner"),
        };
        assert_entity_columns(&chapter);
    }
}
