use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    audit::{non_empty, Audit},
    db::{Entity, PgQuery},
    field_mask::AllowList,
};

/// Course row in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub image_file_name: String,
    pub slug: Option<String>,
    pub instructor_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub course_type: Option<String>,
    pub seo_description: Option<String>,
    pub duration: Option<String>,
    pub timezone: Option<String>,
    pub thumbnail: Option<String>,
    pub demo_video_storage: Option<String>,
    pub demo_video_source: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub certificate: Option<bool>,
    pub gna: Option<bool>,
    pub message_for_reviewer: Option<String>,
    pub is_approved: Option<bool>,
    pub status: Option<String>,
    pub course_level_id: Option<Uuid>,
    pub course_language_id: Option<Uuid>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub audit: Audit,
}

/// Field-masked course; columns that were not selected stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(default)]
#[sqlx(default)]
pub struct CourseView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_video_storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_video_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gna: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_for_reviewer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_approved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_level_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_language_id: Option<Uuid>,
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

impl Entity for Course {
    type View = CourseView;

    const TABLE: &'static str = "courses";
    const ALLOW_LIST: AllowList = AllowList::new(&[
        "id",
        "name",
        "address",
        "image_file_name",
        "slug",
        "instructor_id",
        "category_id",
        "course_type",
        "seo_description",
        "duration",
        "timezone",
        "thumbnail",
        "demo_video_storage",
        "demo_video_source",
        "description",
        "capacity",
        "price",
        "discount",
        "certificate",
        "gna",
        "message_for_reviewer",
        "is_approved",
        "status",
        "course_level_id",
        "course_language_id",
        "created_at",
        "created_by",
        "updated_at",
        "updated_by",
        "deleted_at",
        "deleted_by",
    ]);
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "address",
        "image_file_name",
        "slug",
        "instructor_id",
        "category_id",
        "course_type",
        "seo_description",
        "duration",
        "timezone",
        "thumbnail",
        "demo_video_storage",
        "demo_video_source",
        "description",
        "capacity",
        "price",
        "discount",
        "certificate",
        "gna",
        "message_for_reviewer",
        "is_approved",
        "status",
        "course_level_id",
        "course_language_id",
        "created_at",
        "created_by",
    ];
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "name",
        "address",
        "image_file_name",
        "slug",
        "instructor_id",
        "category_id",
        "course_type",
        "seo_description",
        "duration",
        "timezone",
        "thumbnail",
        "demo_video_storage",
        "demo_video_source",
        "description",
        "capacity",
        "price",
        "discount",
        "certificate",
        "gna",
        "message_for_reviewer",
        "is_approved",
        "status",
        "course_level_id",
        "course_language_id",
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

    fn normalize_view(view: CourseView) -> CourseView {
        CourseView {
            name: non_empty(view.name),
            address: non_empty(view.address),
            image_file_name: non_empty(view.image_file_name),
            slug: non_empty(view.slug),
            course_type: non_empty(view.course_type),
            seo_description: non_empty(view.seo_description),
            duration: non_empty(view.duration),
            timezone: non_empty(view.timezone),
            thumbnail: non_empty(view.thumbnail),
            demo_video_storage: non_empty(view.demo_video_storage),
            demo_video_source: non_empty(view.demo_video_source),
            description: non_empty(view.description),
            message_for_reviewer: non_empty(view.message_for_reviewer),
            status: non_empty(view.status),
            created_by: non_empty(view.created_by),
            updated_by: non_empty(view.updated_by),
            deleted_by: non_empty(view.deleted_by),
            ..view
        }
    }
}

impl Course {
    fn bind_mutable<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.name)
            .bind(&self.address)
            .bind(&self.image_file_name)
            .bind(&self.slug)
            .bind(self.instructor_id)
            .bind(self.category_id)
            .bind(&self.course_type)
            .bind(&self.seo_description)
            .bind(&self.duration)
            .bind(&self.timezone)
            .bind(&self.thumbnail)
            .bind(&self.demo_video_storage)
            .bind(&self.demo_video_source)
            .bind(&self.description)
            .bind(self.capacity)
            .bind(self.price)
            .bind(self.discount)
            .bind(self.certificate)
            .bind(self.gna)
            .bind(&self.message_for_reviewer)
            .bind(self.is_approved)
            .bind(&self.status)
            .bind(self.course_level_id)
            .bind(self.course_language_id)
    }
}
