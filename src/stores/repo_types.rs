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
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub image_file_name: String,
    pub slug: Option<String>,
    pub instructor_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(default)]
#[sqlx(default)]
pub struct StoreView {
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

impl Entity for Store {
    type View = StoreView;

    const TABLE: &'static str = "stores";
    const ALLOW_LIST: AllowList = AllowList::new(&[
        "id",
        "name",
        "address",
        "image_file_name",
        "slug",
        "instructor_id",
        "category_id",
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
        "updated_at",
        "updated_by",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn bind_insert<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(&self.name)
            .bind(&self.address)
            .bind(&self.image_file_name)
            .bind(&self.slug)
            .bind(self.instructor_id)
            .bind(self.category_id)
            .bind(self.audit.created_at)
            .bind(&self.audit.created_by)
    }

    fn bind_update<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.name)
            .bind(&self.address)
            .bind(&self.image_file_name)
            .bind(&self.slug)
            .bind(self.instructor_id)
            .bind(self.category_id)
            .bind(self.audit.updated_at)
            .bind(&self.audit.updated_by)
    }

    fn normalize_view(view: StoreView) -> StoreView {
        StoreView {
            name: non_empty(view.name),
            address: non_empty(view.address),
            image_file_name: non_empty(view.image_file_name),
            slug: non_empty(view.slug),
            created_by: non_empty(view.created_by),
            updated_by: non_empty(view.updated_by),
            deleted_by: non_empty(view.deleted_by),
            ..view
        }
    }
}
