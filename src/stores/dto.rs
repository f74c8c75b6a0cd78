use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::repo_types::{Store, StoreView};
use crate::audit::Audit;

/// `id` is the one returned by the image upload; absent means a new one.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateStoreRequest {
    pub id: Option<Uuid>,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Image file name is required"))]
    pub image_file_name: String,
    pub slug: Option<String>,
    pub instructor_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct EditStoreRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Image file name is required"))]
    pub image_file_name: String,
    pub slug: Option<String>,
    pub instructor_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StoreDetail {
    #[serde(flatten)]
    pub store: StoreView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl EditStoreRequest {
    pub fn into_store(self, id: Uuid, audit: Audit) -> Store {
        Store {
            id,
            name: self.name,
            address: self.address,
            image_file_name: self.image_file_name,
            slug: self.slug,
            instructor_id: self.instructor_id,
            category_id: self.category_id,
            audit,
        }
    }
}

impl CreateStoreRequest {
    pub fn into_store(self, audit: Audit) -> Store {
        Store {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name,
            address: self.address,
            image_file_name: self.image_file_name,
            slug: self.slug,
            instructor_id: self.instructor_id,
            category_id: self.category_id,
            audit,
        }
    }
}
