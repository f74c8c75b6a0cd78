use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::repo_types::{Course, CourseView};
use crate::audit::Audit;

/// Optional course attributes shared by create and edit bodies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CourseDetails {
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
}

/// `id` is the one returned by the image upload; absent means a new one.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateCourseRequest {
    pub id: Option<Uuid>,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Image file name is required"))]
    pub image_file_name: String,
    #[serde(flatten)]
    pub details: CourseDetails,
}

/// Full replacement of a course's mutable fields.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct EditCourseRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Image file name is required"))]
    pub image_file_name: String,
    #[serde(flatten)]
    pub details: CourseDetails,
}

#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: CourseView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CourseDetails {
    pub fn into_course(
        self,
        id: Uuid,
        name: String,
        address: String,
        image_file_name: String,
        audit: Audit,
    ) -> Course {
        Course {
            id,
            name,
            address,
            image_file_name,
            slug: self.slug,
            instructor_id: self.instructor_id,
            category_id: self.category_id,
            course_type: self.course_type,
            seo_description: self.seo_description,
            duration: self.duration,
            timezone: self.timezone,
            thumbnail: self.thumbnail,
            demo_video_storage: self.demo_video_storage,
            demo_video_source: self.demo_video_source,
            description: self.description,
            capacity: self.capacity,
            price: self.price,
            discount: self.discount,
            certificate: self.certificate,
            gna: self.gna,
            message_for_reviewer: self.message_for_reviewer,
            is_approved: self.is_approved,
            status: self.status,
            course_level_id: self.course_level_id,
            course_language_id: self.course_language_id,
            audit,
        }
    }
}
