use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CourseDetail, CreateCourseRequest, EditCourseRequest},
    repo_types::Course,
};
use crate::{
    audit::Audit,
    auth::extractors::Session,
    db::{Backend, Repository, UnitOfWork},
    error::AppError,
    images::services::{ImageKind, ImageService},
    policy::{Operation, RolePolicy},
    response::{ApiResponse, EntityId},
};

#[derive(Clone)]
pub struct CourseService<B: Backend> {
    backend: B,
    policy: Arc<RolePolicy>,
    images: ImageService,
}

impl<B: Backend> CourseService<B> {
    pub fn new(backend: B, policy: Arc<RolePolicy>, images: ImageService) -> Self {
        Self {
            backend,
            policy,
            images,
        }
    }

    fn repo(&self) -> B::Repo<Course> {
        self.backend.repository()
    }

    /// Inserts the course, then requires its uploaded image to exist; without
    /// it the insert is rolled back.
    pub async fn create(
        &self,
        session: &Session,
        req: CreateCourseRequest,
    ) -> Result<ApiResponse<EntityId>, AppError> {
        self.policy.authorize(Operation::CreateCourse, session)?;
        let claims = &session.claims;

        let course = req.details.into_course(
            req.id.unwrap_or_else(Uuid::new_v4),
            req.name,
            req.address,
            req.image_file_name,
            Audit::created_now(&claims.full_name),
        );

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<Course>(&self.repo()).create_new(&course).await?;

        if !self
            .images
            .exists(course.id, ImageKind::Course, &course.image_file_name)
            .await?
        {
            warn!(entity_id = %course.id, file = %course.image_file_name, "course image missing");
            return Ok(ApiResponse::bad_request("File not found"));
        }

        uow.commit().await?;
        info!(entity_id = %course.id, user_id = %claims.sub, "course created");
        Ok(ApiResponse::success(
            "Course successfully created",
            EntityId { id: course.id },
        ))
    }

    pub async fn detail(
        &self,
        session: &Session,
        id: Uuid,
        fields: &[String],
    ) -> Result<ApiResponse<CourseDetail>, AppError> {
        self.policy.authorize(Operation::DetailCourse, session)?;

        let Some(course) = self.repo().get_by_id_field_mask(id, fields).await? else {
            return Ok(ApiResponse::not_found("Course not found"));
        };

        let image_url = course
            .image_file_name
            .as_deref()
            .map(|file| self.images.url(course.id, ImageKind::Course, file));
        Ok(ApiResponse::success(
            "Course Detail Success",
            CourseDetail { course, image_url },
        ))
    }

    /// Full-row overwrite. A changed image must already be uploaded; the old
    /// file is removed before commit.
    pub async fn edit(
        &self,
        session: &Session,
        id: Uuid,
        req: EditCourseRequest,
    ) -> Result<ApiResponse<EntityId>, AppError> {
        self.policy.authorize(Operation::EditCourse, session)?;
        let claims = &session.claims;

        let repo = self.repo();
        let Some(existing) = repo.get_by_id(id).await? else {
            return Ok(ApiResponse::not_found("Course not found"));
        };

        let course = req.details.into_course(
            id,
            req.name,
            req.address,
            req.image_file_name,
            existing.audit.touched(&claims.full_name),
        );

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<Course>(&repo).update(&course).await?;

        if existing.image_file_name != course.image_file_name {
            if !self
                .images
                .exists(id, ImageKind::Course, &course.image_file_name)
                .await?
            {
                warn!(entity_id = %id, file = %course.image_file_name, "new course image missing");
                return Ok(ApiResponse::bad_request("Image not found"));
            }
            if !existing.image_file_name.is_empty() {
                self.images
                    .remove(id, ImageKind::Course, &existing.image_file_name)
                    .await?;
            }
        }

        uow.commit().await?;
        info!(entity_id = %id, user_id = %claims.sub, "course edited");
        Ok(ApiResponse::success("Edit Course Success", EntityId { id }))
    }

    pub async fn delete(&self, session: &Session, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        self.policy.authorize(Operation::DeleteCourse, session)?;
        let claims = &session.claims;

        let repo = self.repo();
        let Some(existing) = repo.get_by_id(id).await? else {
            return Ok(ApiResponse::not_found("Course not found"));
        };

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<Course>(&repo)
            .delete(id, OffsetDateTime::now_utc(), &claims.full_name)
            .await?;

        if !existing.image_file_name.is_empty() {
            self.images
                .remove(id, ImageKind::Course, &existing.image_file_name)
                .await?;
        }

        uow.commit().await?;
        info!(entity_id = %id, user_id = %claims.sub, "course soft-deleted");
        Ok(ApiResponse::ok("Delete with SoftDelete Course Success"))
    }
}
