use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::ChapterLessonRequest,
    repo_types::{ChapterLesson, ChapterLessonView},
};
use crate::{
    audit::Audit,
    auth::extractors::Session,
    db::{Backend, Repository, UnitOfWork},
    error::AppError,
    policy::{Operation, RolePolicy},
    response::{ApiResponse, EntityId},
};

#[derive(Clone)]
pub struct ChapterLessonService<B: Backend> {
    backend: B,
    policy: Arc<RolePolicy>,
}

impl<B: Backend> ChapterLessonService<B> {
    pub fn new(backend: B, policy: Arc<RolePolicy>) -> Self {
        Self { backend, policy }
    }

    fn repo(&self) -> B::Repo<ChapterLesson> {
        self.backend.repository()
    }

    pub async fn create(
        &self,
        session: &Session,
        req: ChapterLessonRequest,
    ) -> Result<ApiResponse<EntityId>, AppError> {
        self.policy.authorize(Operation::CreateLesson, session)?;
        let claims = &session.claims;
        let lesson = req.into_lesson(Uuid::new_v4(), Audit::created_now(&claims.full_name));

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<ChapterLesson>(&self.repo())
            .create_new(&lesson)
            .await?;
        uow.commit().await?;

        info!(entity_id = %lesson.id, course_id = %lesson.course_id, "chapter lesson created");
        Ok(ApiResponse::success(
            "Course chapter lesson successfully created",
            EntityId { id: lesson.id },
        ))
    }

    pub async fn detail(
        &self,
        session: &Session,
        id: Uuid,
        fields: &[String],
    ) -> Result<ApiResponse<ChapterLessonView>, AppError> {
        self.policy.authorize(Operation::DetailLesson, session)?;

        match self.repo().get_by_id_field_mask(id, fields).await? {
            Some(lesson) => Ok(ApiResponse::success(
                "Course Chapter Lesson Detail Success",
                lesson,
            )),
            None => Ok(ApiResponse::not_found("Course chapter lesson not found")),
        }
    }

    pub async fn edit(
        &self,
        session: &Session,
        id: Uuid,
        req: ChapterLessonRequest,
    ) -> Result<ApiResponse<EntityId>, AppError> {
        self.policy.authorize(Operation::EditLesson, session)?;
        let claims = &session.claims;

        let repo = self.repo();
        let Some(existing) = repo.get_by_id(id).await? else {
            return Ok(ApiResponse::not_found("Course chapter lesson not found"));
        };
        let lesson = req.into_lesson(id, existing.audit.touched(&claims.full_name));

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<ChapterLesson>(&repo).update(&lesson).await?;
        uow.commit().await?;

        info!(entity_id = %id, user_id = %claims.sub, "chapter lesson edited");
        Ok(ApiResponse::success(
            "Edit Course Chapter Lesson Success",
            EntityId { id },
        ))
    }

    pub async fn delete(&self, session: &Session, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        self.policy.authorize(Operation::DeleteLesson, session)?;
        let claims = &session.claims;

        let repo = self.repo();
        if repo.get_by_id(id).await?.is_none() {
            return Ok(ApiResponse::not_found("Course chapter lesson not found"));
        }

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<ChapterLesson>(&repo)
            .delete(id, OffsetDateTime::now_utc(), &claims.full_name)
            .await?;
        uow.commit().await?;

        info!(entity_id = %id, user_id = %claims.sub, "chapter lesson soft-deleted");
        Ok(ApiResponse::ok(
            "Delete with SoftDelete Course Chapter Lesson Success",
        ))
    }
}
