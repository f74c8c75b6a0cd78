use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::CourseChapterRequest,
    repo_types::{CourseChapter, CourseChapterView},
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
pub struct CourseChapterService<B: Backend> {
    backend: B,
    policy: Arc<RolePolicy>,
}

impl<B: Backend> CourseChapterService<B> {
    pub fn new(backend: B, policy: Arc<RolePolicy>) -> Self {
        Self { backend, policy }
    }

    fn repo(&self) -> B::Repo<CourseChapter> {
        self.backend.repository()
    }

    pub async fn create(
        &self,
        session: &Session,
        req: CourseChapterRequest,
    ) -> Result<ApiResponse<EntityId>, AppError> {
        self.policy.authorize(Operation::CreateChapter, session)?;
        let claims = &session.claims;
        let chapter = req.into_chapter(Uuid::new_v4(), Audit::created_now(&claims.full_name));

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<CourseChapter>(&self.repo())
            .create_new(&chapter)
            .await?;
        uow.commit().await?;

        info!(entity_id = %chapter.id, course_id = %chapter.course_id, "course chapter created");
        Ok(ApiResponse::success(
            "Course chapter successfully created",
            EntityId { id: chapter.id },
        ))
    }

    pub async fn detail(
        &self,
        session: &Session,
        id: Uuid,
        fields: &[String],
    ) -> Result<ApiResponse<CourseChapterView>, AppError> {
        self.policy.authorize(Operation::DetailChapter, session)?;

        match self.repo().get_by_id_field_mask(id, fields).await? {
            Some(chapter) => Ok(ApiResponse::success("Course Chapter Detail Success", chapter)),
            None => Ok(ApiResponse::not_found("Course chapter not found")),
        }
    }

    pub async fn edit(
        &self,
        session: &Session,
        id: Uuid,
        req: CourseChapterRequest,
    ) -> Result<ApiResponse<EntityId>, AppError> {
        self.policy.authorize(Operation::EditChapter, session)?;
        let claims = &session.claims;

        let repo = self.repo();
        let Some(existing) = repo.get_by_id(id).await? else {
            return Ok(ApiResponse::not_found("Course chapter not found"));
        };
        let chapter = req.into_chapter(id, existing.audit.touched(&claims.full_name));

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<CourseChapter>(&repo).update(&chapter).await?;
        uow.commit().await?;

        info!(entity_id = %id, user_id = %claims.sub, "course chapter edited");
        Ok(ApiResponse::success(
            "Edit Course Chapter Success",
            EntityId { id },
        ))
    }

    pub async fn delete(&self, session: &Session, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        self.policy.authorize(Operation::DeleteChapter, session)?;
        let claims = &session.claims;

        let repo = self.repo();
        if repo.get_by_id(id).await?.is_none() {
            return Ok(ApiResponse::not_found("Course chapter not found"));
        }

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<CourseChapter>(&repo)
            .delete(id, OffsetDateTime::now_utc(), &claims.full_name)
            .await?;
        uow.commit().await?;

        info!(entity_id = %id, user_id = %claims.sub, "course chapter soft-deleted");
        Ok(ApiResponse::ok("Delete with SoftDelete Course Chapter Success"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::claims::Role,
        testing::{session_with_role, TestApp},
    };

    fn chapter_req(title: &str, order: i32) -> CourseChapterRequest {
        CourseChapterRequest {
            instructor_id: Some(Uuid::new_v4()),
            course_id: Some(Uuid::new_v4()),
            title: title.into(),
            order,
            status: "draft".into(),
        }
    }

    #[tokio::test]
    async fn create_generates_id_and_commits() {
        let app = TestApp::new();
        let owner = session_with_role(Role::Owner);

        let res = app
            .state
            .chapters
            .create(&owner, chapter_req("Intro", 1))
            .await
            .unwrap();
        assert_eq!(res.base.message, "Course chapter successfully created");
        let id = res.data.unwrap().id;
        assert_eq!(app.backend.commits(), 1);

        let stored = app.state.chapters.repo().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Intro");
        assert_eq!(stored.audit.created_by, "Test owner");
    }

    #[tokio::test]
    async fn duplicate_order_values_are_accepted() {
        let app = TestApp::new();
        let owner = session_with_role(Role::Owner);
        let a = app.state.chapters.create(&owner, chapter_req("A", 1)).await.unwrap();
        let b = app.state.chapters.create(&owner, chapter_req("B", 1)).await.unwrap();
        assert!(!a.is_error() && !b.is_error());
        assert_eq!(app.backend.row_count("course_chapters"), 2);
    }

    #[tokio::test]
    async fn edit_then_detail_reflects_every_field() {
        let app = TestApp::new();
        let owner = session_with_role(Role::Owner);
        let id = app
            .state
            .chapters
            .create(&owner, chapter_req("Intro", 1))
            .await
            .unwrap()
            .data
            .unwrap()
            .id;

        let update = chapter_req("Ownership", 3);
        let course_id = update.course_id;
        let res = app.state.chapters.edit(&owner, id, update).await.unwrap();
        assert_eq!(res.base.message, "Edit Course Chapter Success");

        let view = app
            .state
            .chapters
            .detail(&owner, id, &[])
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(view.title.as_deref(), Some("Ownership"));
        assert_eq!(view.order, Some(3));
        assert_eq!(view.course_id, course_id);
        assert_eq!(view.updated_by.as_deref(), Some("Test owner"));
        assert_eq!(view.deleted_at, None);
    }

    #[tokio::test]
    async fn delete_hides_the_row() {
        let app = TestApp::new();
        let owner = session_with_role(Role::Owner);
        let id = app
            .state
            .chapters
            .create(&owner, chapter_req("Intro", 1))
            .await
            .unwrap()
            .data
            .unwrap()
            .id;

        let res = app.state.chapters.delete(&owner, id).await.unwrap();
        assert_eq!(res.base.message, "Delete with SoftDelete Course Chapter Success");
        let detail = app.state.chapters.detail(&owner, id, &[]).await.unwrap();
        assert_eq!(detail.base.status_code, 404);
        assert_eq!(detail.base.message, "Course chapter not found");
        let edit = app
            .state
            .chapters
            .edit(&owner, id, chapter_req("x", 1))
            .await
            .unwrap();
        assert_eq!(edit.base.status_code, 404);
    }

    #[tokio::test]
    async fn wrong_role_is_unauthenticated() {
        let app = TestApp::new();
        let instructor = session_with_role(Role::Instructor);
        let res = app
            .state
            .chapters
            .create(&instructor, chapter_req("Intro", 1))
            .await;
        assert!(matches!(res, Err(AppError::Unauthenticated)));
        assert_eq!(app.backend.row_count("course_chapters"), 0);
    }
}
