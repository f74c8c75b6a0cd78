use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CreateStoreRequest, EditStoreRequest, StoreDetail},
    repo_types::Store,
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
pub struct StoreService<B: Backend> {
    backend: B,
    policy: Arc<RolePolicy>,
    images: ImageService,
}

impl<B: Backend> StoreService<B> {
    pub fn new(backend: B, policy: Arc<RolePolicy>, images: ImageService) -> Self {
        Self {
            backend,
            policy,
            images,
        }
    }

    fn repo(&self) -> B::Repo<Store> {
        self.backend.repository()
    }

    pub async fn create(
        &self,
        session: &Session,
        req: CreateStoreRequest,
    ) -> Result<ApiResponse<EntityId>, AppError> {
        self.policy.authorize(Operation::CreateStore, session)?;
        let claims = &session.claims;
        let store = req.into_store(Audit::created_now(&claims.full_name));

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<Store>(&self.repo()).create_new(&store).await?;

        if !self
            .images
            .exists(store.id, ImageKind::Store, &store.image_file_name)
            .await?
        {
            warn!(entity_id = %store.id, file = %store.image_file_name, "store image missing");
            return Ok(ApiResponse::bad_request("File not found"));
        }

        uow.commit().await?;
        info!(entity_id = %store.id, user_id = %claims.sub, "store created");
        Ok(ApiResponse::success(
            "Store successfully created",
            EntityId { id: store.id },
        ))
    }

    pub async fn detail(
        &self,
        session: &Session,
        id: Uuid,
        fields: &[String],
    ) -> Result<ApiResponse<StoreDetail>, AppError> {
        self.policy.authorize(Operation::DetailStore, session)?;

        let Some(store) = self.repo().get_by_id_field_mask(id, fields).await? else {
            return Ok(ApiResponse::not_found("Store not found"));
        };

        let image_url = store
            .image_file_name
            .as_deref()
            .map(|file| self.images.url(store.id, ImageKind::Store, file));
        Ok(ApiResponse::success(
            "Store Detail Success",
            StoreDetail { store, image_url },
        ))
    }

    pub async fn edit(
        &self,
        session: &Session,
        id: Uuid,
        req: EditStoreRequest,
    ) -> Result<ApiResponse<EntityId>, AppError> {
        self.policy.authorize(Operation::EditStore, session)?;
        let claims = &session.claims;

        let repo = self.repo();
        let Some(existing) = repo.get_by_id(id).await? else {
            return Ok(ApiResponse::not_found("Store not found"));
        };
        let store = req.into_store(id, existing.audit.touched(&claims.full_name));

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<Store>(&repo).update(&store).await?;

        if existing.image_file_name != store.image_file_name {
            if !self
                .images
                .exists(id, ImageKind::Store, &store.image_file_name)
                .await?
            {
                warn!(entity_id = %id, file = %store.image_file_name, "new store image missing");
                return Ok(ApiResponse::bad_request("Image not found"));
            }
            if !existing.image_file_name.is_empty() {
                self.images
                    .remove(id, ImageKind::Store, &existing.image_file_name)
                    .await?;
            }
        }

        uow.commit().await?;
        info!(entity_id = %id, user_id = %claims.sub, "store edited");
        Ok(ApiResponse::success("Edit Store Success", EntityId { id }))
    }

    pub async fn delete(&self, session: &Session, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        self.policy.authorize(Operation::DeleteStore, session)?;
        let claims = &session.claims;

        let repo = self.repo();
        let Some(existing) = repo.get_by_id(id).await? else {
            return Ok(ApiResponse::not_found("Store not found"));
        };

        let uow = UnitOfWork::begin(&self.backend).await?;
        uow.bind::<Store>(&repo)
            .delete(id, OffsetDateTime::now_utc(), &claims.full_name)
            .await?;

        if !existing.image_file_name.is_empty() {
            self.images
                .remove(id, ImageKind::Store, &existing.image_file_name)
                .await?;
        }

        uow.commit().await?;
        info!(entity_id = %id, user_id = %claims.sub, "store soft-deleted");
        Ok(ApiResponse::ok("Delete with SoftDelete Store Success"))
    }
}
