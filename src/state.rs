use std::{sync::Arc, time::Duration};

use tracing::info;

use crate::{
    auth::{
        jwt::JwtKeys,
        revocation::{MemoryRevocationStore, RevocationStore},
        services::AuthService,
    },
    chapters::services::CourseChapterService,
    config::AppConfig,
    courses::services::CourseService,
    db::{Backend, PgBackend},
    images::services::ImageService,
    lessons::services::ChapterLessonService,
    notifications::{EmailQueue, SmtpSender},
    policy::RolePolicy,
    storage::{self, StorageClient},
    stores::services::StoreService,
};

#[derive(Clone)]
pub struct AppState<B: Backend = PgBackend> {
    pub backend: B,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub revocations: Arc<dyn RevocationStore>,
    pub images: ImageService,
    pub policy: Arc<RolePolicy>,
    pub auth: AuthService,
    pub courses: CourseService<B>,
    pub stores: StoreService<B>,
    pub chapters: CourseChapterService<B>,
    pub lessons: ChapterLessonService<B>,
}

impl AppState<PgBackend> {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let backend = PgBackend::connect(&config.database_url).await?;
        let storage = storage::from_config(&config.storage).await?;
        info!(backend = ?config.storage.backend, "storage ready");

        let sender = Arc::new(SmtpSender::new(&config.smtp)?);
        let (emails, _worker) = EmailQueue::start(
            sender,
            config.email_queue.capacity,
            Duration::from_secs(config.email_queue.retry_max_seconds),
        );

        Ok(Self::from_parts(
            backend,
            config,
            storage,
            Arc::new(MemoryRevocationStore::new()),
            emails,
            RolePolicy::default(),
        ))
    }
}

impl<B: Backend> AppState<B> {
    pub fn from_parts(
        backend: B,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        revocations: Arc<dyn RevocationStore>,
        emails: EmailQueue,
        policy: RolePolicy,
    ) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        let images = ImageService::new(storage, config.storage.service_url.clone());
        let policy = Arc::new(policy);
        let auth = AuthService::new(
            backend.auth_repository(),
            jwt.clone(),
            revocations.clone(),
            emails,
            config.otp.policy(),
        );

        Self {
            courses: CourseService::new(backend.clone(), policy.clone(), images.clone()),
            stores: StoreService::new(backend.clone(), policy.clone(), images.clone()),
            chapters: CourseChapterService::new(backend.clone(), policy.clone()),
            lessons: ChapterLessonService::new(backend.clone(), policy.clone()),
            backend,
            config,
            jwt,
            revocations,
            images,
            policy,
            auth,
        }
    }
}
