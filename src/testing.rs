//! In-memory doubles for unit and router tests.
//!
//! `MemoryBackend` keeps rows as JSON objects keyed by table and id. Writes made
//! through a transaction-bound repository are staged and only become visible
//! to other readers on commit; a discarded transaction leaves no trace.

use std::{
    collections::{BTreeSet, HashMap},
    marker::PhantomData,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    audit::Audit,
    auth::{
        claims::{Claims, Role},
        extractors::Session,
        repo::AuthRepository,
        repo_types::{User, UserOtp},
        revocation::MemoryRevocationStore,
    },
    config::AppConfig,
    db::{Backend, Entity, Repository},
    error::DbError,
    notifications::{sender::MessageSender, EmailQueue, OutboundEmail},
    policy::RolePolicy,
    state::AppState,
    storage::StorageClient,
};

type Tables = HashMap<&'static str, HashMap<Uuid, Value>>;

struct StagedWrite {
    table: &'static str,
    id: Uuid,
    row: Value,
}

#[derive(Clone)]
pub struct MemoryTx(Arc<Mutex<Option<Vec<StagedWrite>>>>);

#[derive(Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<Mutex<Tables>>,
    auth: Arc<MemoryAuthRepository>,
    commits: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
}

impl MemoryBackend {
    pub fn auth(&self) -> &Arc<MemoryAuthRepository> {
        &self.auth
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Committed rows in `table`, soft-deleted ones included.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    type Tx = MemoryTx;
    type Repo<E: Entity> = MemoryRepository<E>;

    async fn begin(&self) -> Result<MemoryTx, DbError> {
        Ok(MemoryTx(Arc::new(Mutex::new(Some(Vec::new())))))
    }

    async fn commit(&self, tx: &MemoryTx) -> Result<(), DbError> {
        let staged = tx.0.lock().unwrap().take().ok_or(DbError::TransactionClosed)?;
        let mut tables = self.tables.lock().unwrap();
        for write in staged {
            tables.entry(write.table).or_default().insert(write.id, write.row);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn discard(&self, tx: &MemoryTx) {
        if tx.0.lock().unwrap().take().is_some() {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn repository<E: Entity>(&self) -> MemoryRepository<E> {
        MemoryRepository {
            tables: self.tables.clone(),
            tx: None,
            _entity: PhantomData,
        }
    }

    fn auth_repository(&self) -> Arc<dyn AuthRepository> {
        self.auth.clone()
    }
}

pub struct MemoryRepository<E> {
    tables: Arc<Mutex<Tables>>,
    tx: Option<MemoryTx>,
    _entity: PhantomData<fn() -> E>,
}

fn is_live(row: &Value) -> bool {
    row.get("deleted_at").map_or(true, Value::is_null)
}

impl<E: Entity> MemoryRepository<E> {
    /// Latest version of a row as seen from this repository: staged writes of
    /// the bound transaction first, then committed state.
    fn load(&self, id: Uuid) -> Result<Option<Value>, DbError> {
        if let Some(tx) = &self.tx {
            let staged = tx.0.lock().unwrap();
            let staged = staged.as_ref().ok_or(DbError::TransactionClosed)?;
            if let Some(write) = staged
                .iter()
                .rev()
                .find(|w| w.table == E::TABLE && w.id == id)
            {
                return Ok(Some(write.row.clone()));
            }
        }
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(E::TABLE)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    fn store(&self, id: Uuid, row: Value) -> Result<(), DbError> {
        match &self.tx {
            Some(tx) => {
                let mut staged = tx.0.lock().unwrap();
                let staged = staged.as_mut().ok_or(DbError::TransactionClosed)?;
                staged.push(StagedWrite {
                    table: E::TABLE,
                    id,
                    row,
                });
            }
            None => {
                self.tables
                    .lock()
                    .unwrap()
                    .entry(E::TABLE)
                    .or_default()
                    .insert(id, row);
            }
        }
        Ok(())
    }

    fn load_live(&self, id: Uuid) -> Result<Option<Value>, DbError> {
        Ok(self.load(id)?.filter(is_live))
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    type Tx = MemoryTx;

    fn with_transaction(&self, tx: &MemoryTx) -> Self {
        Self {
            tables: self.tables.clone(),
            tx: Some(tx.clone()),
            _entity: PhantomData,
        }
    }

    async fn create_new(&self, entity: &E) -> Result<(), DbError> {
        if self.load(entity.id())?.is_some() {
            return Err(DbError::Constraint(format!(
                "duplicate key {} in {}",
                entity.id(),
                E::TABLE
            )));
        }
        self.store(entity.id(), serde_json::to_value(entity)?)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<E>, DbError> {
        match self.load_live(id)? {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_id_field_mask(
        &self,
        id: Uuid,
        fields: &[String],
    ) -> Result<Option<E::View>, DbError> {
        let Some(Value::Object(row)) = self.load_live(id)? else {
            return Ok(None);
        };
        let projection = E::ALLOW_LIST.resolve(fields);
        let selected: Map<String, Value> = row
            .into_iter()
            .filter(|(k, _)| projection.contains(k))
            .collect();
        let view = serde_json::from_value(Value::Object(selected))?;
        Ok(Some(E::normalize_view(view)))
    }

    async fn update(&self, entity: &E) -> Result<(), DbError> {
        let Some(Value::Object(mut row)) = self.load_live(entity.id())? else {
            return Ok(());
        };
        let Value::Object(new) = serde_json::to_value(entity)? else {
            return Ok(());
        };
        for column in E::UPDATE_COLUMNS {
            if let Some(value) = new.get(*column) {
                row.insert((*column).to_string(), value.clone());
            }
        }
        self.store(entity.id(), Value::Object(row))
    }

    async fn delete(
        &self,
        id: Uuid,
        deleted_at: OffsetDateTime,
        deleted_by: &str,
    ) -> Result<(), DbError> {
        let Some(Value::Object(mut row)) = self.load_live(id)? else {
            return Ok(());
        };
        let at = time::serde::rfc3339::serialize(&deleted_at, serde_json::value::Serializer)?;
        row.insert("deleted_at".into(), at);
        row.insert("deleted_by".into(), Value::String(deleted_by.to_string()));
        self.store(id, Value::Object(row))
    }
}

/// Users keyed by email plus one pending code per email.
#[derive(Default)]
pub struct MemoryAuthRepository {
    users: Mutex<HashMap<String, User>>,
    otps: Mutex<HashMap<String, UserOtp>>,
}

impl MemoryAuthRepository {
    pub fn user(&self, email: &str) -> Option<User> {
        self.users.lock().unwrap().get(email).cloned()
    }

    pub fn otp(&self, email: &str) -> Option<UserOtp> {
        self.otps.lock().unwrap().get(email).cloned()
    }

    /// Moves the stored code's timestamps `by` into the past.
    pub fn backdate_otp(&self, email: &str, by: time::Duration) {
        if let Some(otp) = self.otps.lock().unwrap().get_mut(email) {
            otp.created_at -= by;
            otp.expired_at -= by;
        }
    }
}

#[async_trait]
impl AuthRepository for MemoryAuthRepository {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        Ok(self.user(email).filter(|u| !u.audit.is_deleted()))
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.email) {
            return Err(DbError::Constraint(format!("duplicate email {}", user.email)));
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        updated_by: &str,
    ) -> Result<(), DbError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.values_mut().find(|u| u.id == user_id) {
            user.password_hash = password_hash.to_string();
            user.audit = user.audit.touched(updated_by);
        }
        Ok(())
    }

    async fn upsert_otp(&self, otp: &UserOtp) -> Result<(), DbError> {
        self.otps
            .lock()
            .unwrap()
            .insert(otp.email.clone(), otp.clone());
        Ok(())
    }

    async fn get_otp_by_email(&self, email: &str) -> Result<Option<UserOtp>, DbError> {
        Ok(self.otp(email))
    }

    async fn complete_verification(
        &self,
        user_id: Uuid,
        email: &str,
        verified_at: OffsetDateTime,
    ) -> Result<(), DbError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users
            .values_mut()
            .find(|u| u.id == user_id && u.verified_at.is_none())
        {
            user.verified_at = Some(verified_at);
        }
        self.otps.lock().unwrap().remove(email);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl FakeStorage {
    /// Seeds an object as if it had been uploaded.
    pub fn insert(&self, key: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from_static(b"img"));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.contains(key))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Storage whose every call fails, as an unreachable bucket would.
pub struct FailingStorage;

#[async_trait]
impl StorageClient for FailingStorage {
    async fn put_object(&self, key: &str, _body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        anyhow::bail!("storage unavailable: put {key}")
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        anyhow::bail!("storage unavailable: get {key}")
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        anyhow::bail!("storage unavailable: head {key}")
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        anyhow::bail!("storage unavailable: delete {key}")
    }
}

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(OutboundEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Fails the first `n` sends, then succeeds.
pub struct FlakySender {
    failures_left: Mutex<usize>,
    attempts: AtomicUsize,
    delivered: AtomicUsize,
}

impl FlakySender {
    pub fn failing_times(n: usize) -> Self {
        Self {
            failures_left: Mutex::new(n),
            attempts: AtomicUsize::new(0),
            delivered: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSender for FlakySender {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                anyhow::bail!("smtp unavailable");
            }
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn session_with_role(role: Role) -> Session {
    let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
    Session {
        token: format!("test-token-{}", Uuid::new_v4()),
        claims: Claims {
            sub: Uuid::new_v4(),
            email: format!("{role}@x.com"),
            full_name: format!("Test {role}"),
            role,
            verified_at: None,
            iat: now,
            exp: now + 3600,
            iss: "lms-backend".into(),
            aud: "lms-users".into(),
        },
    }
}

/// Checks that an entity's serialized fields are exactly its allow-list and
/// that the write column lists only name selectable columns.
pub fn assert_entity_columns<E: Entity>(entity: &E) {
    let Value::Object(map) = serde_json::to_value(entity).unwrap() else {
        panic!("{} does not serialize to an object", E::TABLE);
    };
    let fields: BTreeSet<&str> = map.keys().map(String::as_str).collect();
    let allowed: BTreeSet<&str> = E::ALLOW_LIST.columns().iter().copied().collect();
    assert_eq!(fields, allowed, "{} fields vs allow-list", E::TABLE);
    assert_eq!(E::ALLOW_LIST.id_column(), "id");
    for column in E::INSERT_COLUMNS.iter().chain(E::UPDATE_COLUMNS) {
        assert!(allowed.contains(column), "{}: unknown column {column}", E::TABLE);
    }
}

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused/lms".into()),
        "JWT_SECRET" => Some("test-secret".into()),
        "STORAGE_SERVICE_URL" => Some("http://files.local/storage".into()),
        _ => None,
    })
    .unwrap()
}

/// An application wired to in-memory collaborators, with handles on each.
pub struct TestApp {
    pub state: AppState<MemoryBackend>,
    pub backend: MemoryBackend,
    pub storage: Arc<FakeStorage>,
    pub sender: Arc<RecordingSender>,
    pub revocations: Arc<MemoryRevocationStore>,
}

impl TestApp {
    /// Must run inside a Tokio runtime; the email worker is spawned here.
    pub fn new() -> Self {
        Self::with_policy(RolePolicy::default())
    }

    pub fn with_policy(policy: RolePolicy) -> Self {
        let backend = MemoryBackend::default();
        let storage = Arc::new(FakeStorage::default());
        let sender = Arc::new(RecordingSender::default());
        let revocations = Arc::new(MemoryRevocationStore::new());
        let (emails, _worker) =
            EmailQueue::start(sender.clone(), 16, std::time::Duration::from_secs(1));
        let state = AppState::from_parts(
            backend.clone(),
            Arc::new(test_config()),
            storage.clone(),
            revocations.clone(),
            emails,
            policy,
        );
        Self {
            state,
            backend,
            storage,
            sender,
            revocations,
        }
    }

    /// Inserts a user directly and returns a signed session for it.
    pub async fn user_session(&self, role: Role) -> Session {
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}-{}@x.com", role, Uuid::new_v4().simple()),
            password_hash: "unused".into(),
            full_name: format!("Test {role}"),
            role_code: role.as_str().into(),
            verified_at: None,
            audit: Audit::created_now("seed"),
        };
        self.backend.auth().insert_user(&user).await.unwrap();
        let token = self.state.jwt.sign(&user).unwrap();
        let claims = self.state.jwt.verify(&token).unwrap();
        Session { token, claims }
    }
}
