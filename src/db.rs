use std::{marker::PhantomData, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{
    postgres::{PgArguments, PgPoolOptions, PgRow},
    FromRow, PgPool, Postgres, Transaction,
};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::repo::{AuthRepository, PgAuthRepository},
    error::DbError,
    field_mask::AllowList,
};

pub type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// A soft-deletable table row carrying the audit envelope.
///
/// Column lists are compile-time constants; the field names of the row and of
/// its `View` match the column names.
pub trait Entity:
    for<'r> FromRow<'r, PgRow>
    + Serialize
    + DeserializeOwned
    + Clone
    + Send
    + Sync
    + Unpin
    + 'static
{
    /// Field-masked shape: every field optional, absent when not selected.
    type View: for<'r> FromRow<'r, PgRow> + DeserializeOwned + Default + Send + Unpin + 'static;

    const TABLE: &'static str;
    /// Every selectable column, `id` first.
    const ALLOW_LIST: AllowList;
    /// Columns written by `create_new`, in `bind_insert` order.
    const INSERT_COLUMNS: &'static [&'static str];
    /// Columns written by `update`, in `bind_update` order.
    const UPDATE_COLUMNS: &'static [&'static str];

    fn id(&self) -> Uuid;
    fn bind_insert<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;
    fn bind_update<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;
    /// Turns empty strings into absent values.
    fn normalize_view(view: Self::View) -> Self::View;
}

/// Row mover for one entity. Never begins, commits or rolls back.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync + Sized + 'static {
    type Tx;

    /// Same repository, bound to `tx` instead of the shared pool.
    fn with_transaction(&self, tx: &Self::Tx) -> Self;

    async fn create_new(&self, entity: &E) -> Result<(), DbError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<E>, DbError>;
    async fn get_by_id_field_mask(
        &self,
        id: Uuid,
        fields: &[String],
    ) -> Result<Option<E::View>, DbError>;
    async fn update(&self, entity: &E) -> Result<(), DbError>;
    async fn delete(
        &self,
        id: Uuid,
        deleted_at: OffsetDateTime,
        deleted_by: &str,
    ) -> Result<(), DbError>;
}

/// A persistence backend: transaction lifecycle plus repository factories.
#[async_trait]
pub trait Backend: Clone + Send + Sync + 'static {
    type Tx: Clone + Send + Sync + 'static;
    type Repo<E: Entity>: Repository<E, Tx = Self::Tx>;

    async fn begin(&self) -> Result<Self::Tx, DbError>;
    async fn commit(&self, tx: &Self::Tx) -> Result<(), DbError>;
    /// Rolls back synchronously; a no-op once committed.
    fn discard(&self, tx: &Self::Tx);

    fn repository<E: Entity>(&self) -> Self::Repo<E>;
    fn auth_repository(&self) -> Arc<dyn AuthRepository>;
}

/// Scoped transaction. Dropping it without `commit` rolls back, whatever the
/// exit path (early return, `?`, panic unwind, cancelled future).
pub struct UnitOfWork<B: Backend> {
    backend: B,
    tx: B::Tx,
    finished: bool,
}

impl<B: Backend> UnitOfWork<B> {
    pub async fn begin(backend: &B) -> Result<Self, DbError> {
        let tx = backend.begin().await?;
        Ok(Self {
            backend: backend.clone(),
            tx,
            finished: false,
        })
    }

    pub fn bind<E: Entity>(&self, repo: &B::Repo<E>) -> B::Repo<E> {
        repo.with_transaction(&self.tx)
    }

    pub async fn commit(mut self) -> Result<(), DbError> {
        let result = self.backend.commit(&self.tx).await;
        self.finished = result.is_ok();
        result
    }
}

impl<B: Backend> Drop for UnitOfWork<B> {
    fn drop(&mut self) {
        if !self.finished {
            self.backend.discard(&self.tx);
            debug!("transaction rolled back");
        }
    }
}

// ---- Postgres ----

#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Transaction shared by every repository of one unit of work.
#[derive(Clone)]
pub struct PgTx(Arc<Mutex<Option<Transaction<'static, Postgres>>>>);

#[async_trait]
impl Backend for PgBackend {
    type Tx = PgTx;
    type Repo<E: Entity> = PgRepository<E>;

    async fn begin(&self) -> Result<PgTx, DbError> {
        let tx = self.pool.begin().await?;
        Ok(PgTx(Arc::new(Mutex::new(Some(tx)))))
    }

    async fn commit(&self, tx: &PgTx) -> Result<(), DbError> {
        let inner = tx.0.lock().await.take().ok_or(DbError::TransactionClosed)?;
        inner.commit().await?;
        Ok(())
    }

    fn discard(&self, tx: &PgTx) {
        // Dropping the sqlx transaction queues its ROLLBACK.
        if let Ok(mut guard) = tx.0.try_lock() {
            guard.take();
        }
    }

    fn repository<E: Entity>(&self) -> PgRepository<E> {
        PgRepository {
            conn: Conn::Pool(self.pool.clone()),
            _entity: PhantomData,
        }
    }

    fn auth_repository(&self) -> Arc<dyn AuthRepository> {
        Arc::new(PgAuthRepository::new(self.pool.clone()))
    }
}

#[derive(Clone)]
enum Conn {
    Pool(PgPool),
    Tx(PgTx),
}

pub struct PgRepository<E> {
    conn: Conn,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> PgRepository<E> {
    async fn execute(&self, query: PgQuery<'_>) -> Result<u64, DbError> {
        let done = match &self.conn {
            Conn::Pool(pool) => query.execute(pool).await?,
            Conn::Tx(tx) => {
                let mut guard = tx.0.lock().await;
                let conn = guard.as_mut().ok_or(DbError::TransactionClosed)?;
                query.execute(&mut **conn).await?
            }
        };
        Ok(done.rows_affected())
    }

    async fn fetch_optional<T>(
        &self,
        query: sqlx::query::QueryAs<'_, Postgres, T, PgArguments>,
    ) -> Result<Option<T>, DbError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let row = match &self.conn {
            Conn::Pool(pool) => query.fetch_optional(pool).await?,
            Conn::Tx(tx) => {
                let mut guard = tx.0.lock().await;
                let conn = guard.as_mut().ok_or(DbError::TransactionClosed)?;
                query.fetch_optional(&mut **conn).await?
            }
        };
        Ok(row)
    }

    fn select_sql(columns: &str) -> String {
        format!(
            "SELECT {columns} FROM {} WHERE id = $1 AND deleted_at IS NULL",
            E::TABLE
        )
    }
}

fn quoted(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        quoted(columns)
    )
}

fn update_sql(table: &str, columns: &[&str]) -> String {
    let sets = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("\"{c}\" = ${}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {table} SET {sets} WHERE id = ${} AND deleted_at IS NULL",
        columns.len() + 1
    )
}

#[async_trait]
impl<E: Entity> Repository<E> for PgRepository<E> {
    type Tx = PgTx;

    fn with_transaction(&self, tx: &PgTx) -> Self {
        Self {
            conn: Conn::Tx(tx.clone()),
            _entity: PhantomData,
        }
    }

    async fn create_new(&self, entity: &E) -> Result<(), DbError> {
        let sql = insert_sql(E::TABLE, E::INSERT_COLUMNS);
        let query = entity.bind_insert(sqlx::query(&sql));
        self.execute(query).await.map_err(|e| match e {
            DbError::Sqlx(e) => DbError::from_insert(e),
            other => other,
        })?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<E>, DbError> {
        let sql = Self::select_sql(&quoted(E::ALLOW_LIST.columns()));
        self.fetch_optional(sqlx::query_as::<_, E>(&sql).bind(id))
            .await
    }

    async fn get_by_id_field_mask(
        &self,
        id: Uuid,
        fields: &[String],
    ) -> Result<Option<E::View>, DbError> {
        let projection = E::ALLOW_LIST.resolve(fields);
        let sql = Self::select_sql(&projection.to_sql());
        let view = self
            .fetch_optional(sqlx::query_as::<_, E::View>(&sql).bind(id))
            .await?;
        Ok(view.map(E::normalize_view))
    }

    async fn update(&self, entity: &E) -> Result<(), DbError> {
        let sql = update_sql(E::TABLE, E::UPDATE_COLUMNS);
        let query = entity.bind_update(sqlx::query(&sql)).bind(entity.id());
        self.execute(query).await?;
        Ok(())
    }

    async fn delete(
        &self,
        id: Uuid,
        deleted_at: OffsetDateTime,
        deleted_by: &str,
    ) -> Result<(), DbError> {
        let sql = format!(
            "UPDATE {} SET deleted_at = $1, deleted_by = $2 WHERE id = $3 AND deleted_at IS NULL",
            E::TABLE
        );
        let query = sqlx::query(&sql).bind(deleted_at).bind(deleted_by).bind(id);
        self.execute(query).await?;
        Ok(())
    }
}
