use crate::db::connector::DbConnector;
use crate::db::schema::{
    COUNTER_TABLE, CREATE_COUNTER_TABLE, DELETE_COUNTER_ROWS, INSERT_COUNTER_ROW,
    PG_UNDEFINED_TABLE, SELECT_COUNTER_ROWS, UPDATE_COUNTER_ROW,
};
use crate::error::TierError;
use crate::service::connection::{ConnectionProvider, Connector};
use crate::types::counter::{Count, CounterStore};
use async_trait::async_trait;
use sqlx::AnyPool;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Create the counter table if missing and converge it to the single row `(0, count)`.
///
/// Safe to call any number of times; a correct table is left untouched.
pub async fn ensure_table(pool: &AnyPool) -> Result<(), TierError> {
    match sqlx::query(SELECT_COUNTER_ROWS).fetch_all(pool).await {
        Ok(_) => {}
        Err(e) if is_undefined_table(&e) => {
            info!(table = COUNTER_TABLE, "counter table missing; creating");
            sqlx::query(CREATE_COUNTER_TABLE).execute(pool).await?;
        }
        Err(e) => return Err(e.into()),
    }

    let mut tx = pool.begin().await?;
    let rows: Vec<(i64, Option<i64>)> = sqlx::query_as(SELECT_COUNTER_ROWS)
        .fetch_all(&mut *tx)
        .await?;

    let reset = match rows.as_slice() {
        [] => false,
        [(id, count)] => {
            info!(id, count = ?count, "initial counter row");
            if *id != 0 {
                info!(id, "expected counter row id 0; clearing table");
            }
            *id != 0
        }
        many => {
            warn!(rows = many.len(), "expected 1 counter row; clearing table");
            true
        }
    };

    if reset {
        sqlx::query(DELETE_COUNTER_ROWS).execute(&mut *tx).await?;
    }
    if reset || rows.is_empty() {
        sqlx::query(INSERT_COUNTER_ROW)
            .bind(0_i64)
            .bind(0_i64)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Read-increment-write the counter row inside one transaction.
///
/// Anything other than exactly one row with id 0 is a corrupt table and is
/// returned as an error rather than repaired.
pub async fn increment(pool: &AnyPool) -> Result<Count, TierError> {
    let mut tx = pool.begin().await?;
    let rows: Vec<(i64, Option<i64>)> = sqlx::query_as(SELECT_COUNTER_ROWS)
        .fetch_all(&mut *tx)
        .await?;

    let current = match rows.as_slice() {
        [(0, count)] => count.unwrap_or(0),
        [(id, _)] => {
            return Err(TierError::CounterCorrupt(format!(
                "expected row id 0, found {id}"
            )));
        }
        other => {
            return Err(TierError::CounterCorrupt(format!(
                "expected 1 row, found {}",
                other.len()
            )));
        }
    };

    let count = current
        .checked_add(1)
        .ok_or_else(|| TierError::CounterCorrupt(format!("count {current} cannot grow")))?;
    sqlx::query(UPDATE_COUNTER_ROW)
        .bind(count)
        .bind(0_i64)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(count, "postgresql counter incremented");
    Ok(Count { count })
}

fn is_undefined_table(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };
    db_err.code().as_deref() == Some(PG_UNDEFINED_TABLE)
        || db_err.message().contains("no such table")
}

/// Counter row in a relational table, reached through a lazily opened pool.
pub struct RelationalCounter<C = DbConnector>
where
    C: Connector<Handle = AnyPool>,
{
    provider: ConnectionProvider<C>,
    table_ready: OnceCell<()>,
}

impl<C> RelationalCounter<C>
where
    C: Connector<Handle = AnyPool>,
{
    pub fn new(connector: C) -> Self {
        Self {
            provider: ConnectionProvider::new(connector),
            table_ready: OnceCell::new(),
        }
    }

    pub fn provider(&self) -> &ConnectionProvider<C> {
        &self.provider
    }
}

#[async_trait]
impl<C> CounterStore for RelationalCounter<C>
where
    C: Connector<Handle = AnyPool>,
{
    async fn increment(&self) -> Result<Count, TierError> {
        let pool = self
            .provider
            .get_connection()
            .await
            .ok_or(TierError::BackendUnavailable(self.provider.backend()))?;

        self.table_ready
            .get_or_try_init(|| ensure_table(&pool))
            .await?;

        increment(&pool).await
    }
}
