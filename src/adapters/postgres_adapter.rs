//! PostgreSQL key-value adapter.

use crate::domain::error::JournalError;
use crate::ports::kv_port::KvPort;
use postgres::NoTls;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use tracing::info;

type Manager = PostgresConnectionManager<NoTls>;

pub struct PostgresAdapter {
    pool: Pool<Manager>,
}

impl PostgresAdapter {
    pub fn connect(connection_string: &str, pool_size: u32) -> Result<Self, JournalError> {
        let config: postgres::Config =
            connection_string
                .parse()
                .map_err(|e: postgres::Error| JournalError::Database {
                    reason: format!("invalid connection string: {e}"),
                })?;

        let manager = PostgresConnectionManager::new(config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| JournalError::Database {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        info!("postgres storage connected");
        Ok(adapter)
    }

    pub fn initialize_schema(&self) -> Result<(), JournalError> {
        self.conn()?
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS public.fxjournal_kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )",
            )
            .map_err(|e| JournalError::Database {
                reason: e.to_string(),
            })
    }

    fn conn(&self) -> Result<PooledConnection<Manager>, JournalError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| JournalError::Database {
                reason: e.to_string(),
            })
    }
}

impl KvPort for PostgresAdapter {
    fn get(&self, key: &str) -> Result<Option<String>, JournalError> {
        let row = self
            .conn()?
            .query_opt("SELECT value FROM public.fxjournal_kv WHERE key = $1", &[&key])
            .map_err(|e| JournalError::persistence(key, e))?;
        Ok(row.map(|r| r.get(0)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), JournalError> {
        self.conn()?
            .execute(
                "INSERT INTO public.fxjournal_kv (key, value, updated_at) VALUES ($1, $2, now())
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
                &[&key, &value],
            )
            .map_err(|e| JournalError::persistence(key, e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), JournalError> {
        self.conn()?
            .execute("DELETE FROM public.fxjournal_kv WHERE key = $1", &[&key])
            .map_err(|e| JournalError::persistence(key, e))?;
        Ok(())
    }
}
