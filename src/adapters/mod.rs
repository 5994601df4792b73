pub mod csv_adapter;
pub mod file_config_adapter;
pub mod file_kv_adapter;
pub mod memory_adapter;
#[cfg(feature = "postgres")]
pub mod postgres_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
