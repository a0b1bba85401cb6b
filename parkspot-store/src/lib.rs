pub mod app_config;
pub mod database;
pub mod redis_repo;
pub mod reservation_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use reservation_repo::PgLedger;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
