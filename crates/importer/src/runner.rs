//! Running an import against PostgreSQL or, for dry runs, memory.

use mudclub_core::error::StoreError;
use mudclub_core::import::{import_rows, ImportContext, ImportRow, ImportSummary};
use mudclub_core::memory::MemoryStore;
use mudclub_core::observer::ReconcileObserver;
use mudclub_db::PgUnitOfWork;

use crate::config::{ConfigError, ImportConfig};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Import `rows` as configured. Each row commits or rolls back on its own.
pub async fn run(
    config: &ImportConfig,
    rows: Vec<ImportRow>,
    observer: &dyn ReconcileObserver,
) -> Result<ImportSummary, ImportError> {
    let ctx = ImportContext {
        kind: config.role,
        active: config.active,
    };

    if config.dry_run {
        tracing::info!(rows = rows.len(), role = %ctx.kind, "Dry run against an in-memory store");
        let store = MemoryStore::new();
        return Ok(import_rows(&store, rows, &ctx, config.on_error, observer).await?);
    }

    let pool = mudclub_db::create_pool(config.database_url()?, config.max_connections).await?;
    tracing::info!("Database connection pool created");

    mudclub_db::health_check(&pool).await?;
    mudclub_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    tracing::info!(rows = rows.len(), role = %ctx.kind, "Importing rows");
    let uow = PgUnitOfWork::new(pool);
    let summary = import_rows(&uow, rows, &ctx, config.on_error, observer).await?;
    uow.pool().close().await;
    Ok(summary)
}
