//! Bookshelf application library
//!
//! Hosts the application modules and the bootstrap sequence shared by the
//! binary and the integration tests.

pub mod modules;

use anyhow::Context;
use bookshelf_kernel::{settings::Settings, ModuleRegistry};
use sqlx::SqlitePool;

/// Register every module on `pool` and bring its schema up to date.
pub async fn prepare(pool: &SqlitePool) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, pool).context("failed to register modules")?;

    let applied = bookshelf_db::migrate(pool, &registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, "migrations complete");

    Ok(registry)
}

/// Connect, migrate, serve until shutdown, then tear down in reverse.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let pool = bookshelf_db::connect(&settings)
        .await
        .context("failed to open database")?;

    let registry = prepare(&pool).await?;
    let ctx = bookshelf_kernel::InitCtx {
        settings: &settings,
    };

    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings).await;

    registry.stop_modules().await?;
    pool.close().await;
    tracing::info!("bookshelf shut down");

    served
}
