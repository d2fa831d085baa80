//! SQLite connection factory and migration runner for bookshelf.

use std::str::FromStr;

use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use bookshelf_kernel::Migration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const LEDGER_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (module, id)
    )
"#;

/// Open the pool for the database selected by the current environment.
///
/// The database file (and its directory) is created when missing.
pub async fn connect(settings: &Settings) -> anyhow::Result<SqlitePool> {
    let url = settings.database_url();

    if settings.database.url.is_none() {
        std::fs::create_dir_all(&settings.database.directory).with_context(|| {
            format!(
                "failed to create database directory '{}'",
                settings.database.directory
            )
        })?;
    }

    tracing::info!(
        target: "bookshelf-db",
        env = settings.environment.as_str(),
        %url,
        max_connections = settings.database.max_connections,
        "opening database"
    );

    connect_url(&url, settings.database.max_connections).await
}

/// Open a pool for an explicit connection string.
pub async fn connect_url(url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url '{}'", url))?
        .create_if_missing(true);

    // Connections are kept for the life of the pool; an in-memory database
    // disappears with its last connection.
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to '{}'", url))
}

/// Apply every migration not yet recorded in the `_migrations` ledger.
///
/// Returns how many migrations were applied by this call.
pub async fn migrate(pool: &SqlitePool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::raw_sql(LEDGER_DDL)
        .execute(pool)
        .await
        .context("failed to create migration ledger")?;

    let mut applied = 0;

    for (module, migration) in migrations {
        let already: Option<(String,)> =
            sqlx::query_as("SELECT id FROM _migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .with_context(|| format!("failed to read ledger for '{}'", module))?;

        if already.is_some() {
            tracing::debug!(target: "bookshelf-db", %module, id = migration.id, "migration already applied");
            continue;
        }

        tracing::info!(target: "bookshelf-db", %module, id = migration.id, "applying migration");

        // The schema change and its ledger row commit together.
        let mut tx = pool
            .begin()
            .await
            .with_context(|| format!("failed to begin migration {}/{}", module, migration.id))?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;

        sqlx::query("INSERT INTO _migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to record migration {}/{}", module, migration.id))?;

        tx.commit()
            .await
            .with_context(|| format!("failed to commit migration {}/{}", module, migration.id))?;

        applied += 1;
    }

    Ok(applied)
}
