//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates every table the
//! services need. All statements are idempotent, so this is safe to call on
//! every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets reads proceed while the background enrichment task writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables on an already-open pool
///
/// Used directly by tests with `sqlite::memory:` pools.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_settings_table(pool).await?;
    create_groups_table(pool).await?;
    create_coins_table(pool).await?;
    create_coin_images_table(pool).await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs (API keys, service URLs).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_coins_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coins (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            year INTEGER NOT NULL DEFAULT 0 CHECK (year = 0 OR (year >= -5000 AND year <= 3000)),
            face_value TEXT NOT NULL DEFAULT '',
            currency TEXT NOT NULL DEFAULT '',
            material TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            km_code TEXT NOT NULL DEFAULT '',
            grade TEXT NOT NULL DEFAULT '',
            mint TEXT NOT NULL DEFAULT '',
            mintage INTEGER NOT NULL DEFAULT 0 CHECK (mintage >= 0),
            weight_g REAL NOT NULL DEFAULT 0,
            diameter_mm REAL NOT NULL DEFAULT 0,
            thickness_mm REAL NOT NULL DEFAULT 0,
            edge TEXT NOT NULL DEFAULT '',
            shape TEXT NOT NULL DEFAULT '',
            ruler TEXT NOT NULL DEFAULT '',
            orientation TEXT NOT NULL DEFAULT '',
            series TEXT NOT NULL DEFAULT '',
            commemorated_topic TEXT NOT NULL DEFAULT '',
            min_value REAL NOT NULL DEFAULT 0,
            max_value REAL NOT NULL DEFAULT 0,
            price_paid REAL NOT NULL DEFAULT 0,
            sold_price REAL NOT NULL DEFAULT 0,
            sale_channel TEXT NOT NULL DEFAULT '',
            technical_notes TEXT NOT NULL DEFAULT '',
            personal_notes TEXT NOT NULL DEFAULT '',
            group_id INTEGER REFERENCES groups(id) ON DELETE SET NULL,
            gemini_details TEXT,
            gemini_model TEXT NOT NULL DEFAULT '',
            gemini_temperature REAL NOT NULL DEFAULT 0,
            numista_number INTEGER NOT NULL DEFAULT 0,
            numista_details TEXT,
            numista_search TEXT,
            acquired_at TEXT,
            sold_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_coins_group ON coins(group_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_coin_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coin_images (
            id TEXT PRIMARY KEY,
            coin_id TEXT NOT NULL REFERENCES coins(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            image_type TEXT NOT NULL,
            side TEXT NOT NULL,
            path TEXT NOT NULL,
            extension TEXT NOT NULL,
            size INTEGER NOT NULL DEFAULT 0,
            width INTEGER NOT NULL DEFAULT 0,
            height INTEGER NOT NULL DEFAULT 0,
            mime_type TEXT NOT NULL DEFAULT '',
            original_filename TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_coin_images_coin ON coin_images(coin_id)")
        .execute(pool)
        .await?;

    Ok(())
}
