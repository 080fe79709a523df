//! Group persistence

use crate::models::Group;
use crate::types::GroupRepository;
use chrono::{DateTime, Utc};
use numis_common::Result;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

fn group_from_row(row: &SqliteRow) -> sqlx::Result<Group> {
    let created_at: String = row.try_get("created_at")?;
    Ok(Group {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: parse_timestamp(&created_at),
    })
}

pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            tracing::warn!(value, "Unparseable timestamp in database, using epoch");
            DateTime::<Utc>::default()
        })
}

pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Group>> {
    let row = sqlx::query("SELECT id, name, description, created_at FROM groups WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(group_from_row).transpose()?)
}

pub async fn create(pool: &SqlitePool, name: &str, description: &str) -> Result<Group> {
    let created_at = Utc::now();
    let result = sqlx::query("INSERT INTO groups (name, description, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(description)
        .bind(created_at.to_rfc3339())
        .execute(pool)
        .await?;

    Ok(Group {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        description: description.to_string(),
        created_at,
    })
}

/// Rename or re-describe a group; `None` when no such group exists
pub async fn update_group(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    description: &str,
) -> Result<Option<Group>> {
    let result = sqlx::query("UPDATE groups SET name = ?, description = ? WHERE id = ?")
        .bind(name)
        .bind(description)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let row = sqlx::query("SELECT id, name, description, created_at FROM groups WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(Some(group_from_row(&row)?))
}

/// Delete a group, detaching its coins first
///
/// Coins are cleared explicitly so the result does not depend on the
/// connection having `foreign_keys` enabled.
pub async fn delete_group(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE coins SET group_id = NULL WHERE group_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM groups WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_groups(pool: &SqlitePool) -> Result<Vec<Group>> {
    let rows = sqlx::query("SELECT id, name, description, created_at FROM groups ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(group_from_row).collect::<sqlx::Result<_>>()?)
}

/// [`GroupRepository`] backed by the shared SQLite pool
#[derive(Clone)]
pub struct SqliteGroupRepository {
    pool: SqlitePool,
}

impl SqliteGroupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GroupRepository for SqliteGroupRepository {
    async fn get_by_name(&self, name: &str) -> anyhow::Result<Option<Group>> {
        Ok(get_by_name(&self.pool, name).await?)
    }

    async fn create(&self, name: &str, description: &str) -> anyhow::Result<Group> {
        Ok(create(&self.pool, name, description).await?)
    }

    async fn update(&self, id: i64, name: &str, description: &str) -> anyhow::Result<Option<Group>> {
        Ok(update_group(&self.pool, id, name, description).await?)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(delete_group(&self.pool, id).await?)
    }

    async fn list(&self) -> anyhow::Result<Vec<Group>> {
        Ok(list_groups(&self.pool).await?)
    }
}
