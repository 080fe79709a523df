//! Coin persistence
//!
//! A coin is stored as one `coins` row plus its `coin_images` rows. Both
//! writes always happen in a single transaction. The raw AI response and the
//! catalog payloads are stored as JSON text.

use super::groups::parse_timestamp;
use crate::models::{Coin, CoinFilter, CoinImage, Mintage, Year};
use crate::types::CoinRepository;
use chrono::{DateTime, Utc};
use numis_common::{Error, Result};
use serde_json::{Map, Value};
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool,
};
use uuid::Uuid;

/// Coin columns written by both insert and update, in bind order
const DATA_COLUMNS: &[&str] = &[
    "name",
    "country",
    "year",
    "face_value",
    "currency",
    "material",
    "description",
    "km_code",
    "grade",
    "mint",
    "mintage",
    "weight_g",
    "diameter_mm",
    "thickness_mm",
    "edge",
    "shape",
    "ruler",
    "orientation",
    "series",
    "commemorated_topic",
    "min_value",
    "max_value",
    "price_paid",
    "sold_price",
    "sale_channel",
    "technical_notes",
    "personal_notes",
    "group_id",
    "gemini_details",
    "gemini_model",
    "gemini_temperature",
    "numista_number",
    "numista_details",
    "numista_search",
    "acquired_at",
    "sold_at",
    "updated_at",
];

/// Default page size for listings
const DEFAULT_LIST_LIMIT: i64 = 100;

/// JSON columns serialized ahead of binding
struct JsonColumns {
    gemini_details: Option<String>,
    numista_details: Option<String>,
    numista_search: Option<String>,
}

impl JsonColumns {
    fn from_coin(coin: &Coin) -> Result<Self> {
        Ok(Self {
            gemini_details: to_json_text(coin.gemini_details.as_ref())?,
            numista_details: to_json_text(coin.numista_details.as_ref())?,
            numista_search: to_json_text(coin.numista_search.as_ref())?,
        })
    }
}

fn to_json_text<T: serde::Serialize>(value: Option<&T>) -> Result<Option<String>> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(Error::from)
}

fn bind_coin_fields<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    coin: &Coin,
    json: JsonColumns,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query = query
        .bind(coin.name.clone())
        .bind(coin.country.clone())
        .bind(coin.year.value())
        .bind(coin.face_value.clone())
        .bind(coin.currency.clone())
        .bind(coin.material.clone())
        .bind(coin.description.clone())
        .bind(coin.km_code.as_str().to_string())
        .bind(coin.grade.as_str().to_string())
        .bind(coin.mint.clone())
        .bind(coin.mintage.value())
        .bind(coin.weight_g)
        .bind(coin.diameter_mm)
        .bind(coin.thickness_mm)
        .bind(coin.edge.clone())
        .bind(coin.shape.clone())
        .bind(coin.ruler.clone())
        .bind(coin.orientation.clone())
        .bind(coin.series.clone())
        .bind(coin.commemorated_topic.clone())
        .bind(coin.min_value)
        .bind(coin.max_value)
        .bind(coin.price_paid)
        .bind(coin.sold_price)
        .bind(coin.sale_channel.clone())
        .bind(coin.technical_notes.clone())
        .bind(coin.personal_notes.clone())
        .bind(coin.group_id);

    query
        .bind(json.gemini_details)
        .bind(coin.gemini_model.clone())
        .bind(coin.gemini_temperature)
        .bind(coin.numista_number)
        .bind(json.numista_details)
        .bind(json.numista_search)
        .bind(coin.acquired_at.map(|t| t.to_rfc3339()))
        .bind(coin.sold_at.map(|t| t.to_rfc3339()))
        .bind(coin.updated_at.to_rfc3339())
}

fn decode_error(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> sqlx::Error {
    sqlx::Error::Decode(e.into())
}

fn json_object(row: &SqliteRow, column: &str) -> sqlx::Result<Option<Map<String, Value>>> {
    let text: Option<String> = row.try_get(column)?;
    match text {
        Some(text) if !text.is_empty() => match serde_json::from_str(&text).map_err(decode_error)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

fn optional_timestamp(row: &SqliteRow, column: &str) -> sqlx::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.try_get(column)?;
    Ok(text.filter(|t| !t.is_empty()).map(|t| parse_timestamp(&t)))
}

fn coin_from_row(row: &SqliteRow) -> sqlx::Result<Coin> {
    let id: String = row.try_get("id")?;
    let numista_search: Option<String> = row.try_get("numista_search")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Coin {
        id: Uuid::parse_str(&id).map_err(decode_error)?,
        name: row.try_get("name")?,
        country: row.try_get("country")?,
        year: Year::try_from(row.try_get::<i64, _>("year")?).map_err(decode_error)?,
        face_value: row.try_get("face_value")?,
        currency: row.try_get("currency")?,
        material: row.try_get("material")?,
        description: row.try_get("description")?,
        km_code: crate::models::CatalogCode::new(row.try_get::<String, _>("km_code")?),
        grade: crate::models::Grade::new(row.try_get::<String, _>("grade")?),
        mint: row.try_get("mint")?,
        mintage: Mintage::try_from(row.try_get::<i64, _>("mintage")?).map_err(decode_error)?,
        weight_g: row.try_get("weight_g")?,
        diameter_mm: row.try_get("diameter_mm")?,
        thickness_mm: row.try_get("thickness_mm")?,
        edge: row.try_get("edge")?,
        shape: row.try_get("shape")?,
        ruler: row.try_get("ruler")?,
        orientation: row.try_get("orientation")?,
        series: row.try_get("series")?,
        commemorated_topic: row.try_get("commemorated_topic")?,
        min_value: row.try_get("min_value")?,
        max_value: row.try_get("max_value")?,
        price_paid: row.try_get("price_paid")?,
        sold_price: row.try_get("sold_price")?,
        sale_channel: row.try_get("sale_channel")?,
        technical_notes: row.try_get("technical_notes")?,
        personal_notes: row.try_get("personal_notes")?,
        group_id: row.try_get("group_id")?,
        gemini_details: json_object(row, "gemini_details")?,
        gemini_model: row.try_get("gemini_model")?,
        gemini_temperature: row.try_get("gemini_temperature")?,
        numista_number: row.try_get("numista_number")?,
        numista_details: json_object(row, "numista_details")?,
        numista_search: numista_search
            .filter(|t| !t.is_empty())
            .map(|t| serde_json::from_str(&t))
            .transpose()
            .map_err(decode_error)?,
        acquired_at: optional_timestamp(row, "acquired_at")?,
        sold_at: optional_timestamp(row, "sold_at")?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        images: Vec::new(),
    })
}

fn image_from_row(row: &SqliteRow) -> sqlx::Result<CoinImage> {
    let id: String = row.try_get("id")?;
    let coin_id: String = row.try_get("coin_id")?;
    let image_type: String = row.try_get("image_type")?;
    let side: String = row.try_get("side")?;
    let width: i64 = row.try_get("width")?;
    let height: i64 = row.try_get("height")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(CoinImage {
        id: Uuid::parse_str(&id).map_err(decode_error)?,
        coin_id: Uuid::parse_str(&coin_id).map_err(decode_error)?,
        image_type: image_type.parse().map_err(decode_error)?,
        side: side.parse().map_err(decode_error)?,
        path: row.try_get("path")?,
        extension: row.try_get("extension")?,
        size: row.try_get("size")?,
        width: u32::try_from(width).unwrap_or(0),
        height: u32::try_from(height).unwrap_or(0),
        mime_type: row.try_get("mime_type")?,
        original_filename: row.try_get("original_filename")?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

async fn insert_images(conn: &mut SqliteConnection, coin: &Coin) -> Result<()> {
    for (position, image) in coin.images.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO coin_images (
                id, coin_id, position, image_type, side, path, extension, size,
                width, height, mime_type, original_filename, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(image.id.to_string())
        .bind(coin.id.to_string())
        .bind(position as i64)
        .bind(image.image_type.as_str())
        .bind(image.side.as_str())
        .bind(&image.path)
        .bind(&image.extension)
        .bind(image.size)
        .bind(image.width as i64)
        .bind(image.height as i64)
        .bind(&image.mime_type)
        .bind(&image.original_filename)
        .bind(image.created_at.to_rfc3339())
        .bind(image.updated_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn load_images(pool: &SqlitePool, coin_id: Uuid) -> Result<Vec<CoinImage>> {
    let rows = sqlx::query("SELECT * FROM coin_images WHERE coin_id = ? ORDER BY position")
        .bind(coin_id.to_string())
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(image_from_row).collect::<sqlx::Result<_>>()?)
}

/// Insert a new coin with all of its images
pub async fn save_coin(pool: &SqlitePool, coin: &Coin) -> Result<()> {
    let json = JsonColumns::from_coin(coin)?;
    let placeholders = vec!["?"; DATA_COLUMNS.len() + 2].join(", ");
    let sql = format!(
        "INSERT INTO coins (id, created_at, {}) VALUES ({})",
        DATA_COLUMNS.join(", "),
        placeholders
    );

    let mut tx = pool.begin().await?;

    let query = sqlx::query(&sql)
        .bind(coin.id.to_string())
        .bind(coin.created_at.to_rfc3339());
    bind_coin_fields(query, coin, json).execute(&mut *tx).await?;
    insert_images(&mut tx, coin).await?;

    tx.commit().await?;
    Ok(())
}

/// Overwrite every mutable column and replace the image rows
///
/// Last write wins: there is no version check against concurrent writers.
pub async fn update_coin(pool: &SqlitePool, coin: &Coin) -> Result<()> {
    let json = JsonColumns::from_coin(coin)?;
    let assignments = DATA_COLUMNS
        .iter()
        .map(|column| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE coins SET {} WHERE id = ?", assignments);

    let mut tx = pool.begin().await?;

    let result = bind_coin_fields(sqlx::query(&sql), coin, json)
        .bind(coin.id.to_string())
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("coin {}", coin.id)));
    }

    sqlx::query("DELETE FROM coin_images WHERE coin_id = ?")
        .bind(coin.id.to_string())
        .execute(&mut *tx)
        .await?;
    insert_images(&mut tx, coin).await?;

    tx.commit().await?;
    Ok(())
}

/// Load a coin with its images in insertion order
pub async fn load_coin(pool: &SqlitePool, id: Uuid) -> Result<Option<Coin>> {
    let row = sqlx::query("SELECT * FROM coins WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut coin = coin_from_row(&row)?;
    coin.images = load_images(pool, id).await?;
    Ok(Some(coin))
}

/// List coins, newest first
pub async fn list_coins(pool: &SqlitePool, filter: &CoinFilter) -> Result<Vec<Coin>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM coins WHERE 1 = 1");

    if let Some(group_id) = filter.group_id {
        builder.push(" AND group_id = ").push_bind(group_id);
    }
    if let Some(country) = filter.country.as_ref().filter(|c| !c.trim().is_empty()) {
        builder.push(" AND country = ").push_bind(country.trim().to_string());
    }
    if let Some(year) = filter.year {
        builder.push(" AND year = ").push_bind(year);
    }

    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0))
        .push(" OFFSET ")
        .push_bind(filter.offset.unwrap_or(0).max(0));

    let rows = builder.build().fetch_all(pool).await?;

    let mut coins = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut coin = coin_from_row(row)?;
        coin.images = load_images(pool, coin.id).await?;
        coins.push(coin);
    }
    Ok(coins)
}

/// Delete a coin and its image rows; returns false if it did not exist
pub async fn delete_coin(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM coin_images WHERE coin_id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM coins WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

/// Record a sale; returns false if the coin does not exist
pub async fn mark_coin_sold(
    pool: &SqlitePool,
    id: Uuid,
    sold_at: DateTime<Utc>,
    sold_price: f64,
    sale_channel: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE coins SET sold_at = ?, sold_price = ?, sale_channel = ?, updated_at = ? WHERE id = ?",
    )
    .bind(sold_at.to_rfc3339())
    .bind(sold_price)
    .bind(sale_channel)
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// [`CoinRepository`] backed by the shared SQLite pool
#[derive(Clone)]
pub struct SqliteCoinRepository {
    pool: SqlitePool,
}

impl SqliteCoinRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CoinRepository for SqliteCoinRepository {
    async fn save(&self, coin: &Coin) -> anyhow::Result<()> {
        Ok(save_coin(&self.pool, coin).await?)
    }

    async fn update(&self, coin: &Coin) -> anyhow::Result<()> {
        Ok(update_coin(&self.pool, coin).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Option<Coin>> {
        Ok(load_coin(&self.pool, id).await?)
    }

    async fn list(&self, filter: &CoinFilter) -> anyhow::Result<Vec<Coin>> {
        Ok(list_coins(&self.pool, filter).await?)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(delete_coin(&self.pool, id).await?)
    }

    async fn mark_sold(
        &self,
        id: Uuid,
        sold_at: DateTime<Utc>,
        sold_price: f64,
        sale_channel: &str,
    ) -> anyhow::Result<bool> {
        Ok(mark_coin_sold(&self.pool, id, sold_at, sold_price, sale_channel).await?)
    }
}
