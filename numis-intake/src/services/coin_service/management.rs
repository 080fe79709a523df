//! Coin and group management: reads, manual edits, sales, deletion

use super::CoinService;
use crate::error::{CoinError, CoinResult};
use crate::models::{CatalogCode, Coin, CoinFilter, Grade, Group, Mintage, Year};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

/// Full replacement of a coin's editable fields
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCoinParams {
    pub name: String,
    pub mint: String,
    pub mintage: i64,
    pub country: String,
    pub year: i64,
    pub face_value: String,
    pub currency: String,
    pub material: String,
    pub description: String,
    pub km_code: String,
    pub min_value: f64,
    pub max_value: f64,
    pub grade: String,
    pub technical_notes: String,
    pub personal_notes: String,
    pub weight_g: f64,
    pub diameter_mm: f64,
    pub thickness_mm: f64,
    pub edge: String,
    pub shape: String,
    pub acquired_at: Option<DateTime<Utc>>,
    pub sold_at: Option<DateTime<Utc>>,
    pub price_paid: f64,
    pub sold_price: f64,
    pub sale_channel: String,
    /// Blank clears the group
    pub group_name: String,
}

impl CoinService {
    pub async fn get_coin(&self, id: Uuid) -> CoinResult<Coin> {
        self.load_coin(id).await
    }

    pub async fn list_coins(&self, filter: &CoinFilter) -> CoinResult<Vec<Coin>> {
        self.coins
            .list(filter)
            .await
            .map_err(|e| CoinError::persistence("failed to list coins", e))
    }

    /// Apply a manual edit
    ///
    /// Year and mintage go through the strict constructors, so an
    /// out-of-range value fails the whole edit.
    pub async fn update_coin(&self, id: Uuid, params: UpdateCoinParams) -> CoinResult<Coin> {
        let year = Year::new(params.year)?;
        let mintage = Mintage::new(params.mintage)?;

        let mut coin = self.load_coin(id).await?;
        let group_id = self.resolve_group(&params.group_name).await?;

        coin.name = params.name;
        coin.mint = params.mint;
        coin.mintage = mintage;
        coin.country = params.country;
        coin.year = year;
        coin.face_value = params.face_value;
        coin.currency = params.currency;
        coin.material = params.material;
        coin.description = params.description;
        coin.km_code = CatalogCode::new(params.km_code.trim());
        coin.min_value = params.min_value;
        coin.max_value = params.max_value;
        coin.grade = Grade::normalized(&params.grade);
        coin.technical_notes = params.technical_notes;
        coin.personal_notes = params.personal_notes;
        coin.weight_g = params.weight_g;
        coin.diameter_mm = params.diameter_mm;
        coin.thickness_mm = params.thickness_mm;
        coin.edge = params.edge;
        coin.shape = params.shape;
        coin.acquired_at = params.acquired_at;
        coin.sold_at = params.sold_at;
        coin.price_paid = params.price_paid;
        coin.sold_price = params.sold_price;
        coin.sale_channel = params.sale_channel.trim().to_string();
        coin.group_id = group_id;

        self.store_update(&mut coin, "failed to update coin").await?;
        info!(coin_id = %id, "Coin updated");
        Ok(coin)
    }

    /// Delete the coin row, then its files
    ///
    /// Once the row is gone the deletion counts as done; a leftover
    /// directory is only logged.
    pub async fn delete_coin(&self, id: Uuid) -> CoinResult<()> {
        let deleted = self
            .coins
            .delete(id)
            .await
            .map_err(|e| CoinError::persistence("failed to delete coin", e))?;
        if !deleted {
            return Err(CoinError::not_found(format!("coin {} not found", id)));
        }

        if let Err(e) = self.storage.delete_coin_directory(id).await {
            error!(coin_id = %id, error = %e, "Failed to delete coin files");
        }
        info!(coin_id = %id, "Coin deleted");
        Ok(())
    }

    /// Record a sale at the current time
    ///
    /// Only the sale fields change; the rest of the coin is left as stored.
    pub async fn mark_coin_as_sold(
        &self,
        id: Uuid,
        sold_price: f64,
        sale_channel: &str,
    ) -> CoinResult<Coin> {
        if !sold_price.is_finite() || sold_price < 0.0 {
            return Err(CoinError::invalid_input(format!("invalid sold price: {}", sold_price)));
        }

        let found = self
            .coins
            .mark_sold(id, Utc::now(), sold_price, sale_channel.trim())
            .await
            .map_err(|e| CoinError::persistence("failed to mark coin as sold", e))?;
        if !found {
            return Err(CoinError::not_found(format!("coin {} not found", id)));
        }

        info!(coin_id = %id, sold_price, channel = sale_channel.trim(), "Coin marked as sold");
        self.load_coin(id).await
    }

    pub async fn create_group(&self, name: &str, description: &str) -> CoinResult<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoinError::invalid_input("group name cannot be empty"));
        }
        self.groups
            .create(name, description.trim())
            .await
            .map_err(|e| CoinError::persistence("failed to create group", e))
    }

    pub async fn update_group(&self, id: i64, name: &str, description: &str) -> CoinResult<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoinError::invalid_input("group name cannot be empty"));
        }
        self.groups
            .update(id, name, description.trim())
            .await
            .map_err(|e| CoinError::persistence("failed to update group", e))?
            .ok_or_else(|| CoinError::not_found(format!("group {} not found", id)))
    }

    /// Remove a group; its coins stay, without a group
    pub async fn delete_group(&self, id: i64) -> CoinResult<()> {
        let deleted = self
            .groups
            .delete(id)
            .await
            .map_err(|e| CoinError::persistence("failed to delete group", e))?;
        if !deleted {
            return Err(CoinError::not_found(format!("group {} not found", id)));
        }
        info!(group_id = id, "Group deleted");
        Ok(())
    }

    pub async fn list_groups(&self) -> CoinResult<Vec<Group>> {
        self.groups
            .list()
            .await
            .map_err(|e| CoinError::persistence("failed to list groups", e))
    }
}
