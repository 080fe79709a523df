//! Coin aggregate, its images and groups

use super::values::{CatalogCode, Grade, Mintage, Year};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Side of a coin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Back => "back",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "front" => Ok(Side::Front),
            "back" => Ok(Side::Back),
            other => Err(format!("unknown side: {}", other)),
        }
    }
}

/// Role of a stored image asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    /// Raw upload, as received
    Original,
    /// Background removed and cropped to content
    Processed,
    /// Fixed-width preview of the processed image
    Thumbnail,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Original => "original",
            ImageType::Processed => "processed",
            ImageType::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(ImageType::Original),
            "processed" => Ok(ImageType::Processed),
            "thumbnail" => Ok(ImageType::Thumbnail),
            other => Err(format!("unknown image type: {}", other)),
        }
    }
}

/// One stored image asset of a coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinImage {
    pub id: Uuid,
    pub coin_id: Uuid,
    pub image_type: ImageType,
    pub side: Side,
    pub path: String,
    pub extension: String,
    pub size: i64,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
    pub original_filename: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named collection bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted coin record
///
/// `numista_number == 0` means the coin is not matched to a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub year: Year,
    pub face_value: String,
    pub currency: String,
    pub material: String,
    pub description: String,
    pub km_code: CatalogCode,
    pub grade: Grade,
    pub mint: String,
    pub mintage: Mintage,
    pub weight_g: f64,
    pub diameter_mm: f64,
    pub thickness_mm: f64,
    pub edge: String,
    pub shape: String,
    pub ruler: String,
    pub orientation: String,
    pub series: String,
    pub commemorated_topic: String,
    pub min_value: f64,
    pub max_value: f64,
    pub price_paid: f64,
    pub sold_price: f64,
    /// Where the coin was sold (auction house, shop, private sale)
    pub sale_channel: String,
    pub technical_notes: String,
    pub personal_notes: String,
    pub group_id: Option<i64>,
    /// Raw AI response, kept verbatim for audit
    pub gemini_details: Option<Map<String, Value>>,
    pub gemini_model: String,
    pub gemini_temperature: f64,
    pub numista_number: i64,
    pub numista_details: Option<Map<String, Value>>,
    pub numista_search: Option<Value>,
    pub acquired_at: Option<DateTime<Utc>>,
    pub sold_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub images: Vec<CoinImage>,
}

impl Coin {
    /// Empty coin with every descriptive field at its zero value
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: String::new(),
            country: String::new(),
            year: Year::UNKNOWN,
            face_value: String::new(),
            currency: String::new(),
            material: String::new(),
            description: String::new(),
            km_code: CatalogCode::default(),
            grade: Grade::default(),
            mint: String::new(),
            mintage: Mintage::UNKNOWN,
            weight_g: 0.0,
            diameter_mm: 0.0,
            thickness_mm: 0.0,
            edge: String::new(),
            shape: String::new(),
            ruler: String::new(),
            orientation: String::new(),
            series: String::new(),
            commemorated_topic: String::new(),
            min_value: 0.0,
            max_value: 0.0,
            price_paid: 0.0,
            sold_price: 0.0,
            sale_channel: String::new(),
            technical_notes: String::new(),
            personal_notes: String::new(),
            group_id: None,
            gemini_details: None,
            gemini_model: String::new(),
            gemini_temperature: 0.0,
            numista_number: 0,
            numista_details: None,
            numista_search: None,
            acquired_at: None,
            sold_at: None,
            created_at: now,
            updated_at: now,
            images: Vec::new(),
        }
    }

    /// First image record of the given type and side
    pub fn image(&self, image_type: ImageType, side: Side) -> Option<&CoinImage> {
        self.images
            .iter()
            .find(|img| img.image_type == image_type && img.side == side)
    }

    pub fn image_mut(&mut self, image_type: ImageType, side: Side) -> Option<&mut CoinImage> {
        self.images
            .iter_mut()
            .find(|img| img.image_type == image_type && img.side == side)
    }

    pub fn is_catalog_matched(&self) -> bool {
        self.numista_number != 0
    }
}

/// Filter for coin listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoinFilter {
    pub group_id: Option<i64>,
    pub country: Option<String>,
    pub year: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
