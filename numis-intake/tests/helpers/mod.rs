//! Test Helper Utilities
//!
//! Shared fakes and builders for numis-intake integration tests

#![allow(dead_code)]

pub mod fakes;

pub use fakes::{
    FakeAnalyzer, FakeCatalog, FakeCoinRepository, FakeGroupRepository, FakeImageProcessor,
    FakeRemover, FakeStorage,
};

use numis_intake::models::{
    CatalogCandidate, Coin, CoinAnalysisResult, CoinImage, ImageType, Side, TypeSearchResponse,
};
use numis_intake::services::side_processor::image_record;
use numis_intake::services::{AddCoinRequest, CoinService, SideUpload};
use numis_intake::types::{AnalysisOptions, CatalogClient, ImageMetadata};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Coin service wired to fakes, with handles on every fake
pub struct Harness {
    pub service: CoinService,
    pub coins: Arc<FakeCoinRepository>,
    pub groups: Arc<FakeGroupRepository>,
    pub storage: Arc<FakeStorage>,
    pub remover: Arc<FakeRemover>,
    pub images: Arc<FakeImageProcessor>,
    pub analyzer: Arc<FakeAnalyzer>,
    pub catalog: Option<Arc<FakeCatalog>>,
}

impl Harness {
    pub fn new(analyzer: FakeAnalyzer) -> Self {
        Self::build(analyzer, None)
    }

    pub fn with_catalog(catalog: FakeCatalog) -> Self {
        Self::build(FakeAnalyzer::default(), Some(catalog))
    }

    fn build(analyzer: FakeAnalyzer, catalog: Option<FakeCatalog>) -> Self {
        let coins = Arc::new(FakeCoinRepository::default());
        let groups = Arc::new(FakeGroupRepository::default());
        let storage = Arc::new(FakeStorage::default());
        let remover = Arc::new(FakeRemover::default());
        let images = Arc::new(FakeImageProcessor::default());
        let analyzer = Arc::new(analyzer);
        let catalog = catalog.map(Arc::new);

        let service = CoinService::new(
            coins.clone(),
            groups.clone(),
            storage.clone(),
            remover.clone(),
            images.clone(),
            analyzer.clone(),
            catalog.clone().map(|c| c as Arc<dyn CatalogClient>),
        );

        Self {
            service,
            coins,
            groups,
            storage,
            remover,
            images,
            analyzer,
            catalog,
        }
    }

    pub fn catalog(&self) -> &FakeCatalog {
        self.catalog.as_deref().expect("harness built without a catalog")
    }
}

pub fn upload(side: Side) -> SideUpload {
    SideUpload {
        side,
        bytes: format!("{}-photo-bytes", side).into_bytes(),
        filename: format!("{}.jpg", side),
    }
}

pub fn add_request(group_name: &str) -> AddCoinRequest {
    AddCoinRequest {
        front: upload(Side::Front),
        back: upload(Side::Back),
        group_name: group_name.to_string(),
        notes: "bought at the Sunday market".to_string(),
        options: AnalysisOptions {
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.2,
            language: "es".to_string(),
        },
    }
}

pub fn analysis(name: &str, year: i64, mintage: i64) -> CoinAnalysisResult {
    let raw = serde_json::json!({ "name": name, "year": year, "mintage": mintage });
    let raw_details = match raw {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    CoinAnalysisResult {
        name: name.to_string(),
        country: "Spain".to_string(),
        year,
        face_value: "25 Pesetas".to_string(),
        currency: "Peseta".to_string(),
        grade: "MBC".to_string(),
        mintage,
        raw_details,
        ..Default::default()
    }
}

fn stored_image(coin_id: Uuid, image_type: ImageType, side: Side, name: &str) -> CoinImage {
    image_record(
        coin_id,
        image_type,
        side,
        &Path::new("/store/coins").join(coin_id.to_string()).join(name),
        ImageMetadata {
            width: 1000,
            height: 1000,
            size: 2048,
            mime_type: "image/png".to_string(),
        },
        &format!("{}.jpg", side),
    )
}

/// Coin with the full set of six image records
pub fn coin_with_images() -> Coin {
    let mut coin = Coin::new(Uuid::new_v4());
    let id = coin.id;
    for side in [Side::Front, Side::Back] {
        coin.images.push(stored_image(id, ImageType::Original, side, &format!("original_{}.jpg", side)));
        coin.images.push(stored_image(id, ImageType::Processed, side, &format!("processed_{}.png", side)));
        coin.images.push(stored_image(
            id,
            ImageType::Thumbnail,
            side,
            &format!("processed_{}_thumb.png", side),
        ));
    }
    coin
}

/// Coin ready for catalog matching
pub fn catalog_coin(face_value: &str, year: i64) -> Coin {
    let mut coin = coin_with_images();
    coin.face_value = face_value.to_string();
    coin.currency = "Euro".to_string();
    coin.country = "Spain".to_string();
    coin.year = numis_intake::models::Year::new(year).expect("test year in range");
    coin
}

pub fn candidate(id: i64, min_year: i32, max_year: i32) -> CatalogCandidate {
    CatalogCandidate {
        id,
        title: format!("Type {}", id),
        category: "coin".to_string(),
        min_year: Some(min_year),
        max_year: Some(max_year),
        issuer: None,
    }
}

pub fn search_response(count: i64, types: Vec<CatalogCandidate>) -> TypeSearchResponse {
    TypeSearchResponse { count, types }
}

/// In-memory SQLite pool with the full schema
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    numis_common::db::create_schema(&pool)
        .await
        .expect("Failed to create schema");
    pool
}
