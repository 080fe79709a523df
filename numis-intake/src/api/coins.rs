//! Coin API handlers
//!
//! POST/GET /api/coins, GET/PUT/DELETE /api/coins/:id and the per-coin
//! actions (reanalyze, rotate, sell, catalog enrich/apply)

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Coin, CoinFilter, Side},
    services::{AddCoinRequest, SideUpload, UpdateCoinParams},
    types::AnalysisOptions,
    AppState,
};

/// Upper bound on an intake request (two full-size photographs)
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Analysis overrides shared by intake and re-analysis
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisOverrides {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub lang: Option<String>,
}

impl AnalysisOverrides {
    fn apply_to(self, defaults: &AnalysisOptions) -> AnalysisOptions {
        AnalysisOptions {
            model: self
                .model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| defaults.model.clone()),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            language: self
                .lang
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| defaults.language.clone()),
        }
    }
}

/// POST /api/coins/:id/rotate request
#[derive(Debug, Deserialize)]
pub struct RotateRequest {
    pub side: Side,
    /// Degrees, counter-clockwise
    pub angle: f64,
}

/// POST /api/coins/:id/numista/apply request
#[derive(Debug, Deserialize)]
pub struct ApplyCandidateRequest {
    pub numista_id: i64,
}

/// POST /api/coins/:id/sell request
#[derive(Debug, Deserialize)]
pub struct SellRequest {
    pub sold_price: f64,
    #[serde(default)]
    pub sale_channel: String,
}

/// POST /api/coins/:id/numista/enrich response
#[derive(Debug, Serialize)]
pub struct EnrichResponse {
    pub coin_id: Uuid,
    pub status: String,
}

/// POST /api/coins
///
/// Multipart fields: `front` and `back` files, optional `group`, `notes`,
/// `model`, `temperature`, `lang`.
pub async fn add_coin(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Coin>)> {
    let mut front = None;
    let mut back = None;
    let mut group_name = String::new();
    let mut notes = String::new();
    let mut overrides = AnalysisOverrides::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "front" | "back" => {
                let side: Side = name.parse().map_err(ApiError::BadRequest)?;
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read {} image: {}", side, e)))?;
                if bytes.is_empty() {
                    return Err(ApiError::BadRequest(format!("{} image is empty", side)));
                }
                let upload = SideUpload {
                    side,
                    bytes: bytes.to_vec(),
                    filename,
                };
                match side {
                    Side::Front => front = Some(upload),
                    Side::Back => back = Some(upload),
                }
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field {}: {}", other, e)))?;
                match other {
                    "group" => group_name = value,
                    "notes" => notes = value,
                    "model" => overrides.model = Some(value),
                    "lang" => overrides.lang = Some(value),
                    "temperature" => {
                        let temperature = value.trim().parse::<f32>().map_err(|_| {
                            ApiError::BadRequest(format!("Invalid temperature: {}", value))
                        })?;
                        overrides.temperature = Some(temperature);
                    }
                    _ => tracing::debug!(field = other, "Ignoring unknown multipart field"),
                }
            }
        }
    }

    let front = front.ok_or_else(|| ApiError::BadRequest("front image is required".to_string()))?;
    let back = back.ok_or_else(|| ApiError::BadRequest("back image is required".to_string()))?;

    let coin = state
        .service
        .add_coin(AddCoinRequest {
            front,
            back,
            group_name,
            notes,
            options: overrides.apply_to(&state.analysis_defaults),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(coin)))
}

/// GET /api/coins
pub async fn list_coins(
    State(state): State<AppState>,
    Query(filter): Query<CoinFilter>,
) -> ApiResult<Json<Vec<Coin>>> {
    Ok(Json(state.service.list_coins(&filter).await?))
}

/// GET /api/coins/:id
pub async fn get_coin(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Coin>> {
    Ok(Json(state.service.get_coin(id).await?))
}

/// PUT /api/coins/:id
pub async fn update_coin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(params): Json<UpdateCoinParams>,
) -> ApiResult<Json<Coin>> {
    Ok(Json(state.service.update_coin(id, params).await?))
}

/// DELETE /api/coins/:id
pub async fn delete_coin(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    state.service.delete_coin(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/coins/:id/reanalyze
pub async fn reanalyze_coin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(overrides): Json<AnalysisOverrides>,
) -> ApiResult<Json<Coin>> {
    let options = overrides.apply_to(&state.analysis_defaults);
    Ok(Json(state.service.reanalyze_coin(id, options).await?))
}

/// POST /api/coins/:id/rotate
pub async fn rotate_coin_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RotateRequest>,
) -> ApiResult<Json<Coin>> {
    Ok(Json(
        state
            .service
            .rotate_coin_image(id, request.side, request.angle)
            .await?,
    ))
}

/// POST /api/coins/:id/sell
pub async fn mark_coin_as_sold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SellRequest>,
) -> ApiResult<Json<Coin>> {
    Ok(Json(
        state
            .service
            .mark_coin_as_sold(id, request.sold_price, &request.sale_channel)
            .await?,
    ))
}

/// POST /api/coins/:id/numista/enrich
///
/// Schedules catalog matching and answers 202 straight away.
pub async fn enrich_coin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<EnrichResponse>)> {
    state.service.get_coin(id).await?;

    if state.service.schedule_enrichment(id).is_none() {
        return Err(ApiError::Dependency(
            "Numista API key is not configured".to_string(),
        ));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(EnrichResponse {
            coin_id: id,
            status: "scheduled".to_string(),
        }),
    ))
}

/// POST /api/coins/:id/numista/apply
pub async fn apply_numista_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApplyCandidateRequest>,
) -> ApiResult<Json<Coin>> {
    Ok(Json(
        state
            .service
            .apply_numista_candidate(id, request.numista_id)
            .await?,
    ))
}

/// Build coin routes
pub fn coin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/coins",
            post(add_coin)
                .get(list_coins)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/coins/:id",
            get(get_coin).put(update_coin).delete(delete_coin),
        )
        .route("/api/coins/:id/reanalyze", post(reanalyze_coin))
        .route("/api/coins/:id/rotate", post(rotate_coin_image))
        .route("/api/coins/:id/sell", post(mark_coin_as_sold))
        .route("/api/coins/:id/numista/enrich", post(enrich_coin))
        .route("/api/coins/:id/numista/apply", post(apply_numista_candidate))
}
