//! HTTP API（axum）
//!
//! /login 以外はすべてベアラートークンが必要。
//! 失敗はすべて `{ "error": message }` の形で返す。

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};
use uuid::Uuid;

use crate::auth::{AuthError, AuthService};
use crate::error::StoreError;
use crate::models::{
    CreateStationDto, Location, LoginDto, NearbyStation, PriceHistory, Station, StationId,
    TokenDto, UpdateStationDto, UpdateUserDto, User, UserDto,
};
use crate::store::StationRepository;

// =============================================================================
// 共有状態
// =============================================================================

/// ハンドラーが持つ共有状態
pub struct AppState {
    pub store: Arc<StationRepository>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(store: Arc<StationRepository>, auth: AuthService) -> Self {
        Self { store, auth }
    }
}

// =============================================================================
// エラー → レスポンス
// =============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Unauthorized(String),

    /// 壊れたJSONや数値でないパスなど
    #[error("{0}")]
    BadRequest(String),

    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    /// NotFound だけは 404、それ以外の検証エラーは 400
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Credential(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal(detail) => error!(%detail, "request failed"),
            ApiError::Store(StoreError::Credential(detail)) => error!(%detail, "request failed"),
            other => debug!(%status, error = %other, "request rejected"),
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Hash(detail) => ApiError::Internal(detail),
            AuthError::MissingToken | AuthError::InvalidToken(_) => {
                ApiError::Unauthorized("Unauthorized".to_string())
            }
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// ルーター
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/user", get(get_users).post(create_user).put(update_user))
        .route("/user/{id}", get(get_user).delete(delete_user))
        .route("/station", get(get_stations).post(create_station).put(update_station))
        .route("/station/{id}", get(get_station).delete(delete_station))
        .route("/prices/history/{id}/{gas_type}", get(get_price_history))
        .route("/prices/location", post(get_prices_by_location))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/login", post(login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Authorization: Bearer <token> を検証する
async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let value = request.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let claims = state.auth.validate_header(value)?;
    debug!(user = %claims.sub, "authorized");
    Ok(next.run(request).await)
}

// =============================================================================
// ハンドラー
// =============================================================================

/// POST /login
async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginDto>, JsonRejection>,
) -> ApiResult<Json<TokenDto>> {
    let Json(login) = body?;
    let user = state
        .store
        .authenticate(&login.email, &login.password)
        .ok_or_else(|| ApiError::Unauthorized("Incorrect email or password".to_string()))?;
    let token = state.auth.issue(&user.email).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(TokenDto { token }))
}

/// GET /station
async fn get_stations(State(state): State<Arc<AppState>>) -> Json<Vec<Station>> {
    Json(state.store.stations())
}

/// GET /station/{id}
async fn get_station(
    State(state): State<Arc<AppState>>,
    id: Result<Path<StationId>, PathRejection>,
) -> ApiResult<Json<Station>> {
    let Path(id) = id?;
    Ok(Json(state.store.station(id)?))
}

/// POST /station
async fn create_station(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateStationDto>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Station>)> {
    let Json(dto) = body?;
    let station = state.store.create_station(dto)?;
    Ok((StatusCode::CREATED, Json(station)))
}

/// PUT /station
async fn update_station(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UpdateStationDto>, JsonRejection>,
) -> ApiResult<Json<Station>> {
    let Json(dto) = body?;
    Ok(Json(state.store.update_station(dto)?))
}

/// DELETE /station/{id}
async fn delete_station(
    State(state): State<Arc<AppState>>,
    id: Result<Path<StationId>, PathRejection>,
) -> ApiResult<Json<String>> {
    let Path(id) = id?;
    state.store.delete_station(id)?;
    Ok(Json(format!("Station with id {id} deleted")))
}

/// GET /prices/history/{id}/{gas_type}
async fn get_price_history(
    State(state): State<Arc<AppState>>,
    params: Result<Path<(StationId, String)>, PathRejection>,
) -> ApiResult<Json<PriceHistory>> {
    let Path((id, gas_type)) = params?;
    Ok(Json(state.store.price_history(id, &gas_type)?))
}

/// POST /prices/location
async fn get_prices_by_location(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Location>, JsonRejection>,
) -> ApiResult<Json<Vec<NearbyStation>>> {
    let Json(location) = body?;
    Ok(Json(state.store.nearest_stations(&location)?))
}

/// GET /user
async fn get_users(State(state): State<Arc<AppState>>) -> Json<Vec<User>> {
    Json(state.store.users())
}

/// GET /user/{id}
async fn get_user(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<User>> {
    let Path(id) = id?;
    Ok(Json(state.store.user(id)?))
}

/// POST /user
async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UserDto>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(dto) = body?;
    let user = state.store.create_user(dto)?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /user
async fn update_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UpdateUserDto>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(dto) = body?;
    Ok(Json(state.store.update_user(dto)?))
}

/// DELETE /user/{id}
async fn delete_user(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<String>> {
    let Path(id) = id?;
    state.store.delete_user(id)?;
    Ok(Json(format!("User with id {id} deleted")))
}
