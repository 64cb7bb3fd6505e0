//! HTTP handlers for the `coches` resource.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coches_store::{CarStore, StoreError};
use coches_types::{parse_object, Car, CarPatch, NewCar, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Confirmation texts sent in `mensaje`, kept stable for existing clients.
pub const MENSAJE_CREADO: &str = "Se ha agregado el nuevo coche exitosamente";
pub const MENSAJE_ACTUALIZADO: &str = "Se ha actualizado el coche exitosamente";
pub const MENSAJE_ELIMINADO: &str = "Coche eliminado exitosamente";

/// Response body for create, update and delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub mensaje: String,
    pub id: i64,
    /// The stored record after the mutation. Absent for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coche: Option<Car>,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ApiError::NotFound(format!("car {id} not found")),
            ref err => {
                tracing::error!(error = %err, "store operation failed");
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

/// Runs a blocking store operation off the async executor.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn CarStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "store task join error");
            ApiError::InternalServerError(format!("task join error: {}", e))
        })?;

    Ok(result?)
}

/// Parses the `{id}` path segment. Anything other than plain decimal digits
/// is treated like an unmatched route.
pub(crate) fn parse_car_id(raw: &str) -> Result<i64, ApiError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::NotFound(format!("no route for /api/coches/{raw}")));
    }
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("no route for /api/coches/{raw}")))
}

/// GET /
pub async fn index_handler() -> &'static str {
    "Bienvenido a mi API de Coches"
}

/// GET /marcas
pub async fn marcas_handler() -> &'static str {
    "Aqui irán las marcas de coches"
}

/// GET /api/coches
pub async fn list_coches_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Car>>, ApiError> {
    let cars = with_store(&state, |store| store.list()).await?;
    Ok(Json(cars))
}

/// GET /api/coches/:id
pub async fn get_coche_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Car>, ApiError> {
    let id = parse_car_id(&raw_id)?;
    let car = with_store(&state, move |store| store.get(id)).await?;
    Ok(Json(car))
}

/// POST /api/coches
///
/// Requires `marca`, `modelo` and, unless disabled in config, `anio`. Every
/// missing field is named in the 400 response.
pub async fn create_coche_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let fields = parse_object(&body)?;
    let new_car = NewCar::from_json(&fields, state.require_anio)?;

    let car = with_store(&state, move |store| store.insert(new_car)).await?;
    tracing::info!(id = car.id, marca = %car.marca, modelo = %car.modelo, "car created");

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            mensaje: MENSAJE_CREADO.to_string(),
            id: car.id,
            coche: Some(car),
        }),
    ))
}

/// PUT /api/coches/:id
///
/// Applies a partial update. The body is validated in full before the store
/// is touched, so a rejected request never modifies the record.
pub async fn update_coche_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<MutationResponse>, ApiError> {
    let id = parse_car_id(&raw_id)?;
    let fields = parse_object(&body)?;
    let patch = CarPatch::from_json(&fields)?;

    let car = with_store(&state, move |store| store.update(id, &patch)).await?;
    tracing::info!(id, "car updated");

    Ok(Json(MutationResponse {
        mensaje: MENSAJE_ACTUALIZADO.to_string(),
        id,
        coche: Some(car),
    }))
}

/// DELETE /api/coches/:id
pub async fn delete_coche_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<MutationResponse>, ApiError> {
    let id = parse_car_id(&raw_id)?;
    let deleted = with_store(&state, move |store| store.delete(id)).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("car {id} not found")));
    }
    tracing::info!(id, "car deleted");

    Ok(Json(MutationResponse {
        mensaje: MENSAJE_ELIMINADO.to_string(),
        id,
        coche: None,
    }))
}
