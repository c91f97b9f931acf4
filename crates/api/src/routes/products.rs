//! Product stock endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::ProductId;
use serde::{Deserialize, Serialize};
use store::{OrderRepository, StockStore};

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RestockRequest {
    pub stock: i64,
}

#[derive(Serialize)]
pub struct StockResponse {
    pub product_id: String,
    pub stock: i64,
}

/// GET /products/{id}/stock
#[tracing::instrument(skip(state))]
pub async fn get_stock<R: OrderRepository + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<R, S>>>,
    Path(id): Path<String>,
) -> Result<Json<StockResponse>, ApiError> {
    let product_id = ProductId::new(id);
    let stock = state.service.product_stock(&product_id).await?;
    Ok(Json(StockResponse {
        product_id: product_id.to_string(),
        stock,
    }))
}

/// PUT /products/{id}/stock: overwrite the counter. Admin only.
#[tracing::instrument(skip(state, caller, payload))]
pub async fn set_stock<R: OrderRepository + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<R, S>>>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<RestockRequest>, JsonRejection>,
) -> Result<Json<StockResponse>, ApiError> {
    let Json(req) = payload?;
    let product_id = ProductId::new(id);
    if product_id.is_blank() {
        return Err(ApiError::BadRequest("product id must not be blank".to_string()));
    }

    state
        .service
        .restock(&caller.0, &product_id, req.stock)
        .await?;

    Ok(Json(StockResponse {
        product_id: product_id.to_string(),
        stock: req.stock,
    }))
}
