//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, UserId};
use domain::{Checkout, ItemInput, Money, NewOrder, Order, OrderPatch};
use serde::{Deserialize, Serialize};
use store::{OrderRepository, StockStore};

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    /// Owner of the order; defaults to the caller.
    pub user_id: Option<String>,
    pub items: Vec<ItemInput>,
    #[serde(default)]
    pub address: String,
}

#[derive(Deserialize)]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub order: CreateOrderRequest,
    pub total_cents: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub items: Option<Vec<ItemInput>>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub address: String,
    pub created_at: String,
    pub updated_at: String,
    pub version: u64,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct OrderIdResponse {
    pub order_id: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status.to_string(),
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            total_cents: order.total_amount.cents(),
            address: order.address,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            version: order.version,
        }
    }
}

impl CreateOrderRequest {
    fn into_command(self, caller: &Caller) -> Result<NewOrder, ApiError> {
        let user_id = match self.user_id.as_deref() {
            Some(raw) => parse_user_id(raw)?,
            None => caller.0.user_id,
        };
        let items = ItemInput::parse_all(self.items)?;
        Ok(NewOrder::new(user_id, items, self.address))
    }
}

// -- Handlers --

/// POST /orders: place an order and consume its stock.
#[tracing::instrument(skip(state, caller, payload))]
pub async fn create<R: OrderRepository + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<R, S>>>,
    caller: Caller,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload?;
    let cmd = req.into_command(&caller)?;

    let order = state.service.create_order(&caller.0, cmd).await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// POST /orders/checkout: place an order after verifying the cart total.
#[tracing::instrument(skip(state, caller, payload))]
pub async fn checkout<R: OrderRepository + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<R, S>>>,
    caller: Caller,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderIdResponse>), ApiError> {
    let Json(req) = payload?;
    let declared_total = req.total_cents.map(Money::from_cents);
    let cmd = req.order.into_command(&caller)?;

    let order_id = state
        .service
        .checkout(&caller.0, Checkout::new(cmd, declared_total))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderIdResponse {
            order_id: order_id.to_string(),
        }),
    ))
}

/// GET /orders: the caller's orders, or every order for admins.
#[tracing::instrument(skip(state, caller))]
pub async fn list<R: OrderRepository + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<R, S>>>,
    caller: Caller,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.service.list_orders(&caller.0).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state, caller))]
pub async fn get<R: OrderRepository + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<R, S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.service.get_order(&caller.0, order_id).await?;
    Ok(Json(order.into()))
}

/// PATCH /orders/{id}: change status and/or replace items.
#[tracing::instrument(skip(state, caller, payload))]
pub async fn update<R: OrderRepository + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<R, S>>>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload?;

    let mut patch = OrderPatch::new();
    if let Some(status) = req.status {
        patch = patch.with_status(status);
    }
    if let Some(items) = req.items {
        patch = patch.with_items(ItemInput::parse_all(items)?);
    }

    let order = state.service.update_order(&caller.0, order_id, patch).await?;
    Ok(Json(order.into()))
}

/// DELETE /orders/{id}: remove an order, returning its stock.
#[tracing::instrument(skip(state, caller))]
pub async fn delete<R: OrderRepository + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<R, S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderIdResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let deleted = state.service.delete_order(&caller.0, order_id).await?;
    Ok(Json(OrderIdResponse {
        order_id: deleted.to_string(),
    }))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user_id: {e}")))?;
    Ok(UserId::from_uuid(uuid))
}
