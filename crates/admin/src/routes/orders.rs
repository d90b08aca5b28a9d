//! Order administration.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use serde::Serialize;
use tracing::instrument;

use shop_core::OrderId;

use super::json_body;
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{OrderFilter, OrderLine, OrderSummary, OrderUpdate, Page, Paginated};
use crate::state::AppState;

/// An order with its line items.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderSummary,
    pub order_items: Vec<OrderLine>,
}

/// List orders, newest first.
#[instrument(skip_all)]
pub async fn index(
    _: RequireAdmin,
    State(state): State<AppState>,
    Query(page): Query<Page>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Paginated<OrderSummary>>> {
    let orders = OrderRepository::new(state.pool()).list(&filter, page).await?;
    Ok(Json(orders))
}

/// A single order.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn show(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let (order, order_items) = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(Json(OrderDetail { order, order_items }))
}

/// Change an order's fulfilment or payment status.
///
/// `ordered_at`, line items and the Stripe reference cannot be changed.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn update(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    body: Bytes,
) -> Result<Json<OrderSummary>> {
    let update: OrderUpdate = json_body(&body)?;
    if update.is_empty() {
        return Err(AppError::BadRequest(
            "Provide order_status and/or payment_status.".to_string(),
        ));
    }

    let order = OrderRepository::new(state.pool())
        .update_status(id, &update)
        .await?;
    Ok(Json(order))
}
