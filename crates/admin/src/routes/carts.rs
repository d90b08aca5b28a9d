//! Cart inspection.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use tracing::instrument;

use shop_core::CartId;

use crate::db::CartRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{CartFilter, CartLine, CartSummary, Page, Paginated};
use crate::state::AppState;

/// A cart with its lines.
#[derive(Debug, Serialize)]
pub struct CartDetail {
    #[serde(flatten)]
    pub cart: CartSummary,
    pub items: Vec<CartLine>,
}

/// List carts, newest first.
#[instrument(skip_all)]
pub async fn index(
    _: RequireAdmin,
    State(state): State<AppState>,
    Query(page): Query<Page>,
    Query(filter): Query<CartFilter>,
) -> Result<Json<Paginated<CartSummary>>> {
    let carts = CartRepository::new(state.pool()).list(&filter, page).await?;
    Ok(Json(carts))
}

/// A single cart.
#[instrument(skip_all, fields(cart_id = %id))]
pub async fn show(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CartId>,
) -> Result<Json<CartDetail>> {
    let (cart, items) = CartRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(Json(CartDetail { cart, items }))
}
