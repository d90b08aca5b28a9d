//! Product administration.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use tracing::instrument;

use shop_core::ProductId;

use super::{ImportQuery, csv_attachment, json_body};
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::import_export::{self, ImportResult};
use crate::middleware::RequireAdmin;
use crate::models::{Page, Paginated, Product, ProductFilter, ProductUpdate};
use crate::state::AppState;

/// List products, newest first.
#[instrument(skip_all)]
pub async fn index(
    _: RequireAdmin,
    State(state): State<AppState>,
    Query(page): Query<Page>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Paginated<Product>>> {
    let products = ProductRepository::new(state.pool())
        .list(&filter, page)
        .await?;
    Ok(Json(products))
}

/// Inline edit of price, stock and visibility.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn update(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    body: Bytes,
) -> Result<Json<Product>> {
    let update: ProductUpdate = json_body(&body)?;
    update.validate().map_err(AppError::BadRequest)?;

    let product = ProductRepository::new(state.pool())
        .update(id, &update)
        .await?;
    tracing::info!(
        product_id = %id,
        price = %product.price,
        stock = product.stock,
        is_active = product.is_active,
        "Product updated"
    );

    Ok(Json(product))
}

/// Delete a product that no cart or order references.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn delete(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    if !ProductRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::not_found());
    }
    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Import products from an uploaded CSV body.
#[instrument(skip_all)]
pub async fn import(
    _: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Result<Json<ImportResult>> {
    let dry_run = query.dry_run()?;
    let result = import_export::import_products(
        state.pool(),
        &state.config().media_root,
        body.as_ref(),
        dry_run,
    )
    .await?;
    Ok(Json(result))
}

/// Download every product as CSV.
#[instrument(skip_all)]
pub async fn export(_: RequireAdmin, State(state): State<AppState>) -> Result<Response> {
    let mut buffer = Vec::new();
    import_export::export_products(state.pool(), &mut buffer).await?;
    Ok(csv_attachment("products.csv", buffer))
}
