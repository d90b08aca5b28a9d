//! Category administration.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;

use shop_core::CategoryId;

use super::{ImportQuery, csv_attachment, json_body};
use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::import_export::{self, ImportResult};
use crate::middleware::RequireAdmin;
use crate::models::catalog::validate_category_name;
use crate::models::{Category, CategoryInput, CategoryUpdate};
use crate::state::AppState;

/// Query string of the category list.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// List categories by name.
#[instrument(skip_all)]
pub async fn index(
    _: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool())
        .list(query.search.as_deref())
        .await?;
    Ok(Json(categories))
}

/// Create a category.
#[instrument(skip_all)]
pub async fn create(
    _: RequireAdmin,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Category>)> {
    let mut input: CategoryInput = json_body(&body)?;
    input.name = validate_category_name(&input.name)
        .map_err(AppError::BadRequest)?
        .to_string();

    let category = CategoryRepository::new(state.pool()).create(&input).await?;
    tracing::info!(category_id = %category.id, name = %category.name, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

/// Rename a category or change its description.
#[instrument(skip_all, fields(category_id = %id))]
pub async fn update(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    body: Bytes,
) -> Result<Json<Category>> {
    let mut update: CategoryUpdate = json_body(&body)?;
    if let Some(name) = &update.name {
        update.name = Some(
            validate_category_name(name)
                .map_err(AppError::BadRequest)?
                .to_string(),
        );
    }

    let category = CategoryRepository::new(state.pool())
        .update(id, &update)
        .await?;
    Ok(Json(category))
}

/// Delete a category. Its products are kept without a category.
#[instrument(skip_all, fields(category_id = %id))]
pub async fn delete(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    if !CategoryRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::not_found());
    }
    tracing::info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Import categories from an uploaded CSV body.
#[instrument(skip_all)]
pub async fn import(
    _: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Result<Json<ImportResult>> {
    let dry_run = query.dry_run()?;
    let result = import_export::import_categories(state.pool(), body.as_ref(), dry_run).await?;
    Ok(Json(result))
}

/// Download every category as CSV.
#[instrument(skip_all)]
pub async fn export(_: RequireAdmin, State(state): State<AppState>) -> Result<Response> {
    let mut buffer = Vec::new();
    import_export::export_categories(state.pool(), &mut buffer).await?;
    Ok(csv_attachment("categories.csv", buffer))
}
