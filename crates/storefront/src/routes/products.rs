//! Catalog route handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shop_core::{CategoryId, Money, ProductId};

use crate::config::MediaConfig;
use crate::db::{CategoryRepository, ProductFilter, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::{Category, Product};
use crate::state::AppState;

/// Product as rendered by the API.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub description: String,
    pub price: Money,
    pub stock: i32,
    /// Absolute image URL.
    pub image: Option<String>,
    pub rating: Decimal,
    pub is_active: bool,
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    /// Render a product, resolving its image against the media URL.
    #[must_use]
    pub fn new(product: &Product, media: &MediaConfig) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            brand: product.brand.clone(),
            description: product.description.clone(),
            price: product.price,
            stock: product.stock,
            image: product.image.as_deref().map(|path| media.url_for(path)),
            rating: product.rating,
            is_active: product.is_active,
            category: product.category.clone(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Product listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ProductQuery {
    fn into_filter(self) -> Result<ProductFilter> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map(CategoryId::new)
                    .map_err(|_| AppError::BadRequest("category must be an integer".to_string()))?,
            ),
        };

        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(ProductFilter { category, search })
    }
}

/// List active products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductView>>> {
    let filter = query.into_filter()?;
    let products = ProductRepository::new(state.pool())
        .list_active(&filter)
        .await?;

    let media = &state.config().media;
    Ok(Json(
        products
            .iter()
            .map(|product| ProductView::new(product, media))
            .collect(),
    ))
}

/// Show one active product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = if let Some(cached) = state.catalog().product(id).await {
        cached
    } else {
        let product = ProductRepository::new(state.pool())
            .get_active(id)
            .await?
            .ok_or_else(AppError::not_found)?;
        let product = Arc::new(product);
        state.catalog().insert_product(Arc::clone(&product)).await;
        product
    };

    Ok(Json(ProductView::new(&product, &state.config().media)))
}

/// List all categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    if let Some(cached) = state.catalog().categories().await {
        return Ok(Json(cached.as_ref().clone()));
    }

    let categories = CategoryRepository::new(state.pool()).list().await?;
    state
        .catalog()
        .insert_categories(Arc::new(categories.clone()))
        .await;

    Ok(Json(categories))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use crate::models::cart::tests::product;

    use super::*;

    fn media() -> MediaConfig {
        MediaConfig {
            root: PathBuf::from("media"),
            url: "https://shop.example.com/media".to_string(),
        }
    }

    #[test]
    fn test_product_view_resolves_image_url() {
        let mut item = product(3, "10.00");
        item.image = Some("products/mobile_3.jpg".to_string());

        let view = ProductView::new(&item, &media());
        assert_eq!(
            view.image.as_deref(),
            Some("https://shop.example.com/media/products/mobile_3.jpg")
        );

        item.image = None;
        assert_eq!(ProductView::new(&item, &media()).image, None);
    }

    #[test]
    fn test_product_view_serializes_price_as_string() {
        let view = ProductView::new(&product(1, "129.9"), &media());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["price"], "129.90");
        assert_eq!(json["id"], 1);
    }

    #[test]
    fn test_query_filter_parsing() {
        let filter = ProductQuery {
            category: Some(" 4 ".to_string()),
            search: Some("  phone ".to_string()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.category, Some(CategoryId::new(4)));
        assert_eq!(filter.search.as_deref(), Some("phone"));

        let filter = ProductQuery {
            category: Some(String::new()),
            search: Some("   ".to_string()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter, ProductFilter::default());
    }

    #[test]
    fn test_query_rejects_non_numeric_category() {
        let err = ProductQuery {
            category: Some("phones".to_string()),
            search: None,
        }
        .into_filter()
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
