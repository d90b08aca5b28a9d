//! Cart route handlers.
//!
//! Every shopper has at most one cart, created on first access.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use shop_core::{CartId, CartItemId, Money, ProductId, UserId};

use crate::config::MediaConfig;
use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Cart, CartItem};
use crate::state::AppState;

use super::json_body;
use super::products::ProductView;

const INVALID_QUANTITY_DETAIL: &str = "Quantity must be a positive integer";

/// Cart as rendered by the API.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub user: UserId,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartItemView>,
    pub total_price: Money,
}

/// Cart line as rendered by the API.
#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub product: ProductView,
    pub quantity: u32,
    pub total_price: Money,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, media: &MediaConfig) -> Self {
        Self {
            id: cart.id,
            user: cart.user_id,
            created_at: cart.created_at,
            items: cart
                .items
                .iter()
                .map(|item| CartItemView::new(item, media))
                .collect(),
            total_price: cart.total_price(),
        }
    }
}

impl CartItemView {
    #[must_use]
    pub fn new(item: &CartItem, media: &MediaConfig) -> Self {
        Self {
            id: item.id,
            product: ProductView::new(&item.product, media),
            quantity: item.quantity,
            total_price: item.total_price(),
        }
    }
}

/// Add-to-cart request body.
#[derive(Debug, Default, Deserialize)]
pub struct AddToCartRequest {
    /// Integer or numeric string; defaults to 1.
    #[serde(default)]
    pub quantity: Option<Value>,
}

impl AddToCartRequest {
    /// The requested quantity as a positive `i32`.
    fn quantity(&self) -> Result<i32> {
        let quantity = match &self.quantity {
            None | Some(Value::Null) => return Ok(1),
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
        };

        quantity
            .filter(|q| *q > 0)
            .and_then(|q| i32::try_from(q).ok())
            .ok_or_else(|| AppError::BadRequest(INVALID_QUANTITY_DETAIL.to_string()))
    }
}

/// Show the shopper's cart, creating it if needed.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let cart = CartRepository::new(state.pool())
        .get_or_create(user.id)
        .await?;

    Ok(Json(CartView::new(&cart, &state.config().media)))
}

/// Add a product to the cart, or increase its quantity if already present.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    body: Bytes,
) -> Result<(StatusCode, Json<CartView>)> {
    let request: AddToCartRequest = json_body(&body)?;
    let quantity = request.quantity()?;

    ProductRepository::new(state.pool())
        .get_active(product_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    let carts = CartRepository::new(state.pool());
    let cart = carts.get_or_create(user.id).await?;
    carts.add_item(cart.id, product_id, quantity).await?;

    tracing::info!(cart_id = %cart.id, product_id = %product_id, quantity, "Added to cart");

    let cart = carts.get_or_create(user.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CartView::new(&cart, &state.config().media)),
    ))
}

/// Remove a line from the shopper's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<Value>> {
    let removed = CartRepository::new(state.pool())
        .remove_item(user.id, item_id)
        .await?;

    if !removed {
        return Err(AppError::not_found());
    }

    Ok(Json(json!({ "detail": "removed" })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use crate::models::cart::tests::product;

    use super::*;

    fn request(body: &str) -> AddToCartRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        assert_eq!(AddToCartRequest::default().quantity().unwrap(), 1);
        assert_eq!(request("{}").quantity().unwrap(), 1);
        assert_eq!(request(r#"{"quantity":null}"#).quantity().unwrap(), 1);
    }

    #[test]
    fn test_quantity_accepts_numbers_and_numeric_strings() {
        assert_eq!(request(r#"{"quantity":3}"#).quantity().unwrap(), 3);
        assert_eq!(request(r#"{"quantity":" 7 "}"#).quantity().unwrap(), 7);
    }

    #[test]
    fn test_quantity_rejects_invalid() {
        for body in [
            r#"{"quantity":0}"#,
            r#"{"quantity":-2}"#,
            r#"{"quantity":1.5}"#,
            r#"{"quantity":"two"}"#,
            r#"{"quantity":true}"#,
            r#"{"quantity":99999999999}"#,
        ] {
            assert!(
                matches!(request(body).quantity(), Err(AppError::BadRequest(_))),
                "{body} should be rejected"
            );
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let media = MediaConfig {
            root: PathBuf::from("media"),
            url: "/media".to_string(),
        };
        let cart = Cart {
            id: CartId::new(2),
            user_id: UserId::new(9),
            created_at: Utc::now(),
            items: vec![CartItem {
                id: CartItemId::new(5),
                product: product(1, "250.00"),
                quantity: 2,
            }],
        };

        let json = serde_json::to_value(CartView::new(&cart, &media)).unwrap();
        assert_eq!(json["user"], 9);
        assert_eq!(json["total_price"], "500.00");
        assert_eq!(json["items"][0]["total_price"], "500.00");
        assert_eq!(json["items"][0]["product"]["name"], "Phone 1");
    }
}
