//! Order route handlers: checkout, history and card payment.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shop_core::{Money, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus};

use crate::config::MediaConfig;
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderItem};
use crate::services::checkout::{self, OrderRequest};
use crate::services::payments::{self, PaymentSession};
use crate::state::AppState;

use super::auth::UserView;
use super::json_body;
use super::products::ProductView;

/// Order as rendered by the API.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub user: UserView,
    pub ordered_at: DateTime<Utc>,
    pub shipping_address: String,
    pub order_status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_amount: Money,
    pub order_items: Vec<OrderItemView>,
    pub stripe_payment_intent: Option<String>,
}

/// Order line as rendered by the API.
#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub id: OrderItemId,
    pub product: ProductView,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order, media: &MediaConfig) -> Self {
        Self {
            id: order.id,
            user: UserView::from(&order.user),
            ordered_at: order.ordered_at,
            shipping_address: order.shipping_address.clone(),
            order_status: order.order_status,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            total_amount: order.total_amount,
            order_items: order
                .items
                .iter()
                .map(|item| OrderItemView::new(item, media))
                .collect(),
            stripe_payment_intent: order.stripe_payment_intent.clone(),
        }
    }
}

impl OrderItemView {
    #[must_use]
    pub fn new(item: &OrderItem, media: &MediaConfig) -> Self {
        Self {
            id: item.id,
            product: ProductView::new(&item.product, media),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price(),
        }
    }
}

/// Checkout request body.
#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub shipping_address: String,
    /// `"COD"` or `"Stripe"`; defaults to `"COD"`.
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl CreateOrderRequest {
    fn into_order_request(self) -> Result<OrderRequest> {
        let payment_method = match self.payment_method.as_deref().map(str::trim) {
            None | Some("") => PaymentMethod::default(),
            Some(raw) => raw
                .parse::<PaymentMethod>()
                .map_err(|_| AppError::BadRequest(format!("\"{raw}\" is not a valid choice.")))?,
        };

        Ok(OrderRequest {
            shipping_address: self.shipping_address,
            payment_method,
        })
    }
}

/// List the shopper's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    let media = &state.config().media;
    Ok(Json(
        orders.iter().map(|order| OrderView::new(order, media)).collect(),
    ))
}

/// Show one of the shopper's orders.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(user.id, id)
        .await?
        .ok_or_else(AppError::not_found)?;

    Ok(Json(OrderView::new(&order, &state.config().media)))
}

/// Convert the shopper's cart into an order.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Bytes,
) -> Result<(StatusCode, Json<OrderView>)> {
    let request: CreateOrderRequest = json_body(&body)?;
    let request = request.into_order_request()?;

    let order = checkout::place_order(state.pool(), user.id, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderView::new(&order, &state.config().media)),
    ))
}

/// Start a Stripe payment for one of the shopper's orders.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<PaymentSession>> {
    let session =
        payments::start_card_payment(state.pool(), state.stripe(), user.id, id).await?;

    Ok(Json(session))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use shop_core::{UserId, Username};

    use crate::models::User;
    use crate::models::cart::tests::product;

    use super::*;

    #[test]
    fn test_payment_method_defaults_to_cod() {
        let request = CreateOrderRequest::default().into_order_request().unwrap();
        assert_eq!(request.payment_method, PaymentMethod::CashOnDelivery);
        assert_eq!(request.shipping_address, "");
    }

    #[test]
    fn test_payment_method_parses_stripe() {
        let request: CreateOrderRequest =
            serde_json::from_str(r#"{"shipping_address":"1 Main St","payment_method":"Stripe"}"#)
                .unwrap();
        let request = request.into_order_request().unwrap();
        assert_eq!(request.payment_method, PaymentMethod::Stripe);
        assert_eq!(request.shipping_address, "1 Main St");
    }

    #[test]
    fn test_invalid_payment_method_is_rejected() {
        let request = CreateOrderRequest {
            shipping_address: String::new(),
            payment_method: Some("Card".to_string()),
        };
        let err = request.into_order_request().unwrap_err();
        assert_eq!(err.detail(), "\"Card\" is not a valid choice.");
    }

    #[test]
    fn test_order_view_shape() {
        let media = MediaConfig {
            root: PathBuf::from("media"),
            url: "/media".to_string(),
        };
        let order = Order {
            id: OrderId::new(11),
            user: User {
                id: UserId::new(3),
                username: Username::parse("alice").unwrap(),
                email: None,
                created_at: Utc::now(),
            },
            ordered_at: Utc::now(),
            shipping_address: "1 Main St".to_string(),
            order_status: OrderStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            total_amount: "30.00".parse().unwrap(),
            stripe_payment_intent: None,
            items: vec![OrderItem {
                id: OrderItemId::new(1),
                product: product(4, "12.00"),
                quantity: 3,
                unit_price: "10.00".parse().unwrap(),
            }],
        };

        let json = serde_json::to_value(OrderView::new(&order, &media)).unwrap();
        assert_eq!(json["user"]["username"], "alice");
        assert_eq!(json["user"]["email"], "");
        assert_eq!(json["payment_method"], "COD");
        assert_eq!(json["order_items"][0]["unit_price"], "10.00");
        assert_eq!(json["order_items"][0]["total_price"], "30.00");
        assert!(json["stripe_payment_intent"].is_null());
    }
}
