//! Cart to order conversion.
//!
//! Runs in one transaction with the cart row locked, so concurrent
//! submissions of the same cart serialize and only the first one sees items.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use shop_core::{Money, PaymentMethod, UserId};

use crate::db::carts::CheckoutLine;
use crate::db::orders::NewOrder;
use crate::db::{OrderRepository, RepositoryError, carts, orders};
use crate::models::Order;

/// Maximum length of a shipping address.
pub const MAX_SHIPPING_ADDRESS_LENGTH: usize = 512;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The user has never had a cart.
    #[error("cart not found")]
    NoCart,

    /// The cart has no items.
    #[error("cart empty")]
    EmptyCart,

    /// Shipping address exceeds the column size.
    #[error("shipping address must be at most {MAX_SHIPPING_ADDRESS_LENGTH} characters")]
    AddressTooLong,

    /// The order total does not fit the amount column.
    #[error("order total exceeds {}", Money::MAX)]
    TotalTooLarge,

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// What the shopper submitted at checkout.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
}

/// Convert the user's cart into an order and empty the cart.
///
/// Each order item records the product's price at this instant.
///
/// # Errors
///
/// Returns `CheckoutError::NoCart` / `CheckoutError::EmptyCart` when there is
/// nothing to order, `CheckoutError::AddressTooLong` on oversized input, and
/// `CheckoutError::Repository` on database failure. Nothing is written unless
/// the whole conversion succeeds.
#[instrument(skip(pool, request), fields(payment_method = %request.payment_method))]
pub async fn place_order(
    pool: &PgPool,
    user_id: UserId,
    request: &OrderRequest,
) -> Result<Order, CheckoutError> {
    if request.shipping_address.chars().count() > MAX_SHIPPING_ADDRESS_LENGTH {
        return Err(CheckoutError::AddressTooLong);
    }

    let mut tx = pool.begin().await?;

    let cart_id = carts::lock_for_user(&mut tx, user_id)
        .await?
        .ok_or(CheckoutError::NoCart)?;

    let lines = carts::checkout_lines(&mut tx, cart_id).await?;
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let total_amount = order_total(&lines)?;

    let order_id = orders::insert(
        &mut tx,
        &NewOrder {
            user_id,
            shipping_address: &request.shipping_address,
            payment_method: request.payment_method,
            total_amount,
        },
    )
    .await?;
    orders::insert_items(&mut tx, order_id, &lines).await?;
    carts::clear(&mut tx, cart_id).await?;

    tx.commit().await?;

    tracing::info!(order_id = %order_id, total = %total_amount, lines = lines.len(), "Order placed");

    OrderRepository::new(pool)
        .get_for_user(user_id, order_id)
        .await?
        .ok_or(CheckoutError::Repository(RepositoryError::NotFound))
}

/// Sum of the line totals, bounded by what an order row can store.
fn order_total(lines: &[CheckoutLine]) -> Result<Money, CheckoutError> {
    let total: Money = lines.iter().map(CheckoutLine::total).sum();
    if total > Money::MAX {
        return Err(CheckoutError::TotalTooLarge);
    }
    Ok(total)
}
