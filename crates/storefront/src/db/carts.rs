//! Cart repository.
//!
//! Each user owns at most one cart (`UNIQUE (user_id)`), and each product
//! appears at most once per cart (`UNIQUE (cart_id, product_id)`). Both are
//! relied on for single-statement get-or-create and add-or-increment.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use shop_core::{CartId, CartItemId, Money, ProductId, UserId};

use super::products::{CATEGORY_JOIN, PRODUCT_COLUMNS, ProductRow};
use super::{RepositoryError, quantity_from_db};
use crate::models::{Cart, CartItem, Product};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    item_id: CartItemId,
    quantity: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.item_id,
            quantity: quantity_from_db(row.quantity)?,
            product: Product::from(row.product),
        })
    }
}

/// A cart line priced at the product's current price, as read at checkout.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
}

impl CheckoutLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn total(&self) -> Money {
        self.unit_price
            .times(u32::try_from(self.quantity).unwrap_or_default())
    }
}

/// Repository for cart operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's cart with its items, creating an empty cart if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO shop.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, created_at
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        let items = self.items(row.id).await?;

        Ok(Cart {
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
            items,
        })
    }

    /// List a cart's items in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let sql = format!(
            "SELECT ci.id AS item_id, ci.quantity, {PRODUCT_COLUMNS} \
             FROM shop.cart_item ci \
             JOIN shop.product p ON p.id = ci.product_id \
             {CATEGORY_JOIN} \
             WHERE ci.cart_id = $1 \
             ORDER BY ci.id"
        );

        let rows = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(cart_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    /// Add `quantity` of a product, incrementing an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the resulting quantity would
    /// overflow, `RepositoryError::Database` for other failures.
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.cart_item (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = shop.cart_item.quantity + EXCLUDED.quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await
        .map_err(|e| {
            // 22003: numeric_value_out_of_range
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.code().as_deref() == Some("22003")
            {
                return RepositoryError::Conflict("quantity out of range".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    /// Remove a line from the user's own cart.
    ///
    /// Returns `false` if no such line exists in that user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shop.cart_item ci
            USING shop.cart c
            WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.id = $2
            ",
        )
        .bind(user_id)
        .bind(item_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Lock the user's cart row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_user(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<CartId>, RepositoryError> {
    let id = sqlx::query_scalar::<_, CartId>(
        "SELECT id FROM shop.cart WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    Ok(id)
}

/// Read a cart's lines at current product prices.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn checkout_lines(
    conn: &mut PgConnection,
    cart_id: CartId,
) -> Result<Vec<CheckoutLine>, RepositoryError> {
    let lines = sqlx::query_as::<_, CheckoutLine>(
        r"
        SELECT ci.product_id, ci.quantity, p.price AS unit_price
        FROM shop.cart_item ci
        JOIN shop.product p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.id
        ",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;

    Ok(lines)
}

/// Delete every line of a cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn clear(conn: &mut PgConnection, cart_id: CartId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM shop.cart_item WHERE cart_id = $1")
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_line_total() {
        let line = CheckoutLine {
            product_id: ProductId::new(1),
            quantity: 3,
            unit_price: Money::from_minor_units(1_999),
        };
        assert_eq!(line.total().to_string(), "59.97");
    }
}
