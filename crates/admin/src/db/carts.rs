//! Read-only cart inspection.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use shop_core::{CartId, CartItemId, Money, ProductId, UserId};

use super::{RepositoryError, search_term};
use crate::models::{CartFilter, CartLine, CartSummary, Page, Paginated};

const CART_SELECT: &str = "\
    SELECT ca.id, ca.user_id, u.username, ca.created_at, \
           COUNT(ci.id) AS item_count, \
           COALESCE(SUM(p.price * ci.quantity), 0)::NUMERIC(12, 2) AS total_price \
    FROM shop.cart ca \
    JOIN shop.\"user\" u ON u.id = ca.user_id \
    LEFT JOIN shop.cart_item ci ON ci.cart_id = ca.id \
    LEFT JOIN shop.product p ON p.id = ci.product_id";

const CART_GROUP_BY: &str = " GROUP BY ca.id, u.username";

#[derive(Debug, sqlx::FromRow)]
struct CartSummaryRow {
    id: CartId,
    user_id: UserId,
    username: String,
    created_at: DateTime<Utc>,
    item_count: i64,
    total_price: Money,
}

impl From<CartSummaryRow> for CartSummary {
    fn from(row: CartSummaryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            created_at: row.created_at,
            item_count: row.item_count,
            total_price: row.total_price,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    unit_price: Money,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        let quantity = u32::try_from(row.quantity).unwrap_or_default();
        Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.unit_price.times(quantity),
        }
    }
}

/// Repository for cart inspection.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of carts, newest first, optionally filtered by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &CartFilter,
        page: Page,
    ) -> Result<Paginated<CartSummary>, RepositoryError> {
        let pattern = search_term(filter.search.as_deref());

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM shop.cart ca JOIN shop.\"user\" u ON u.id = ca.user_id",
        );
        if let Some(pattern) = &pattern {
            count.push(" WHERE u.username ILIKE ").push_bind(pattern.clone());
        }
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(CART_SELECT);
        if let Some(pattern) = pattern {
            query.push(" WHERE u.username ILIKE ").push_bind(pattern);
        }
        query
            .push(CART_GROUP_BY)
            .push(" ORDER BY ca.created_at DESC, ca.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = query
            .build_query_as::<CartSummaryRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(Paginated {
            items: rows.into_iter().map(Into::into).collect(),
            page: page.page.max(1),
            per_page: page.per_page,
            total,
        })
    }

    /// A cart with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(
        &self,
        id: CartId,
    ) -> Result<Option<(CartSummary, Vec<CartLine>)>, RepositoryError> {
        let sql = format!("{CART_SELECT} WHERE ca.id = $1{CART_GROUP_BY}");
        let Some(summary) = sqlx::query_as::<_, CartSummaryRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.id, ci.product_id, p.name AS product_name, ci.quantity,
                   p.price AS unit_price
            FROM shop.cart_item ci
            JOIN shop.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some((
            summary.into(),
            lines.into_iter().map(Into::into).collect(),
        )))
    }
}
