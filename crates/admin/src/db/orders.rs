//! Order inspection and status changes.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use shop_core::{
    Money, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

use super::{RepositoryError, search_term};
use crate::models::{OrderFilter, OrderLine, OrderSummary, OrderUpdate, Page, Paginated};

const ORDER_SELECT: &str = "\
    SELECT o.id, o.user_id, u.username, o.ordered_at, o.shipping_address, o.order_status, \
           o.payment_method, o.payment_status, o.total_amount, o.stripe_payment_intent \
    FROM shop.\"order\" o \
    JOIN shop.\"user\" u ON u.id = o.user_id";

const ORDER_FROM: &str = "\
    SELECT COUNT(*) FROM shop.\"order\" o JOIN shop.\"user\" u ON u.id = o.user_id";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    username: String,
    ordered_at: DateTime<Utc>,
    shipping_address: String,
    order_status: OrderStatus,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    total_amount: Money,
    stripe_payment_intent: Option<String>,
}

impl From<OrderRow> for OrderSummary {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            ordered_at: row.ordered_at,
            shipping_address: row.shipping_address,
            order_status: row.order_status,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            total_amount: row.total_amount,
            stripe_payment_intent: row.stripe_payment_intent,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: OrderItemId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    unit_price: Money,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
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

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    query.push(" WHERE TRUE");

    if let Some(status) = filter.order_status {
        query.push(" AND o.order_status = ").push_bind(status);
    }
    if let Some(method) = filter.payment_method {
        query.push(" AND o.payment_method = ").push_bind(method);
    }
    if let Some(status) = filter.payment_status {
        query.push(" AND o.payment_status = ").push_bind(status);
    }
    if let Some(pattern) = search_term(filter.search.as_deref()) {
        query
            .push(" AND (u.username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR o.shipping_address ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Repository for order administration.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<Paginated<OrderSummary>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(ORDER_FROM);
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(ORDER_SELECT);
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY o.ordered_at DESC, o.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = query
            .build_query_as::<OrderRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(Paginated {
            items: rows.into_iter().map(Into::into).collect(),
            page: page.page.max(1),
            per_page: page.per_page,
            total,
        })
    }

    /// An order with its line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(
        &self,
        id: OrderId,
    ) -> Result<Option<(OrderSummary, Vec<OrderLine>)>, RepositoryError> {
        let Some(order) = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT oi.id, oi.product_id, p.name AS product_name, oi.quantity, oi.unit_price
            FROM shop.order_item oi
            JOIN shop.product p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some((
            order.into(),
            lines.into_iter().map(Into::into).collect(),
        )))
    }

    /// Change an order's fulfilment and/or payment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<OrderSummary, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE shop."order"
            SET
                order_status = COALESCE($2, order_status),
                payment_status = COALESCE($3, payment_status)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.order_status)
        .bind(update.payment_status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::info!(
            order_id = %id,
            order_status = ?update.order_status,
            payment_status = ?update.payment_status,
            "Order status changed by admin"
        );

        let order = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(order.into())
    }
}
