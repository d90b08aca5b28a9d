//! Order repository.
//!
//! Orders are created only by checkout (see [`crate::services::checkout`]).
//! After creation only the payment fields change.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use shop_core::{
    Money, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, UserId,
};

use super::carts::CheckoutLine;
use super::products::{CATEGORY_JOIN, PRODUCT_COLUMNS, ProductRow};
use super::users::build_user;
use super::{RepositoryError, quantity_from_db};
use crate::models::{Order, OrderItem, Product};

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.ordered_at, o.shipping_address, o.order_status, o.payment_method,
           o.payment_status, o.total_amount, o.stripe_payment_intent,
           u.id AS user_id, u.username, u.email, u.created_at AS user_created_at
    FROM shop."order" o
    JOIN shop."user" u ON u.id = o.user_id
"#;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    ordered_at: DateTime<Utc>,
    shipping_address: String,
    order_status: OrderStatus,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    total_amount: Money,
    stripe_payment_intent: Option<String>,
    user_id: UserId,
    username: String,
    email: String,
    user_created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    item_id: OrderItemId,
    order_id: OrderId,
    quantity: i32,
    unit_price: Money,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let user = build_user(
            self.user_id,
            &self.username,
            &self.email,
            self.user_created_at,
        )?;

        Ok(Order {
            id: self.id,
            user,
            ordered_at: self.ordered_at,
            shipping_address: self.shipping_address,
            order_status: self.order_status,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            total_amount: self.total_amount,
            stripe_payment_intent: self.stripe_payment_intent,
            items,
        })
    }
}

/// Values for a new order row.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: UserId,
    pub shipping_address: &'a str,
    pub payment_method: PaymentMethod,
    pub total_amount: Money,
}

/// Result of a payment status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentUpdate {
    /// The order's status changed.
    Applied,
    /// The order exists but was already in a terminal state.
    Unchanged,
    /// No order matched.
    NotFound,
}

/// Repository for order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.ordered_at DESC, o.id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        self.attach_items(rows).await
    }

    /// Get one of a user's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = $1 AND o.user_id = $2");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(self.attach_items(row.into_iter().collect()).await?.pop())
    }

    /// Record the payment intent created for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_payment_intent(
        &self,
        order_id: OrderId,
        payment_intent_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE shop."order" SET stripe_payment_intent = $2 WHERE id = $1"#,
        )
        .bind(order_id)
        .bind(payment_intent_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark an order paid by the given payment intent.
    ///
    /// The intent must be the one stored on the order or, when the order
    /// holds a newer intent (the shopper restarted payment), charge exactly
    /// the order total. The paying intent becomes the stored one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn mark_paid(
        &self,
        order_id: OrderId,
        payment_intent_id: &str,
        amount: Option<Money>,
    ) -> Result<PaymentUpdate, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(r#"UPDATE shop."order" SET payment_status = "#);
        query
            .push_bind(PaymentStatus::Paid)
            .push(", stripe_payment_intent = ")
            .push_bind(payment_intent_id)
            .push(" WHERE id = ")
            .push_bind(order_id)
            .push(" AND payment_status <> ")
            .push_bind(PaymentStatus::Paid)
            .push(" AND (stripe_payment_intent IS NULL OR stripe_payment_intent = ")
            .push_bind(payment_intent_id);
        if let Some(amount) = amount {
            query.push(" OR total_amount = ").push_bind(amount);
        }
        query.push(")");

        let result = query.build().execute(self.pool).await?;
        self.payment_outcome(order_id, result.rows_affected()).await
    }

    /// Mark an order's payment failed, unless it has already been paid.
    ///
    /// Failures of an intent other than the stored one are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn mark_failed(
        &self,
        order_id: OrderId,
        payment_intent_id: &str,
    ) -> Result<PaymentUpdate, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE shop."order"
            SET payment_status = $3,
                stripe_payment_intent = COALESCE(stripe_payment_intent, $2)
            WHERE id = $1
              AND payment_status = $4
              AND (stripe_payment_intent IS NULL OR stripe_payment_intent = $2)
            "#,
        )
        .bind(order_id)
        .bind(payment_intent_id)
        .bind(PaymentStatus::Failed)
        .bind(PaymentStatus::Pending)
        .execute(self.pool)
        .await?;

        self.payment_outcome(order_id, result.rows_affected()).await
    }

    async fn payment_outcome(
        &self,
        order_id: OrderId,
        rows_affected: u64,
    ) -> Result<PaymentUpdate, RepositoryError> {
        if rows_affected > 0 {
            return Ok(PaymentUpdate::Applied);
        }

        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM shop."order" WHERE id = $1)"#,
        )
        .bind(order_id)
        .fetch_one(self.pool)
        .await?;

        Ok(if exists {
            PaymentUpdate::Unchanged
        } else {
            PaymentUpdate::NotFound
        })
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|row| row.id.as_i32()).collect();
        let sql = format!(
            "SELECT oi.id AS item_id, oi.order_id, oi.quantity, oi.unit_price, {PRODUCT_COLUMNS} \
             FROM shop.order_item oi \
             JOIN shop.product p ON p.id = oi.product_id \
             {CATEGORY_JOIN} \
             WHERE oi.order_id = ANY($1) \
             ORDER BY oi.id"
        );
        let item_rows = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool)
            .await?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.order_id).or_default().push(OrderItem {
                id: row.item_id,
                quantity: quantity_from_db(row.quantity)?,
                unit_price: row.unit_price,
                product: Product::from(row.product),
            });
        }

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }
}

/// Insert an order row, returning its ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(conn: &mut PgConnection, order: &NewOrder<'_>) -> Result<OrderId, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderId>(
        r#"
        INSERT INTO shop."order" (user_id, shipping_address, payment_method, total_amount)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(order.user_id)
    .bind(order.shipping_address)
    .bind(order.payment_method)
    .bind(order.total_amount)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

/// Copy checkout lines into order items with their unit price snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    lines: &[CheckoutLine],
) -> Result<(), RepositoryError> {
    if lines.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO shop.order_item (order_id, product_id, quantity, unit_price) ",
    );
    query.push_values(lines, |mut row, line| {
        row.push_bind(order_id)
            .push_bind(line.product_id)
            .push_bind(line.quantity)
            .push_bind(line.unit_price);
    });
    query.build().execute(conn).await?;

    Ok(())
}
