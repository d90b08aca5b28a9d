//! Product maintenance over the full catalog, inactive products included.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use shop_core::{CategoryId, Money, ProductId};

use super::{RepositoryError, map_constraint_error, search_term};
use crate::models::{Page, Paginated, Product, ProductFields, ProductFilter, ProductUpdate};

const PRODUCT_SELECT: &str = "\
    SELECT p.id, p.name, p.brand, p.category_id, c.name AS category_name, p.description, \
           p.price, p.stock, p.image, p.rating, p.is_active, p.created_at, p.updated_at \
    FROM shop.product p \
    LEFT JOIN shop.category c ON c.id = p.category_id";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    brand: String,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    description: String,
    price: Money,
    stock: i32,
    image: Option<String>,
    rating: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let image = row.image.filter(|path| !path.is_empty());
        Self {
            id: row.id,
            name: row.name,
            brand: row.brand,
            category_id: row.category_id,
            category: row.category_name,
            description: row.description,
            price: row.price,
            stock: row.stock,
            has_image: image.is_some(),
            image,
            rating: row.rating,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Append the `WHERE` clause for `filter`.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    query.push(" WHERE TRUE");

    if let Some(category) = filter.category {
        query.push(" AND p.category_id = ").push_bind(category);
    }
    if let Some(brand) = filter.brand.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        query.push(" AND p.brand = ").push_bind(brand.to_string());
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND p.is_active = ").push_bind(is_active);
    }
    if let Some(pattern) = search_term(filter.search.as_deref()) {
        query
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.brand ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: Page,
    ) -> Result<Paginated<Product>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM shop.product p LEFT JOIN shop.category c ON c.id = p.category_id",
        );
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(Paginated {
            items: rows.into_iter().map(Into::into).collect(),
            page: page.page.max(1),
            per_page: page.per_page,
            total,
        })
    }

    /// Every product ordered by ID, for export.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} ORDER BY p.id"))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Apply an inline edit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.product
            SET
                price = COALESCE($2, price),
                stock = COALESCE($3, stock),
                is_active = COALESCE($4, is_active)
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.price)
        .bind(update.stock)
        .bind(update.is_active)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// Returns `false` if no such product exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if carts or orders still reference it.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                map_constraint_error(e, "Product is referenced by carts or orders; deactivate it instead.")
            })?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Import helpers (run inside the caller's transaction)
// =============================================================================

/// Look up a product by exact name.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_name(
    conn: &mut PgConnection,
    name: &str,
) -> Result<Option<Product>, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "{PRODUCT_SELECT} WHERE p.name = $1 ORDER BY p.id LIMIT 1"
    ))
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Insert a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(
    conn: &mut PgConnection,
    fields: &ProductFields,
) -> Result<ProductId, RepositoryError> {
    let id = sqlx::query_scalar::<_, ProductId>(
        r"
        INSERT INTO shop.product
            (name, brand, category_id, description, price, stock, image, rating, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        ",
    )
    .bind(&fields.name)
    .bind(&fields.brand)
    .bind(fields.category_id)
    .bind(&fields.description)
    .bind(fields.price)
    .bind(fields.stock)
    .bind(fields.image.as_deref())
    .bind(fields.rating)
    .bind(fields.is_active)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

/// Overwrite every field of a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn replace(
    conn: &mut PgConnection,
    id: ProductId,
    fields: &ProductFields,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE shop.product
        SET name = $2, brand = $3, category_id = $4, description = $5,
            price = $6, stock = $7, image = $8, rating = $9, is_active = $10
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(&fields.name)
    .bind(&fields.brand)
    .bind(fields.category_id)
    .bind(&fields.description)
    .bind(fields.price)
    .bind(fields.stock)
    .bind(fields.image.as_deref())
    .bind(fields.rating)
    .bind(fields.is_active)
    .execute(conn)
    .await?;

    Ok(())
}
