//! Product repository.
//!
//! Shoppers only ever see active products; the admin console has its own
//! queries over the full table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use shop_core::{CategoryId, Money, ProductId};

use super::{RepositoryError, contains_pattern};
use crate::models::{Category, Product};

/// Product columns with the joined category, aliased to match [`ProductRow`].
///
/// Expects the product aliased as `p` and the category as `c`.
pub(crate) const PRODUCT_COLUMNS: &str = "\
    p.id, p.name, p.brand, p.description, p.price, p.stock, p.image, p.rating, \
    p.is_active, p.created_at, p.updated_at, \
    c.id AS category_id, c.name AS category_name, c.description AS category_description";

/// Join bringing in the product's category as `c`.
pub(crate) const CATEGORY_JOIN: &str = "LEFT JOIN shop.category c ON c.id = p.category_id";

#[derive(sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: ProductId,
    name: String,
    brand: String,
    description: String,
    price: Money,
    stock: i32,
    image: Option<String>,
    rating: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    category_description: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let category = match (row.category_id, row.category_name) {
            (Some(id), Some(name)) => Some(Category {
                id,
                name,
                description: row.category_description.unwrap_or_default(),
            }),
            _ => None,
        };

        Self {
            id: row.id,
            category,
            name: row.name,
            brand: row.brand,
            description: row.description,
            price: row.price,
            stock: row.stock,
            image: row.image.filter(|path| !path.is_empty()),
            rating: row.rating,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Filters for the public product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductFilter {
    /// Only products in this category.
    pub category: Option<CategoryId>,
    /// Case-insensitive match on name, brand or description.
    pub search: Option<String>,
}

/// Repository for product reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active products matching `filter`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product p {CATEGORY_JOIN} WHERE p.is_active"
        ));

        if let Some(category) = filter.category {
            query.push(" AND p.category_id = ").push_bind(category);
        }

        if let Some(search) = filter.search.as_deref() {
            let pattern = contains_pattern(search);
            query
                .push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.brand ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query.push(" ORDER BY p.id");

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get an active product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product p {CATEGORY_JOIN} \
             WHERE p.id = $1 AND p.is_active"
        );

        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }
}
