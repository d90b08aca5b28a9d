//! Category maintenance.

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use shop_core::CategoryId;

use super::{RepositoryError, map_constraint_error, search_term};
use crate::models::{Category, CategoryInput, CategoryUpdate};

const DUPLICATE_NAME: &str = "category with this name already exists.";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    description: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
        }
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Categories ordered by name, optionally filtered by a name search.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Category>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT id, name, description FROM shop.category");
        if let Some(pattern) = search_term(search) {
            query.push(" WHERE name ILIKE ").push_bind(pattern);
        }
        query.push(" ORDER BY name");

        let rows = query
            .build_query_as::<CategoryRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO shop.category (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            ",
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_constraint_error(e, DUPLICATE_NAME))?;

        Ok(row.into())
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist and
    /// `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE shop.category
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING id, name, description
            ",
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.description.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_constraint_error(e, DUPLICATE_NAME))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a category. Its products keep existing without one.
    ///
    /// Returns `false` if no such category exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Import helpers (run inside the caller's transaction)
// =============================================================================

/// Look up a category by exact name.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_name(
    conn: &mut PgConnection,
    name: &str,
) -> Result<Option<Category>, RepositoryError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, description FROM shop.category WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Insert a category.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the name is taken.
pub async fn insert(
    conn: &mut PgConnection,
    name: &str,
    description: &str,
) -> Result<CategoryId, RepositoryError> {
    sqlx::query_scalar::<_, CategoryId>(
        "INSERT INTO shop.category (name, description) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(description)
    .fetch_one(conn)
    .await
    .map_err(|e| map_constraint_error(e, DUPLICATE_NAME))
}

/// Replace a category's description.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn set_description(
    conn: &mut PgConnection,
    id: CategoryId,
    description: &str,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.category SET description = $2 WHERE id = $1")
        .bind(id)
        .bind(description)
        .execute(conn)
        .await?;

    Ok(())
}
