//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shop_core::{Email, UserId, Username};

use super::RepositoryError;
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        build_user(row.id, &row.username, &row.email, row.created_at)
    }
}

/// Assemble a [`User`] from stored column values, validating them.
pub(crate) fn build_user(
    id: UserId,
    username: &str,
    email: &str,
    created_at: DateTime<Utc>,
) -> Result<User, RepositoryError> {
    let username = Username::parse(username).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
    })?;
    let email = shop_core::Email::parse_optional(email)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))?;

    Ok(User {
        id,
        username,
        email,
        created_at,
    })
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, created_at
            FROM shop."user"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user and their password hash by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r#"
            SELECT id, username, email, created_at, password_hash
            FROM shop."user"
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        username: &Username,
        email: Option<&Email>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO shop."user" (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, created_at
            "#,
        )
        .bind(username.as_str())
        .bind(email.map_or("", Email::as_str))
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("username already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        User::try_from(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_user_allows_blank_email() {
        let user = build_user(UserId::new(1), "alice", "", Utc::now());
        assert!(user.is_ok_and(|u| u.email.is_none() && u.email_str().is_empty()));
    }

    #[test]
    fn test_build_user_rejects_corrupt_username() {
        let user = build_user(UserId::new(1), "", "a@b.co", Utc::now());
        assert!(matches!(user, Err(RepositoryError::DataCorruption(_))));
    }
}
