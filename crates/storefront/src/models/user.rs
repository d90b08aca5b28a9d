//! User domain types.

use chrono::{DateTime, Utc};

use shop_core::{Email, UserId, Username};

/// A shopper account.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// Contact email, if the shopper gave one.
    pub email: Option<Email>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Email as the API renders it (blank when unset).
    #[must_use]
    pub fn email_str(&self) -> &str {
        self.email.as_ref().map_or("", Email::as_str)
    }
}
