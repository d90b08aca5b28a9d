//! Shopper email addresses.
//!
//! Email is optional at signup: blank input means the shopper gave none.
//! A non-blank address must look deliverable: one `@`, a local part without
//! whitespace and a dotted host name. The domain is stored lowercased.

use core::fmt;

use serde::Serialize;

/// Why an email address was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },

    #[error("email must contain a single @")]
    NotOneAt,

    #[error("email local part is invalid")]
    InvalidLocalPart,

    #[error("email domain {0:?} is invalid")]
    InvalidDomain(String),
}

/// A validated email address.
///
/// ```
/// use shop_core::Email;
///
/// assert_eq!(Email::parse("Ann@Example.COM").unwrap().as_str(), "Ann@example.com");
/// assert!(Email::parse_optional("  ").unwrap().is_none());
/// assert!(Email::parse("ann@localhost.").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Longest address a `VARCHAR(254)` column stores.
    pub const MAX_LENGTH: usize = 254;

    const MAX_LOCAL_LENGTH: usize = 64;

    /// Parse a non-blank address.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` naming the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::NotOneAt)?;
        if domain.contains('@') {
            return Err(EmailError::NotOneAt);
        }

        if local.is_empty()
            || local.chars().count() > Self::MAX_LOCAL_LENGTH
            || local.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(EmailError::InvalidLocalPart);
        }

        let domain = domain.to_ascii_lowercase();
        if !is_host_name(&domain) {
            return Err(EmailError::InvalidDomain(domain));
        }

        Ok(Self(format!("{local}@{domain}")))
    }

    /// Parse an address where blank input means "none".
    ///
    /// # Errors
    ///
    /// Returns `EmailError` if the trimmed input is non-blank and invalid.
    pub fn parse_optional(s: &str) -> Result<Option<Self>, EmailError> {
        match s.trim() {
            "" => Ok(None),
            trimmed => Self::parse(trimmed).map(Some),
        }
    }

    /// The address as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// At least two dot-separated labels of letters, digits and inner hyphens.
fn is_host_name(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_means_no_email() {
        assert_eq!(Email::parse_optional(""), Ok(None));
        assert_eq!(Email::parse_optional(" \t "), Ok(None));
    }

    #[test]
    fn test_optional_trims_and_normalises_domain() {
        let email = Email::parse_optional("  Priya.Shah+orders@Mail.Example.IN ").unwrap().unwrap();
        assert_eq!(email.as_str(), "Priya.Shah+orders@mail.example.in");
    }

    #[test]
    fn test_at_sign_count() {
        assert_eq!(Email::parse("priya.example.in"), Err(EmailError::NotOneAt));
        assert_eq!(Email::parse("a@b@example.in"), Err(EmailError::NotOneAt));
    }

    #[test]
    fn test_local_part_rules() {
        assert_eq!(Email::parse("@example.in"), Err(EmailError::InvalidLocalPart));
        assert_eq!(Email::parse("pri ya@example.in"), Err(EmailError::InvalidLocalPart));
        let long_local = format!("{}@example.in", "p".repeat(65));
        assert_eq!(Email::parse(&long_local), Err(EmailError::InvalidLocalPart));
    }

    #[test]
    fn test_domain_needs_dotted_host() {
        for domain in ["localhost", "example.", ".example.in", "-shop.in", "shop_1.in", ""] {
            assert!(
                matches!(
                    Email::parse(&format!("priya@{domain}")),
                    Err(EmailError::InvalidDomain(_))
                ),
                "{domain} should be rejected"
            );
        }
        assert!(Email::parse("priya@my-shop.co.in").is_ok());
    }

    #[test]
    fn test_length_limit() {
        let at_limit = format!("p@{}.in", "a".repeat(Email::MAX_LENGTH - 5));
        assert!(matches!(Email::parse(&at_limit), Err(EmailError::InvalidDomain(_))));

        let too_long = format!("p@{}.in", "a".repeat(Email::MAX_LENGTH));
        assert_eq!(
            Email::parse(&too_long),
            Err(EmailError::TooLong { max: Email::MAX_LENGTH })
        );
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email = Email::parse("priya@example.in").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"priya@example.in\"");
    }
}
