//! Logged-in customer identity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a logged-in storefront customer.
///
/// Host pages hand this over as either a number or a string, so it is kept
/// as text. An empty or whitespace-only value means "guest" and never
/// produces a `CustomerId`.
///
/// ## Examples
///
/// ```
/// use sentia_core::CustomerId;
///
/// assert_eq!(CustomerId::parse(" 6021 ").unwrap().as_str(), "6021");
/// assert!(CustomerId::parse("").is_none());
/// assert!(CustomerId::parse("   ").is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    /// Parse a customer identifier, returning `None` for guests.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CustomerId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CustomerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<i64> for CustomerId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}
