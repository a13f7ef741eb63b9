//! Wishlist membership actions.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single membership change sent to the remote wishlist backend.
///
/// Rendered on the wire as `add` / `remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WishlistAction {
    Add,
    Remove,
}

impl WishlistAction {
    /// Wire representation used in query strings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for WishlistAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown action name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown wishlist action: {0:?}")]
pub struct ParseActionError(pub String);

impl FromStr for WishlistAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            other => Err(ParseActionError(other.to_owned())),
        }
    }
}
