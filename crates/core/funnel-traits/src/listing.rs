//! Listing value types.

use serde::{Deserialize, Serialize};

/// A key returned by a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// The key name (or common prefix when grouped by a delimiter)
    pub name: String,

    /// Object size in bytes; zero for common prefixes
    pub size: u64,

    /// Whether this entry is a common prefix rather than an object
    pub is_prefix: bool,
}

impl KeyInfo {
    /// An object entry.
    pub fn object(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            is_prefix: false,
        }
    }

    /// A common-prefix entry.
    pub fn prefix(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            is_prefix: true,
        }
    }
}

/// One page of a paginated key listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Keys in listing order
    pub keys: Vec<KeyInfo>,

    /// Whether more keys follow the last one in this page
    pub is_truncated: bool,
}

impl ListPage {
    /// Create a page.
    pub fn new(keys: Vec<KeyInfo>, is_truncated: bool) -> Self {
        Self { keys, is_truncated }
    }

    /// The name of the last key in the page, used as the next marker.
    pub fn last_key(&self) -> Option<&str> {
        self.keys.last().map(|k| k.name.as_str())
    }
}
