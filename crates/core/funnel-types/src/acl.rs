//! Canned access-control values.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Canned ACL applied to uploaded or copied objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    /// Owner-only access
    #[default]
    Private,
    /// Anyone may read
    PublicRead,
    /// Anyone may read and write
    PublicReadWrite,
    /// Any authenticated principal may read
    AuthenticatedRead,
}

impl Acl {
    /// All accepted values, in wire form.
    pub const VALUES: [&'static str; 4] = [
        "private",
        "public-read",
        "public-read-write",
        "authenticated-read",
    ];

    /// The wire representation of this ACL.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
        }
    }

    /// Parse an ACL, falling back to [`Acl::Private`] for unknown values.
    ///
    /// Unknown values are not an error: a warning is logged and the most
    /// restrictive ACL is used instead.
    pub fn coerce(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            warn!(acl = value, fallback = "private", "Unsupported ACL, using private");
            Self::Private
        })
    }
}

impl FromStr for Acl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            "public-read-write" => Ok(Self::PublicReadWrite),
            "authenticated-read" => Ok(Self::AuthenticatedRead),
            other => Err(format!(
                "'{}' is not one of {}",
                other,
                Self::VALUES.join(", ")
            )),
        }
    }
}

impl std::fmt::Display for Acl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
