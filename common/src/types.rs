//! Domain types: communities, liked items, login states and content categories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A community the logged-in user is an accepted member of.
///
/// Immutable once fetched. The list held by a client is replaced wholesale
/// on every successful login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Community {
    /// Display name shown on the portal
    pub name: String,
    /// Remote member id of the user inside this community
    pub member_id: String,
}

impl Community {
    /// Create a community entry
    pub fn new(name: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            member_id: member_id.into(),
        }
    }
}

/// A (community member id, item id) pair recorded after a like.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LikedItem {
    /// Member id of the community the like was issued from
    pub member_id: String,
    /// Remote content item id
    pub item_id: String,
}

impl LikedItem {
    /// Create a liked-item record
    pub fn new(member_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            item_id: item_id.into(),
        }
    }
}

/// Content client lifecycle state.
///
/// `LoggedOut -> ScanningQrCode -> LoggedIn`, plus the terminal `TornDown`.
/// A failed bind moves `ScanningQrCode` back to `LoggedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LoginState {
    /// No login attempted, or the last bind failed
    LoggedOut = 0,
    /// QR code issued, waiting for the user to scan and confirm
    ScanningQrCode = 1,
    /// Bound to a remote identity
    LoggedIn = 2,
    /// A scan was stopped explicitly; the client must not be reused
    TornDown = 3,
}

impl LoginState {
    /// Convert state to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoggedOut => "logged_out",
            Self::ScanningQrCode => "scanning_qr_code",
            Self::LoggedIn => "logged_in",
            Self::TornDown => "torn_down",
        }
    }

    /// Decode the raw value stored in an atomic cell.
    ///
    /// Unknown values decode to `TornDown` so a corrupted cell never reads
    /// as logged in.
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::LoggedOut,
            1 => Self::ScanningQrCode,
            2 => Self::LoggedIn,
            _ => Self::TornDown,
        }
    }
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four content feeds that support bulk liking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Community notices
    Notices,
    /// Neighbourhood moments
    Moments,
    /// Party-building posts
    CcpPosts,
    /// Resident proposals
    Proposals,
}

impl Category {
    /// Every category, in the order the portal lists them
    pub const ALL: [Category; 4] = [
        Category::Notices,
        Category::Moments,
        Category::CcpPosts,
        Category::Proposals,
    ];

    /// Stable identifier used in routes and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notices => "notices",
            Self::Moments => "moments",
            Self::CcpPosts => "ccp-posts",
            Self::Proposals => "proposals",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCategoryError(pub String);

impl fmt::Display for ParseCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for ParseCategoryError {}

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notices" => Ok(Self::Notices),
            "moments" => Ok(Self::Moments),
            "ccp-posts" | "ccpposts" => Ok(Self::CcpPosts),
            "proposals" => Ok(Self::Proposals),
            other => Err(ParseCategoryError(other.to_string())),
        }
    }
}
