//! Common types shared across the Atom liker crates.
//!
//! # Architecture
//!
//! The `atom-common` crate sits at the bottom of the dependency hierarchy:
//! - Has NO dependencies on other workspace crates
//! - Defines the domain types the client, registry and API agree on
//! - Defines the store interfaces (`HistoryGate`, `SelectionStore`) that
//!   `atom-store` implements and `atom-client` consumes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod store;
mod types;

pub use error::{StoreError, StoreResult};
pub use store::{HistoryGate, SelectionStore};
pub use types::{Category, Community, LikedItem, LoginState, ParseCategoryError};
