//! Atom Session Registry
//!
//! Multiplexes inbound sessions onto content clients.
//!
//! # Architecture
//!
//! - one `ContentClient` per session id, built by a `ClientFactory`
//! - absolute expiry: each entry is evicted `max_age` after it was created
//! - replacing or evicting an entry tears its client down outside the table
//!   lock, and a replacement is installed only after the previous client's
//!   login task has finished

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod error;
mod factory;
mod registry;

pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use factory::{ClientFactory, DefaultClientFactory};
pub use registry::SessionRegistry;
