//! Atom Content Client
//!
//! One outbound identity against the community portal.
//!
//! # Architecture
//!
//! A `ContentClient` owns:
//! - a `Transport` carrying its private cookie jar
//! - the QR login state machine, driven over a `DuplexConnection`
//! - the accepted memberships and the active community
//! - the bulk like engine, deduplicated through a `HistoryGate`
//!
//! Every collaborator sits behind a trait so tests can script the portal.
//!
//! # Usage
//!
//! ```rust,no_run
//! use atom_client::{ClientConfig, ContentClient};
//! use atom_common::Category;
//! use atom_store::NullHistory;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Arc::new(ContentClient::with_defaults(
//!         ClientConfig::default(),
//!         Arc::new(NullHistory),
//!     )?);
//!
//!     let qr = client.start_login(None).await?;
//!     println!("Scan: {}", qr);
//!
//!     // ...once logged in
//!     let liked = client.like(Category::Notices, 10).await?;
//!     println!("Liked {} notices", liked);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod category;
mod client;
mod config;
mod connection;
mod error;
mod like;
mod markup;
mod transport;

#[cfg(feature = "testing")]
pub mod testing;

pub use category::{CategoryRules, LIKE_PARAM, LIKE_PATH};
pub use client::{ClientDeps, ContentClient, LoginHook, Profile};
pub use config::{ClientConfig, RemoteConfig};
pub use connection::{DuplexConnection, DuplexConnector, Frame, FrameMessage, WebSocketConnector};
pub use error::{ClientError, ClientResult};
pub use markup::{ItemRef, MarkupParser, RegexMarkupParser};
pub use transport::{get_json, HttpTransport, Transport};
