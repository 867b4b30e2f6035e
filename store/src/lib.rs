//! Store backends for like history and community selection.
//!
//! Three flavours of each interface:
//! - `Null*`: remembers nothing, every item looks new
//! - `Memory*`: process-local, backed by `DashMap`
//! - `SledStore`: persistent, one sled tree per interface

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod memory;
mod null;
mod sled_store;

pub use memory::{MemoryHistory, MemorySelectionStore};
pub use null::{NullHistory, NullSelectionStore};
pub use sled_store::SledStore;
