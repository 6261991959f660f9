//! Core building blocks for the process relay.
//!
//! This crate provides:
//! - `Message` - the tagged wire protocol unit
//! - `MessageCodec` - `\r\n`-delimited JSON framing
//! - `ProcessSource` - process enumeration collaborator
//! - `SnapshotStore` - snapshot persistence collaborator

pub mod codec;
pub mod process;
pub mod protocol;
pub mod store;

pub use codec::{CodecError, MessageCodec};
pub use process::{ProcessInfo, ProcessMap, ProcessSource, SystemProcessSource};
pub use protocol::Message;
pub use store::{JsonFileStore, SnapshotStore, StoreError};
