//! Connection/session protocol for the process relay.
//!
//! This crate provides:
//! - `Session` - one connection's handshake state machine and dispatch
//! - `AdmissionPolicy` - address whitelist for inbound connections
//! - `Publisher` - cancellable periodic snapshot sender
//! - `SenderSlot` - explicit takeover of the sending role between sessions

pub mod admission;
pub mod publisher;
pub mod session;
pub mod takeover;

pub use admission::AdmissionPolicy;
pub use publisher::{DEFAULT_PERIOD, Publisher};
pub use session::{Role, Session, SessionContext, SessionState};
pub use takeover::{SenderSlot, SessionCommand};
