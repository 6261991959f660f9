//! Wire protocol for peer-to-peer snapshot exchange.

use serde::{Deserialize, Serialize};

use crate::process::ProcessMap;

/// A single wire record, tagged by its `type` field.
///
/// Unknown `type` values decode to [`Message::Unknown`] rather than failing,
/// and unknown fields inside known messages are ignored, so older peers keep
/// working when the protocol grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Handshake opener; `send` announces whether this side intends to
    /// transmit snapshots. A hello without `send` is ignored by dispatch.
    Hello {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        send: Option<bool>,
    },
    /// Handshake acceptance.
    #[serde(rename = "ok")]
    Ack,
    /// Peer-reported protocol error.
    #[serde(rename = "err")]
    Error { msg: String },
    /// A process snapshot keyed by pid.
    Tasks { tasks: ProcessMap },
    /// Any record with an unrecognized `type` tag.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Build the handshake opener for a side with the given send role.
    #[must_use]
    pub const fn hello(send: bool) -> Self {
        Self::Hello { send: Some(send) }
    }

    /// Build a peer-facing error report.
    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error { msg: msg.into() }
    }
}
