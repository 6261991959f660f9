//! Address-based admission policy for inbound connections.

use std::collections::HashSet;
use std::net::IpAddr;

/// Accept/reject policy applied to inbound peers before any message is read.
///
/// Without a whitelist every peer is admitted. With one, a peer is admitted
/// only on an exact address match; there is no wildcard or subnet matching.
#[derive(Debug, Clone, Default)]
pub struct AdmissionPolicy {
    whitelist: Option<HashSet<IpAddr>>,
}

impl AdmissionPolicy {
    /// Admit every peer.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self { whitelist: None }
    }

    /// Admit only the listed addresses.
    #[must_use]
    pub fn whitelist(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            whitelist: Some(addrs.into_iter().collect()),
        }
    }

    /// Whether a connection from `peer` may proceed.
    #[must_use]
    pub fn allows(&self, peer: IpAddr) -> bool {
        self.whitelist
            .as_ref()
            .is_none_or(|list| list.contains(&peer))
    }
}
