//! Capability tokens and the policy used to check them on reads.
//!
//! A token is minted exactly once per registered module. It carries two
//! random identifiers: its own and the one of the registry that issued it.
//! Neither is reachable from outside the crate, so the only way to hold a
//! valid token is to have received it from [`Registry::mint`](super::Registry::mint).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque credential proving the holder registered a module.
///
/// Not `Clone`, not `Copy`, and has no public equality: two tokens are the
/// same credential only if the registry says so. Debug output is redacted.
pub struct CapabilityToken {
    id: Uuid,
    registry: Uuid,
}

impl CapabilityToken {
    /// Mint a fresh token for the registry identified by `registry`.
    pub(crate) fn issue(registry: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    /// Whether this token was issued by the registry identified by `registry`.
    pub(crate) fn issued_by(&self, registry: Uuid) -> bool {
        self.registry == registry
    }
}

impl std::fmt::Debug for CapabilityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CapabilityToken(__REDACTED__)")
    }
}

/// How `read` validates the token it is given.
///
/// `Owner` scopes each token to the data of the module that minted it.
/// `AnyIssued` accepts any token the registry has issued, which lets one
/// module read another's private API; it only exists to reproduce the
/// legacy behaviour and must be chosen explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPolicy {
    /// The token must be the one stored for the target module.
    #[default]
    Owner,
    /// The token must be any token issued by this registry.
    AnyIssued,
}

impl TokenPolicy {
    /// Stable lowercase name, matching the config spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::AnyIssued => "any_issued",
        }
    }
}

impl std::fmt::Display for TokenPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
