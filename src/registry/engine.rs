//! The registry: module entries, token issuance, and the mint/publish/read
//! primitives.
//!
//! All mutable state sits behind a single mutex and every primitive takes
//! it exactly once, so two modules racing to register the same identifier
//! cannot both win.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::AuditLogger;
use crate::config::RegistryConfig;

use super::allow_list::AllowList;
use super::api::{ApiFragment, ApiValue, PrivateApi};
use super::token::{CapabilityToken, TokenPolicy};

/// Registry error types. All of them are caller errors; none is retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Registration of an identifier outside the allow list.
    #[error("cannot register module {module}: it is not on the allow list")]
    NotAllowlisted {
        /// Rejected identifier.
        module: String,
    },
    /// Second registration of an identifier that already owns an entry.
    #[error("module {module} is already registered")]
    AlreadyRegistered {
        /// Identifier registered twice.
        module: String,
    },
    /// The opt-in acknowledgement did not match the required phrase.
    #[error("module {module} did not acknowledge that private APIs are unstable")]
    MissingConsent {
        /// Identifier that tried to opt in.
        module: String,
    },
    /// The presented token does not grant the requested operation.
    #[error("{}", invalid_token_message(.target.as_deref()))]
    InvalidToken {
        /// Module being read, when the failure came from a read.
        target: Option<String>,
    },
    /// A read targeted a module that has not registered yet.
    #[error("module {module} is not registered yet")]
    UnregisteredModule {
        /// Identifier that was read.
        module: String,
    },
    /// A thread panicked while holding the registry lock.
    #[error("registry state lock poisoned")]
    Poisoned,
}

fn invalid_token_message(target: Option<&str>) -> String {
    match target {
        Some(module) => format!("the token passed to read module {module} is not valid for it"),
        None => "invalid capability token".to_owned(),
    }
}

impl RegistryError {
    /// Stable snake_case name of the error kind, used in audit and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAllowlisted { .. } => "not_allowlisted",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::MissingConsent { .. } => "missing_consent",
            Self::InvalidToken { .. } => "invalid_token",
            Self::UnregisteredModule { .. } => "unregistered_module",
            Self::Poisoned => "poisoned",
        }
    }

    fn module(&self) -> Option<&str> {
        match self {
            Self::NotAllowlisted { module }
            | Self::AlreadyRegistered { module }
            | Self::MissingConsent { module }
            | Self::UnregisteredModule { module } => Some(module),
            Self::InvalidToken { target } => target.as_deref(),
            Self::Poisoned => None,
        }
    }
}

struct Entry {
    token: Uuid,
    api: BTreeMap<String, ApiValue>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    /// Every token ever issued, mapped to the module that owns it.
    issued: HashMap<Uuid, String>,
}

/// Registry of trusted modules and their private APIs.
///
/// The host builds one at startup and shares it as `Arc<Registry>`. There
/// is no teardown and no deletion: entries live as long as the registry.
pub struct Registry {
    id: Uuid,
    allow_list: AllowList,
    policy: TokenPolicy,
    state: Mutex<State>,
    audit: Option<Arc<AuditLogger>>,
}

impl Registry {
    /// Registry with the owner-only token policy.
    pub fn new(allow_list: AllowList) -> Self {
        Self::with_policy(allow_list, TokenPolicy::Owner)
    }

    /// Registry with an explicit token policy.
    pub fn with_policy(allow_list: AllowList, policy: TokenPolicy) -> Self {
        if policy == TokenPolicy::AnyIssued {
            warn!("registry built with any_issued token policy: any module can read any other");
        }
        Self {
            id: Uuid::new_v4(),
            allow_list,
            policy,
            state: Mutex::new(State::default()),
            audit: None,
        }
    }

    /// Registry from the `[registry]` config section.
    pub fn from_config(config: &RegistryConfig) -> Self {
        let allow_list = config.allow_list.iter().map(|m| m.trim()).collect();
        Self::with_policy(allow_list, config.token_policy)
    }

    /// Attach an audit logger.
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Register `module_id` and hand back its token.
    ///
    /// Fails if the identifier is not allowed or already registered. A
    /// second call never succeeds, so nobody can re-mint a module's token.
    pub fn mint(&self, module_id: &str) -> Result<CapabilityToken, RegistryError> {
        if !self.allow_list.contains(module_id) {
            return Err(self.deny(
                "mint",
                RegistryError::NotAllowlisted {
                    module: module_id.to_owned(),
                },
            ));
        }

        let mut state = self.lock()?;
        if state.entries.contains_key(module_id) {
            drop(state);
            return Err(self.deny(
                "mint",
                RegistryError::AlreadyRegistered {
                    module: module_id.to_owned(),
                },
            ));
        }

        let token = CapabilityToken::issue(self.id);
        state.entries.insert(
            module_id.to_owned(),
            Entry {
                token: token.id(),
                api: BTreeMap::new(),
            },
        );
        state.issued.insert(token.id(), module_id.to_owned());
        drop(state);

        info!(module = %module_id, "module registered");
        self.record(|audit| audit.log_module_registered(module_id));
        Ok(token)
    }

    /// Merge `fragment` into the private API of the module owning `token`.
    ///
    /// Existing names are overwritten; names not in the fragment are kept.
    pub fn publish(
        &self,
        token: &CapabilityToken,
        fragment: ApiFragment,
    ) -> Result<(), RegistryError> {
        let keys: Vec<String> = fragment.keys().map(str::to_owned).collect();

        let mut state = self.lock()?;
        let Some(module) = self.owner_of(&state, token).cloned() else {
            drop(state);
            return Err(self.deny("publish", RegistryError::InvalidToken { target: None }));
        };
        let Some(entry) = state.entries.get_mut(&module) else {
            drop(state);
            return Err(self.deny("publish", RegistryError::InvalidToken { target: None }));
        };
        entry.api.extend(fragment.into_values());
        drop(state);

        debug!(module = %module, keys = ?keys, "private API published");
        self.record(|audit| audit.log_api_published(&module, &keys));
        Ok(())
    }

    /// Snapshot the private API of `target`.
    ///
    /// `UnregisteredModule` is checked before the token, so a reader that
    /// runs before its dependency has initialized learns exactly that.
    pub fn read(
        &self,
        token: &CapabilityToken,
        target: &str,
    ) -> Result<PrivateApi, RegistryError> {
        let state = self.lock()?;
        let Some(entry) = state.entries.get(target) else {
            drop(state);
            return Err(self.deny(
                "read",
                RegistryError::UnregisteredModule {
                    module: target.to_owned(),
                },
            ));
        };

        let reader = self.owner_of(&state, token).cloned();
        let authorized = match self.policy {
            TokenPolicy::Owner => token.issued_by(self.id) && entry.token == token.id(),
            TokenPolicy::AnyIssued => reader.is_some(),
        };
        if !authorized {
            drop(state);
            return Err(self.deny(
                "read",
                RegistryError::InvalidToken {
                    target: Some(target.to_owned()),
                },
            ));
        }

        let snapshot = PrivateApi::new(target, entry.api.clone());
        drop(state);

        if let Some(reader) = reader {
            debug!(reader = %reader, target = %target, keys = snapshot.len(), "private API read");
            self.record(|audit| audit.log_api_read(&reader, target));
        }
        Ok(snapshot)
    }

    /// Whether `module_id` has an entry. Reveals nothing about its API.
    pub fn is_registered(&self, module_id: &str) -> bool {
        match self.state.lock() {
            Ok(state) => state.entries.contains_key(module_id),
            Err(_) => false,
        }
    }

    /// Identifiers with an entry, sorted.
    pub fn registered_modules(&self) -> Vec<String> {
        match self.state.lock() {
            Ok(state) => {
                let mut modules: Vec<String> = state.entries.keys().cloned().collect();
                modules.sort();
                modules
            }
            Err(_) => Vec::new(),
        }
    }

    /// The allow list this registry enforces.
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// The token policy applied on reads.
    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, RegistryError> {
        self.state.lock().map_err(|_| {
            error!("registry state lock poisoned");
            RegistryError::Poisoned
        })
    }

    fn owner_of<'s>(&self, state: &'s State, token: &CapabilityToken) -> Option<&'s String> {
        if !token.issued_by(self.id) {
            return None;
        }
        state.issued.get(&token.id())
    }

    /// Log and audit a refusal, then hand the error back for returning.
    fn deny(&self, operation: &str, err: RegistryError) -> RegistryError {
        warn!(operation, kind = err.kind(), error = %err, "registry access denied");
        self.record(|audit| audit.log_access_denied(operation, err.kind(), err.module()));
        err
    }

    fn record(&self, write: impl FnOnce(&AuditLogger) -> anyhow::Result<()>) {
        if let Some(ref audit) = self.audit {
            if let Err(e) = write(audit) {
                warn!(error = %e, "failed to write registry audit entry");
            }
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("allow_list", &self.allow_list)
            .field("policy", &self.policy)
            .field("registered", &self.registered_modules())
            .finish_non_exhaustive()
    }
}
