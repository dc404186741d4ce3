//! Opt-in facade: a module acknowledges that private APIs are unstable and
//! receives publish/read handles bound to its freshly minted token.
//!
//! The acknowledgement is advisory. Anyone can copy the phrase; its purpose
//! is to make every opt-in visible and greppable in the calling source.

use std::sync::Arc;

use tracing::warn;

use super::api::{ApiFragment, PrivateApi};
use super::engine::{Registry, RegistryError};
use super::token::CapabilityToken;

/// The exact acknowledgement a module must pass to [`opt_in`].
pub const CONSENT_PHRASE: &str =
    "I know using unstable features means my plugin or theme will inevitably break on the next WordPress release.";

/// Boxed publish closure returned by [`ModuleApis::into_parts`].
pub type PublishFn = Box<dyn Fn(ApiFragment) -> Result<(), RegistryError> + Send + Sync>;

/// Boxed read closure returned by [`ModuleApis::into_parts`].
pub type ReadFn = Box<dyn Fn(&str) -> Result<PrivateApi, RegistryError> + Send + Sync>;

/// Opt `module_id` in and return handles scoped to its token.
///
/// The phrase is checked before anything else: a mismatch leaves the
/// registry untouched, whatever `module_id` is.
pub fn opt_in(
    registry: &Arc<Registry>,
    consent: &str,
    module_id: &str,
) -> Result<ModuleApis, RegistryError> {
    if consent != CONSENT_PHRASE {
        warn!(module = %module_id, "opt-in refused: acknowledgement phrase does not match");
        return Err(RegistryError::MissingConsent {
            module: module_id.to_owned(),
        });
    }
    let token = registry.mint(module_id)?;
    Ok(ModuleApis::bind(Arc::clone(registry), module_id, token))
}

/// Publish and read handles of one opted-in module.
#[derive(Debug)]
pub struct ModuleApis {
    registry: Arc<Registry>,
    module: String,
    token: Arc<CapabilityToken>,
}

impl ModuleApis {
    /// Bind handles to a token minted without going through [`opt_in`].
    pub(crate) fn bind(registry: Arc<Registry>, module: &str, token: CapabilityToken) -> Self {
        Self {
            registry,
            module: module.to_owned(),
            token: Arc::new(token),
        }
    }

    /// Module these handles belong to.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Merge `fragment` into this module's private API.
    pub fn publish(&self, fragment: ApiFragment) -> Result<(), RegistryError> {
        self.registry.publish(&self.token, fragment)
    }

    /// Snapshot the private API of `target` using this module's token.
    pub fn read(&self, target: &str) -> Result<PrivateApi, RegistryError> {
        self.registry.read(&self.token, target)
    }

    /// Split into a publish closure and a read closure sharing the token.
    pub fn into_parts(self) -> (PublishFn, ReadFn) {
        let (registry, token) = (Arc::clone(&self.registry), Arc::clone(&self.token));
        let publish: PublishFn = Box::new(move |fragment| registry.publish(&token, fragment));
        let read: ReadFn = Box::new(move |target: &str| self.registry.read(&self.token, target));
        (publish, read)
    }
}
