//! Registry core: the trust boundary for private APIs.
//!
//! A fixed allow list of trusted modules can each mint one capability
//! token, publish named values under it, and read snapshots of registered
//! modules' APIs. Everything else is refused with a typed [`RegistryError`].

pub mod allow_list;
pub mod api;
pub mod consent;
pub mod engine;
pub mod token;

pub use allow_list::{AllowList, CORE_MODULES};
pub use api::{ApiFragment, ApiValue, LookupError, PrivateApi};
pub use consent::{opt_in, ModuleApis, PublishFn, ReadFn, CONSENT_PHRASE};
pub use engine::{Registry, RegistryError};
pub use token::{CapabilityToken, TokenPolicy};
