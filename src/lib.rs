//! Experiments — capability-gated exchange of private APIs between the
//! trusted core modules of the editor.
//!
//! Each allow-listed module mints one capability token at load time and
//! publishes its private functions and values under it. Third-party code
//! cannot register.
//!
//! Under the default `owner` token policy a token reads only its own
//! module's API; reading another registered module's API requires a
//! registry built with the legacy `any_issued` policy. A token never
//! publishes into any module but its own.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod config;
pub mod logging;
pub mod manifest;
pub mod registry;
