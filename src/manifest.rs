//! Boot manifests: replay a host's module load sequence against a registry.
//!
//! Each `[[module]]` registers (through the opt-in facade when it carries a
//! `consent` phrase, by minting directly otherwise), publishes its
//! `publish` table, then reads every module in `reads`. Failures are
//! recorded per step. A failed registration skips that module's publish
//! and reads but never stops the boot.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::registry::{
    opt_in, ApiFragment, ApiValue, ModuleApis, Registry, RegistryError, TokenPolicy,
};

/// Ordered list of modules as the host loads them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootManifest {
    /// Modules in load order.
    #[serde(rename = "module", default)]
    pub modules: Vec<ModuleStep>,
}

/// One module's initialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleStep {
    /// Module identifier.
    pub name: String,

    /// Acknowledgement passed to the opt-in facade. Mints directly when absent.
    #[serde(default)]
    pub consent: Option<String>,

    /// Values published right after registration.
    #[serde(default)]
    pub publish: BTreeMap<String, serde_json::Value>,

    /// Modules whose private API is read after publishing.
    #[serde(default)]
    pub reads: Vec<String>,
}

impl BootManifest {
    /// Parse a manifest from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read manifest at {}: {e}", path.display()))?;
        Self::from_toml(&contents)
            .map_err(|e| anyhow::anyhow!("failed to parse manifest at {}: {e}", path.display()))
    }
}

/// Outcome of a single registry call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The call succeeded; `keys` are the names published or read.
    Ok {
        /// API names involved.
        keys: Vec<String>,
    },
    /// The call was refused.
    Failed {
        /// Error kind, e.g. `unregistered_module`.
        kind: String,
        /// Human-readable error.
        message: String,
    },
}

impl StepOutcome {
    fn failed(err: &RegistryError) -> Self {
        Self::Failed {
            kind: err.kind().to_owned(),
            message: err.to_string(),
        }
    }

    /// Whether the call succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Outcome of reading one target module.
#[derive(Debug, Clone, Serialize)]
pub struct ReadOutcome {
    /// Module that was read.
    pub target: String,
    /// What happened.
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Everything one module did during the boot.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    /// Module identifier.
    pub module: String,
    /// Registration result.
    pub registration: StepOutcome,
    /// Publish result, when the module registered and had values to publish.
    pub publish: Option<StepOutcome>,
    /// Read results in manifest order.
    pub reads: Vec<ReadOutcome>,
}

/// Result of replaying a manifest.
#[derive(Debug, Clone, Serialize)]
pub struct BootReport {
    /// Token policy of the registry the boot ran against.
    pub policy: TokenPolicy,
    /// Per-module reports in load order.
    pub modules: Vec<ModuleReport>,
}

impl BootReport {
    /// Number of modules whose registration was refused.
    pub fn registration_failures(&self) -> usize {
        self.modules
            .iter()
            .filter(|m| !m.registration.is_ok())
            .count()
    }

    /// Whether every registration, publish, and read succeeded.
    pub fn is_clean(&self) -> bool {
        self.modules.iter().all(|m| {
            m.registration.is_ok()
                && m.publish.as_ref().map_or(true, StepOutcome::is_ok)
                && m.reads.iter().all(|r| r.outcome.is_ok())
        })
    }
}

/// Replay `manifest` against `registry`.
pub fn run_boot(registry: &Arc<Registry>, manifest: &BootManifest) -> BootReport {
    let modules = manifest
        .modules
        .iter()
        .map(|step| run_step(registry, step))
        .collect();
    BootReport {
        policy: registry.policy(),
        modules,
    }
}

fn run_step(registry: &Arc<Registry>, step: &ModuleStep) -> ModuleReport {
    let registered = match step.consent {
        Some(ref consent) => opt_in(registry, consent, &step.name),
        None => registry
            .mint(&step.name)
            .map(|token| ModuleApis::bind(Arc::clone(registry), &step.name, token)),
    };

    let apis = match registered {
        Ok(apis) => apis,
        Err(e) => {
            warn!(module = %step.name, error = %e, "boot: registration refused");
            return ModuleReport {
                module: step.name.clone(),
                registration: StepOutcome::failed(&e),
                publish: None,
                reads: Vec::new(),
            };
        }
    };
    info!(module = %step.name, "boot: module registered");

    let publish = (!step.publish.is_empty()).then(|| {
        let fragment: ApiFragment = step
            .publish
            .iter()
            .map(|(name, value)| (name.clone(), ApiValue::new(value.clone())))
            .collect();
        let keys: Vec<String> = fragment.keys().map(str::to_owned).collect();
        match apis.publish(fragment) {
            Ok(()) => StepOutcome::Ok { keys },
            Err(e) => StepOutcome::failed(&e),
        }
    });

    let reads = step
        .reads
        .iter()
        .map(|target| {
            let outcome = match apis.read(target) {
                Ok(api) => StepOutcome::Ok {
                    keys: api.keys().map(str::to_owned).collect(),
                },
                Err(e) => StepOutcome::failed(&e),
            };
            ReadOutcome {
                target: target.clone(),
                outcome,
            }
        })
        .collect();

    ModuleReport {
        module: step.name.clone(),
        registration: StepOutcome::Ok { keys: Vec::new() },
        publish,
        reads,
    }
}
