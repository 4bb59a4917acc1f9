//! NLP configuration and the service registry.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use nlp_insights_nlp::{ContainerAnnotation, NlpService};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::insight::constants::{ACD_NLP_SYSTEM, QUICK_UMLS_NLP_SYSTEM};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown NLP service: {0}")]
    UnknownService(String),

    #[error("NLP service {0} is the default or an override and cannot be removed")]
    ServiceInUse(String),

    #[error("NLP service {service} does not handle {resource_type}")]
    UnsupportedResourceType {
        service: String,
        resource_type: String,
    },

    #[error("No NLP service configured for {0}")]
    NoServiceConfigured(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where an insight says the full NLP output can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluatedOutputLocation {
    /// No evaluated-output extension.
    Omitted,
    /// The same URI for every output.
    Fixed(String),
    /// `{prefix}{sha256 of the serialized output}.json`; identical output gives an
    /// identical URI.
    ContentDigest { prefix: String },
}

impl EvaluatedOutputLocation {
    pub fn resolve(&self, output: &ContainerAnnotation) -> Option<String> {
        match self {
            EvaluatedOutputLocation::Omitted => None,
            EvaluatedOutputLocation::Fixed(uri) => Some(uri.clone()),
            EvaluatedOutputLocation::ContentDigest { prefix } => {
                let bytes = match serde_json::to_vec(output) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(error = %e, "could not serialize NLP output for digest");
                        return None;
                    }
                };
                Some(format!("{prefix}{}.json", hash_data(&bytes)))
            }
        }
    }
}

/// Compute SHA-256 hash of data.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Per-service settings that shape provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NlpConfig {
    /// System URI on insight identifiers.
    pub nlp_system: String,
    /// First insight sequence number.
    pub insight_id_start: u32,
    pub evaluated_output: EvaluatedOutputLocation,
}

impl NlpConfig {
    pub fn acd() -> Self {
        Self {
            nlp_system: ACD_NLP_SYSTEM.to_string(),
            insight_id_start: 1,
            evaluated_output: EvaluatedOutputLocation::ContentDigest {
                prefix: "uri://path/acd-".to_string(),
            },
        }
    }

    pub fn quick_umls() -> Self {
        Self {
            nlp_system: QUICK_UMLS_NLP_SYSTEM.to_string(),
            insight_id_start: 1,
            evaluated_output: EvaluatedOutputLocation::Omitted,
        }
    }

    pub fn nlp_output_uri(&self, output: &ContainerAnnotation) -> Option<String> {
        self.evaluated_output.resolve(output)
    }
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self::acd()
    }
}

/// Registry selection settings, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySettings {
    #[serde(default)]
    pub default: Option<String>,
    /// Resource type → service name.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub insight_id_start: Option<u32>,
}

impl RegistrySettings {
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A named service with its configuration.
#[derive(Clone)]
pub struct RegisteredService {
    pub service: Arc<dyn NlpService>,
    pub config: NlpConfig,
}

impl RegisteredService {
    pub fn name(&self) -> &str {
        self.service.name()
    }
}

impl std::fmt::Debug for RegisteredService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredService")
            .field("name", &self.service.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Named NLP services, a default, and per resource type overrides.
#[derive(Debug, Clone, Default)]
pub struct NlpServiceRegistry {
    services: BTreeMap<String, RegisteredService>,
    default: Option<String>,
    overrides: BTreeMap<String, String>,
}

impl NlpServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a service under its own name.
    pub fn register(&mut self, service: Arc<dyn NlpService>, config: NlpConfig) {
        let name = service.name().to_string();
        info!(service = %name, "registering NLP service");
        self.services
            .insert(name, RegisteredService { service, config });
    }

    /// Remove a service. The default and overridden services are refused.
    pub fn remove(&mut self, name: &str) -> ConfigResult<()> {
        if !self.services.contains_key(name) {
            return Err(ConfigError::UnknownService(name.to_string()));
        }
        let in_use = self.default.as_deref() == Some(name)
            || self.overrides.values().any(|s| s == name);
        if in_use {
            return Err(ConfigError::ServiceInUse(name.to_string()));
        }
        self.services.remove(name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredService> {
        self.services.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn default_service(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn set_default(&mut self, name: &str) -> ConfigResult<()> {
        if !self.services.contains_key(name) {
            return Err(ConfigError::UnknownService(name.to_string()));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn clear_default(&mut self) {
        self.default = None;
    }

    pub fn overrides(&self) -> &BTreeMap<String, String> {
        &self.overrides
    }

    /// Route `resource_type` to `name`. The service must handle the type.
    pub fn set_override(&mut self, resource_type: &str, name: &str) -> ConfigResult<()> {
        let registered = self
            .services
            .get(name)
            .ok_or_else(|| ConfigError::UnknownService(name.to_string()))?;
        if !registered.service.handles(resource_type) {
            return Err(ConfigError::UnsupportedResourceType {
                service: name.to_string(),
                resource_type: resource_type.to_string(),
            });
        }
        self.overrides
            .insert(resource_type.to_string(), name.to_string());
        Ok(())
    }

    pub fn remove_override(&mut self, resource_type: &str) -> Option<String> {
        self.overrides.remove(resource_type)
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// Service for `resource_type`: its override, else the default.
    pub fn service_for(&self, resource_type: &str) -> ConfigResult<&RegisteredService> {
        let name = self
            .overrides
            .get(resource_type)
            .or(self.default.as_ref())
            .ok_or_else(|| ConfigError::NoServiceConfigured(resource_type.to_string()))?;

        self.services
            .get(name)
            .ok_or_else(|| ConfigError::UnknownService(name.clone()))
    }

    /// Apply stored settings. Nothing changes if any named service is unknown or
    /// rejects its override.
    pub fn apply_settings(&mut self, settings: &RegistrySettings) -> ConfigResult<()> {
        let mut next = self.clone();

        if let Some(default) = &settings.default {
            next.set_default(default)?;
        }
        for (resource_type, name) in &settings.overrides {
            next.set_override(resource_type, name)?;
        }
        if let Some(start) = settings.insight_id_start {
            for registered in next.services.values_mut() {
                registered.config.insight_id_start = start;
            }
        }

        *self = next;
        Ok(())
    }

    /// Current selection as storable settings.
    pub fn settings(&self) -> RegistrySettings {
        RegistrySettings {
            default: self.default.clone(),
            overrides: self.overrides.clone(),
            insight_id_start: None,
        }
    }
}
