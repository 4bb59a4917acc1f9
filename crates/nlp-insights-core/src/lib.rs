//! NLP Insights Core Library
//!
//! Derives new FHIR resources from clinical text and enriches existing codeable
//! concepts, recording how every derived coding was obtained.
//!
//! # Architecture
//!
//! ```text
//! FHIR resource ──► unstructured text ──► NLP ──► correlate ──► derive (CUI dedup)
//!       │                                                  │
//!       └──► fields of interest ──► NLP ──► correlate ──► enrich codings
//!                                                          │
//!                                       insight extensions in meta.extension
//!                                                          │
//!                                               transaction bundle / resource
//! ```
//!
//! # Modules
//!
//! - [`models`]: FHIR data types and resources
//! - [`insight`]: span, confidence, insight ids and the provenance extension builders
//! - [`coding`]: duplicate-suppressing coding merge
//! - [`correlate`]: attribute → source annotation lookup
//! - [`derive`]: Condition and MedicationStatement derivation
//! - [`enrich`]: codeable concept enrichment
//! - [`source`]: unstructured text extraction
//! - [`bundle`]: transaction bundle assembly
//! - [`config`]: NLP configuration and service registry
//! - [`pipeline`]: request-level discovery

pub mod bundle;
pub mod coding;
pub mod config;
pub mod correlate;
pub mod derive;
pub mod enrich;
pub mod insight;
pub mod models;
pub mod pipeline;
pub mod source;

// Re-export commonly used types
pub use bundle::{create_transaction_bundle, BundleEntryDef, HttpMethod};
pub use config::{
    ConfigError, EvaluatedOutputLocation, NlpConfig, NlpServiceRegistry, RegistrySettings,
};
pub use insight::{Confidence, InsightIdMaker, TextSpan};
pub use models::{FhirError, Resource};
pub use pipeline::{discover_insights, DiscoveryOutcome, PipelineError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use nlp_insights_nlp::{DictionaryAnnotator, NlpError, PrecomputedNlpService};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum InsightsError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("NLP error: {0}")]
    Nlp(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<FhirError> for InsightsError {
    fn from(e: FhirError) -> Self {
        InsightsError::InvalidPayload(e.to_string())
    }
}

impl From<ConfigError> for InsightsError {
    fn from(e: ConfigError) -> Self {
        InsightsError::Configuration(e.to_string())
    }
}

impl From<NlpError> for InsightsError {
    fn from(e: NlpError) -> Self {
        InsightsError::Nlp(e.to_string())
    }
}

impl From<PipelineError> for InsightsError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::InvalidPayload(e) => e.into(),
            PipelineError::Config(e) => e.into(),
            PipelineError::Nlp(e) => e.into(),
        }
    }
}

impl From<serde_json::Error> for InsightsError {
    fn from(e: serde_json::Error) -> Self {
        InsightsError::Serialization(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for InsightsError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        InsightsError::Configuration(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Free Functions (exported to FFI)
// =========================================================================

/// Registry holding a single service that replays `nlp_response`.
///
/// A JSON array is read as QuickUMLS output, anything else as an ACD container.
pub fn precomputed_registry(nlp_response: &str) -> Result<NlpServiceRegistry, InsightsError> {
    let config = if nlp_response.trim_start().starts_with('[') {
        NlpConfig::quick_umls()
    } else {
        NlpConfig::acd()
    };
    let service = PrecomputedNlpService::from_json("precomputed", nlp_response)?;

    let mut registry = NlpServiceRegistry::new();
    registry.register(Arc::new(service), config);
    registry.set_default("precomputed")?;
    Ok(registry)
}

/// Discover insights in `payload` using an NLP response computed elsewhere.
#[uniffi::export]
pub fn discover_insights_with_response(
    payload: String,
    nlp_response: String,
) -> Result<String, InsightsError> {
    let registry = precomputed_registry(&nlp_response)?;
    let outcome = discover_insights(&registry, &payload)?;
    Ok(outcome.to_json()?)
}

/// Parse a dosage value such as `"1,000 mg"`.
#[uniffi::export]
pub fn parse_dosage_text(text: String) -> FfiDose {
    derive::parse_dosage(&text).into()
}

/// Create an engine with an empty service registry.
#[uniffi::export]
pub fn create_engine() -> Arc<InsightsEngine> {
    Arc::new(InsightsEngine {
        registry: Mutex::new(NlpServiceRegistry::new()),
    })
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe registry wrapper for FFI.
#[derive(uniffi::Object)]
pub struct InsightsEngine {
    registry: Mutex<NlpServiceRegistry>,
}

#[uniffi::export]
impl InsightsEngine {
    // =========================================================================
    // Service Registry
    // =========================================================================

    /// Register a dictionary annotator from its JSON definition.
    pub fn register_dictionary(
        &self,
        dictionary_json: String,
        preset: FfiConfigPreset,
    ) -> Result<String, InsightsError> {
        let annotator = DictionaryAnnotator::from_json(&dictionary_json)?;
        let name = annotator.name.clone();
        let mut registry = self.registry.lock()?;
        registry.register(Arc::new(annotator), preset.into());
        Ok(name)
    }

    /// Register a service that answers every request with `nlp_response`.
    pub fn register_precomputed(
        &self,
        name: String,
        nlp_response: String,
        preset: FfiConfigPreset,
    ) -> Result<(), InsightsError> {
        let service = PrecomputedNlpService::from_json(name, &nlp_response)?;
        let mut registry = self.registry.lock()?;
        registry.register(Arc::new(service), preset.into());
        Ok(())
    }

    pub fn remove_service(&self, name: String) -> Result<(), InsightsError> {
        let mut registry = self.registry.lock()?;
        Ok(registry.remove(&name)?)
    }

    pub fn service_names(&self) -> Result<Vec<String>, InsightsError> {
        let registry = self.registry.lock()?;
        Ok(registry.names().map(str::to_string).collect())
    }

    pub fn set_default_service(&self, name: String) -> Result<(), InsightsError> {
        let mut registry = self.registry.lock()?;
        Ok(registry.set_default(&name)?)
    }

    pub fn clear_default_service(&self) -> Result<(), InsightsError> {
        self.registry.lock()?.clear_default();
        Ok(())
    }

    pub fn set_override(&self, resource_type: String, name: String) -> Result<(), InsightsError> {
        let mut registry = self.registry.lock()?;
        Ok(registry.set_override(&resource_type, &name)?)
    }

    /// Remove an override; returns the service it pointed at.
    pub fn remove_override(&self, resource_type: String) -> Result<Option<String>, InsightsError> {
        let mut registry = self.registry.lock()?;
        Ok(registry.remove_override(&resource_type))
    }

    pub fn clear_overrides(&self) -> Result<(), InsightsError> {
        self.registry.lock()?.clear_overrides();
        Ok(())
    }

    /// Apply `RegistrySettings` JSON.
    pub fn apply_settings_json(&self, settings_json: String) -> Result<(), InsightsError> {
        let settings: RegistrySettings = serde_json::from_str(&settings_json)?;
        let mut registry = self.registry.lock()?;
        Ok(registry.apply_settings(&settings)?)
    }

    /// Current default and overrides as `RegistrySettings` JSON.
    pub fn settings_json(&self) -> Result<String, InsightsError> {
        let registry = self.registry.lock()?;
        Ok(registry.settings().to_json()?)
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Discover insights in a resource or bundle; returns the response JSON.
    pub fn discover_insights(&self, payload: String) -> Result<String, InsightsError> {
        let registry = self.registry.lock()?;
        let outcome = discover_insights(&registry, &payload)?;
        Ok(outcome.to_json()?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe configuration preset.
#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiConfigPreset {
    Acd,
    QuickUmls,
}

impl From<FfiConfigPreset> for NlpConfig {
    fn from(preset: FfiConfigPreset) -> Self {
        match preset {
            FfiConfigPreset::Acd => NlpConfig::acd(),
            FfiConfigPreset::QuickUmls => NlpConfig::quick_umls(),
        }
    }
}

/// FFI-safe parsed dose.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDose {
    pub amount: Option<f64>,
    pub unit: Option<String>,
}

impl From<derive::ParsedDose> for FfiDose {
    fn from(dose: derive::ParsedDose) -> Self {
        Self {
            amount: dose.amount,
            unit: dose.unit,
        }
    }
}
