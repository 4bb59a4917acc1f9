//! Insight discovery for one request.
//!
//! Pipeline: parse → (bundle recursion) → service selection → derive new resources
//! from unstructured text and enrich existing codeable concepts → response shaping.

use nlp_insights_nlp::{NlpError, NlpService};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::bundle::{create_transaction_bundle, BundleEntryDef, HttpMethod};
use crate::config::{ConfigError, NlpConfig, NlpServiceRegistry};
use crate::derive::{derive_conditions, derive_medication_statements};
use crate::enrich::{enrich_codeable_concepts, fields_of_interest, ConceptAnalysis};
use crate::models::{Bundle, FhirError, FhirResult, Resource};
use crate::source::{unstructured_text, UnstructuredText};

/// Request-level errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] FhirError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("NLP error: {0}")]
    Nlp(#[from] NlpError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// What a discovery request answers with.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryOutcome {
    /// Nothing was found; the input resource as received.
    Unchanged(Resource),
    /// The input resource with enriched concepts.
    Updated(Resource),
    /// New and updated resources as a transaction.
    Bundle(Bundle),
}

impl DiscoveryOutcome {
    pub fn to_value(&self) -> FhirResult<Value> {
        match self {
            DiscoveryOutcome::Unchanged(resource) | DiscoveryOutcome::Updated(resource) => {
                resource.to_value()
            }
            DiscoveryOutcome::Bundle(bundle) => Ok(serde_json::to_value(bundle)?),
        }
    }

    pub fn to_json(&self) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }
}

/// Run discovery over a JSON payload.
pub fn discover_insights(
    registry: &NlpServiceRegistry,
    payload: &str,
) -> PipelineResult<DiscoveryOutcome> {
    let resource = Resource::from_json(payload)?;
    discover_insights_for(registry, resource)
}

/// Run discovery over a parsed resource.
pub fn discover_insights_for(
    registry: &NlpServiceRegistry,
    resource: Resource,
) -> PipelineResult<DiscoveryOutcome> {
    let entries = derive_bundle_entries(registry, &resource)?;
    info!(
        resource_type = resource.resource_type(),
        entries = entries.len(),
        "insight discovery complete"
    );

    if !matches!(resource, Resource::Bundle(_)) {
        if entries.is_empty() {
            return Ok(DiscoveryOutcome::Unchanged(resource));
        }
        if entries.len() == 1 && entries[0].method == HttpMethod::Put {
            if let Some(entry) = entries.clone().into_iter().next() {
                return Ok(DiscoveryOutcome::Updated(entry.resource));
            }
        }
    }

    Ok(DiscoveryOutcome::Bundle(create_transaction_bundle(&entries)?))
}

/// New (POST) and enriched (PUT) resources for `resource`. Bundles are searched
/// entry by entry; entries of unsupported types are skipped.
pub fn derive_bundle_entries(
    registry: &NlpServiceRegistry,
    resource: &Resource,
) -> PipelineResult<Vec<BundleEntryDef>> {
    if let Resource::Bundle(bundle) = resource {
        let mut entries = Vec::new();
        for entry in &bundle.entry {
            let Some(value) = &entry.resource else {
                continue;
            };
            match Resource::from_value(value.clone()) {
                Ok(inner) => entries.extend(derive_bundle_entries(registry, &inner)?),
                Err(FhirError::UnsupportedResourceType(resource_type)) => {
                    debug!(%resource_type, "skipping bundle entry");
                }
                Err(e) => return Err(e.into()),
            }
        }
        return Ok(entries);
    }

    let texts = unstructured_text(resource);
    let concepts = fields_of_interest(resource);
    if texts.is_empty() && concepts.is_empty() {
        return Ok(Vec::new());
    }

    let registered = registry.service_for(resource.resource_type())?;
    let service = registered.service.as_ref();
    let config = &registered.config;

    let mut entries = derive_new_resources(service, config, &texts)?;

    if !concepts.is_empty() {
        let mut analyses = Vec::with_capacity(concepts.len());
        for concept in concepts {
            info!(service = service.name(), path = %concept.path, "analyzing concept text");
            let output = service.analyze(&concept.adjusted_text)?;
            analyses.push(ConceptAnalysis { concept, output });
        }

        let mut enriched = resource.clone();
        if enrich_codeable_concepts(&mut enriched, &analyses, config) > 0 {
            entries.push(BundleEntryDef::update(enriched));
        }
    }

    Ok(entries)
}

/// Conditions and medication statements derived from each text, in text order.
pub fn derive_new_resources(
    service: &dyn NlpService,
    config: &NlpConfig,
    texts: &[UnstructuredText],
) -> PipelineResult<Vec<BundleEntryDef>> {
    let mut entries = Vec::new();

    for text in texts {
        info!(service = service.name(), path = %text.fhir_path, "analyzing unstructured text");
        let output = service.analyze(&text.text)?;

        entries.extend(
            derive_conditions(text, &output, config)
                .into_iter()
                .map(|c| BundleEntryDef::create(c.into())),
        );
        entries.extend(
            derive_medication_statements(text, &output, config)
                .into_iter()
                .map(|m| BundleEntryDef::create(m.into())),
        );
    }

    Ok(entries)
}
