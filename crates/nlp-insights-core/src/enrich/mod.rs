//! Codeable concept enrichment.
//!
//! Text of a codeable concept already in a resource is analyzed; the codes NLP finds
//! are merged back into that concept as derived codings, and each contributing
//! attribute leaves a structured insight pointing at the concept's FHIR path.

mod fields;

pub use fields::*;

use nlp_insights_nlp::ContainerAnnotation;
use tracing::{debug, warn};

use crate::coding::add_all_codings;
use crate::config::NlpConfig;
use crate::correlate::source_concept;
use crate::insight::{attach_insight, build_insight_id, build_structured_detail, InsightIdMaker};
use crate::models::Resource;

/// Resource kinds whose codeable concepts can be enriched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichableKind {
    AllergyIntolerance,
    Condition,
    Immunization,
}

const ENRICHABLE_KINDS: &[(&str, EnrichableKind)] = &[
    ("AllergyIntolerance", EnrichableKind::AllergyIntolerance),
    ("Condition", EnrichableKind::Condition),
    ("Immunization", EnrichableKind::Immunization),
];

impl EnrichableKind {
    pub fn of(resource_type: &str) -> Option<Self> {
        ENRICHABLE_KINDS
            .iter()
            .find(|(name, _)| *name == resource_type)
            .map(|(_, kind)| *kind)
    }

    /// Attribute names relevant to this kind.
    pub fn attribute_types(self) -> &'static [&'static str] {
        match self {
            EnrichableKind::AllergyIntolerance => &["CDP-Allergy", "MedicationAllergy", "Diagnosis"],
            EnrichableKind::Condition => &["CDP-Condition"],
            EnrichableKind::Immunization => &["CDP-Immunization"],
        }
    }
}

/// A concept reference and the NLP output for its adjusted text.
#[derive(Debug, Clone)]
pub struct ConceptAnalysis {
    pub concept: CodeableConceptRef,
    pub output: ContainerAnnotation,
}

/// Merge derived codings into the referenced concepts of `resource`.
///
/// Every relevant attribute whose source concept contributes at least one new coding
/// gets its own insight. Returns the number of codings appended; zero means the
/// resource is unchanged.
pub fn enrich_codeable_concepts(
    resource: &mut Resource,
    analyses: &[ConceptAnalysis],
    config: &NlpConfig,
) -> usize {
    let Some(kind) = EnrichableKind::of(resource.resource_type()) else {
        debug!(resource_type = resource.resource_type(), "resource kind is not enrichable");
        return 0;
    };
    let attribute_types = kind.attribute_types();
    let mut ids = InsightIdMaker::new(config.insight_id_start);
    let mut total = 0;

    for analysis in analyses {
        let path = analysis.concept.path;
        let nlp_output_uri = config.nlp_output_uri(&analysis.output);

        for attr in analysis.output.attributes_named(attribute_types) {
            let Some(concept) = source_concept(attr, &analysis.output) else {
                continue;
            };
            if ids.is_exhausted() {
                warn!(path = %path, "insight ids exhausted; skipping remaining attributes");
                return total;
            }
            let Some(code) = path.resolve_mut(resource) else {
                debug!(path = %path, "codeable concept not found in resource");
                break;
            };

            let appended = add_all_codings(code, concept, true);
            if appended == 0 {
                continue;
            }
            total += appended;

            let insight_id = ids.next_id();
            if let (Some(domain), Some(insight_id)) = (resource.as_domain_mut(), insight_id) {
                attach_insight(
                    domain,
                    build_insight_id(&insight_id, &config.nlp_system),
                    build_structured_detail(&path.to_string(), nlp_output_uri.as_deref()),
                );
            }
        }
    }

    debug!(codings = total, "enriched codeable concepts");
    total
}
