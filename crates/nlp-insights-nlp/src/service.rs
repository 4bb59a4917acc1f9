//! NLP service boundary.
//!
//! Concrete network backends live outside this crate; anything that can turn text into
//! a [`ContainerAnnotation`] implements [`NlpService`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotations::{
    parse_container, AttributeValueAnnotation, Concept, ConceptRef, ContainerAnnotation,
    MedicationAnnotation, NlpError, NlpResult, Uid,
};
use crate::quickumls;

/// A text analysis backend.
pub trait NlpService: Send + Sync {
    /// Registry name of the service.
    fn name(&self) -> &str;

    /// Analyze one piece of text.
    fn analyze(&self, text: &str) -> NlpResult<ContainerAnnotation>;

    /// Whether this service may be selected for `resource_type`.
    fn handles(&self, _resource_type: &str) -> bool {
        true
    }
}

/// Service that answers every request with the same container.
///
/// Useful when the NLP call happened elsewhere and only the response is at hand.
#[derive(Debug, Clone)]
pub struct PrecomputedNlpService {
    name: String,
    container: ContainerAnnotation,
}

impl PrecomputedNlpService {
    pub fn new(name: impl Into<String>, container: ContainerAnnotation) -> Self {
        Self {
            name: name.into(),
            container,
        }
    }

    /// Build from a raw response. A top-level JSON array is read as a QuickUMLS match
    /// list, anything else as an ACD container.
    pub fn from_json(name: impl Into<String>, json: &str) -> NlpResult<Self> {
        let container = if json.trim_start().starts_with('[') {
            let matches = quickumls::parse_matches(json)?;
            quickumls::to_container(&matches)
        } else {
            parse_container(json)?
        };
        Ok(Self::new(name, container))
    }

    pub fn container(&self) -> &ContainerAnnotation {
        &self.container
    }
}

impl NlpService for PrecomputedNlpService {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&self, _text: &str) -> NlpResult<ContainerAnnotation> {
        Ok(self.container.clone())
    }
}

/// A dictionary term and the concept it maps to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Surface text to look for (case-insensitive).
    pub term: String,
    /// Attribute name emitted per occurrence, e.g. `CDP-Condition`.
    pub attribute: String,
    #[serde(flatten)]
    pub concept: Concept,
}

impl DictionaryEntry {
    fn is_medication(&self) -> bool {
        self.attribute == "CDP-Medication"
    }
}

/// Case-insensitive term matcher.
///
/// Every occurrence of every term becomes one attribute. Condition-like entries emit a
/// concept, medication entries a medication annotation; one source annotation is
/// shared by all occurrences of a term within a call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryAnnotator {
    #[serde(default = "default_dictionary_name")]
    pub name: String,
    #[serde(default)]
    pub resource_types: Vec<String>,
    pub entries: Vec<DictionaryEntry>,
}

fn default_dictionary_name() -> String {
    "dictionary".to_string()
}

impl DictionaryAnnotator {
    pub fn new(name: impl Into<String>, entries: Vec<DictionaryEntry>) -> Self {
        Self {
            name: name.into(),
            resource_types: Vec::new(),
            entries,
        }
    }

    pub fn from_json(json: &str) -> NlpResult<Self> {
        let annotator: DictionaryAnnotator = serde_json::from_str(json)?;
        if annotator.entries.iter().any(|e| e.term.is_empty()) {
            return Err(NlpError::InvalidFormat(
                "dictionary entries need a non-empty term".into(),
            ));
        }
        Ok(annotator)
    }

    /// Restrict the annotator to the given resource types.
    pub fn with_resource_types(mut self, resource_types: Vec<String>) -> Self {
        self.resource_types = resource_types;
        self
    }

    /// Annotate `text`.
    pub fn annotate(&self, text: &str) -> ContainerAnnotation {
        let mut container = ContainerAnnotation::default();
        // ASCII lowering keeps byte offsets aligned with the original text.
        let text_lower = text.to_ascii_lowercase();
        // Spans are reported in characters.
        let char_offset = |byte: usize| text[..byte].chars().count() as u32;

        for (idx, entry) in self.entries.iter().enumerate() {
            let pattern = entry.term.to_ascii_lowercase();
            if pattern.is_empty() {
                continue;
            }

            let occurrences: Vec<usize> = text_lower
                .match_indices(pattern.as_str())
                .map(|(pos, _)| pos)
                .collect();
            if occurrences.is_empty() {
                continue;
            }

            let uid = Uid::Number(idx as i64 + 1);
            debug!(term = %entry.term, count = occurrences.len(), "dictionary term matched");

            for pos in occurrences {
                let end_pos = pos + pattern.len();
                container.attribute_values.push(AttributeValueAnnotation {
                    name: entry.attribute.clone(),
                    begin: char_offset(pos),
                    end: char_offset(end_pos),
                    covered_text: text[pos..end_pos].to_string(),
                    preferred_name: entry.concept.preferred_name.clone(),
                    concept: Some(ConceptRef {
                        uid: Some(uid.clone()),
                    }),
                    insight_model_data: None,
                });
            }

            if entry.is_medication() {
                container.medication_ind.push(MedicationAnnotation {
                    uid: Some(uid),
                    cui: entry.concept.cui.clone(),
                    drug: Some(serde_json::json!([{
                        "name1": [{
                            "drugSurfaceForm": entry.term,
                            "drugNormalizedName": entry.concept.preferred_name,
                            "cui": entry.concept.cui,
                            "rxNormID": entry.concept.rx_norm_id,
                        }]
                    }])),
                    ..Default::default()
                });
            } else {
                container.concepts.push(Concept {
                    uid: Some(uid),
                    ..entry.concept.clone()
                });
            }
        }

        container
    }
}

impl NlpService for DictionaryAnnotator {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&self, text: &str) -> NlpResult<ContainerAnnotation> {
        Ok(self.annotate(text))
    }

    fn handles(&self, resource_type: &str) -> bool {
        self.resource_types.is_empty() || self.resource_types.iter().any(|t| t == resource_type)
    }
}
