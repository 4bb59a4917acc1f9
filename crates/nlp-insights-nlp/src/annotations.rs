//! Annotation container returned by a clinical NLP service.
//!
//! The shapes follow the JSON emitted by Annotator for Clinical Data (ACD). Only the
//! parts the insight engine reads are typed; nested drug and administration data is
//! kept as raw JSON because its structure varies between annotator flows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// NLP boundary errors.
#[derive(Error, Debug)]
pub enum NlpError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("NLP service error: {0}")]
    Service(String),
}

pub type NlpResult<T> = Result<T, NlpError>;

/// Opaque annotation identifier.
///
/// ACD emits numeric uids; other annotators use strings. Two uids are equal only when
/// both the kind and the value match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Uid {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Uid::Number(n) => write!(f, "{n}"),
            Uid::Text(s) => f.write_str(s),
        }
    }
}

/// Something an attribute can point back to by uid.
pub trait Annotated {
    fn uid(&self) -> Option<&Uid>;
}

/// Full response for one piece of analyzed text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAnnotation {
    #[serde(default)]
    pub attribute_values: Vec<AttributeValueAnnotation>,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default, rename = "SymptomDiseaseInd")]
    pub symptom_disease_ind: Vec<Concept>,
    #[serde(default, rename = "MedicationInd")]
    pub medication_ind: Vec<MedicationAnnotation>,
}

impl ContainerAnnotation {
    /// Attributes whose name is one of `names`, in response order.
    pub fn attributes_named<'a>(
        &'a self,
        names: &'a [&'a str],
    ) -> impl Iterator<Item = &'a AttributeValueAnnotation> + 'a {
        self.attribute_values
            .iter()
            .filter(move |attr| names.contains(&attr.name.as_str()))
    }

    /// True when the response carries no annotations at all.
    pub fn is_empty(&self) -> bool {
        self.attribute_values.is_empty()
            && self.concepts.is_empty()
            && self.symptom_disease_ind.is_empty()
            && self.medication_ind.is_empty()
    }
}

/// Reference from an attribute to the annotation that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptRef {
    #[serde(default)]
    pub uid: Option<Uid>,
}

/// A derived attribute (e.g. "CDP-Condition") pointing at its source annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeValueAnnotation {
    pub name: String,
    #[serde(default)]
    pub begin: u32,
    #[serde(default)]
    pub end: u32,
    #[serde(default)]
    pub covered_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<ConceptRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight_model_data: Option<InsightModelData>,
}

impl AttributeValueAnnotation {
    /// The uid of the source annotation, if the attribute carries one.
    pub fn source_uid(&self) -> Option<&Uid> {
        self.concept.as_ref().and_then(|c| c.uid.as_ref())
    }
}

/// A normalized clinical concept with its terminology codes.
///
/// Code fields may hold several codes of one system separated by commas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cui: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snomed_concept_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nci_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loinc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icd9_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icd10_code: Option<String>,
    #[serde(
        default,
        rename = "rxNormID",
        alias = "rxNormId",
        skip_serializing_if = "Option::is_none"
    )]
    pub rx_norm_id: Option<String>,
}

impl Annotated for Concept {
    fn uid(&self) -> Option<&Uid> {
        self.uid.as_ref()
    }
}

/// A medication mention.
///
/// `drug` and `administration` are lists of loosely structured objects; readers must
/// expect missing keys and unexpected shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cui: Option<String>,
    #[serde(default)]
    pub begin: u32,
    #[serde(default)]
    pub end: u32,
    #[serde(default)]
    pub covered_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight_model_data: Option<InsightModelData>,
}

impl Annotated for MedicationAnnotation {
    fn uid(&self) -> Option<&Uid> {
        self.uid.as_ref()
    }
}

impl MedicationAnnotation {
    /// First drug's first name entry (`drug[0].name1[0]`), if the structure is there.
    pub fn first_drug_name(&self) -> Option<&Value> {
        self.drug.as_ref()?.get(0)?.get("name1")?.get(0)
    }

    /// String value of `key` in the first administration entry.
    pub fn administration_value(&self, key: &str) -> Option<&str> {
        self.administration.as_ref()?.get(0)?.get(key)?.as_str()
    }
}

/// Model scores attached to an attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightModelData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<DiagnosisModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<MedicationModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<DiagnosisUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspected_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_history_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_reported_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discussed_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicationModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<MedicationUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub considering_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discussed_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_measurement_score: Option<f64>,
}

/// Parse an NLP response into a container.
///
/// Leading or trailing text around the JSON object (log prefixes, transport framing)
/// is ignored.
pub fn parse_container(json: &str) -> NlpResult<ContainerAnnotation> {
    let json_start = json.find('{').ok_or_else(|| {
        NlpError::InvalidFormat("No JSON object found in response".into())
    })?;
    let json_end = json.rfind('}').ok_or_else(|| {
        NlpError::InvalidFormat("No closing brace found in response".into())
    })?;

    let json_slice = &json[json_start..=json_end];
    let container: ContainerAnnotation = serde_json::from_str(json_slice)?;

    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACD_RESPONSE: &str = r#"{
        "attributeValues": [
            {
                "name": "CDP-Condition",
                "begin": 12,
                "end": 20,
                "coveredText": "diabetes",
                "concept": {"uid": 2},
                "insightModelData": {
                    "diagnosis": {
                        "usage": {"explicitScore": 0.94, "patientReportedScore": 0.0},
                        "suspectedScore": 0.02,
                        "familyHistoryScore": 0.0
                    }
                }
            }
        ],
        "concepts": [
            {
                "uid": 2,
                "cui": "C0011849",
                "preferredName": "Diabetes Mellitus",
                "type": "umls.DiseaseOrSyndrome",
                "snomedConceptId": "73211009",
                "icd10Code": "E11.9,E10.9",
                "rxNormID": "1234"
            }
        ],
        "MedicationInd": [
            {
                "uid": 7,
                "cui": "C0025598",
                "begin": 30,
                "end": 39,
                "coveredText": "metformin",
                "drug": [{"name1": [{"drugSurfaceForm": "metformin", "cui": "C0025598"}]}],
                "administration": [{"dosageValue": "500 mg", "frequencyValue": "Q AM"}]
            }
        ]
    }"#;

    #[test]
    fn test_parse_container() {
        let container = parse_container(ACD_RESPONSE).unwrap();

        assert_eq!(container.attribute_values.len(), 1);
        let attr = &container.attribute_values[0];
        assert_eq!(attr.name, "CDP-Condition");
        assert_eq!(attr.source_uid(), Some(&Uid::Number(2)));

        let usage = attr
            .insight_model_data
            .as_ref()
            .and_then(|d| d.diagnosis.as_ref())
            .and_then(|d| d.usage.as_ref())
            .unwrap();
        assert_eq!(usage.explicit_score, Some(0.94));
        assert_eq!(usage.discussed_score, None);

        let concept = &container.concepts[0];
        assert_eq!(concept.cui.as_deref(), Some("C0011849"));
        assert_eq!(concept.icd10_code.as_deref(), Some("E11.9,E10.9"));
        assert_eq!(concept.rx_norm_id.as_deref(), Some("1234"));
        assert_eq!(concept.semantic_type.as_deref(), Some("umls.DiseaseOrSyndrome"));
    }

    #[test]
    fn test_parse_container_with_prefix() {
        let json = format!("annotator response follows:\n{}\n-- end", ACD_RESPONSE);
        let container = parse_container(&json).unwrap();
        assert_eq!(container.medication_ind.len(), 1);
    }

    #[test]
    fn test_parse_container_rejects_non_json() {
        assert!(matches!(
            parse_container("no annotations here"),
            Err(NlpError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_medication_accessors() {
        let container = parse_container(ACD_RESPONSE).unwrap();
        let med = &container.medication_ind[0];

        let name = med.first_drug_name().unwrap();
        assert_eq!(name["drugSurfaceForm"], "metformin");
        assert_eq!(med.administration_value("dosageValue"), Some("500 mg"));
        assert_eq!(med.administration_value("frequencyValue"), Some("Q AM"));
        assert_eq!(med.administration_value("route"), None);
    }

    #[test]
    fn test_malformed_drug_survives_parsing() {
        let json = r#"{"MedicationInd": [{"uid": "m1", "drug": "not-a-list"}]}"#;
        let container = parse_container(json).unwrap();
        let med = &container.medication_ind[0];

        assert_eq!(med.uid, Some(Uid::Text("m1".into())));
        assert!(med.first_drug_name().is_none());
    }

    #[test]
    fn test_uid_kinds_are_distinct() {
        assert_ne!(Uid::Number(3), Uid::Text("3".into()));
        assert_eq!(Uid::Number(3).to_string(), "3");
    }

    #[test]
    fn test_attributes_named() {
        let mut container = ContainerAnnotation::default();
        for name in ["CDP-Condition", "CDP-Medication", "CDP-Condition"] {
            container.attribute_values.push(AttributeValueAnnotation {
                name: name.into(),
                ..Default::default()
            });
        }

        let names = ["CDP-Condition"];
        assert_eq!(container.attributes_named(&names).count(), 2);
        assert!(!container.is_empty());
        assert!(ContainerAnnotation::default().is_empty());
    }
}
