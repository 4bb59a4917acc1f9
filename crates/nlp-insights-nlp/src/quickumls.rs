//! QuickUMLS match list adapter.
//!
//! QuickUMLS returns a flat list of CUI matches with UMLS semantic type ids. The
//! adapter lifts those matches into a [`ContainerAnnotation`] so that downstream
//! derivation and enrichment see the same shape as an ACD response.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::annotations::{
    AttributeValueAnnotation, Concept, ConceptRef, ContainerAnnotation, MedicationAnnotation,
    NlpResult, Uid,
};

/// One QuickUMLS match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickUmlsMatch {
    pub cui: Option<String>,
    #[serde(default)]
    pub ngram: String,
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub end: u32,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub semtypes: Vec<String>,
    #[serde(default)]
    pub snomed_ct: Option<String>,
}

/// How a semantic type is used when deriving resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticRole {
    Condition,
    Medication,
}

impl SemanticRole {
    fn attribute_name(self) -> &'static str {
        match self {
            SemanticRole::Condition => "CDP-Condition",
            SemanticRole::Medication => "CDP-Medication",
        }
    }
}

/// (type id, type name, role)
const SEMTYPES: &[(&str, &str, Option<SemanticRole>)] = &[
    ("T019", "CongenitalAbnormality", Some(SemanticRole::Condition)),
    ("T020", "AcquiredAbnormality", Some(SemanticRole::Condition)),
    ("T033", "Finding", Some(SemanticRole::Condition)),
    ("T037", "InjuryOrPoisoning", Some(SemanticRole::Condition)),
    ("T046", "PathologicFunction", Some(SemanticRole::Condition)),
    ("T047", "DiseaseOrSyndrome", Some(SemanticRole::Condition)),
    ("T048", "MentalOrBehavioralDysfunction", Some(SemanticRole::Condition)),
    ("T049", "CellOrMolecularDysfunction", Some(SemanticRole::Condition)),
    ("T050", "ExperimentalModelOfDisease", Some(SemanticRole::Condition)),
    ("T184", "SignOrSymptom", Some(SemanticRole::Condition)),
    ("T190", "AnatomicalAbnormality", Some(SemanticRole::Condition)),
    ("T191", "NeoplasticProcess", Some(SemanticRole::Condition)),
    ("T109", "OrganicChemical", None),
    ("T116", "AminoAcidPeptideOrProtein", None),
    ("T121", "PharmacologicSubstance", Some(SemanticRole::Medication)),
    ("T125", "Hormone", Some(SemanticRole::Medication)),
    ("T129", "ImmunologicFactor", Some(SemanticRole::Medication)),
    ("T195", "Antibiotic", Some(SemanticRole::Medication)),
    ("T200", "ClinicalDrug", Some(SemanticRole::Medication)),
    ("T059", "LaboratoryProcedure", None),
    ("T060", "DiagnosticProcedure", None),
    ("T061", "TherapeuticOrPreventiveProcedure", None),
];

/// UMLS semantic type name for a type id, e.g. `T047` → `DiseaseOrSyndrome`.
pub fn semtype_name(type_id: &str) -> Option<&'static str> {
    SEMTYPES
        .iter()
        .find(|(id, _, _)| *id == type_id)
        .map(|(_, name, _)| *name)
}

fn roles_for(semtypes: &[String]) -> Vec<SemanticRole> {
    let mut roles = Vec::new();
    for type_id in semtypes {
        let role = SEMTYPES
            .iter()
            .find(|(id, _, _)| *id == type_id.as_str())
            .and_then(|(_, _, role)| *role);
        if let Some(role) = role {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
    }
    roles
}

/// Parse a QuickUMLS JSON response.
pub fn parse_matches(json: &str) -> NlpResult<Vec<QuickUmlsMatch>> {
    Ok(serde_json::from_str(json)?)
}

/// Convert matches to a container. Matches without a CUI or without a condition or
/// drug semantic type are dropped.
pub fn to_container(matches: &[QuickUmlsMatch]) -> ContainerAnnotation {
    let mut container = ContainerAnnotation::default();

    for (idx, m) in matches.iter().enumerate() {
        let Some(cui) = m.cui.as_deref() else {
            continue;
        };
        let roles = roles_for(&m.semtypes);
        if roles.is_empty() {
            continue;
        }

        let uid = Uid::Number(idx as i64 + 1);
        let semantic_type = m
            .semtypes
            .iter()
            .filter_map(|t| semtype_name(t))
            .map(|name| format!("umls.{name}"))
            .collect::<Vec<_>>()
            .join(",");

        for role in &roles {
            container.attribute_values.push(AttributeValueAnnotation {
                name: role.attribute_name().to_string(),
                begin: m.start,
                end: m.end,
                covered_text: m.ngram.clone(),
                preferred_name: Some(m.term.clone()),
                concept: Some(ConceptRef {
                    uid: Some(uid.clone()),
                }),
                insight_model_data: None,
            });
        }

        if roles.contains(&SemanticRole::Condition) {
            container.concepts.push(Concept {
                uid: Some(uid.clone()),
                cui: Some(cui.to_string()),
                preferred_name: Some(m.term.clone()),
                semantic_type: Some(semantic_type),
                snomed_concept_id: m.snomed_ct.clone(),
                ..Default::default()
            });
        }

        if roles.contains(&SemanticRole::Medication) {
            container.medication_ind.push(MedicationAnnotation {
                uid: Some(uid),
                cui: Some(cui.to_string()),
                begin: m.start,
                end: m.end,
                covered_text: m.ngram.clone(),
                drug: Some(json!([{
                    "name1": [{
                        "drugSurfaceForm": m.ngram,
                        "drugNormalizedName": m.term,
                        "cui": cui,
                    }]
                }])),
                administration: None,
                insight_model_data: None,
            });
        }
    }

    container
}
