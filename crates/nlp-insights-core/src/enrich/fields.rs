//! Codeable concepts worth analyzing, and their location inside a resource.

use std::fmt;

use crate::models::{CodeableConcept, Resource};

/// Location of a codeable concept within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePath {
    AllergyCode,
    AllergyManifestation {
        reaction: usize,
        manifestation: usize,
    },
    ConditionCode,
    ImmunizationVaccineCode,
}

impl CodePath {
    pub fn resolve<'a>(&self, resource: &'a Resource) -> Option<&'a CodeableConcept> {
        match (self, resource) {
            (CodePath::AllergyCode, Resource::AllergyIntolerance(r)) => r.code.as_ref(),
            (
                CodePath::AllergyManifestation {
                    reaction,
                    manifestation,
                },
                Resource::AllergyIntolerance(r),
            ) => r.reaction.get(*reaction)?.manifestation.get(*manifestation),
            (CodePath::ConditionCode, Resource::Condition(r)) => r.code.as_ref(),
            (CodePath::ImmunizationVaccineCode, Resource::Immunization(r)) => {
                r.vaccine_code.as_ref()
            }
            _ => None,
        }
    }

    pub fn resolve_mut<'a>(&self, resource: &'a mut Resource) -> Option<&'a mut CodeableConcept> {
        match (self, resource) {
            (CodePath::AllergyCode, Resource::AllergyIntolerance(r)) => r.code.as_mut(),
            (
                CodePath::AllergyManifestation {
                    reaction,
                    manifestation,
                },
                Resource::AllergyIntolerance(r),
            ) => r
                .reaction
                .get_mut(*reaction)?
                .manifestation
                .get_mut(*manifestation),
            (CodePath::ConditionCode, Resource::Condition(r)) => r.code.as_mut(),
            (CodePath::ImmunizationVaccineCode, Resource::Immunization(r)) => {
                r.vaccine_code.as_mut()
            }
            _ => None,
        }
    }
}

impl fmt::Display for CodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodePath::AllergyCode => f.write_str("AllergyIntolerance.code"),
            CodePath::AllergyManifestation {
                reaction,
                manifestation,
            } => write!(
                f,
                "AllergyIntolerance.reaction[{reaction}].manifestation[{manifestation}]"
            ),
            CodePath::ConditionCode => f.write_str("Condition.code"),
            CodePath::ImmunizationVaccineCode => f.write_str("Immunization.vaccineCode"),
        }
    }
}

/// A codeable concept to analyze and the text to send to NLP for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeableConceptRef {
    pub path: CodePath,
    pub adjusted_text: String,
}

/// Text sent to NLP for a concept. Allergen text gets context so the annotator reads
/// it as an allergy rather than a substance.
pub fn adjusted_text(path: CodePath, text: &str) -> String {
    match path {
        CodePath::AllergyCode => format!("allergy to {text}"),
        _ => text.to_string(),
    }
}

fn text_of(concept: Option<&CodeableConcept>) -> Option<&str> {
    concept?.text.as_deref().filter(|t| !t.trim().is_empty())
}

/// Codeable concepts with text in `resource`, in document order.
pub fn fields_of_interest(resource: &Resource) -> Vec<CodeableConceptRef> {
    let mut paths = Vec::new();

    match resource {
        Resource::AllergyIntolerance(r) => {
            paths.push(CodePath::AllergyCode);
            for (reaction, entry) in r.reaction.iter().enumerate() {
                for manifestation in 0..entry.manifestation.len() {
                    paths.push(CodePath::AllergyManifestation {
                        reaction,
                        manifestation,
                    });
                }
            }
        }
        Resource::Condition(_) => paths.push(CodePath::ConditionCode),
        Resource::Immunization(_) => paths.push(CodePath::ImmunizationVaccineCode),
        _ => {}
    }

    paths
        .into_iter()
        .filter_map(|path| {
            let text = text_of(path.resolve(resource))?;
            Some(CodeableConceptRef {
                path,
                adjusted_text: adjusted_text(path, text),
            })
        })
        .collect()
}
