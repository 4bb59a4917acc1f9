//! MedicationStatement derivation.

use nlp_insights_nlp::{Concept, ContainerAnnotation, MedicationAnnotation};
use serde_json::Value;
use tracing::{debug, warn};

use super::{attribute_span, medication_confidences, CuiTracker};
use crate::coding::add_all_codings;
use crate::config::NlpConfig;
use crate::correlate::source_medication;
use crate::insight::constants::TIMING_URL;
use crate::insight::{attach_insight, build_insight_id, build_unstructured_detail};
use crate::models::{
    CodeableConcept, Coding, DoseAndRate, Dosage, MedicationStatement, Quantity, Timing,
};
use crate::source::UnstructuredText;

/// Attribute names that yield medication statements.
pub const MEDICATION_ATTRIBUTES: &[&str] = &["CDP-Medication"];

/// Drug details from the first name entry of a medication annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrugInfo {
    pub surface_form: Option<String>,
    pub normalized_name: Option<String>,
    pub cui: Option<String>,
    pub rx_norm_id: Option<String>,
}

impl DrugInfo {
    /// Read `drug[0].name1[0]`. A missing or malformed structure gives an empty
    /// record and a warning.
    pub fn from_annotation(annotation: &MedicationAnnotation) -> Self {
        let Some(name) = annotation.first_drug_name().filter(|v| v.is_object()) else {
            warn!(
                uid = ?annotation.uid,
                covered_text = %annotation.covered_text,
                "unable to read drug information from medication annotation"
            );
            return Self::default();
        };

        let field = |key: &str| name.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            surface_form: field("drugSurfaceForm"),
            normalized_name: field("drugNormalizedName"),
            cui: field("cui"),
            rx_norm_id: field("rxNormID"),
        }
    }

    /// The drug as a concept: UMLS code with the surface form as display, RxNorm list.
    pub fn as_concept(&self) -> Concept {
        Concept {
            cui: self.cui.clone(),
            preferred_name: self.surface_form.clone(),
            rx_norm_id: self.rx_norm_id.clone(),
            ..Default::default()
        }
    }
}

/// Amount and unit read from an NLP dosage value such as `"1,000 mg"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDose {
    pub amount: Option<f64>,
    pub unit: Option<String>,
}

/// Parse a dosage value. The text before the first space is the amount (commas
/// removed), the next token is the unit. Never fails; an unreadable amount is
/// logged and left unset.
pub fn parse_dosage(text: &str) -> ParsedDose {
    let (amount_text, unit) = match text.split_once(' ') {
        Some((left, right)) => {
            let unit = right
                .split(' ')
                .next()
                .filter(|u| !u.is_empty())
                .map(str::to_string);
            (left, unit)
        }
        None => (text, None),
    };

    let cleaned = amount_text.replace(',', "");
    let amount = match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(dosage = text, "unable to parse dosage amount");
            None
        }
    };

    ParsedDose { amount, unit }
}

/// Timing abbreviations recognised in NLP frequency values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingAbbreviation {
    Am,
    Pm,
}

impl TimingAbbreviation {
    pub fn code(self) -> &'static str {
        match self {
            TimingAbbreviation::Am => "AM",
            TimingAbbreviation::Pm => "PM",
        }
    }
}

pub fn parse_frequency(text: &str) -> Option<TimingAbbreviation> {
    match text {
        "Q AM" | "Q AM." | "AM" => Some(TimingAbbreviation::Am),
        "Q PM" | "Q PM." | "PM" => Some(TimingAbbreviation::Pm),
        _ => None,
    }
}

/// Timing for a frequency value. The raw text is always kept; a coding is added
/// only for a recognised abbreviation.
pub fn build_timing(frequency: &str) -> Timing {
    let mut code = CodeableConcept::with_text(frequency);
    if let Some(abbreviation) = parse_frequency(frequency) {
        code.coding.push(Coding::new(
            TIMING_URL,
            abbreviation.code(),
            Some(abbreviation.code()),
        ));
    }
    Timing { code: Some(code) }
}

/// Dosage from the first administration entry, if it has a dosage or frequency.
pub fn build_dosage(annotation: &MedicationAnnotation) -> Option<Dosage> {
    let dose_text = annotation.administration_value("dosageValue");
    let frequency = annotation.administration_value("frequencyValue");
    if dose_text.is_none() && frequency.is_none() {
        return None;
    }

    let mut dosage = Dosage::default();
    if let Some(text) = dose_text {
        let dose = parse_dosage(text);
        if let Some(amount) = dose.amount {
            dosage.dose_and_rate.push(DoseAndRate {
                dose_quantity: Some(Quantity {
                    value: Some(amount),
                    unit: dose.unit,
                }),
            });
        }
    }
    dosage.timing = frequency.map(build_timing);

    Some(dosage)
}

/// One medication statement per distinct CUI among the medication attributes.
pub fn derive_medication_statements(
    source: &UnstructuredText,
    output: &ContainerAnnotation,
    config: &NlpConfig,
) -> Vec<MedicationStatement> {
    let mut tracker: CuiTracker<MedicationStatement> = CuiTracker::new(config.insight_id_start);
    let nlp_output_uri = config.nlp_output_uri(output);

    for attr in output.attributes_named(MEDICATION_ATTRIBUTES) {
        let Some(annotation) = source_medication(attr, output) else {
            continue;
        };
        let drug = DrugInfo::from_annotation(annotation);
        let cui = annotation
            .cui
            .as_deref()
            .or(drug.cui.as_deref())
            .filter(|c| !c.is_empty());
        let Some(cui) = cui else {
            debug!(attribute = %attr.name, "medication annotation has no CUI");
            continue;
        };
        let Some(span) = attribute_span(attr) else {
            continue;
        };

        let entry = tracker.track(cui, || MedicationStatement {
            status: "unknown".to_string(),
            medication_codeable_concept: Some(CodeableConcept {
                text: drug.surface_form.clone(),
                ..Default::default()
            }),
            subject: source.subject.clone(),
            ..MedicationStatement::new()
        });

        let Some(insight_id) = entry.ids.next_id() else {
            warn!(%cui, "insight ids exhausted; skipping medication statement mention");
            continue;
        };
        let confidences = medication_confidences(attr.insight_model_data.as_ref());
        let detail = build_unstructured_detail(
            &source.source_reference,
            &span,
            &confidences,
            nlp_output_uri.as_deref(),
        );
        attach_insight(
            &mut entry.resource,
            build_insight_id(&insight_id, &config.nlp_system),
            detail,
        );

        let statement = &mut entry.resource;
        let code = statement
            .medication_codeable_concept
            .get_or_insert_with(CodeableConcept::default);
        add_all_codings(code, &drug.as_concept(), false);

        // one dosage per mention, repeats included
        if let Some(dosage) = build_dosage(annotation) {
            statement.dosage.push(dosage);
        }
    }

    debug!(count = tracker.len(), "derived medication statements");
    tracker.finish()
}
