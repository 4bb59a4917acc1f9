//! Fixed URIs and names used in insight provenance.

macro_rules! structure_definition {
    ($($name:ident => $path:literal),* $(,)?) => {
        $(
            pub const $name: &str = concat!("http://ibm.com/fhir/cdm/StructureDefinition/", $path);
        )*
    };
}

structure_definition! {
    INSIGHT_URL => "insight",
    INSIGHT_ID_URL => "insight-id",
    INSIGHT_DETAIL_URL => "insight-detail",
    INSIGHT_RESULT_URL => "insight-result",
    INSIGHT_SPAN_URL => "span",
    INSIGHT_SPAN_OFFSET_BEGIN_URL => "offset-begin",
    INSIGHT_SPAN_OFFSET_END_URL => "offset-end",
    INSIGHT_SPAN_COVERED_TEXT_URL => "covered-text",
    INSIGHT_CONFIDENCE_URL => "insight-confidence",
    INSIGHT_CONFIDENCE_SCORE_URL => "score",
    INSIGHT_CONFIDENCE_NAME_URL => "description",
    INSIGHT_REFERENCE_URL => "reference",
    INSIGHT_REFERENCE_PATH_URL => "reference-path",
    INSIGHT_EVALUATED_OUTPUT_URL => "evaluated-output",
    INSIGHT_CATEGORY_URL => "category",
}

// Derived-by-NLP classification
pub const CLASSIFICATION_DERIVED_SYSTEM: &str =
    "http://ibm.com/fhir/cdm/CodeSystem/insight-category-code-system";
pub const CLASSIFICATION_DERIVED_CODE: &str = "natural-language-processing";
pub const CLASSIFICATION_DERIVED_DISPLAY: &str = "NLP";

// Code systems
pub const UMLS_URL: &str = "http://terminology.hl7.org/CodeSystem/umls";
pub const SNOMED_URL: &str = "http://snomed.info/sct";
pub const LOINC_URL: &str = "http://loinc.org";
pub const MESH_URL: &str = "http://www.nlm.nih.gov/mesh/meshhome.html";
pub const NCI_URL: &str = "http://ncithesaurus.nci.nih.gov/ncitbrowser/";
pub const ICD9_URL: &str = "http://terminology.hl7.org/CodeSystem/icd9";
pub const ICD10_URL: &str = "https://terminology.hl7.org/CodeSystem/icd10";
pub const RXNORM_URL: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
pub const TIMING_URL: &str = "http://hl7.org/fhir/ValueSet/timing-abbreviation";

// Confidence names
pub const CONFIDENCE_SCORE_EXPLICIT: &str = "Explicit Score";
pub const CONFIDENCE_SCORE_PATIENT_REPORTED: &str = "Patient Reported Score";
pub const CONFIDENCE_SCORE_DISCUSSED: &str = "Discussed Score";
pub const CONFIDENCE_SCORE_FAMILY_HISTORY: &str = "Family History Score";
pub const CONFIDENCE_SCORE_SUSPECTED: &str = "Suspected Score";
pub const CONFIDENCE_SCORE_MEDICATION_TAKEN: &str = "Medication Taken Score";
pub const CONFIDENCE_SCORE_MEDICATION_CONSIDERING: &str = "Medication Considering Score";
pub const CONFIDENCE_SCORE_MEDICATION_DISCUSSED: &str = "Medication Discussed Score";
pub const CONFIDENCE_SCORE_MEDICATION_MEASUREMENT: &str = "Medication Lab Measurement Score";

// NLP systems
pub const ACD_NLP_SYSTEM: &str = "urn:id:COM.IBM.WH.PA.CDP.CDE/1.0.0";
pub const QUICK_UMLS_NLP_SYSTEM: &str = "urn:id:COM.IBM.QUICKUMLS/1.0.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_definition_urls() {
        assert_eq!(
            INSIGHT_CONFIDENCE_URL,
            "http://ibm.com/fhir/cdm/StructureDefinition/insight-confidence"
        );
        assert_eq!(
            INSIGHT_SPAN_OFFSET_BEGIN_URL,
            "http://ibm.com/fhir/cdm/StructureDefinition/offset-begin"
        );
    }
}
