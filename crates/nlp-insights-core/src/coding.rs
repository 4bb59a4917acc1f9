//! Coding merge engine.
//!
//! Codings are appended to a [`CodeableConcept`] without duplicating an existing
//! (system, code) pair. The two append flavours differ on purpose:
//!
//! - a plain append is suppressed by any matching coding;
//! - a derived append is suppressed only by a matching coding that already carries
//!   the derived-by-NLP tag, so a manually entered code gains a tagged sibling.

use nlp_insights_nlp::Concept;

use crate::insight::constants::*;
use crate::insight::{derived_by_nlp_extension, has_derived_by_nlp};
use crate::models::{CodeableConcept, Coding};

/// Codings in `concept` matching (system, code).
pub fn find_existing<'a>(
    concept: &'a CodeableConcept,
    system: &'a str,
    code: &'a str,
) -> impl Iterator<Item = &'a Coding> + 'a {
    concept.coding.iter().filter(move |c| c.matches(system, code))
}

/// Append an untagged coding unless (system, code) is already present.
pub fn append_coding(
    concept: &mut CodeableConcept,
    system: &str,
    code: &str,
    display: Option<&str>,
) -> bool {
    if find_existing(concept, system, code).next().is_some() {
        return false;
    }
    concept.coding.push(Coding::new(system, code, display));
    true
}

/// Append a tagged coding unless a tagged (system, code) is already present.
pub fn append_derived_coding(
    concept: &mut CodeableConcept,
    system: &str,
    code: &str,
    display: Option<&str>,
) -> bool {
    if find_existing(concept, system, code).any(|c| has_derived_by_nlp(&c.extension)) {
        return false;
    }
    let mut coding = Coding::new(system, code, display);
    coding.extension.push(derived_by_nlp_extension());
    concept.coding.push(coding);
    true
}

/// Split `csv_codes` on `,` and append each code. Codes are not trimmed.
///
/// Returns the number of codings appended.
pub fn expand_and_append(
    concept: &mut CodeableConcept,
    system: &str,
    csv_codes: &str,
    derived: bool,
) -> usize {
    let mut added = 0;
    for code in csv_codes.split(',') {
        let appended = if derived {
            append_derived_coding(concept, system, code, None)
        } else {
            append_coding(concept, system, code, None)
        };
        if appended {
            added += 1;
        }
    }
    added
}

/// Append every code an NLP concept carries.
///
/// The CUI is added first as a single UMLS code with the preferred name as display,
/// then SNOMED, NCI, LOINC, MeSH, ICD-9, ICD-10 and RxNorm lists. Absent or empty
/// fields are skipped.
pub fn add_all_codings(concept: &mut CodeableConcept, source: &Concept, derived: bool) -> usize {
    let mut added = 0;

    if let Some(cui) = source.cui.as_deref().filter(|c| !c.is_empty()) {
        let display = source.preferred_name.as_deref();
        let appended = if derived {
            append_derived_coding(concept, UMLS_URL, cui, display)
        } else {
            append_coding(concept, UMLS_URL, cui, display)
        };
        added += usize::from(appended);
    }

    let code_lists = [
        (SNOMED_URL, &source.snomed_concept_id),
        (NCI_URL, &source.nci_code),
        (LOINC_URL, &source.loinc_id),
        (MESH_URL, &source.mesh_id),
        (ICD9_URL, &source.icd9_code),
        (ICD10_URL, &source.icd10_code),
        (RXNORM_URL, &source.rx_norm_id),
    ];

    for (system, codes) in code_lists {
        if let Some(codes) = codes.as_deref().filter(|c| !c.is_empty()) {
            added += expand_and_append(concept, system, codes, derived);
        }
    }

    added
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diabetes() -> Concept {
        Concept {
            cui: Some("C0011849".into()),
            preferred_name: Some("Diabetes Mellitus".into()),
            snomed_concept_id: Some("73211009".into()),
            icd10_code: Some("E11.9,E10.9".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_append_suppressed_by_any_match() {
        let mut concept = CodeableConcept::default();
        assert!(append_derived_coding(&mut concept, SNOMED_URL, "1", None));
        assert!(!append_coding(&mut concept, SNOMED_URL, "1", None));
        assert_eq!(concept.coding.len(), 1);
    }

    #[test]
    fn test_derived_append_adds_tagged_sibling() {
        let mut concept = CodeableConcept::default();
        assert!(append_coding(&mut concept, SNOMED_URL, "1", Some("manual")));
        assert!(append_derived_coding(&mut concept, SNOMED_URL, "1", None));
        assert!(!append_derived_coding(&mut concept, SNOMED_URL, "1", None));

        assert_eq!(concept.coding.len(), 2);
        assert!(concept.coding[0].extension.is_empty());
        assert!(has_derived_by_nlp(&concept.coding[1].extension));
    }

    #[test]
    fn test_expand_does_not_trim() {
        let mut concept = CodeableConcept::default();
        let added = expand_and_append(&mut concept, ICD10_URL, "E11.9, E10.9,E11.9", false);

        assert_eq!(added, 2);
        assert_eq!(concept.coding[1].code.as_deref(), Some(" E10.9"));
    }

    #[test]
    fn test_expand_counts_only_appended_codes() {
        let mut concept = CodeableConcept::default();

        assert_eq!(expand_and_append(&mut concept, SNOMED_URL, "1,1,2", false), 2);
        assert_eq!(concept.coding.len(), 2);
        assert_eq!(expand_and_append(&mut concept, SNOMED_URL, "2,3", false), 1);
        assert_eq!(expand_and_append(&mut concept, SNOMED_URL, "1,2,3", true), 3);
        assert_eq!(expand_and_append(&mut concept, SNOMED_URL, "1,2,3", true), 0);
        assert_eq!(concept.coding.len(), 6);
    }

    #[test]
    fn test_add_all_codings_order() {
        let mut concept = CodeableConcept::default();
        let added = add_all_codings(&mut concept, &diabetes(), true);

        assert_eq!(added, 4);
        let systems: Vec<_> = concept
            .coding
            .iter()
            .map(|c| c.system.as_deref().unwrap())
            .collect();
        assert_eq!(systems, [UMLS_URL, SNOMED_URL, ICD10_URL, ICD10_URL]);
        assert_eq!(concept.coding[0].display.as_deref(), Some("Diabetes Mellitus"));
        assert!(concept.coding[1].display.is_none());
    }

    #[test]
    fn test_add_all_codings_idempotent() {
        let mut concept = CodeableConcept::default();
        add_all_codings(&mut concept, &diabetes(), true);
        let snapshot = concept.clone();

        assert_eq!(add_all_codings(&mut concept, &diabetes(), true), 0);
        assert_eq!(concept, snapshot);
    }

    #[test]
    fn test_concept_without_codes() {
        let mut concept = CodeableConcept::default();
        let empty = Concept {
            cui: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(add_all_codings(&mut concept, &empty, false), 0);
    }
}
