//! Property-based tests for coding merge, dosage parsing and derivation.

use std::collections::BTreeSet;

use nlp_insights_core::coding::{add_all_codings, append_coding, append_derived_coding};
use nlp_insights_core::derive::{derive_conditions, parse_dosage};
use nlp_insights_core::models::CodeableConcept;
use nlp_insights_core::source::UnstructuredText;
use nlp_insights_core::NlpConfig;
use nlp_insights_nlp::{AttributeValueAnnotation, Concept, ConceptRef, ContainerAnnotation, Uid};
use proptest::prelude::*;

fn code_strategy() -> impl Strategy<Value = String> {
    "[A-Z][0-9]{1,6}"
}

fn concept_strategy() -> impl Strategy<Value = Concept> {
    (
        proptest::option::of(code_strategy()),
        proptest::option::of(prop::collection::vec("[0-9]{3,9}", 1..4)),
        proptest::option::of(prop::collection::vec("[A-Z][0-9]{2}\\.[0-9]", 1..3)),
    )
        .prop_map(|(cui, snomed, icd10)| Concept {
            cui,
            snomed_concept_id: snomed.map(|codes| codes.join(",")),
            icd10_code: icd10.map(|codes| codes.join(",")),
            ..Default::default()
        })
}

fn text() -> UnstructuredText {
    UnstructuredText {
        source_reference: "DiagnosticReport/r1".into(),
        subject: None,
        fhir_path: "DiagnosticReport.presentedForm[0].data".into(),
        text: "note".into(),
    }
}

/// One CDP-Condition attribute per CUI in `cuis`, each with its own concept.
fn container_for(cuis: &[String]) -> ContainerAnnotation {
    let mut container = ContainerAnnotation::default();
    for (i, cui) in cuis.iter().enumerate() {
        let uid = Uid::Number(i as i64 + 1);
        container.attribute_values.push(AttributeValueAnnotation {
            name: "CDP-Condition".into(),
            begin: i as u32,
            end: i as u32 + 1,
            covered_text: cui.clone(),
            concept: Some(ConceptRef { uid: Some(uid.clone()) }),
            ..Default::default()
        });
        container.concepts.push(Concept {
            uid: Some(uid),
            cui: Some(cui.clone()),
            ..Default::default()
        });
    }
    container
}

proptest! {
    #[test]
    fn prop_add_all_codings_is_idempotent(source in concept_strategy(), derived in any::<bool>()) {
        let mut concept = CodeableConcept::default();
        add_all_codings(&mut concept, &source, derived);
        let once = concept.clone();

        prop_assert_eq!(add_all_codings(&mut concept, &source, derived), 0);
        prop_assert_eq!(concept, once);
    }

    #[test]
    fn prop_no_duplicate_pairs_per_tag_state(source in concept_strategy()) {
        let mut concept = CodeableConcept::default();
        add_all_codings(&mut concept, &source, false);
        add_all_codings(&mut concept, &source, true);

        let mut seen = BTreeSet::new();
        for coding in &concept.coding {
            let key = (coding.system.clone(), coding.code.clone(), coding.extension.is_empty());
            prop_assert!(seen.insert(key), "duplicate coding {:?}", coding);
        }
    }

    #[test]
    fn prop_derived_append_sides_with_plain_code(code in code_strategy()) {
        let mut concept = CodeableConcept::default();
        prop_assert!(append_coding(&mut concept, "urn:test", &code, None));
        prop_assert!(append_derived_coding(&mut concept, "urn:test", &code, None));
        prop_assert!(!append_coding(&mut concept, "urn:test", &code, None));
        prop_assert!(!append_derived_coding(&mut concept, "urn:test", &code, None));
        prop_assert_eq!(concept.coding.len(), 2);
    }

    #[test]
    fn prop_parse_dosage_is_total(input in "\\PC{0,40}") {
        let dose = parse_dosage(&input);
        if let Some(amount) = dose.amount {
            prop_assert!(amount.is_finite());
        }
    }

    #[test]
    fn prop_one_condition_per_distinct_cui(cuis in prop::collection::vec("C000000[1-5]", 0..12)) {
        let container = container_for(&cuis);
        let conditions = derive_conditions(&text(), &container, &NlpConfig::quick_umls());

        let distinct: BTreeSet<_> = cuis.iter().collect();
        prop_assert_eq!(conditions.len(), distinct.len());

        let insight_total: usize = conditions
            .iter()
            .map(|c| c.meta.as_ref().map_or(0, |m| m.extension.len()))
            .sum();
        prop_assert_eq!(insight_total, cuis.len());
    }

    #[test]
    fn prop_derivation_is_deterministic(cuis in prop::collection::vec("C000000[1-5]", 0..12)) {
        let container = container_for(&cuis);
        let config = NlpConfig::acd();
        prop_assert_eq!(
            derive_conditions(&text(), &container, &config),
            derive_conditions(&text(), &container, &config)
        );
    }
}
