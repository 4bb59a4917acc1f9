//! Condition derivation.

use nlp_insights_nlp::ContainerAnnotation;
use tracing::{debug, warn};

use super::{attribute_span, diagnosis_confidences, CuiTracker};
use crate::coding::add_all_codings;
use crate::config::NlpConfig;
use crate::correlate::source_concept;
use crate::insight::{attach_insight, build_insight_id, build_unstructured_detail};
use crate::models::{CodeableConcept, Condition};
use crate::source::UnstructuredText;

/// Attribute names that yield conditions.
pub const CONDITION_ATTRIBUTES: &[&str] = &["CDP-Condition"];

/// One condition per distinct CUI among the condition attributes of `output`.
///
/// The condition's `code` takes the preferred name of the first concept seen and
/// collects the codes of every concept folded into it.
pub fn derive_conditions(
    source: &UnstructuredText,
    output: &ContainerAnnotation,
    config: &NlpConfig,
) -> Vec<Condition> {
    let mut tracker: CuiTracker<Condition> = CuiTracker::new(config.insight_id_start);
    let nlp_output_uri = config.nlp_output_uri(output);

    for attr in output.attributes_named(CONDITION_ATTRIBUTES) {
        let Some(concept) = source_concept(attr, output) else {
            continue;
        };
        let Some(cui) = concept.cui.as_deref().filter(|c| !c.is_empty()) else {
            debug!(attribute = %attr.name, "source concept has no CUI");
            continue;
        };
        let Some(span) = attribute_span(attr) else {
            continue;
        };

        let entry = tracker.track(cui, || Condition {
            subject: source.subject.clone(),
            ..Condition::new()
        });

        let Some(insight_id) = entry.ids.next_id() else {
            warn!(%cui, "insight ids exhausted; skipping condition mention");
            continue;
        };
        let confidences = diagnosis_confidences(attr.insight_model_data.as_ref());
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

        let code = entry.resource.code.get_or_insert_with(|| CodeableConcept {
            text: concept.preferred_name.clone(),
            ..Default::default()
        });
        add_all_codings(code, concept, false);
    }

    debug!(count = tracker.len(), "derived conditions");
    tracker.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::constants::*;
    use crate::models::Reference;
    use nlp_insights_nlp::{AttributeValueAnnotation, Concept, ConceptRef, Uid};

    fn source() -> UnstructuredText {
        UnstructuredText {
            source_reference: "DiagnosticReport/r1".into(),
            subject: Some(Reference::to("Patient/p1")),
            fhir_path: "DiagnosticReport.presentedForm[0].data".into(),
            text: "diabetes ... diabetes ... asthma".into(),
        }
    }

    fn attr(uid: i64, begin: u32, end: u32) -> AttributeValueAnnotation {
        AttributeValueAnnotation {
            name: "CDP-Condition".into(),
            begin,
            end,
            covered_text: "x".into(),
            concept: Some(ConceptRef {
                uid: Some(Uid::Number(uid)),
            }),
            ..Default::default()
        }
    }

    fn concept(uid: i64, cui: Option<&str>, name: &str) -> Concept {
        Concept {
            uid: Some(Uid::Number(uid)),
            cui: cui.map(str::to_string),
            preferred_name: Some(name.into()),
            snomed_concept_id: Some(format!("{uid}000")),
            ..Default::default()
        }
    }

    fn output() -> ContainerAnnotation {
        ContainerAnnotation {
            attribute_values: vec![
                attr(1, 0, 8),
                attr(2, 13, 21),
                attr(3, 26, 32),
                attr(9, 0, 1),
                attr(4, 0, 1),
            ],
            concepts: vec![
                concept(1, Some("C0011849"), "Diabetes Mellitus"),
                concept(2, Some("C0011849"), "Diabetes"),
                concept(3, Some("C0004096"), "Asthma"),
                concept(4, None, "Unknown"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_mentions_fold_by_cui() {
        let conditions = derive_conditions(&source(), &output(), &NlpConfig::quick_umls());
        assert_eq!(conditions.len(), 2);

        let diabetes = &conditions[0];
        let code = diabetes.code.as_ref().unwrap();
        assert_eq!(code.text.as_deref(), Some("Diabetes Mellitus"));
        // UMLS once, then the snomed code of each folded concept
        assert_eq!(code.coding.len(), 3);
        assert!(code.coding.iter().all(|c| c.extension.is_empty()));

        let insights = &diabetes.meta.as_ref().unwrap().extension;
        assert_eq!(insights.len(), 2);
        let ids: Vec<_> = insights
            .iter()
            .filter_map(|i| i.child(INSIGHT_ID_URL))
            .filter_map(|e| e.value_identifier.as_ref())
            .filter_map(|i| i.value.as_deref())
            .collect();
        assert_eq!(ids, ["insight-1", "insight-2"]);

        assert_eq!(
            diabetes.subject.as_ref().and_then(|s| s.reference.as_deref()),
            Some("Patient/p1")
        );
        assert_eq!(conditions[1].meta.as_ref().unwrap().extension.len(), 1);
        assert!(conditions.iter().all(|c| c.extension.len() == 1));
    }

    #[test]
    fn test_exhausted_insight_ids_skip_later_mentions() {
        let config = NlpConfig {
            insight_id_start: u32::MAX,
            ..NlpConfig::quick_umls()
        };
        let conditions = derive_conditions(&source(), &output(), &config);
        assert_eq!(conditions.len(), 2);

        let diabetes = &conditions[0];
        let insights = &diabetes.meta.as_ref().unwrap().extension;
        assert_eq!(insights.len(), 1);
        let id = insights[0]
            .child(INSIGHT_ID_URL)
            .and_then(|e| e.value_identifier.as_ref())
            .and_then(|i| i.value.as_deref());
        assert_eq!(id, Some("insight-4294967295"));
        // the skipped mention contributes no codes
        assert_eq!(diabetes.code.as_ref().unwrap().coding.len(), 2);
    }

    #[test]
    fn test_no_conditions() {
        let output = ContainerAnnotation {
            attribute_values: vec![attr(9, 0, 1)],
            ..Default::default()
        };
        assert!(derive_conditions(&source(), &output, &NlpConfig::acd()).is_empty());
    }

    #[test]
    fn test_evaluated_output_on_every_insight() {
        let conditions = derive_conditions(&source(), &output(), &NlpConfig::acd());
        let insight = &conditions[0].meta.as_ref().unwrap().extension[0];
        let detail = insight.child(INSIGHT_DETAIL_URL).unwrap();
        assert!(detail.child(INSIGHT_EVALUATED_OUTPUT_URL).is_some());
    }
}
