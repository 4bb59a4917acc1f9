//! Resource derivation from unstructured text.
//!
//! Every mention of a concept becomes one insight; mentions sharing a UMLS CUI are
//! folded into one derived resource. Per CUI the state moves
//! unseen → tracked → tracked with N insights → finalized (derived tag added).

mod condition;
mod medication;

pub use condition::*;
pub use medication::*;

use std::collections::HashMap;

use nlp_insights_nlp::{AttributeValueAnnotation, InsightModelData};
use tracing::warn;

use crate::insight::constants::*;
use crate::insight::{append_derived_by_nlp_extension, Confidence, InsightIdMaker, TextSpan};
use crate::models::DomainResource;

/// A derived resource and the id maker for its insights.
#[derive(Debug)]
pub struct TrackerEntry<R> {
    pub resource: R,
    pub ids: InsightIdMaker,
}

/// Derived resources keyed by CUI, kept in first-seen order.
#[derive(Debug)]
pub struct CuiTracker<R> {
    entries: Vec<TrackerEntry<R>>,
    index: HashMap<String, usize>,
    insight_id_start: u32,
}

impl<R: DomainResource> CuiTracker<R> {
    pub fn new(insight_id_start: u32) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            insight_id_start,
        }
    }

    /// The entry for `cui`, creating its skeleton with `create` on first sight.
    pub fn track(&mut self, cui: &str, create: impl FnOnce() -> R) -> &mut TrackerEntry<R> {
        let idx = match self.index.get(cui) {
            Some(&idx) => idx,
            None => {
                self.entries.push(TrackerEntry {
                    resource: create(),
                    ids: InsightIdMaker::new(self.insight_id_start),
                });
                let idx = self.entries.len() - 1;
                self.index.insert(cui.to_string(), idx);
                idx
            }
        };
        &mut self.entries[idx]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tag every resource as derived and hand them back in first-seen order.
    pub fn finish(self) -> Vec<R> {
        self.entries
            .into_iter()
            .map(|mut entry| {
                append_derived_by_nlp_extension(&mut entry.resource);
                entry.resource
            })
            .collect()
    }
}

/// Span of an attribute. Inverted offsets are logged and yield `None`.
pub(crate) fn attribute_span(attr: &AttributeValueAnnotation) -> Option<TextSpan> {
    match TextSpan::new(attr.begin, attr.end, attr.covered_text.as_str()) {
        Ok(span) => Some(span),
        Err(e) => {
            warn!(attribute = %attr.name, error = %e, "skipping attribute with invalid span");
            None
        }
    }
}

/// Diagnosis confidences present in the model data, in a fixed order.
pub fn diagnosis_confidences(data: Option<&InsightModelData>) -> Vec<Confidence> {
    let Some(diagnosis) = data.and_then(|d| d.diagnosis.as_ref()) else {
        return Vec::new();
    };
    let usage = diagnosis.usage.as_ref();

    [
        (CONFIDENCE_SCORE_EXPLICIT, usage.and_then(|u| u.explicit_score)),
        (
            CONFIDENCE_SCORE_PATIENT_REPORTED,
            usage.and_then(|u| u.patient_reported_score),
        ),
        (CONFIDENCE_SCORE_DISCUSSED, usage.and_then(|u| u.discussed_score)),
        (CONFIDENCE_SCORE_FAMILY_HISTORY, diagnosis.family_history_score),
        (CONFIDENCE_SCORE_SUSPECTED, diagnosis.suspected_score),
    ]
    .into_iter()
    .filter_map(|(name, score)| score.map(|s| Confidence::new(name, s)))
    .collect()
}

/// Medication usage confidences present in the model data, in a fixed order.
pub fn medication_confidences(data: Option<&InsightModelData>) -> Vec<Confidence> {
    let Some(usage) = data
        .and_then(|d| d.medication.as_ref())
        .and_then(|m| m.usage.as_ref())
    else {
        return Vec::new();
    };

    [
        (CONFIDENCE_SCORE_MEDICATION_TAKEN, usage.taken_score),
        (CONFIDENCE_SCORE_MEDICATION_CONSIDERING, usage.considering_score),
        (CONFIDENCE_SCORE_MEDICATION_DISCUSSED, usage.discussed_score),
        (CONFIDENCE_SCORE_MEDICATION_MEASUREMENT, usage.lab_measurement_score),
    ]
    .into_iter()
    .filter_map(|(name, score)| score.map(|s| Confidence::new(name, s)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Condition;
    use nlp_insights_nlp::{DiagnosisModel, DiagnosisUsage, MedicationModel, MedicationUsage};

    #[test]
    fn test_tracker_keeps_first_seen_order() {
        let mut tracker: CuiTracker<Condition> = CuiTracker::new(1);

        assert_eq!(tracker.track("C2", Condition::new).ids.next_id().unwrap(), "insight-1");
        assert_eq!(tracker.track("C1", Condition::new).ids.next_id().unwrap(), "insight-1");
        assert_eq!(tracker.track("C2", Condition::new).ids.next_id().unwrap(), "insight-2");
        assert_eq!(tracker.len(), 2);

        tracker.track("C2", Condition::new).resource.id = Some("first".into());
        let resources = tracker.finish();
        assert_eq!(resources[0].id.as_deref(), Some("first"));
        assert!(resources.iter().all(|r| r.extension.len() == 1));
    }

    #[test]
    fn test_diagnosis_confidences() {
        let data = InsightModelData {
            diagnosis: Some(DiagnosisModel {
                usage: Some(DiagnosisUsage {
                    explicit_score: Some(0.9),
                    discussed_score: Some(0.1),
                    ..Default::default()
                }),
                suspected_score: Some(0.05),
                family_history_score: None,
            }),
            medication: None,
        };

        let names: Vec<_> = diagnosis_confidences(Some(&data))
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, [CONFIDENCE_SCORE_EXPLICIT, CONFIDENCE_SCORE_DISCUSSED, CONFIDENCE_SCORE_SUSPECTED]);
        assert!(diagnosis_confidences(None).is_empty());
    }

    #[test]
    fn test_medication_confidences() {
        let data = InsightModelData {
            diagnosis: None,
            medication: Some(MedicationModel {
                usage: Some(MedicationUsage {
                    taken_score: Some(1.0),
                    lab_measurement_score: Some(0.0),
                    ..Default::default()
                }),
            }),
        };

        let confidences = medication_confidences(Some(&data));
        assert_eq!(confidences.len(), 2);
        assert_eq!(confidences[1].name, CONFIDENCE_SCORE_MEDICATION_MEASUREMENT);
        assert_eq!(confidences[1].score, 0.0);
    }

    #[test]
    fn test_attribute_span_rejects_inverted() {
        let attr = AttributeValueAnnotation {
            name: "CDP-Condition".into(),
            begin: 9,
            end: 3,
            ..Default::default()
        };
        assert!(attribute_span(&attr).is_none());
    }
}
