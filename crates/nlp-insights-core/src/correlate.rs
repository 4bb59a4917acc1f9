//! Attribute to source annotation correlation.
//!
//! An attribute names the annotation it was built from by uid. A miss is not an
//! error; callers skip the attribute.

use nlp_insights_nlp::{
    Annotated, AttributeValueAnnotation, Concept, ContainerAnnotation, MedicationAnnotation,
};
use tracing::debug;

/// First candidate whose uid equals the attribute's referenced uid.
pub fn find_source<'a, T: Annotated>(
    attr: &AttributeValueAnnotation,
    candidates: &'a [T],
) -> Option<&'a T> {
    let uid = attr.source_uid()?;
    candidates.iter().find(|c| c.uid() == Some(uid))
}

/// Concept behind a condition-like attribute: `concepts` first, then
/// `SymptomDiseaseInd`.
pub fn source_concept<'a>(
    attr: &AttributeValueAnnotation,
    container: &'a ContainerAnnotation,
) -> Option<&'a Concept> {
    let found = find_source(attr, &container.concepts)
        .or_else(|| find_source(attr, &container.symptom_disease_ind));
    if found.is_none() {
        debug!(attribute = %attr.name, uid = ?attr.source_uid(), "no source concept for attribute");
    }
    found
}

/// Medication annotation behind a medication attribute.
pub fn source_medication<'a>(
    attr: &AttributeValueAnnotation,
    container: &'a ContainerAnnotation,
) -> Option<&'a MedicationAnnotation> {
    let found = find_source(attr, &container.medication_ind);
    if found.is_none() {
        debug!(attribute = %attr.name, uid = ?attr.source_uid(), "no medication annotation for attribute");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlp_insights_nlp::{ConceptRef, Uid};

    fn attr(uid: Option<Uid>) -> AttributeValueAnnotation {
        AttributeValueAnnotation {
            name: "CDP-Condition".into(),
            concept: Some(ConceptRef { uid }),
            ..Default::default()
        }
    }

    fn concept(uid: Uid, cui: &str) -> Concept {
        Concept {
            uid: Some(uid),
            cui: Some(cui.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_match_wins() {
        let candidates = vec![
            concept(Uid::Number(1), "C1"),
            concept(Uid::Number(2), "C2"),
            concept(Uid::Number(2), "C3"),
        ];
        let found = find_source(&attr(Some(Uid::Number(2))), &candidates).unwrap();
        assert_eq!(found.cui.as_deref(), Some("C2"));
    }

    #[test]
    fn test_miss_and_missing_uid() {
        let candidates = vec![concept(Uid::Number(1), "C1")];
        assert!(find_source(&attr(Some(Uid::Number(9))), &candidates).is_none());
        assert!(find_source(&attr(None), &candidates).is_none());
        assert!(find_source(&attr(Some(Uid::Text("1".into()))), &candidates).is_none());
    }

    #[test]
    fn test_symptom_disease_fallback() {
        let container = ContainerAnnotation {
            concepts: vec![concept(Uid::Number(1), "C1")],
            symptom_disease_ind: vec![concept(Uid::Number(5), "C5")],
            ..Default::default()
        };
        let found = source_concept(&attr(Some(Uid::Number(5))), &container).unwrap();
        assert_eq!(found.cui.as_deref(), Some("C5"));
    }
}
