use nlp_insights_nlp::{
    parse_container, Concept, DictionaryAnnotator, DictionaryEntry, NlpService,
    PrecomputedNlpService,
};
use proptest::prelude::*;

fn annotator() -> DictionaryAnnotator {
    DictionaryAnnotator::new(
        "dictionary",
        vec![DictionaryEntry {
            term: "asthma".into(),
            attribute: "CDP-Condition".into(),
            concept: Concept {
                cui: Some("C0004096".into()),
                preferred_name: Some("Asthma".into()),
                ..Default::default()
            },
        }],
    )
}

proptest! {
    #[test]
    fn prop_spans_cover_the_matched_term(
        parts in prop::collection::vec("[a-zéü° ]{0,12}", 1..6),
        upper in any::<bool>(),
    ) {
        let term = if upper { "ASTHMA" } else { "asthma" };
        let text = parts.join(term);

        let container = annotator().annotate(&text);
        let expected = text.to_ascii_lowercase().matches("asthma").count();

        prop_assert_eq!(container.attribute_values.len(), expected);
        for attr in &container.attribute_values {
            let covered: String = text
                .chars()
                .skip(attr.begin as usize)
                .take((attr.end - attr.begin) as usize)
                .collect();
            prop_assert_eq!(covered.as_str(), attr.covered_text.as_str());
            prop_assert!(covered.eq_ignore_ascii_case("asthma"));
        }
        prop_assert_eq!(container.concepts.len(), usize::from(expected > 0));
    }
}

#[test]
fn test_spans_count_characters_not_bytes() {
    let container = annotator().annotate("Café: asthma, naïve ASTHMA");

    let spans: Vec<_> = container
        .attribute_values
        .iter()
        .map(|a| (a.begin, a.end, a.covered_text.as_str()))
        .collect();
    assert_eq!(spans, [(6, 12, "asthma"), (20, 26, "ASTHMA")]);
}

#[test]
fn test_precomputed_service_tolerates_wrapped_output() {
    let raw = r#"response follows: {"attributeValues": [{"name": "CDP-Condition", "begin": 0, "end": 6,
        "coveredText": "asthma", "concept": {"uid": "a1"}}],
        "concepts": [{"uid": "a1", "cui": "C0004096"}]} -- end"#;

    let service = PrecomputedNlpService::from_json("acd", raw).unwrap();
    let container = service.analyze("ignored").unwrap();
    assert_eq!(container, parse_container(raw).unwrap());
    assert_eq!(container.attribute_values.len(), 1);
    assert_eq!(container.concepts[0].cui.as_deref(), Some("C0004096"));
}

#[test]
fn test_quickumls_list_becomes_container() {
    let raw = r#"[
        {"cui": "C0004096", "ngram": "asthma", "start": 4, "end": 10, "term": "asthma",
         "semtypes": ["T047"], "snomed_ct": "195967001"},
        {"cui": "C0025598", "ngram": "metformin", "start": 20, "end": 29, "term": "metformin",
         "semtypes": ["T121"]}
    ]"#;

    let container = PrecomputedNlpService::from_json("quickumls", raw)
        .unwrap()
        .analyze("ignored")
        .unwrap();

    let names: Vec<_> = container
        .attribute_values
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(names, ["CDP-Condition", "CDP-Medication"]);
    assert_eq!(container.concepts.len(), 1);
    assert_eq!(container.medication_ind.len(), 1);
}
