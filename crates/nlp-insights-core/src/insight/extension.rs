//! Builders for the insight extension tree.
//!
//! Every builder returns a finished [`Extension`]; nothing is mutated until
//! [`attach_insight`] appends the assembled insight to a resource.
//!
//! ```text
//! meta.extension[]
//!   insight
//!     insight-id            valueIdentifier {system, value}
//!     insight-detail
//!       evaluated-output    valueAttachment {url}     (optional)
//!       reference           valueReference            (unstructured source)
//!       insight-result
//!         span
//!           covered-text, offset-begin, offset-end, insight-confidence*
//!       reference-path      valueString               (structured source)
//! ```

use super::constants::*;
use super::{Confidence, TextSpan};
use crate::models::{
    Attachment, CodeableConcept, Coding, DomainResource, Extension, Identifier, Meta, Reference,
};

pub fn build_span(span: &TextSpan) -> Extension {
    Extension::complex(
        INSIGHT_SPAN_URL,
        vec![
            Extension::string(INSIGHT_SPAN_COVERED_TEXT_URL, span.covered_text()),
            Extension::integer(INSIGHT_SPAN_OFFSET_BEGIN_URL, span.begin().into()),
            Extension::integer(INSIGHT_SPAN_OFFSET_END_URL, span.end().into()),
        ],
    )
}

pub fn build_confidence(confidence: &Confidence) -> Extension {
    Extension::complex(
        INSIGHT_CONFIDENCE_URL,
        vec![
            Extension::string(INSIGHT_CONFIDENCE_NAME_URL, confidence.name.as_str()),
            Extension::decimal(INSIGHT_CONFIDENCE_SCORE_URL, confidence.score),
        ],
    )
}

/// Pointer to the complete NLP output the insight was taken from.
pub fn build_evaluated_output(uri: &str) -> Extension {
    Extension {
        url: INSIGHT_EVALUATED_OUTPUT_URL.to_string(),
        value_attachment: Some(Attachment {
            url: Some(uri.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Detail for an insight found in unstructured text of `source_reference`.
pub fn build_unstructured_detail(
    source_reference: &str,
    span: &TextSpan,
    confidences: &[Confidence],
    nlp_output_uri: Option<&str>,
) -> Extension {
    let mut span_ext = build_span(span);
    span_ext
        .extension
        .extend(confidences.iter().map(build_confidence));

    let mut children = Vec::with_capacity(3);
    if let Some(uri) = nlp_output_uri {
        children.push(build_evaluated_output(uri));
    }
    children.push(Extension {
        url: INSIGHT_REFERENCE_URL.to_string(),
        value_reference: Some(Reference::to(source_reference)),
        ..Default::default()
    });
    children.push(Extension::complex(INSIGHT_RESULT_URL, vec![span_ext]));

    Extension::complex(INSIGHT_DETAIL_URL, children)
}

/// Detail for an insight found in an element of the same resource.
pub fn build_structured_detail(reference_path: &str, nlp_output_uri: Option<&str>) -> Extension {
    let mut children = Vec::with_capacity(2);
    if let Some(uri) = nlp_output_uri {
        children.push(build_evaluated_output(uri));
    }
    children.push(Extension::string(INSIGHT_REFERENCE_PATH_URL, reference_path));

    Extension::complex(INSIGHT_DETAIL_URL, children)
}

pub fn build_insight_id(insight_id: &str, nlp_system: &str) -> Extension {
    Extension {
        url: INSIGHT_ID_URL.to_string(),
        value_identifier: Some(Identifier {
            system: Some(nlp_system.to_string()),
            value: Some(insight_id.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Append an insight to `meta.extension`, creating `meta` if needed.
pub fn attach_insight(resource: &mut dyn DomainResource, insight_id: Extension, detail: Extension) {
    let insight = Extension::complex(INSIGHT_URL, vec![insight_id, detail]);
    resource
        .meta_mut()
        .get_or_insert_with(Meta::default)
        .extension
        .push(insight);
}

/// The category extension marking an element as derived by NLP.
pub fn derived_by_nlp_extension() -> Extension {
    Extension {
        url: INSIGHT_CATEGORY_URL.to_string(),
        value_codeable_concept: Some(CodeableConcept {
            coding: vec![Coding::new(
                CLASSIFICATION_DERIVED_SYSTEM,
                CLASSIFICATION_DERIVED_CODE,
                Some(CLASSIFICATION_DERIVED_DISPLAY),
            )],
            text: Some(CLASSIFICATION_DERIVED_DISPLAY.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// True when `extensions` carries the derived-by-NLP classification.
pub fn has_derived_by_nlp(extensions: &[Extension]) -> bool {
    extensions
        .iter()
        .filter(|ext| ext.url == INSIGHT_CATEGORY_URL)
        .filter_map(|ext| ext.value_codeable_concept.as_ref())
        .flat_map(|cc| cc.coding.iter())
        .any(|c| c.matches(CLASSIFICATION_DERIVED_SYSTEM, CLASSIFICATION_DERIVED_CODE))
}

/// Tag a resource as derived by NLP. A resource already tagged is left alone.
pub fn append_derived_by_nlp_extension(resource: &mut dyn DomainResource) {
    let extensions = resource.extension_mut();
    if !has_derived_by_nlp(extensions) {
        extensions.push(derived_by_nlp_extension());
    }
}
