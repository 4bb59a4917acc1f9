//! Unstructured text carried by a resource.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::warn;

use crate::models::{Attachment, DomainResource, Reference, Resource};

/// Text to run NLP over, with enough context to build provenance for anything
/// derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnstructuredText {
    /// `Type/id` of the resource holding the text.
    pub source_reference: String,
    /// Subject of the holding resource, copied to derived resources.
    pub subject: Option<Reference>,
    /// FHIR path of the attachment data element.
    pub fhir_path: String,
    pub text: String,
}

fn decode(attachment: &Attachment, fhir_path: &str) -> Option<String> {
    let data = attachment.data.as_deref()?;
    let bytes = match STANDARD.decode(data.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = fhir_path, error = %e, "attachment data is not valid base64");
            return None;
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(path = fhir_path, error = %e, "attachment data is not UTF-8 text");
            None
        }
    }
}

/// Extract decodable attachment text from `DiagnosticReport.presentedForm` and
/// `DocumentReference.content.attachment`. Other resource types carry none.
pub fn unstructured_text(resource: &Resource) -> Vec<UnstructuredText> {
    let mut texts = Vec::new();

    match resource {
        Resource::DiagnosticReport(report) => {
            let source_reference = report.reference();
            for (idx, attachment) in report.presented_form.iter().enumerate() {
                let fhir_path = format!("DiagnosticReport.presentedForm[{idx}].data");
                if let Some(text) = decode(attachment, &fhir_path) {
                    texts.push(UnstructuredText {
                        source_reference: source_reference.clone(),
                        subject: report.subject.clone(),
                        fhir_path,
                        text,
                    });
                }
            }
        }
        Resource::DocumentReference(document) => {
            let source_reference = document.reference();
            for (idx, content) in document.content.iter().enumerate() {
                let Some(attachment) = &content.attachment else {
                    continue;
                };
                let fhir_path = format!("DocumentReference.content[{idx}].attachment.data");
                if let Some(text) = decode(attachment, &fhir_path) {
                    texts.push(UnstructuredText {
                        source_reference: source_reference.clone(),
                        subject: document.subject.clone(),
                        fhir_path,
                        text,
                    });
                }
            }
        }
        _ => {}
    }

    texts
}
