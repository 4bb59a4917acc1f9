//! FHIR resources handled by insight discovery.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::datatypes::{Attachment, CodeableConcept, Dosage, Extension, Meta, Reference};

/// Resource parsing errors. All of them are client errors.
#[derive(Error, Debug)]
pub enum FhirError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Resource has no resourceType")]
    MissingResourceType,

    #[error("Unsupported resource type: {0}")]
    UnsupportedResourceType(String),

    #[error("Invalid {resource_type}: {detail}")]
    InvalidResource {
        resource_type: String,
        detail: String,
    },
}

pub type FhirResult<T> = Result<T, FhirError>;

/// Shared behaviour of resources that carry `meta` and `extension`.
pub trait DomainResource {
    fn resource_type(&self) -> &str;

    fn id(&self) -> Option<&str>;

    fn meta_mut(&mut self) -> &mut Option<Meta>;

    fn extension_mut(&mut self) -> &mut Vec<Extension>;

    /// Literal reference to this resource, `Type/_unknown_` when it has no id.
    fn reference(&self) -> String {
        format!("{}/{}", self.resource_type(), self.id().unwrap_or("_unknown_"))
    }
}

macro_rules! domain_resource {
    ($($ty:ident),* $(,)?) => {
        $(
            impl $ty {
                pub fn new() -> Self {
                    Self {
                        resource_type: stringify!($ty).to_string(),
                        ..Default::default()
                    }
                }
            }

            impl DomainResource for $ty {
                fn resource_type(&self) -> &str {
                    &self.resource_type
                }

                fn id(&self) -> Option<&str> {
                    self.id.as_deref()
                }

                fn meta_mut(&mut self) -> &mut Option<Meta> {
                    &mut self.meta
                }

                fn extension_mut(&mut self) -> &mut Vec<Extension> {
                    &mut self.extension
                }
            }
        )*
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationStatement {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication_codeable_concept: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage: Vec<Dosage>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyIntolerance {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reaction: Vec<AllergyReaction>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllergyReaction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifestation: Vec<CodeableConcept>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Immunization {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vaccine_code: Option<CodeableConcept>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presented_form: Vec<Attachment>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<DocumentContent>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

domain_resource!(
    AllergyIntolerance,
    Condition,
    DiagnosticReport,
    DocumentReference,
    Immunization,
    MedicationStatement,
);

/// Bundle entries keep their resources as raw JSON; callers parse what they need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Bundle {
    pub fn new(bundle_type: &str) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            bundle_type: Some(bundle_type.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<BundleEntryRequest>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleEntryRequest {
    pub method: String,
    pub url: String,
}

/// Any resource the engine accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    AllergyIntolerance(AllergyIntolerance),
    Bundle(Bundle),
    Condition(Condition),
    DiagnosticReport(DiagnosticReport),
    DocumentReference(DocumentReference),
    Immunization(Immunization),
    MedicationStatement(MedicationStatement),
}

fn typed<T: serde::de::DeserializeOwned>(resource_type: &str, value: Value) -> FhirResult<T> {
    serde_json::from_value(value).map_err(|e| FhirError::InvalidResource {
        resource_type: resource_type.to_string(),
        detail: e.to_string(),
    })
}

impl Resource {
    /// Dispatch on `resourceType`.
    pub fn from_value(value: Value) -> FhirResult<Self> {
        let resource_type = value
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or(FhirError::MissingResourceType)?
            .to_string();

        let resource = match resource_type.as_str() {
            "AllergyIntolerance" => Resource::AllergyIntolerance(typed(&resource_type, value)?),
            "Bundle" => Resource::Bundle(typed(&resource_type, value)?),
            "Condition" => Resource::Condition(typed(&resource_type, value)?),
            "DiagnosticReport" => Resource::DiagnosticReport(typed(&resource_type, value)?),
            "DocumentReference" => Resource::DocumentReference(typed(&resource_type, value)?),
            "Immunization" => Resource::Immunization(typed(&resource_type, value)?),
            "MedicationStatement" => {
                Resource::MedicationStatement(typed(&resource_type, value)?)
            }
            _ => return Err(FhirError::UnsupportedResourceType(resource_type)),
        };

        Ok(resource)
    }

    pub fn from_json(json: &str) -> FhirResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn to_value(&self) -> FhirResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn resource_type(&self) -> &str {
        match self {
            Resource::Bundle(b) => &b.resource_type,
            other => other.as_domain().map(|d| d.resource_type()).unwrap_or_default(),
        }
    }

    pub fn as_domain(&self) -> Option<&dyn DomainResource> {
        match self {
            Resource::AllergyIntolerance(r) => Some(r),
            Resource::Bundle(_) => None,
            Resource::Condition(r) => Some(r),
            Resource::DiagnosticReport(r) => Some(r),
            Resource::DocumentReference(r) => Some(r),
            Resource::Immunization(r) => Some(r),
            Resource::MedicationStatement(r) => Some(r),
        }
    }

    pub fn as_domain_mut(&mut self) -> Option<&mut dyn DomainResource> {
        match self {
            Resource::AllergyIntolerance(r) => Some(r),
            Resource::Bundle(_) => None,
            Resource::Condition(r) => Some(r),
            Resource::DiagnosticReport(r) => Some(r),
            Resource::DocumentReference(r) => Some(r),
            Resource::Immunization(r) => Some(r),
            Resource::MedicationStatement(r) => Some(r),
        }
    }
}

impl From<Condition> for Resource {
    fn from(r: Condition) -> Self {
        Resource::Condition(r)
    }
}

impl From<MedicationStatement> for Resource {
    fn from(r: MedicationStatement) -> Self {
        Resource::MedicationStatement(r)
    }
}
