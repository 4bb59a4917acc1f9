//! Transaction bundle assembly.

use std::fmt;

use crate::models::{Bundle, BundleEntry, BundleEntryRequest, FhirResult, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource and the request that should store it.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleEntryDef {
    pub resource: Resource,
    pub method: HttpMethod,
    pub url: String,
}

impl BundleEntryDef {
    /// `POST {type}` for a new resource.
    pub fn create(resource: Resource) -> Self {
        let url = resource.resource_type().to_string();
        Self {
            resource,
            method: HttpMethod::Post,
            url,
        }
    }

    /// `PUT {type}/{id}` for an updated resource.
    pub fn update(resource: Resource) -> Self {
        let url = match resource.as_domain() {
            Some(domain) => domain.reference(),
            None => resource.resource_type().to_string(),
        };
        Self {
            resource,
            method: HttpMethod::Put,
            url,
        }
    }
}

/// Bundle of type `transaction` with one entry per definition, in order.
pub fn create_transaction_bundle(entries: &[BundleEntryDef]) -> FhirResult<Bundle> {
    let mut bundle = Bundle::new("transaction");
    for def in entries {
        bundle.entry.push(BundleEntry {
            resource: Some(def.resource.to_value()?),
            request: Some(BundleEntryRequest {
                method: def.method.to_string(),
                url: def.url.clone(),
            }),
            ..Default::default()
        });
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, MedicationStatement};

    #[test]
    fn test_transaction_bundle() {
        let mut existing = Condition::new();
        existing.id = Some("c7".into());

        let entries = vec![
            BundleEntryDef::create(MedicationStatement::new().into()),
            BundleEntryDef::update(existing.into()),
        ];
        let bundle = create_transaction_bundle(&entries).unwrap();
        let value = serde_json::to_value(&bundle).unwrap();

        assert_eq!(value["resourceType"], "Bundle");
        assert_eq!(value["type"], "transaction");
        assert_eq!(value["entry"][0]["request"]["method"], "POST");
        assert_eq!(value["entry"][0]["request"]["url"], "MedicationStatement");
        assert_eq!(value["entry"][1]["request"]["method"], "PUT");
        assert_eq!(value["entry"][1]["request"]["url"], "Condition/c7");
        assert_eq!(value["entry"][1]["resource"]["id"], "c7");
    }

    #[test]
    fn test_empty_bundle() {
        let bundle = create_transaction_bundle(&[]).unwrap();
        assert!(bundle.entry.is_empty());
    }
}
