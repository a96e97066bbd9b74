//! Search-result Bundles.

use crate::FhirResult;
use serde::Deserialize;
use serde_json::Value;

/// A searchset Bundle; only entry resources are kept.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SearchBundle {
    #[serde(default)]
    pub total: Option<u64>,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BundleEntry {
    #[serde(default)]
    pub resource: Option<Value>,
}

impl SearchBundle {
    pub fn from_slice(body: &[u8]) -> FhirResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// First entry that carries a resource.
    pub fn into_first_resource(self) -> Option<Value> {
        self.entry.into_iter().find_map(|e| e.resource)
    }
}
