//! Typed resource traits and the loosely-typed object the store speaks.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::meta::{GroupVersionResource, ObjectKey, ObjectMeta, API_VERSION};
use crate::errors::FreightlineError;

/// A strongly-typed resource kind.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind name, e.g. `Stage`.
    const KIND: &'static str;
    /// Plural collection name, e.g. `stages`.
    const PLURAL: &'static str;
    /// Whether objects of this kind live inside a namespace.
    const NAMESPACED: bool = true;

    /// Returns the object metadata.
    fn metadata(&self) -> &ObjectMeta;

    /// Returns the object metadata mutably.
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Returns the GVR used for authorization checks.
    fn gvr() -> GroupVersionResource {
        GroupVersionResource::freightline(Self::PLURAL)
    }

    /// Returns the object name.
    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Returns the object namespace.
    fn namespace(&self) -> &str {
        &self.metadata().namespace
    }

    /// Returns the object key.
    fn key(&self) -> ObjectKey {
        self.metadata().key()
    }
}

/// A resource with a status sub-object that can be patched on its own.
pub trait HasStatus: Resource {
    /// The status type.
    type Status: Serialize + DeserializeOwned + Clone + Default + Send + Sync;

    /// Returns the status.
    fn status(&self) -> &Self::Status;

    /// Returns the status mutably.
    fn status_mut(&mut self) -> &mut Self::Status;
}

/// A loosely-typed object as stored, watched and parsed from manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicObject {
    /// `apiVersion` of the object.
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    /// Kind of the object.
    pub kind: String,
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Every other top-level field (`spec`, `status`, ...).
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl DynamicObject {
    /// Creates an empty object of the given type.
    #[must_use]
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, metadata: ObjectMeta) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            metadata,
            data: serde_json::Map::new(),
        }
    }

    /// Builds a dynamic object from a typed resource.
    pub fn from_typed<T: Resource>(obj: &T) -> Result<Self, FreightlineError> {
        let mut value = serde_json::to_value(obj).map_err(|e| conversion_error(T::KIND, &e))?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("apiVersion".into(), API_VERSION.into());
            map.insert("kind".into(), T::KIND.into());
        }
        serde_json::from_value(value).map_err(|e| conversion_error(T::KIND, &e))
    }

    /// Builds a dynamic object from arbitrary JSON, requiring `apiVersion` and `kind`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, String> {
        let obj: Self = serde_json::from_value(value).map_err(|e| e.to_string())?;
        if obj.kind.is_empty() {
            return Err("Object 'Kind' is missing".to_string());
        }
        if obj.api_version.is_empty() {
            return Err("Object 'apiVersion' is missing".to_string());
        }
        Ok(obj)
    }

    /// Converts to the typed form.
    ///
    /// Fails if the kind does not match or the payload does not fit the schema.
    pub fn try_parse<T: Resource>(&self) -> Result<T, FreightlineError> {
        if self.kind != T::KIND {
            return Err(FreightlineError::Conversion {
                kind: T::KIND.to_string(),
                message: format!("unexpected object kind {:?}", self.kind),
            });
        }
        let value = serde_json::to_value(self).map_err(|e| conversion_error(T::KIND, &e))?;
        serde_json::from_value(value).map_err(|e| conversion_error(T::KIND, &e))
    }

    /// Returns true if this object is of the given group/version and kind.
    #[must_use]
    pub fn is_a(&self, api_version: &str, kind: &str) -> bool {
        self.api_version == api_version && self.kind == kind
    }

    /// Returns the object key.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Returns the GVR used for authorization checks, pluralising the kind.
    #[must_use]
    pub fn gvr(&self) -> GroupVersionResource {
        GroupVersionResource::freightline(format!("{}s", self.kind.to_lowercase()))
    }

    /// Returns a top-level field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.get(name)
    }
}

fn conversion_error(kind: &str, err: &serde_json::Error) -> FreightlineError {
    FreightlineError::Conversion {
        kind: kind.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Freight, Stage};
    use crate::errors::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_from_typed_sets_type_meta() {
        let stage = Stage::new("proj", "dev").with_upstream("test");
        let obj = DynamicObject::from_typed(&stage).unwrap();

        assert_eq!(obj.api_version, API_VERSION);
        assert_eq!(obj.kind, "Stage");
        assert_eq!(obj.key(), ObjectKey::new("proj", "dev"));
        assert!(obj.field("spec").is_some());

        let back: Stage = obj.try_parse().unwrap();
        assert_eq!(back, stage);
    }

    #[test]
    fn test_dynamic_gvr_matches_typed_plural() {
        let promotion = crate::core::Promotion::for_stage(&Stage::new("proj", "uat"), "abc", 10);
        for (obj, plural) in [
            (DynamicObject::from_typed(&Stage::new("proj", "dev")).unwrap(), Stage::PLURAL),
            (DynamicObject::from_typed(&Freight::new("proj", "f")).unwrap(), Freight::PLURAL),
            (DynamicObject::from_typed(&promotion).unwrap(), crate::core::Promotion::PLURAL),
        ] {
            assert_eq!(obj.gvr().resource, plural);
        }
    }

    #[test]
    fn test_try_parse_rejects_wrong_kind() {
        let obj = DynamicObject::from_typed(&Stage::new("proj", "dev")).unwrap();
        let err = obj.try_parse::<Freight>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
        assert!(err.to_string().contains("unexpected object kind"));
    }

    #[test]
    fn test_try_parse_rejects_schema_mismatch() {
        let obj = DynamicObject::from_value(json!({
            "apiVersion": API_VERSION,
            "kind": "Stage",
            "metadata": {"name": "dev", "namespace": "proj"},
            "spec": {"subscriptions": "not-an-object"}
        }))
        .unwrap();
        assert!(matches!(
            obj.try_parse::<Stage>(),
            Err(FreightlineError::Conversion { .. })
        ));
    }

    #[test]
    fn test_from_value_requires_kind() {
        let err = DynamicObject::from_value(json!({
            "apiVersion": API_VERSION,
            "kind": "",
            "metadata": {"name": "x"}
        }))
        .unwrap_err();
        assert!(err.contains("Kind"));
    }
}
