//! Typed helpers over the loosely-typed store.

use crate::core::{DynamicObject, HasStatus, ObjectKey, Resource};
use crate::errors::{FreightlineError, Result};

use super::ResourceStore;

/// Fetches a typed object. A missing object is `Ok(None)`.
pub async fn get_object<T: Resource>(
    store: &dyn ResourceStore,
    key: &ObjectKey,
) -> Result<Option<T>> {
    match store.get(T::KIND, key).await {
        Ok(obj) => obj.try_parse().map(Some),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(FreightlineError::store(
            format!("get {}", T::KIND.to_lowercase()),
            e,
        )),
    }
}

/// Lists typed objects in a namespace.
pub async fn list_objects<T: Resource>(
    store: &dyn ResourceStore,
    namespace: &str,
) -> Result<Vec<T>> {
    store
        .list(T::KIND, namespace)
        .await
        .map_err(|e| FreightlineError::store(format!("list {}", T::PLURAL), e))?
        .iter()
        .map(DynamicObject::try_parse::<T>)
        .collect()
}

/// Creates a typed object and returns the stored form.
pub async fn create_object<T: Resource>(store: &dyn ResourceStore, obj: &T) -> Result<T> {
    let created = store
        .create(DynamicObject::from_typed(obj)?)
        .await
        .map_err(|e| FreightlineError::store(format!("create {}", T::KIND.to_lowercase()), e))?;
    created.try_parse()
}

/// Applies `mutate` to a copy of the object's status and writes only the
/// status back, guarded by the object's current resource version.
pub async fn patch_status<T, F>(store: &dyn ResourceStore, obj: &T, mutate: F) -> Result<T>
where
    T: HasStatus,
    F: FnOnce(&mut T::Status),
{
    let mut status = obj.status().clone();
    mutate(&mut status);
    let value = serde_json::to_value(&status).map_err(|e| FreightlineError::Conversion {
        kind: T::KIND.to_string(),
        message: e.to_string(),
    })?;

    let key = obj.key();
    let patched = store
        .patch_status(
            T::KIND,
            &key,
            obj.metadata().resource_version.as_deref(),
            value,
        )
        .await
        .map_err(|e| {
            FreightlineError::store(
                format!(
                    "error patching {} {:?} status in namespace {:?}",
                    T::KIND,
                    key.name,
                    key.namespace
                ),
                e,
            )
        })?;
    patched.try_parse()
}
