//! Point reference binding with a per-instance cache

use crate::core::error::{CollaboratorError, Result};
use crate::core::types::ObjectHandle;
use crate::hashtbl::{HashTable, KeyKind};

/// Turns point references into runtime object handles
pub trait ReferenceBinder {
    /// Bind a fully qualified reference name
    fn bind_reference(&self, qualified_name: &str) -> std::result::Result<ObjectHandle, CollaboratorError>;

    /// Bind a numeric object identifier
    fn bind_object_id(&self, object_id: u32) -> std::result::Result<ObjectHandle, CollaboratorError>;
}

/// Fully qualified reference -> bound handle, kept for the model's lifetime
pub struct ReferenceCache {
    entries: HashTable<ObjectHandle>,
}

impl ReferenceCache {
    pub fn new(bucket_count: usize) -> Result<Self> {
        Ok(Self {
            entries: HashTable::create(bucket_count, KeyKind::ByteString)?,
        })
    }

    /// Join a base reference and a document reference.
    ///
    /// The first character of `relative` is a path marker and is dropped.
    pub fn qualify(base_reference: &str, relative: &str) -> String {
        let mut chars = relative.chars();
        chars.next();
        let mut qualified = String::with_capacity(base_reference.len() + relative.len());
        qualified.push_str(base_reference);
        qualified.push_str(chars.as_str());
        qualified
    }

    /// Resolve through the cache, binding and caching on a miss.
    ///
    /// A binder failure yields [`ObjectHandle::UNRESOLVED`] and is not
    /// cached, so a later call retries.
    pub fn resolve(
        &mut self,
        base_reference: &str,
        relative: &str,
        binder: &dyn ReferenceBinder,
    ) -> ObjectHandle {
        let qualified = Self::qualify(base_reference, relative);
        if let Some(&handle) = self.entries.get(qualified.as_str()) {
            tracing::trace!("reference cache hit: {}", qualified);
            return handle;
        }

        match binder.bind_reference(&qualified) {
            Ok(handle) => {
                if let Err(e) = self.entries.insert(qualified.as_str(), handle) {
                    tracing::warn!("could not cache reference '{}': {}", qualified, e);
                }
                handle
            }
            Err(e) => {
                tracing::warn!("reference '{}' did not bind: {}", qualified, e);
                ObjectHandle::UNRESOLVED
            }
        }
    }

    pub fn get(&self, qualified_name: &str) -> Option<ObjectHandle> {
        self.entries.get(qualified_name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bind a numeric object id; not cached
pub(crate) fn bind_object_id(object_id: u32, binder: &dyn ReferenceBinder) -> ObjectHandle {
    binder.bind_object_id(object_id).unwrap_or_else(|e| {
        tracing::warn!("object id {} did not bind: {}", object_id, e);
        ObjectHandle::UNRESOLVED
    })
}
