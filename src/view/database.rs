//! Per-instance view registry

use serde_json::Value;

use crate::core::error::{Entity, ModelError, Result};
use crate::core::json::str_field;
use crate::core::types::{GroupHandle, ObjectHandle, ViewId};
use crate::core::ModelConfig;
use crate::hashtbl::{HashTable, KeyKind};

use super::compile::ViewCompiler;
use super::resolve::{ReferenceBinder, ReferenceCache};
use super::tree::{Group, ViewTree};

pub struct ViewDatabase {
    views: HashTable<ViewTree>,
    references: ReferenceCache,
    /// Set once a whole document compiled; guards against recompiling
    view_count: u16,
    base_reference: String,
    version: Option<String>,
    config: ModelConfig,
}

impl ViewDatabase {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            views: HashTable::create(config.view_buckets, KeyKind::Integer)?,
            references: ReferenceCache::new(config.reference_cache_buckets)?,
            view_count: 0,
            base_reference: String::new(),
            version: None,
            config: config.clone(),
        })
    }

    /// Compile every view of a `{ "Version", "views": [...] }` document.
    ///
    /// Returns the number of views compiled, or 0 if this database already
    /// holds a compiled document. On failure, views compiled before the
    /// failing one stay registered but the view count is left at zero; the
    /// next call discards them and compiles the whole document again.
    pub fn compile_document(
        &mut self,
        document: &Value,
        base_reference: &str,
        binder: &dyn ReferenceBinder,
    ) -> Result<u16> {
        if self.view_count > 0 {
            tracing::debug!("views already compiled, skipping");
            return Ok(0);
        }

        if !self.views.is_empty() {
            tracing::debug!(
                "discarding {} views left by a failed compile of '{}'",
                self.views.len(),
                self.base_reference
            );
            self.views = HashTable::create(self.config.view_buckets, KeyKind::Integer)?;
        }

        if let Some(version) = str_field(document, "Version") {
            self.version = Some(version.to_string());
        }
        self.base_reference = base_reference.to_string();

        let Some(views) = document.get("views").and_then(Value::as_array) else {
            tracing::debug!("view document has no 'views' array");
            return Ok(0);
        };

        for (index, view) in views.iter().enumerate() {
            let compiler = ViewCompiler::new(
                self.config.root_group_handle,
                self.config.group_buckets,
                &self.base_reference,
                &mut self.references,
                binder,
            )?
            .with_max_depth(self.config.max_view_depth);
            let tree = compiler.compile(view, document).map_err(|e| {
                tracing::warn!("view {} of '{}' failed to compile: {}", index, base_reference, e);
                e
            })?;
            let view_id = tree.view_id;
            self.views.insert(&view_id.0, tree)?;
        }

        self.view_count = u16::try_from(views.len())
            .map_err(|_| ModelError::Parse(format!("{} views in one document", views.len())))?;
        tracing::info!("compiled {} views for '{}'", self.view_count, base_reference);
        Ok(self.view_count)
    }

    pub fn view(&self, view_id: ViewId) -> Result<&ViewTree> {
        if self.views.is_empty() {
            return Err(ModelError::NotFound(Entity::ViewDatabase));
        }
        self.views
            .get(&view_id.0)
            .ok_or(ModelError::NotFound(Entity::View(view_id)))
    }

    pub fn group(&self, view_id: ViewId, handle: GroupHandle) -> Result<&Group> {
        self.view(view_id)?
            .group(handle)
            .ok_or(ModelError::NotFound(Entity::Group(view_id, handle)))
    }

    /// The group registered under the root handle
    pub fn root_group(&self, view_id: ViewId) -> Result<&Group> {
        self.group(view_id, GroupHandle(self.config.root_group_handle))
    }

    /// `(view id, internal)` for every registered view, in table order
    pub fn top_level_views(&self) -> Vec<(ViewId, bool)> {
        self.views
            .values()
            .map(|tree| (tree.view_id, tree.internal))
            .collect()
    }

    /// Resolve a document-relative reference against this instance's base
    pub fn resolve_reference(&mut self, relative: &str, binder: &dyn ReferenceBinder) -> ObjectHandle {
        self.references.resolve(&self.base_reference, relative, binder)
    }

    pub fn reference_cache_len(&self) -> usize {
        self.references.len()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn view_count(&self) -> u16 {
        self.view_count
    }
}
