//! Template registry: name -> handle -> compiled record

use serde_json::Value;
use std::sync::Arc;

use crate::core::error::{Entity, ModelError, Result};
use crate::core::json::str_field;
use crate::core::types::{AttributeId, TemplateHandle};
use crate::core::ModelConfig;
use crate::hashtbl::{HashError, HashTable, KeyKind};

use super::parse::compile_template;
use super::record::{AttributeDescriptor, LiveContext, SubcomponentDescriptor, TemplateRecord};

/// Outcome of a bulk template load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub compiled: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Registry of compiled templates for one model
pub struct TemplateDatabase {
    /// Registration name -> handle
    names: HashTable<TemplateHandle>,
    /// Handle -> compiled record
    records: HashTable<Arc<TemplateRecord>>,
    /// Last handle handed out; advances even when a compile fails
    template_count: u16,
    version: Option<String>,
    config: ModelConfig,
}

impl TemplateDatabase {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            names: HashTable::create(config.template_name_buckets, KeyKind::ByteString)?,
            records: HashTable::create(config.template_record_buckets, KeyKind::Integer)?,
            template_count: 0,
            version: None,
            config: config.clone(),
        })
    }

    /// Register and compile a template, or return the handle it already has.
    ///
    /// A fresh handle is reserved before compiling. If the compile fails the
    /// name is unregistered again but the handle stays consumed.
    pub fn add_template(&mut self, name: &str, json: &Value) -> Result<TemplateHandle> {
        if let Some(&handle) = self.names.get(name) {
            return Ok(handle);
        }

        self.template_count = self.template_count.checked_add(1).ok_or_else(|| {
            HashError::AllocationFailure("template handles exhausted".to_string())
        })?;
        let handle = TemplateHandle(self.template_count);

        self.names.insert(name, handle)?;

        let compiled = compile_template(name, handle, json, &self.config).and_then(|record| {
            self.records
                .insert(&handle.0, Arc::new(record))
                .map_err(ModelError::from)
        });

        if let Err(e) = compiled {
            let _ = self.names.remove(name);
            tracing::warn!("template '{}' failed to compile ({}): {}", name, handle, e);
            return Err(e);
        }

        Ok(handle)
    }

    /// Bulk load every template of a `{ "Version", "Template": [...] }` document.
    ///
    /// Entries are registered under their `-ID`; entries without one are
    /// ignored. A failing template is logged and skipped.
    pub fn load_document(&mut self, document: &Value) -> LoadSummary {
        if let Some(version) = str_field(document, "Version") {
            self.version = Some(version.to_string());
        }
        self.load_entries(document, false)
    }

    /// Compile only the templates of `document` that are not registered yet
    pub fn load_missing(&mut self, document: &Value) -> LoadSummary {
        self.load_entries(document, true)
    }

    fn load_entries(&mut self, document: &Value, skip_known: bool) -> LoadSummary {
        let mut summary = LoadSummary::default();

        let Some(entries) = document.get("Template").and_then(Value::as_array) else {
            tracing::debug!("template document has no 'Template' array");
            return summary;
        };

        for entry in entries {
            let Some(name) = str_field(entry, "-ID") else {
                continue;
            };
            if skip_known && self.names.contains_key(name) {
                summary.skipped += 1;
                continue;
            }
            match self.add_template(name, entry) {
                Ok(_) => summary.compiled += 1,
                Err(_) => summary.failed += 1,
            }
        }

        tracing::info!(
            "template load: {} compiled, {} skipped, {} failed",
            summary.compiled, summary.skipped, summary.failed
        );
        summary
    }

    /// Lazily compile the single template `name` out of `document`
    pub fn initialize_template(&mut self, name: &str, document: &Value) -> Result<TemplateHandle> {
        if let Some(&handle) = self.names.get(name) {
            return Ok(handle);
        }

        let entry = document
            .get("Template")
            .and_then(Value::as_array)
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|entry| str_field(entry, "-ID") == Some(name))
            })
            .ok_or_else(|| ModelError::NotFound(Entity::TemplateName(name.to_string())))?;

        self.add_template(name, entry)
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<TemplateHandle> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::NotFound(Entity::TemplateName(name.to_string())))
    }

    pub fn template(&self, handle: TemplateHandle) -> Result<&TemplateRecord> {
        self.records
            .get(&handle.0)
            .map(Arc::as_ref)
            .ok_or(ModelError::NotFound(Entity::Template(handle)))
    }

    /// Shared handle to a compiled record
    pub fn shared(&self, handle: TemplateHandle) -> Option<Arc<TemplateRecord>> {
        self.records.get(&handle.0).cloned()
    }

    /// Stored descriptor, without any live enrichment
    pub fn attribute(
        &self,
        handle: TemplateHandle,
        attribute: AttributeId,
    ) -> Result<&AttributeDescriptor> {
        self.template(handle)?
            .attribute(attribute)
            .ok_or(ModelError::NotFound(Entity::Attribute(handle, attribute)))
    }

    /// Describe an attribute, re-reading redirected fields from `live` if given.
    ///
    /// Always returns a copy; the compiled record is not touched.
    pub fn read_attribute_info(
        &self,
        handle: TemplateHandle,
        attribute: AttributeId,
        live: Option<&LiveContext<'_>>,
    ) -> Result<AttributeDescriptor> {
        let stored = self.attribute(handle, attribute)?;
        Ok(match live {
            Some(live) if stored.has_redirected_values => stored.with_live_values(live),
            _ => stored.clone(),
        })
    }

    pub fn subcomponent(
        &self,
        handle: TemplateHandle,
        name: &str,
    ) -> Result<&SubcomponentDescriptor> {
        self.template(handle)?
            .subcomponent(name)
            .ok_or_else(|| ModelError::NotFound(Entity::Subcomponent(handle, name.to_string())))
    }

    pub fn attributes(&self, handle: TemplateHandle) -> Result<Vec<&AttributeDescriptor>> {
        Ok(self.template(handle)?.attributes().collect())
    }

    pub fn subcomponents(&self, handle: TemplateHandle) -> Result<Vec<&SubcomponentDescriptor>> {
        Ok(self.template(handle)?.subcomponents().collect())
    }

    /// Registered names with their handles, in name-table order
    pub fn registered(&self) -> impl Iterator<Item = (&str, TemplateHandle)> {
        self.names.iter().map(|(key, handle)| {
            (std::str::from_utf8(key).unwrap_or_default(), *handle)
        })
    }

    /// Number of handles handed out, including ones burnt by failed compiles
    pub fn template_count(&self) -> u16 {
        self.template_count
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}
