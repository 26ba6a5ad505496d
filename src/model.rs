//! The equipment model: one template database plus one view database

use crate::core::error::Result;
use crate::core::types::TemplateHandle;
use crate::core::ModelConfig;
use crate::source::DocumentSource;
use crate::template::{LoadSummary, TemplateDatabase};
use crate::view::{ReferenceBinder, ViewDatabase};

/// Owns every compiled template and view for one equipment instance.
///
/// Build it once, compile into it, then hand out shared references; nothing
/// in a compiled model is mutated by reads.
pub struct EquipmentModel {
    config: ModelConfig,
    templates: TemplateDatabase,
    views: ViewDatabase,
}

// Compiled models are handed to readers on other threads
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TemplateDatabase>();
    assert_send_sync::<ViewDatabase>();
    assert_send_sync::<EquipmentModel>();
};

impl EquipmentModel {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let templates = TemplateDatabase::new(&config)?;
        let views = ViewDatabase::new(&config)?;
        Ok(Self {
            config,
            templates,
            views,
        })
    }

    /// Compile every template the source provides
    pub fn boot(&mut self, source: &dyn DocumentSource) -> Result<LoadSummary> {
        let document = source.template_document()?;
        let summary = self.templates.load_document(&document);
        tracing::info!(
            "model booted with {} templates (version {})",
            summary.compiled,
            self.templates.version().unwrap_or("unknown")
        );
        Ok(summary)
    }

    /// Compile a single named template on first use
    pub fn initialize_template(
        &mut self,
        source: &dyn DocumentSource,
        name: &str,
    ) -> Result<TemplateHandle> {
        if let Ok(handle) = self.templates.lookup_by_name(name) {
            return Ok(handle);
        }
        let document = source.template_document()?;
        self.templates.initialize_template(name, &document)
    }

    /// Compile this instance's views; a no-op once views exist
    pub fn initialize_view(
        &mut self,
        source: &dyn DocumentSource,
        base_reference: &str,
        binder: &dyn ReferenceBinder,
    ) -> Result<u16> {
        if self.views.view_count() > 0 {
            tracing::debug!("views for '{}' already compiled", base_reference);
            return Ok(0);
        }
        let document = source.view_document()?;
        self.views.compile_document(&document, base_reference, binder)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn templates(&self) -> &TemplateDatabase {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateDatabase {
        &mut self.templates
    }

    pub fn views(&self) -> &ViewDatabase {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut ViewDatabase {
        &mut self.views
    }
}
