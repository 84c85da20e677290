//! Template System - interchangeable CV renderers
//!
//! A template is a presentation-only contract: document in, visual tree out.
//! Unknown template ids resolve to the registry default.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::document::{CvDocument, DEFAULT_TEMPLATE};
use crate::print::PageSpec;
use crate::render::builtin::{ClassicTemplate, CreativeTemplate, MinimalTemplate, ModernTemplate};
use crate::render::Node;
use crate::ENGINE_VERSION;

pub type TemplateId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub id: TemplateId,
    pub name: String,
    pub description: String,
    pub template_version: Version,
    pub engine_min_version: Version,
    #[serde(default)]
    pub deprecated: bool,
}

pub trait CvTemplate: Send + Sync {
    fn info(&self) -> &TemplateInfo;
    fn render(&self, doc: &CvDocument) -> Node;

    /// Page settings the template prefers when the user has not customised them.
    fn page_spec(&self) -> Option<PageSpec> {
        None
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid engine version: {0}")]
    InvalidEngineVersion(#[from] semver::Error),

    #[error("No template registered under the default id '{0}'")]
    MissingDefault(String),
}

/// Output of the render contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCv {
    pub requested_template: String,
    pub template_id: TemplateId,
    pub fell_back: bool,
    pub root: Node,
}

/// Template registry - holds the available renderers
pub struct TemplateRegistry {
    templates: HashMap<TemplateId, Box<dyn CvTemplate>>,
    default_id: TemplateId,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            default_id: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Registry with `modern`, `classic`, `creative` and `minimal`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let builtin: [Box<dyn CvTemplate>; 4] = [
            Box::new(ModernTemplate::new()),
            Box::new(ClassicTemplate::new()),
            Box::new(CreativeTemplate::new()),
            Box::new(MinimalTemplate::new()),
        ];
        for template in builtin {
            // Built-ins target the running engine version.
            if let Err(e) = registry.register(template) {
                warn!("Skipping built-in template: {e}");
            }
        }
        registry
    }

    /// Adds a template, rejecting ones that need a newer engine.
    pub fn register(&mut self, template: Box<dyn CvTemplate>) -> Result<(), TemplateError> {
        let info = template.info();
        let engine = Version::parse(ENGINE_VERSION)?;
        if engine < info.engine_min_version {
            return Err(TemplateError::EngineVersionMismatch(
                info.id.clone(),
                info.engine_min_version.to_string(),
                ENGINE_VERSION.to_string(),
            ));
        }
        debug!("Registered template '{}' v{}", info.id, info.template_version);
        self.templates.insert(info.id.clone(), template);
        Ok(())
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&dyn CvTemplate> {
        self.templates.get(id).map(|t| t.as_ref())
    }

    /// Template metadata sorted by id.
    pub fn list(&self) -> Vec<&TemplateInfo> {
        let mut infos: Vec<_> = self.templates.values().map(|t| t.info()).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// The requested template, or the default when the id is unknown.
    /// The boolean is true when the fallback was taken.
    pub fn resolve(&self, id: &str) -> Result<(&dyn CvTemplate, bool), TemplateError> {
        if let Some(template) = self.get(id) {
            return Ok((template, false));
        }
        let fallback = self
            .get(&self.default_id)
            .ok_or_else(|| TemplateError::MissingDefault(self.default_id.clone()))?;
        debug!("Unknown template '{id}', falling back to '{}'", self.default_id);
        Ok((fallback, true))
    }

    /// Render contract: `(document, template id) -> visual tree`.
    pub fn render(&self, doc: &CvDocument, template_id: &str) -> Result<RenderedCv, TemplateError> {
        let (template, fell_back) = self.resolve(template_id)?;
        Ok(RenderedCv {
            requested_template: template_id.to_string(),
            template_id: template.info().id.clone(),
            fell_back,
            root: template.render(doc),
        })
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
