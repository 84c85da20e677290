//! Export Pipeline - Single Entry Point
//!
//! `export` always runs validation first. The report travels with the bundle
//! but never blocks it: validation is advisory.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::document::CvDocument;
use crate::hashing::{document_hash, sha256_hex};
use crate::persistence::{export_file_name, export_json};
use crate::print::{PageSpec, PrintDocument};
use crate::templates::{TemplateError, TemplateInfo, TemplateRegistry};
use crate::validation::{ValidationReport, Validator};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFile {
    pub filename: String,
    pub media_type: String,
    pub size_bytes: usize,
    pub data_base64: String,
    pub hash: String,
}

impl ExportedFile {
    fn new(filename: String, media_type: &str, data: &[u8]) -> Self {
        Self {
            filename,
            media_type: media_type.to_string(),
            size_bytes: data.len(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(data),
            hash: sha256_hex(data),
        }
    }

    /// `data:` URL for a download link.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data_base64)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub document_id: String,
    pub requested_template: String,
    pub template_id: String,
    pub template_version: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub content_hash: String,
    pub validation: ValidationReport,
    pub print: PrintDocument,
    pub files: Vec<ExportedFile>,
}

/// The export pipeline - single entry point for print and download output
pub struct ExportPipeline {
    registry: TemplateRegistry,
    validator: Validator,
}

impl ExportPipeline {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self {
            registry,
            validator: Validator::new(),
        }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn list_templates(&self) -> Vec<&TemplateInfo> {
        self.registry.list()
    }

    pub fn validate(&self, doc: &CvDocument) -> ValidationReport {
        self.validator.validate(doc)
    }

    /// Validates, renders with `template_id` (falling back to the default
    /// template), and packages the print document plus a JSON copy.
    pub fn export(
        &self,
        doc: &CvDocument,
        template_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ExportBundle, PipelineError> {
        // Always validate, even though nothing below depends on the outcome.
        let validation = self.validate(doc);
        if !validation.valid {
            warn!(
                "Exporting CV {} with {} validation error(s)",
                doc.id,
                validation.errors.len()
            );
        }

        let (template, _) = self.registry.resolve(template_id)?;
        let rendered = self.registry.render(doc, template_id)?;
        let page = PageSpec::resolve(&doc.settings, template.page_spec());
        let print = PrintDocument::new(doc, &rendered, page);

        let json = export_json(doc)?;
        let json_name = export_file_name(doc);
        let html_name = json_name.trim_end_matches(".json").to_string() + ".html";
        let files = vec![
            ExportedFile::new(html_name, "text/html", print.html.as_bytes()),
            ExportedFile::new(json_name, "application/json", json.as_bytes()),
        ];

        info!(
            "Exported CV {} with template '{}'{}",
            doc.id,
            rendered.template_id,
            if rendered.fell_back { " (fallback)" } else { "" }
        );

        Ok(ExportBundle {
            document_id: doc.id.clone(),
            requested_template: rendered.requested_template.clone(),
            template_id: rendered.template_id.clone(),
            template_version: template.info().template_version.to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: now,
            content_hash: document_hash(doc)?,
            validation,
            print,
            files,
        })
    }
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new(TemplateRegistry::default())
    }
}
