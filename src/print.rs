//! Print Authority System
//!
//! Page settings for the print hand-off and the standalone HTML document the
//! platform print pipeline consumes. No PDF is produced here.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::document::{CvDocument, Margins, Settings};
use crate::render::escape_html;
use crate::templates::RenderedCv;

/// PrintAuthority determines where page specifications come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintAuthority {
    /// System defaults (fallback)
    System,
    /// Template-defined specifications
    Template,
    /// User-provided settings (with validation)
    User,
}

impl Default for PrintAuthority {
    fn default() -> Self {
        Self::System
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaperSize {
    A4,
    Letter,
}

impl PaperSize {
    fn css(&self) -> &'static str {
        match self {
            PaperSize::A4 => "A4",
            PaperSize::Letter => "letter",
        }
    }
}

/// Page specification for physical output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    pub authority: PrintAuthority,
    pub paper: PaperSize,
    pub font_size_pt: f32,
    pub line_height: f32,
    pub margins_mm: Margins,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            authority: PrintAuthority::System,
            paper: PaperSize::A4,
            font_size_pt: 11.0,
            line_height: 1.5,
            margins_mm: Margins::uniform(20.0),
        }
    }
}

impl PageSpec {
    /// Create from template authority
    pub fn from_template(font_size_pt: f32, line_height: f32, margins_mm: Margins) -> Self {
        Self {
            authority: PrintAuthority::Template,
            font_size_pt,
            line_height,
            margins_mm,
            ..Self::default()
        }
    }

    /// Create from the document settings with validation
    pub fn from_settings(settings: &Settings) -> Result<Self, &'static str> {
        if !(8.0..=16.0).contains(&settings.font_size) {
            return Err("Font size must be between 8 and 16 pt");
        }
        if !(1.0..=2.5).contains(&settings.line_height) {
            return Err("Line height must be between 1.0 and 2.5");
        }
        let m = settings.margins;
        if [m.top, m.right, m.bottom, m.left]
            .iter()
            .any(|v| !(0.0..=50.0).contains(v))
        {
            return Err("Margins must be between 0 and 50 mm");
        }
        Ok(Self {
            authority: PrintAuthority::User,
            font_size_pt: settings.font_size,
            line_height: settings.line_height,
            margins_mm: m,
            ..Self::default()
        })
    }

    /// User settings win when they differ from the defaults and are in range,
    /// then the template's own spec, then system defaults.
    pub fn resolve(settings: &Settings, template: Option<PageSpec>) -> Self {
        let defaults = Settings::default();
        let customized = settings.font_size != defaults.font_size
            || settings.line_height != defaults.line_height
            || settings.margins != defaults.margins;

        if customized {
            match Self::from_settings(settings) {
                Ok(spec) => return spec,
                Err(reason) => warn!("Ignoring page settings: {reason}"),
            }
        }
        template.unwrap_or_default()
    }

    fn css(&self) -> String {
        let m = &self.margins_mm;
        format!(
            "@page {{ size: {}; margin: {}mm {}mm {}mm {}mm; }}\n\
             body {{ margin: 0; font-size: {}pt; line-height: {}; }}\n\
             .cv-section {{ break-inside: avoid; }}",
            self.paper.css(),
            m.top,
            m.right,
            m.bottom,
            m.left,
            self.font_size_pt,
            self.line_height
        )
    }
}

/// A complete HTML page ready for the platform print pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintDocument {
    pub title: String,
    pub template_id: String,
    pub page: PageSpec,
    pub html: String,
}

impl PrintDocument {
    pub fn new(doc: &CvDocument, rendered: &RenderedCv, page: PageSpec) -> Self {
        let title = match doc.full_name().as_str() {
            "" => "CV".to_string(),
            name => format!("{name} - CV"),
        };
        let html = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{}</title>\n<style>\n{}\n</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            escape_html(&title),
            page.css(),
            rendered.root.to_html()
        );
        Self {
            title,
            template_id: rendered.template_id.clone(),
            page,
            html,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::TemplateRegistry;
    use chrono::{TimeZone, Utc};

    fn doc() -> CvDocument {
        CvDocument::new("cv", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_default_settings_use_system_authority() {
        let spec = PageSpec::resolve(&Settings::default(), None);
        assert_eq!(spec.authority, PrintAuthority::System);
    }

    #[test]
    fn test_custom_settings_use_user_authority() {
        let settings = Settings {
            font_size: 12.0,
            ..Settings::default()
        };
        let spec = PageSpec::resolve(&settings, None);
        assert_eq!(spec.authority, PrintAuthority::User);
        assert_eq!(spec.font_size_pt, 12.0);
        assert_eq!(PageSpec::from_settings(&settings), Ok(spec));
    }

    #[test]
    fn test_out_of_range_settings_fall_back() {
        let settings = Settings {
            margins: Margins::uniform(80.0),
            ..Settings::default()
        };
        assert!(PageSpec::from_settings(&settings).is_err());

        let template = PageSpec::from_template(10.5, 1.4, Margins::uniform(25.0));
        let spec = PageSpec::resolve(&settings, Some(template.clone()));
        assert_eq!(spec, template);
        assert_eq!(PageSpec::resolve(&settings, None), PageSpec::default());
    }

    #[test]
    fn test_print_document_is_standalone_html() {
        let mut doc = doc();
        doc.personal.first_name = "Ada".into();
        doc.personal.last_name = "Lovelace".into();
        let rendered = TemplateRegistry::with_builtin().render(&doc, "modern").unwrap();
        let print = PrintDocument::new(&doc, &rendered, PageSpec::default());

        assert_eq!(print.title, "Ada Lovelace - CV");
        assert!(print.html.starts_with("<!DOCTYPE html>"));
        assert!(print.html.contains("@page { size: A4; margin: 20mm 20mm 20mm 20mm; }"));
        assert!(print.html.contains("Ada Lovelace"));
    }
}
