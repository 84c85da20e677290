//! The four built-in templates.
//!
//! All of them walk `settings.ordered_sections()`; they differ only in layout
//! and in how sections are styled.

use semver::Version;

use crate::document::{ColorPalette, CvDocument, Margins, SectionKind};
use crate::print::PageSpec;
use crate::render::sections::{header, section, SectionStyle, SkillLayout};
use crate::render::{el, Element, Node};
use crate::templates::{CvTemplate, TemplateInfo};

fn info(id: &str, name: &str, description: &str) -> TemplateInfo {
    TemplateInfo {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        template_version: Version::new(1, 0, 0),
        engine_min_version: Version::new(1, 0, 0),
        deprecated: false,
    }
}

/// `value` when it is a `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa` colour,
/// otherwise `fallback`.
fn css_color<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let value = value.trim();
    let valid = value.strip_prefix('#').map_or(false, |hex| {
        matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
    });
    if valid {
        value
    } else {
        fallback
    }
}

/// Root `<article>` carrying the palette as CSS custom properties.
fn page(doc: &CvDocument, template_id: &str) -> Element {
    let c = &doc.settings.colors;
    let defaults = ColorPalette::default();
    el("article")
        .class("cv")
        .class(&format!("template-{}", template_id))
        .attr(
            "style",
            format!(
                "--cv-primary: {}; --cv-secondary: {}; --cv-accent: {}",
                css_color(&c.primary, &defaults.primary),
                css_color(&c.secondary, &defaults.secondary),
                css_color(&c.accent, &defaults.accent),
            ),
        )
}

/// Enabled sections in configured order, skipping any without content.
fn sections_in_order<'a>(
    doc: &'a CvDocument,
    style: &'a SectionStyle,
    include: impl Fn(SectionKind) -> bool + 'a,
) -> impl Iterator<Item = Element> + 'a {
    doc.settings
        .ordered_sections()
        .into_iter()
        .map(|(kind, _)| kind)
        .filter(move |kind| include(*kind))
        .filter_map(move |kind| section(doc, kind, style))
}

pub struct ModernTemplate {
    info: TemplateInfo,
    style: SectionStyle,
}

impl ModernTemplate {
    pub fn new() -> Self {
        Self {
            info: info("modern", "Modern", "Clean single column with accent colour headings"),
            style: SectionStyle::default(),
        }
    }
}

impl Default for ModernTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl CvTemplate for ModernTemplate {
    fn info(&self) -> &TemplateInfo {
        &self.info
    }

    fn render(&self, doc: &CvDocument) -> Node {
        page(doc, &self.info.id)
            .child(header(doc, &self.style))
            .child(el("main").class("cv-body").children(sections_in_order(doc, &self.style, |_| true)))
            .into()
    }
}

pub struct ClassicTemplate {
    info: TemplateInfo,
    style: SectionStyle,
}

impl ClassicTemplate {
    pub fn new() -> Self {
        Self {
            info: info("classic", "Classic", "Traditional serif layout with centred header"),
            style: SectionStyle {
                show_skill_levels: false,
                separator: " • ",
                ..SectionStyle::default()
            },
        }
    }
}

impl Default for ClassicTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl CvTemplate for ClassicTemplate {
    fn info(&self) -> &TemplateInfo {
        &self.info
    }

    fn render(&self, doc: &CvDocument) -> Node {
        let sections = sections_in_order(doc, &self.style, |_| true)
            .flat_map(|s| [s, el("hr").class("section-rule")]);
        page(doc, &self.info.id)
            .class("serif")
            .child(header(doc, &self.style).class("centered"))
            .child(el("main").class("cv-body").children(sections))
            .into()
    }

    fn page_spec(&self) -> Option<PageSpec> {
        Some(PageSpec::from_template(11.5, 1.4, Margins::uniform(25.0)))
    }
}

/// Sections that go in the creative template's sidebar.
const SIDEBAR: [SectionKind; 3] = [
    SectionKind::Skills,
    SectionKind::Languages,
    SectionKind::Certifications,
];

pub struct CreativeTemplate {
    info: TemplateInfo,
    sidebar_style: SectionStyle,
    main_style: SectionStyle,
}

impl CreativeTemplate {
    pub fn new() -> Self {
        Self {
            info: info("creative", "Creative", "Two columns with a coloured sidebar"),
            sidebar_style: SectionStyle {
                heading_tag: "h3",
                skills: SkillLayout::Bars,
                separator: " - ",
                ..SectionStyle::default()
            },
            main_style: SectionStyle::default(),
        }
    }
}

impl Default for CreativeTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl CvTemplate for CreativeTemplate {
    fn info(&self) -> &TemplateInfo {
        &self.info
    }

    fn render(&self, doc: &CvDocument) -> Node {
        let sidebar = el("aside")
            .class("cv-sidebar")
            .child(header(doc, &self.sidebar_style))
            .children(sections_in_order(doc, &self.sidebar_style, |k| SIDEBAR.contains(&k)));
        let main = el("main")
            .class("cv-body")
            .children(sections_in_order(doc, &self.main_style, |k| !SIDEBAR.contains(&k)));

        page(doc, &self.info.id)
            .child(el("div").class("two-column").child(sidebar).child(main))
            .into()
    }
}

pub struct MinimalTemplate {
    info: TemplateInfo,
    style: SectionStyle,
}

impl MinimalTemplate {
    pub fn new() -> Self {
        Self {
            info: info("minimal", "Minimal", "Plain typography, no colour, no extras"),
            style: SectionStyle {
                heading_tag: "h3",
                skills: SkillLayout::Inline,
                show_technologies: false,
                show_skill_levels: false,
                separator: " · ",
            },
        }
    }
}

impl Default for MinimalTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl CvTemplate for MinimalTemplate {
    fn info(&self) -> &TemplateInfo {
        &self.info
    }

    fn render(&self, doc: &CvDocument) -> Node {
        // No palette: minimal is monochrome.
        el("article")
            .class("cv")
            .class("template-minimal")
            .child(header(doc, &self.style))
            .children(sections_in_order(doc, &self.style, |_| true))
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Experience, Skill, SkillLevel};
    use chrono::{TimeZone, Utc};

    fn sample() -> CvDocument {
        let mut doc = CvDocument::new("cv", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        doc.personal.first_name = "Ada".into();
        doc.personal.last_name = "Lovelace".into();
        doc.personal.summary = "Analyst".into();
        doc.experience.push(Experience {
            id: "e".into(),
            company: "Engines Ltd".into(),
            position: "Programmer".into(),
            technologies: vec!["Punch cards".into()],
            ..Default::default()
        });
        doc.skills.push(Skill {
            id: "s".into(),
            name: "Mathematics".into(),
            level: SkillLevel::Expert,
            category: "Core".into(),
        });
        doc
    }

    fn section_titles(node: &Node) -> Vec<String> {
        node.find_by_class("section-title")
            .iter()
            .map(|el| Node::Element((*el).clone()).text_content())
            .collect()
    }

    #[test]
    fn test_modern_follows_section_order() {
        let mut doc = sample();
        doc.settings.sections.get_mut("skills").unwrap().order = 0;
        doc.settings.sections.get_mut("summary").unwrap().order = 9;
        let node = ModernTemplate::new().render(&doc);
        assert_eq!(
            section_titles(&node),
            vec!["Skills", "Work Experience", "Professional Summary"]
        );
    }

    #[test]
    fn test_disabled_section_is_hidden() {
        let mut doc = sample();
        doc.settings.sections.get_mut("experience").unwrap().enabled = false;
        let templates: [Box<dyn CvTemplate>; 4] = [
            Box::new(ModernTemplate::new()),
            Box::new(ClassicTemplate::new()),
            Box::new(CreativeTemplate::new()),
            Box::new(MinimalTemplate::new()),
        ];
        for template in templates {
            let html = template.render(&doc).to_html();
            assert!(!html.contains("Engines Ltd"), "{}", template.info().id);
            assert!(html.contains("Ada Lovelace"));
        }
    }

    #[test]
    fn test_creative_puts_skills_in_sidebar() {
        let node = CreativeTemplate::new().render(&sample());
        let sidebar = Node::Element(node.find_by_class("cv-sidebar")[0].clone());
        assert!(sidebar.text_content().contains("Mathematics"));
        assert!(!sidebar.text_content().contains("Programmer"));
    }

    #[test]
    fn test_minimal_hides_technologies_and_palette() {
        let html = MinimalTemplate::new().render(&sample()).to_html();
        assert!(!html.contains("Punch cards"));
        assert!(!html.contains("--cv-primary"));
    }

    #[test]
    fn test_palette_accepts_only_hex_colors() {
        assert_eq!(css_color("#ABC", "#000"), "#ABC");
        assert_eq!(css_color(" #11223344 ", "#000"), "#11223344");
        assert_eq!(css_color("red", "#000"), "#000");
        assert_eq!(css_color("#12345", "#000"), "#000");

        let mut doc = sample();
        doc.settings.colors.primary = "red; background: url(https://evil.example/x)".into();
        doc.settings.colors.accent = "#ff0066".into();
        let html = ModernTemplate::new().render(&doc).to_html();
        assert!(!html.contains("evil.example"));
        assert!(html.contains("--cv-primary: #2563eb"));
        assert!(html.contains("--cv-accent: #ff0066"));
    }

    #[test]
    fn test_only_classic_prefers_its_own_page() {
        assert!(ClassicTemplate::new().page_spec().is_some());
        assert!(ModernTemplate::new().page_spec().is_none());
    }

    #[test]
    fn test_classic_adds_rules_between_sections() {
        let node = ClassicTemplate::new().render(&sample());
        assert_eq!(node.find_by_class("section-rule").len(), 3);
    }
}
