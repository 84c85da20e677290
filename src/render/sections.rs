//! Section builders shared by the built-in templates.
//!
//! Every builder returns `None` when the backing data is empty so templates
//! never emit a heading without content.

use crate::document::{CvDocument, SectionKind};
use crate::render::format::{date_range, format_month, group_skills_by_category, join_non_empty};
use crate::render::{el, Element};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillLayout {
    /// One line per category: `Languages: Rust (Expert), Go`.
    Grouped,
    /// All skill names on one line.
    Inline,
    /// Name plus a level bar per skill.
    Bars,
}

#[derive(Debug, Clone, Copy)]
pub struct SectionStyle {
    pub heading_tag: &'static str,
    pub skills: SkillLayout,
    pub show_technologies: bool,
    pub show_skill_levels: bool,
    pub separator: &'static str,
}

impl Default for SectionStyle {
    fn default() -> Self {
        Self {
            heading_tag: "h2",
            skills: SkillLayout::Grouped,
            show_technologies: true,
            show_skill_levels: true,
            separator: " | ",
        }
    }
}

/// Name, headline and contact line.
pub fn header(doc: &CvDocument, style: &SectionStyle) -> Element {
    let p = &doc.personal;
    let mut header = el("header").class("cv-header");

    let name = doc.full_name();
    if !name.is_empty() {
        header = header.child(el("h1").class("cv-name").text(name));
    }
    if !p.title.trim().is_empty() {
        header = header.child(el("p").class("cv-title").text(p.title.trim()));
    }

    let contact: Vec<Element> = [
        ("email", &p.email),
        ("phone", &p.phone),
        ("location", &p.location),
        ("linkedin", &p.linkedin),
        ("website", &p.website),
        ("github", &p.github),
    ]
    .into_iter()
    .filter(|(_, value)| !value.trim().is_empty())
    .map(|(kind, value)| el("span").class("contact-item").attr("data-kind", kind).text(value.trim()))
    .collect();

    if !contact.is_empty() {
        let mut line = el("div").class("cv-contact");
        for (i, item) in contact.into_iter().enumerate() {
            if i > 0 {
                line = line.child(el("span").class("contact-sep").text(style.separator));
            }
            line = line.child(item);
        }
        header = header.child(line);
    }
    header
}

/// Builds one section, or `None` when it has nothing to show.
pub fn section(doc: &CvDocument, kind: SectionKind, style: &SectionStyle) -> Option<Element> {
    if !doc.section_has_content(kind) {
        return None;
    }
    let body = match kind {
        SectionKind::Summary => summary_body(doc),
        SectionKind::Experience => experience_body(doc, style),
        SectionKind::Education => education_body(doc, style),
        SectionKind::Skills => skills_body(doc, style),
        SectionKind::Projects => projects_body(doc, style),
        SectionKind::Languages => languages_body(doc, style),
        SectionKind::Certifications => certifications_body(doc, style),
        SectionKind::References => references_body(doc, style),
    };
    if body.is_empty() {
        return None;
    }
    Some(
        el("section")
            .class("cv-section")
            .class(&format!("section-{}", kind.key()))
            .child(el(style.heading_tag).class("section-title").text(doc.settings.section_title(kind)))
            .child(body),
    )
}

/// Link targets allowed in rendered output: web and mail links only.
pub fn safe_href(url: &str) -> Option<&str> {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    ["https://", "http://", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
        .then_some(url)
}

fn entry_header(title: &str, subtitle: &str, dates: &str) -> Element {
    let mut head = el("div").class("entry-header");
    if !title.trim().is_empty() {
        head = head.child(el("span").class("entry-title").text(title.trim()));
    }
    if !subtitle.is_empty() {
        head = head.child(el("span").class("entry-subtitle").text(subtitle));
    }
    if !dates.is_empty() {
        head = head.child(el("span").class("entry-dates").text(dates));
    }
    head
}

fn bullet_list(items: &[String]) -> Option<Element> {
    let items: Vec<Element> = items
        .iter()
        .filter(|a| !a.trim().is_empty())
        .map(|a| el("li").text(a.trim()))
        .collect();
    (!items.is_empty()).then(|| el("ul").class("entry-achievements").children(items))
}

fn tags(label: &str, tags: &[String]) -> Option<Element> {
    let joined = join_non_empty(tags.iter().map(String::as_str), ", ");
    (!joined.is_empty()).then(|| el("p").class("entry-tags").text(format!("{}: {}", label, joined)))
}

fn paragraph(class: &str, text: &str) -> Option<Element> {
    (!text.trim().is_empty()).then(|| el("p").class(class).text(text.trim()))
}

fn summary_body(doc: &CvDocument) -> Element {
    el("div").class("section-body").children(paragraph("summary", &doc.personal.summary))
}

fn experience_body(doc: &CvDocument, style: &SectionStyle) -> Element {
    let entries = doc.experience.iter().map(|e| {
        let subtitle = join_non_empty([e.company.as_str(), e.location.as_str()], style.separator);
        let mut entry = el("div")
            .class("entry")
            .child(entry_header(&e.position, &subtitle, &date_range(&e.start_date, &e.end_date, e.current)))
            .children(paragraph("entry-description", &e.description))
            .children(bullet_list(&e.achievements));
        if style.show_technologies {
            entry = entry.children(tags("Technologies", &e.technologies));
        }
        entry
    });
    el("div").class("section-body").children(entries.filter(Element::has_text))
}

fn education_body(doc: &CvDocument, style: &SectionStyle) -> Element {
    let entries = doc.education.iter().map(|e| {
        let title = match (e.degree.trim(), e.field.trim()) {
            (d, "") => d.to_string(),
            ("", f) => f.to_string(),
            (d, f) => format!("{} in {}", d, f),
        };
        let subtitle = join_non_empty([e.institution.as_str(), e.location.as_str()], style.separator);
        let gpa = (!e.gpa.trim().is_empty()).then(|| el("p").class("entry-gpa").text(format!("GPA: {}", e.gpa.trim())));
        el("div")
            .class("entry")
            .child(entry_header(&title, &subtitle, &date_range(&e.start_date, &e.end_date, e.current)))
            .children(gpa)
            .children(bullet_list(&e.achievements))
    });
    el("div").class("section-body").children(entries.filter(Element::has_text))
}

fn skills_body(doc: &CvDocument, style: &SectionStyle) -> Element {
    let body = el("div").class("section-body");
    let skill_label = |name: &str, level: &str| {
        if style.show_skill_levels {
            format!("{} ({})", name.trim(), level)
        } else {
            name.trim().to_string()
        }
    };

    match style.skills {
        SkillLayout::Grouped => body.children(group_skills_by_category(&doc.skills).into_iter().map(
            |(category, skills)| {
                let list = skills
                    .iter()
                    .map(|s| skill_label(s.name.as_str(), s.level.label()))
                    .collect::<Vec<_>>()
                    .join(", ");
                el("div")
                    .class("skill-group")
                    .child(el("span").class("skill-category").text(format!("{}:", category)))
                    .child(el("span").class("skill-list").text(list))
            },
        )),
        SkillLayout::Inline => {
            let names = join_non_empty(doc.skills.iter().map(|s| s.name.as_str()), " · ");
            body.children(paragraph("skill-list", &names))
        }
        SkillLayout::Bars => body.children(doc.skills.iter().filter(|s| !s.name.trim().is_empty()).map(|s| {
            let width = u32::from(s.level.rank()) * 25;
            el("div")
                .class("skill")
                .child(el("span").class("skill-name").text(s.name.trim()))
                .child(
                    el("span")
                        .class("skill-level")
                        .attr("data-level", s.level.label().to_lowercase())
                        .attr("style", format!("width: {}%", width)),
                )
        })),
    }
}

fn projects_body(doc: &CvDocument, style: &SectionStyle) -> Element {
    let entries = doc.projects.iter().map(|p| {
        let name = match safe_href(&p.url) {
            Some(href) => el("a").class("entry-title").attr("href", href).text(p.name.trim()),
            None => el("span").class("entry-title").text(p.name.trim()),
        };
        let dates = match (p.start_date.trim(), p.end_date.trim()) {
            ("", "") => String::new(),
            (start, end) => date_range(start, end, false),
        };
        let mut entry = el("div")
            .class("entry")
            .child(el("div").class("entry-header").child(name).children(
                (!dates.is_empty()).then(|| el("span").class("entry-dates").text(dates)),
            ))
            .children(paragraph("entry-description", &p.description));
        if style.show_technologies {
            entry = entry.children(tags("Technologies", &p.technologies));
        }
        entry
    });
    el("div").class("section-body").children(entries.filter(Element::has_text))
}

fn languages_body(doc: &CvDocument, style: &SectionStyle) -> Element {
    let items = doc
        .languages
        .iter()
        .filter(|l| !l.name.trim().is_empty())
        .map(|l| el("li").text(format!("{}{}{}", l.name.trim(), style.separator, l.proficiency.label())));
    el("ul").class("section-body").class("language-list").children(items)
}

fn certifications_body(doc: &CvDocument, style: &SectionStyle) -> Element {
    let entries = doc.certifications.iter().map(|c| {
        let expires = match c.expiry_date.trim() {
            "" => String::new(),
            d => format!("Expires {}", format_month(d)),
        };
        let subtitle = join_non_empty([c.issuer.as_str(), expires.as_str()], style.separator);
        let credential = (!c.credential_id.trim().is_empty()).then(|| {
            el("p")
                .class("entry-credential")
                .text(format!("Credential ID: {}", c.credential_id.trim()))
        });
        el("div")
            .class("entry")
            .child(entry_header(&c.name, &subtitle, &format_month(&c.date)))
            .children(credential)
    });
    el("div").class("section-body").children(entries.filter(Element::has_text))
}

fn references_body(doc: &CvDocument, style: &SectionStyle) -> Element {
    let entries = doc.references.iter().map(|r| {
        let role = match (r.position.trim(), r.company.trim()) {
            ("", c) => c.to_string(),
            (p, "") => p.to_string(),
            (p, c) => format!("{} at {}", p, c),
        };
        let contact = join_non_empty([r.email.as_str(), r.phone.as_str()], style.separator);
        el("div")
            .class("entry")
            .child(entry_header(&r.name, &role, ""))
            .children(paragraph("entry-contact", &contact))
            .children(paragraph("entry-relationship", &r.relationship))
    });
    el("div").class("section-body").children(entries.filter(Element::has_text))
}
