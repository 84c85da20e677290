//! Document Schema - the CV aggregate root
//!
//! The whole CV is one serializable value. Optional fields and auxiliary lists
//! default on deserialization so documents written by older builds still load.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type EntryId = String;

pub const DEFAULT_TEMPLATE: &str = "modern";
pub const SUMMARY_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvDocument {
    /// Blank when missing from stored data; filled in on load.
    #[serde(default)]
    pub id: String,
    pub personal: PersonalInfo,
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default = "default_template")]
    pub template: String,
    /// Missing or unreadable timestamps decode as the Unix epoch and are
    /// replaced on load.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub settings: Settings,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default())
}

impl CvDocument {
    /// Fresh, empty document. `created_at` and `updated_at` are both `now`.
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            personal: PersonalInfo::default(),
            experience: vec![],
            education: vec![],
            skills: vec![],
            projects: vec![],
            languages: vec![],
            certifications: vec![],
            references: vec![],
            template: default_template(),
            created_at: now,
            updated_at: now,
            settings: Settings::default(),
        }
    }

    pub fn full_name(&self) -> String {
        let first = self.personal.first_name.trim();
        let last = self.personal.last_name.trim();
        match (first.is_empty(), last.is_empty()) {
            (false, false) => format!("{} {}", first, last),
            (false, true) => first.to_string(),
            (true, false) => last.to_string(),
            (true, true) => String::new(),
        }
    }

    /// Whether the backing data of a section has anything to show.
    pub fn section_has_content(&self, kind: SectionKind) -> bool {
        match kind {
            SectionKind::Summary => !self.personal.summary.trim().is_empty(),
            SectionKind::Experience => !self.experience.is_empty(),
            SectionKind::Education => !self.education.is_empty(),
            SectionKind::Skills => !self.skills.is_empty(),
            SectionKind::Projects => !self.projects.is_empty(),
            SectionKind::Languages => !self.languages.is_empty(),
            SectionKind::Certifications => !self.certifications.is_empty(),
            SectionKind::References => !self.references.is_empty(),
        }
    }
}

/// Minimal structural check applied to persisted and imported JSON:
/// a `personal` object and an `experience` array.
pub fn has_document_shape(value: &Value) -> bool {
    value.get("personal").map_or(false, Value::is_object)
        && value.get("experience").map_or(false, Value::is_array)
}

/// Parses `YYYY-MM` (first of the month) or `YYYY-MM-DD`.
pub fn parse_cv_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d"))
        .ok()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub website: String,
    pub linkedin: String,
    pub github: String,
    pub summary: String,
}

/// Dates are free-form `YYYY-MM` or `YYYY-MM-DD` strings; an empty string means unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[serde(default)]
    pub id: EntryId,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default)]
    pub id: EntryId,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub gpa: String,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    pub fn label(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
            SkillLevel::Expert => "Expert",
        }
    }

    /// 1..=4, used by templates that draw level bars.
    pub fn rank(&self) -> u8 {
        match self {
            SkillLevel::Beginner => 1,
            SkillLevel::Intermediate => 2,
            SkillLevel::Advanced => 3,
            SkillLevel::Expert => 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(default)]
    pub id: EntryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: SkillLevel,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: EntryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageProficiency {
    Basic,
    #[default]
    Conversational,
    Fluent,
    Native,
}

impl LanguageProficiency {
    pub fn label(&self) -> &'static str {
        match self {
            LanguageProficiency::Basic => "Basic",
            LanguageProficiency::Conversational => "Conversational",
            LanguageProficiency::Fluent => "Fluent",
            LanguageProficiency::Native => "Native",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    #[serde(default)]
    pub id: EntryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub proficiency: LanguageProficiency,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    #[serde(default)]
    pub id: EntryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub expiry_date: String,
    #[serde(default)]
    pub credential_id: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(default)]
    pub id: EntryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub relationship: String,
}

/// The sections a template knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Languages,
    Certifications,
    References,
}

impl SectionKind {
    pub const ALL: [SectionKind; 8] = [
        SectionKind::Summary,
        SectionKind::Experience,
        SectionKind::Education,
        SectionKind::Skills,
        SectionKind::Projects,
        SectionKind::Languages,
        SectionKind::Certifications,
        SectionKind::References,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SectionKind::Summary => "summary",
            SectionKind::Experience => "experience",
            SectionKind::Education => "education",
            SectionKind::Skills => "skills",
            SectionKind::Projects => "projects",
            SectionKind::Languages => "languages",
            SectionKind::Certifications => "certifications",
            SectionKind::References => "references",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.key() == key)
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            SectionKind::Summary => "Professional Summary",
            SectionKind::Experience => "Work Experience",
            SectionKind::Education => "Education",
            SectionKind::Skills => "Skills",
            SectionKind::Projects => "Projects",
            SectionKind::Languages => "Languages",
            SectionKind::Certifications => "Certifications",
            SectionKind::References => "References",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionConfig {
    pub enabled: bool,
    pub order: u32,
    pub title: String,
}

impl SectionConfig {
    pub fn for_kind(kind: SectionKind) -> Self {
        Self {
            enabled: true,
            order: kind as u32,
            title: kind.default_title().to_string(),
        }
    }
}

/// Stored section entry; every field may be missing.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSectionConfig {
    enabled: Option<bool>,
    order: Option<u32>,
    title: Option<String>,
}

/// Fills missing section fields from the section's defaults and adds known
/// sections absent from older data. Unknown keys are kept, ordered last.
fn sections_with_defaults<'de, D>(deserializer: D) -> Result<BTreeMap<String, SectionConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let stored = BTreeMap::<String, StoredSectionConfig>::deserialize(deserializer)?;
    let mut sections: BTreeMap<String, SectionConfig> = SectionKind::ALL
        .iter()
        .map(|kind| (kind.key().to_string(), SectionConfig::for_kind(*kind)))
        .collect();

    for (key, cfg) in stored {
        let base = match SectionKind::from_key(&key) {
            Some(kind) => SectionConfig::for_kind(kind),
            None => SectionConfig {
                enabled: true,
                order: u32::MAX,
                title: String::new(),
            },
        };
        sections.insert(
            key,
            SectionConfig {
                enabled: cfg.enabled.unwrap_or(base.enabled),
                order: cfg.order.unwrap_or(base.order),
                title: cfg.title.unwrap_or(base.title),
            },
        );
    }
    Ok(sections)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorPalette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            primary: "#2563eb".to_string(),
            secondary: "#1e293b".to_string(),
            accent: "#0ea5e9".to_string(),
        }
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(20.0)
    }
}

impl Margins {
    pub fn uniform(mm: f32) -> Self {
        Self { top: mm, right: mm, bottom: mm, left: mm }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Body font size in points.
    pub font_size: f32,
    pub line_height: f32,
    pub margins: Margins,
    pub colors: ColorPalette,
    #[serde(deserialize_with = "sections_with_defaults")]
    pub sections: BTreeMap<String, SectionConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        let sections = SectionKind::ALL
            .iter()
            .map(|kind| (kind.key().to_string(), SectionConfig::for_kind(*kind)))
            .collect();

        Self {
            font_size: 11.0,
            line_height: 1.5,
            margins: Margins::default(),
            colors: ColorPalette::default(),
            sections,
        }
    }
}

impl Settings {
    /// Known, enabled sections sorted by `order`. Unknown keys are ignored;
    /// ties keep the canonical section order.
    pub fn ordered_sections(&self) -> Vec<(SectionKind, &SectionConfig)> {
        let mut sections: Vec<_> = self
            .sections
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .filter_map(|(key, cfg)| SectionKind::from_key(key).map(|kind| (kind, cfg)))
            .collect();
        sections.sort_by_key(|(kind, cfg)| (cfg.order, *kind));
        sections
    }

    /// Title configured for a section, or its default.
    pub fn section_title(&self, kind: SectionKind) -> &str {
        self.sections
            .get(kind.key())
            .map(|cfg| cfg.title.as_str())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| kind.default_title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_new_document_defaults() {
        let doc = CvDocument::new("cv-1", now());
        assert_eq!(doc.template, "modern");
        assert_eq!(doc.created_at, doc.updated_at);
        assert_eq!(doc.settings.sections.len(), SectionKind::ALL.len());
        assert!(doc.experience.is_empty());
    }

    #[test]
    fn test_json_field_names_are_camel_case() {
        let doc = CvDocument::new("cv-1", now());
        let v = serde_json::to_value(&doc).unwrap();
        assert!(v.get("createdAt").is_some());
        assert!(v["personal"].get("firstName").is_some());
        assert!(v["settings"].get("fontSize").is_some());
    }

    #[test]
    fn test_older_document_without_optional_fields_loads() {
        let v = json!({
            "id": "old",
            "personal": {"firstName": "Ada"},
            "experience": [{"id": "e1", "company": "Acme"}],
            "createdAt": "2023-01-01T00:00:00Z",
            "updatedAt": "2023-01-02T00:00:00Z"
        });
        let doc: CvDocument = serde_json::from_value(v).unwrap();
        assert_eq!(doc.personal.first_name, "Ada");
        assert_eq!(doc.experience[0].company, "Acme");
        assert!(doc.projects.is_empty());
        assert_eq!(doc.template, DEFAULT_TEMPLATE);
        assert_eq!(doc.settings, Settings::default());
    }

    #[test]
    fn test_missing_ids_and_timestamps_decode_as_blank() {
        let v = json!({
            "personal": {"firstName": "Ada"},
            "experience": [{"company": "Acme"}],
            "createdAt": "yesterday"
        });
        let doc: CvDocument = serde_json::from_value(v).unwrap();
        assert!(doc.id.is_empty());
        assert!(doc.experience[0].id.is_empty());
        assert_eq!(doc.created_at, DateTime::<Utc>::default());
        assert_eq!(doc.updated_at, DateTime::<Utc>::default());
    }

    #[test]
    fn test_partial_section_config_keeps_defaults() {
        let v = json!({
            "sections": {
                "skills": {"enabled": false, "order": 1},
                "hobbies": {"title": "Hobbies"}
            }
        });
        let settings: Settings = serde_json::from_value(v).unwrap();
        let skills = &settings.sections["skills"];
        assert!(!skills.enabled);
        assert_eq!(skills.order, 1);
        assert_eq!(skills.title, "Skills");
        // Sections missing from the stored map come back with their defaults.
        assert_eq!(settings.sections["summary"], SectionConfig::for_kind(SectionKind::Summary));
        assert_eq!(settings.sections.len(), SectionKind::ALL.len() + 1);
        assert!(settings.sections["hobbies"].enabled);
    }

    #[test]
    fn test_shape_check() {
        assert!(has_document_shape(&json!({"personal": {}, "experience": []})));
        assert!(!has_document_shape(&json!({"personal": {}})));
        assert!(!has_document_shape(&json!({"personal": "x", "experience": []})));
        assert!(!has_document_shape(&json!([1, 2, 3])));
    }

    #[test]
    fn test_parse_cv_date() {
        assert_eq!(parse_cv_date("2021-03"), NaiveDate::from_ymd_opt(2021, 3, 1));
        assert_eq!(parse_cv_date("2021-03-15"), NaiveDate::from_ymd_opt(2021, 3, 15));
        assert_eq!(parse_cv_date(""), None);
        assert_eq!(parse_cv_date("March"), None);
    }

    #[test]
    fn test_ordered_sections_respects_order_and_enabled() {
        let mut settings = Settings::default();
        settings.sections.get_mut("skills").unwrap().order = 0;
        settings.sections.get_mut("summary").unwrap().order = 5;
        settings.sections.get_mut("projects").unwrap().enabled = false;
        settings.sections.insert(
            "hobbies".to_string(),
            SectionConfig { enabled: true, order: 0, title: "Hobbies".to_string() },
        );

        let kinds: Vec<_> = settings.ordered_sections().into_iter().map(|(k, _)| k).collect();
        assert_eq!(kinds[0], SectionKind::Skills);
        assert!(!kinds.contains(&SectionKind::Projects));
        assert_eq!(kinds.len(), 7);
    }

    #[test]
    fn test_section_title_falls_back_to_default() {
        let mut settings = Settings::default();
        settings.sections.get_mut("experience").unwrap().title = "  ".to_string();
        assert_eq!(settings.section_title(SectionKind::Experience), "Work Experience");
    }
}
