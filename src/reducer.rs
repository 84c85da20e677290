//! Mutation Reducer - pure `(document, action) -> document`
//!
//! The input document is never modified. Identifiers and the current time are
//! supplied by the caller, so the same inputs always produce the same output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document::{
    Certification, ColorPalette, CvDocument, Education, EntryId, Experience, Language,
    LanguageProficiency, Margins, PersonalInfo, Project, Reference, SectionConfig, Skill,
    SkillLevel,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CvAction {
    LoadDocument(Box<CvDocument>),
    ResetDocument { id: String },
    UpdatePersonal(PersonalPatch),

    AddExperience(Experience),
    UpdateExperience { id: EntryId, patch: ExperiencePatch },
    DeleteExperience { id: EntryId },
    ReorderExperience { from: usize, to: usize },

    AddEducation(Education),
    UpdateEducation { id: EntryId, patch: EducationPatch },
    DeleteEducation { id: EntryId },
    ReorderEducation { from: usize, to: usize },

    AddSkill(Skill),
    UpdateSkill { id: EntryId, patch: SkillPatch },
    DeleteSkill { id: EntryId },

    AddProject(Project),
    UpdateProject { id: EntryId, patch: ProjectPatch },
    DeleteProject { id: EntryId },

    AddLanguage(Language),
    UpdateLanguage { id: EntryId, patch: LanguagePatch },
    DeleteLanguage { id: EntryId },

    AddCertification(Certification),
    UpdateCertification { id: EntryId, patch: CertificationPatch },
    DeleteCertification { id: EntryId },

    AddReference(Reference),
    UpdateReference { id: EntryId, patch: ReferencePatch },
    DeleteReference { id: EntryId },

    SetTemplate { template: String },
    UpdateSettings(SettingsPatch),
    /// `enabled: None` flips the flag, `Some(v)` sets it.
    ToggleSection { section: String, enabled: Option<bool> },
}

impl CvAction {
    pub fn name(&self) -> &'static str {
        match self {
            CvAction::LoadDocument(_) => "LOAD_DOCUMENT",
            CvAction::ResetDocument { .. } => "RESET_DOCUMENT",
            CvAction::UpdatePersonal(_) => "UPDATE_PERSONAL",
            CvAction::AddExperience(_) => "ADD_EXPERIENCE",
            CvAction::UpdateExperience { .. } => "UPDATE_EXPERIENCE",
            CvAction::DeleteExperience { .. } => "DELETE_EXPERIENCE",
            CvAction::ReorderExperience { .. } => "REORDER_EXPERIENCE",
            CvAction::AddEducation(_) => "ADD_EDUCATION",
            CvAction::UpdateEducation { .. } => "UPDATE_EDUCATION",
            CvAction::DeleteEducation { .. } => "DELETE_EDUCATION",
            CvAction::ReorderEducation { .. } => "REORDER_EDUCATION",
            CvAction::AddSkill(_) => "ADD_SKILL",
            CvAction::UpdateSkill { .. } => "UPDATE_SKILL",
            CvAction::DeleteSkill { .. } => "DELETE_SKILL",
            CvAction::AddProject(_) => "ADD_PROJECT",
            CvAction::UpdateProject { .. } => "UPDATE_PROJECT",
            CvAction::DeleteProject { .. } => "DELETE_PROJECT",
            CvAction::AddLanguage(_) => "ADD_LANGUAGE",
            CvAction::UpdateLanguage { .. } => "UPDATE_LANGUAGE",
            CvAction::DeleteLanguage { .. } => "DELETE_LANGUAGE",
            CvAction::AddCertification(_) => "ADD_CERTIFICATION",
            CvAction::UpdateCertification { .. } => "UPDATE_CERTIFICATION",
            CvAction::DeleteCertification { .. } => "DELETE_CERTIFICATION",
            CvAction::AddReference(_) => "ADD_REFERENCE",
            CvAction::UpdateReference { .. } => "UPDATE_REFERENCE",
            CvAction::DeleteReference { .. } => "DELETE_REFERENCE",
            CvAction::SetTemplate { .. } => "SET_TEMPLATE",
            CvAction::UpdateSettings(_) => "UPDATE_SETTINGS",
            CvAction::ToggleSection { .. } => "TOGGLE_SECTION",
        }
    }
}

/// Shallow merge of a partial update into an entry.
pub trait Patch<T> {
    fn apply_to(&self, target: &mut T);
}

/// List entries addressable by identifier.
pub trait Entry {
    fn entry_id(&self) -> &str;
    fn entry_id_mut(&mut self) -> &mut EntryId;
}

macro_rules! impl_entry {
    ($($ty:ty),* $(,)?) => {
        $(impl Entry for $ty {
            fn entry_id(&self) -> &str {
                &self.id
            }

            fn entry_id_mut(&mut self) -> &mut EntryId {
                &mut self.id
            }
        })*
    };
}

impl_entry!(Experience, Education, Skill, Project, Language, Certification, Reference);

fn merge<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub summary: Option<String>,
}

impl Patch<PersonalInfo> for PersonalPatch {
    fn apply_to(&self, p: &mut PersonalInfo) {
        merge(&mut p.first_name, &self.first_name);
        merge(&mut p.last_name, &self.last_name);
        merge(&mut p.title, &self.title);
        merge(&mut p.email, &self.email);
        merge(&mut p.phone, &self.phone);
        merge(&mut p.location, &self.location);
        merge(&mut p.website, &self.website);
        merge(&mut p.linkedin, &self.linkedin);
        merge(&mut p.github, &self.github);
        merge(&mut p.summary, &self.summary);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperiencePatch {
    pub company: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: Option<bool>,
    pub description: Option<String>,
    pub achievements: Option<Vec<String>>,
    pub technologies: Option<Vec<String>>,
}

impl Patch<Experience> for ExperiencePatch {
    fn apply_to(&self, e: &mut Experience) {
        merge(&mut e.company, &self.company);
        merge(&mut e.position, &self.position);
        merge(&mut e.location, &self.location);
        merge(&mut e.start_date, &self.start_date);
        merge(&mut e.end_date, &self.end_date);
        merge(&mut e.current, &self.current);
        merge(&mut e.description, &self.description);
        merge(&mut e.achievements, &self.achievements);
        merge(&mut e.technologies, &self.technologies);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationPatch {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: Option<bool>,
    pub gpa: Option<String>,
    pub achievements: Option<Vec<String>>,
}

impl Patch<Education> for EducationPatch {
    fn apply_to(&self, e: &mut Education) {
        merge(&mut e.institution, &self.institution);
        merge(&mut e.degree, &self.degree);
        merge(&mut e.field, &self.field);
        merge(&mut e.location, &self.location);
        merge(&mut e.start_date, &self.start_date);
        merge(&mut e.end_date, &self.end_date);
        merge(&mut e.current, &self.current);
        merge(&mut e.gpa, &self.gpa);
        merge(&mut e.achievements, &self.achievements);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillPatch {
    pub name: Option<String>,
    pub level: Option<SkillLevel>,
    pub category: Option<String>,
}

impl Patch<Skill> for SkillPatch {
    fn apply_to(&self, s: &mut Skill) {
        merge(&mut s.name, &self.name);
        merge(&mut s.level, &self.level);
        merge(&mut s.category, &self.category);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub url: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Patch<Project> for ProjectPatch {
    fn apply_to(&self, p: &mut Project) {
        merge(&mut p.name, &self.name);
        merge(&mut p.description, &self.description);
        merge(&mut p.technologies, &self.technologies);
        merge(&mut p.url, &self.url);
        merge(&mut p.start_date, &self.start_date);
        merge(&mut p.end_date, &self.end_date);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguagePatch {
    pub name: Option<String>,
    pub proficiency: Option<LanguageProficiency>,
}

impl Patch<Language> for LanguagePatch {
    fn apply_to(&self, l: &mut Language) {
        merge(&mut l.name, &self.name);
        merge(&mut l.proficiency, &self.proficiency);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificationPatch {
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub date: Option<String>,
    pub expiry_date: Option<String>,
    pub credential_id: Option<String>,
    pub url: Option<String>,
}

impl Patch<Certification> for CertificationPatch {
    fn apply_to(&self, c: &mut Certification) {
        merge(&mut c.name, &self.name);
        merge(&mut c.issuer, &self.issuer);
        merge(&mut c.date, &self.date);
        merge(&mut c.expiry_date, &self.expiry_date);
        merge(&mut c.credential_id, &self.credential_id);
        merge(&mut c.url, &self.url);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferencePatch {
    pub name: Option<String>,
    pub position: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
}

impl Patch<Reference> for ReferencePatch {
    fn apply_to(&self, r: &mut Reference) {
        merge(&mut r.name, &self.name);
        merge(&mut r.position, &self.position);
        merge(&mut r.company, &self.company);
        merge(&mut r.email, &self.email);
        merge(&mut r.phone, &self.phone);
        merge(&mut r.relationship, &self.relationship);
    }
}

/// `sections` replaces the whole section map when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub font_size: Option<f32>,
    pub line_height: Option<f32>,
    pub margins: Option<Margins>,
    pub colors: Option<ColorPalette>,
    pub sections: Option<BTreeMap<String, SectionConfig>>,
}

/// Applies one action. A variant that leaves the content untouched (unknown
/// id, out-of-range reorder, unknown section) returns a document equal to the
/// input, `updated_at` included. Otherwise `updated_at` advances to `now`,
/// never moving backwards.
pub fn reduce(doc: &CvDocument, action: CvAction, now: DateTime<Utc>) -> CvDocument {
    let mut next = doc.clone();

    match action {
        CvAction::LoadDocument(loaded) => return *loaded,
        CvAction::ResetDocument { id } => return CvDocument::new(id, now),

        CvAction::UpdatePersonal(patch) => patch.apply_to(&mut next.personal),

        CvAction::AddExperience(entry) => next.experience.insert(0, entry),
        CvAction::UpdateExperience { id, patch } => update_entry(&mut next.experience, &id, &patch),
        CvAction::DeleteExperience { id } => delete_entry(&mut next.experience, &id),
        CvAction::ReorderExperience { from, to } => move_entry(&mut next.experience, from, to),

        CvAction::AddEducation(entry) => next.education.insert(0, entry),
        CvAction::UpdateEducation { id, patch } => update_entry(&mut next.education, &id, &patch),
        CvAction::DeleteEducation { id } => delete_entry(&mut next.education, &id),
        CvAction::ReorderEducation { from, to } => move_entry(&mut next.education, from, to),

        CvAction::AddSkill(entry) => next.skills.push(entry),
        CvAction::UpdateSkill { id, patch } => update_entry(&mut next.skills, &id, &patch),
        CvAction::DeleteSkill { id } => delete_entry(&mut next.skills, &id),

        CvAction::AddProject(entry) => next.projects.push(entry),
        CvAction::UpdateProject { id, patch } => update_entry(&mut next.projects, &id, &patch),
        CvAction::DeleteProject { id } => delete_entry(&mut next.projects, &id),

        CvAction::AddLanguage(entry) => next.languages.push(entry),
        CvAction::UpdateLanguage { id, patch } => update_entry(&mut next.languages, &id, &patch),
        CvAction::DeleteLanguage { id } => delete_entry(&mut next.languages, &id),

        CvAction::AddCertification(entry) => next.certifications.push(entry),
        CvAction::UpdateCertification { id, patch } => {
            update_entry(&mut next.certifications, &id, &patch)
        }
        CvAction::DeleteCertification { id } => delete_entry(&mut next.certifications, &id),

        CvAction::AddReference(entry) => next.references.push(entry),
        CvAction::UpdateReference { id, patch } => update_entry(&mut next.references, &id, &patch),
        CvAction::DeleteReference { id } => delete_entry(&mut next.references, &id),

        CvAction::SetTemplate { template } => next.template = template,
        CvAction::UpdateSettings(patch) => {
            let s = &mut next.settings;
            merge(&mut s.font_size, &patch.font_size);
            merge(&mut s.line_height, &patch.line_height);
            merge(&mut s.margins, &patch.margins);
            merge(&mut s.colors, &patch.colors);
            merge(&mut s.sections, &patch.sections);
        }
        CvAction::ToggleSection { section, enabled } => {
            if let Some(cfg) = next.settings.sections.get_mut(&section) {
                cfg.enabled = enabled.unwrap_or(!cfg.enabled);
            }
        }
    }

    if next != *doc {
        next.updated_at = now.max(doc.updated_at);
    }
    next
}

fn update_entry<T: Entry, P: Patch<T>>(list: &mut [T], id: &str, patch: &P) {
    if let Some(entry) = list.iter_mut().find(|e| e.entry_id() == id) {
        patch.apply_to(entry);
    }
}

fn delete_entry<T: Entry>(list: &mut Vec<T>, id: &str) {
    list.retain(|e| e.entry_id() != id);
}

/// Out-of-range `from` leaves the list alone; `to` is clamped to the last slot.
fn move_entry<T>(list: &mut Vec<T>, from: usize, to: usize) {
    if from >= list.len() {
        return;
    }
    let to = to.min(list.len() - 1);
    let entry = list.remove(from);
    list.insert(to, entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn exp(id: &str, company: &str) -> Experience {
        Experience {
            id: id.to_string(),
            company: company.to_string(),
            ..Default::default()
        }
    }

    fn doc_with_experience() -> CvDocument {
        let mut doc = CvDocument::new("cv", t0());
        doc.experience = vec![exp("a", "A"), exp("b", "B"), exp("c", "C")];
        doc
    }

    fn companies(doc: &CvDocument) -> Vec<&str> {
        doc.experience.iter().map(|e| e.company.as_str()).collect()
    }

    #[test]
    fn test_add_experience_prepends() {
        let doc = doc_with_experience();
        let next = reduce(&doc, CvAction::AddExperience(exp("d", "D")), t0() + Duration::seconds(1));
        assert_eq!(companies(&next), vec!["D", "A", "B", "C"]);
        assert_eq!(next.updated_at, t0() + Duration::seconds(1));
        assert_eq!(doc.experience.len(), 3, "input untouched");
    }

    #[test]
    fn test_add_skill_appends() {
        let doc = CvDocument::new("cv", t0());
        let s1 = Skill { id: "s1".into(), name: "Rust".into(), ..Default::default() };
        let s2 = Skill { id: "s2".into(), name: "Go".into(), ..Default::default() };
        let doc = reduce(&doc, CvAction::AddSkill(s1), t0());
        let doc = reduce(&doc, CvAction::AddSkill(s2), t0());
        assert_eq!(doc.skills[1].name, "Go");
    }

    #[test]
    fn test_update_merges_only_given_fields() {
        let doc = doc_with_experience();
        let patch = ExperiencePatch {
            position: Some("Engineer".into()),
            ..Default::default()
        };
        let next = reduce(&doc, CvAction::UpdateExperience { id: "b".into(), patch }, t0());
        assert_eq!(next.experience[1].position, "Engineer");
        assert_eq!(next.experience[1].company, "B");
        assert_eq!(next.experience[0], doc.experience[0]);
        assert_eq!(next.experience[2], doc.experience[2]);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let doc = doc_with_experience();
        let patch = ExperiencePatch { company: Some("X".into()), ..Default::default() };
        let next = reduce(
            &doc,
            CvAction::UpdateExperience { id: "missing".into(), patch },
            t0() + Duration::hours(1),
        );
        assert_eq!(next, doc);
    }

    #[test]
    fn test_delete_removes_entry() {
        let doc = doc_with_experience();
        let next = reduce(&doc, CvAction::DeleteExperience { id: "b".into() }, t0());
        assert_eq!(companies(&next), vec!["A", "C"]);
    }

    #[test]
    fn test_reorder_moves_entry() {
        let doc = doc_with_experience();
        let next = reduce(&doc, CvAction::ReorderExperience { from: 0, to: 2 }, t0());
        assert_eq!(companies(&next), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_reorder_out_of_range_from_is_rejected() {
        let doc = doc_with_experience();
        let next = reduce(&doc, CvAction::ReorderExperience { from: 7, to: 0 }, t0() + Duration::hours(1));
        assert_eq!(next, doc);
    }

    #[test]
    fn test_reorder_out_of_range_to_is_clamped() {
        let doc = doc_with_experience();
        let next = reduce(&doc, CvAction::ReorderExperience { from: 0, to: 99 }, t0());
        assert_eq!(companies(&next), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_toggle_section_flip_and_set() {
        let doc = CvDocument::new("cv", t0());
        let flipped = reduce(
            &doc,
            CvAction::ToggleSection { section: "projects".into(), enabled: None },
            t0(),
        );
        assert!(!flipped.settings.sections["projects"].enabled);

        let set = CvAction::ToggleSection { section: "projects".into(), enabled: Some(false) };
        let once = reduce(&doc, set.clone(), t0());
        let twice = reduce(&once, set, t0());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_toggle_unknown_section_does_not_create_key() {
        let doc = CvDocument::new("cv", t0());
        let next = reduce(
            &doc,
            CvAction::ToggleSection { section: "hobbies".into(), enabled: None },
            t0() + Duration::minutes(5),
        );
        assert_eq!(next, doc);
        assert!(!next.settings.sections.contains_key("hobbies"));
    }

    #[test]
    fn test_updated_at_never_moves_backwards() {
        let doc = CvDocument::new("cv", t0());
        let earlier = t0() - Duration::days(1);
        let next = reduce(&doc, CvAction::SetTemplate { template: "classic".into() }, earlier);
        assert_eq!(next.updated_at, t0());
    }

    #[test]
    fn test_reset_uses_new_id_and_creation_time() {
        let doc = doc_with_experience();
        let later = t0() + Duration::days(2);
        let next = reduce(&doc, CvAction::ResetDocument { id: "fresh".into() }, later);
        assert_eq!(next.id, "fresh");
        assert_eq!(next.created_at, later);
        assert_eq!(next.updated_at, later);
        assert!(next.experience.is_empty());
    }

    #[test]
    fn test_load_keeps_loaded_timestamp() {
        let doc = CvDocument::new("cv", t0());
        let loaded = CvDocument::new("other", t0() - Duration::days(30));
        let next = reduce(&doc, CvAction::LoadDocument(Box::new(loaded.clone())), t0());
        assert_eq!(next, loaded);
    }

    #[test]
    fn test_update_settings_merges() {
        let doc = CvDocument::new("cv", t0());
        let patch = SettingsPatch { font_size: Some(12.0), ..Default::default() };
        let next = reduce(&doc, CvAction::UpdateSettings(patch), t0());
        assert_eq!(next.settings.font_size, 12.0);
        assert_eq!(next.settings.line_height, doc.settings.line_height);
    }

    #[test]
    fn test_action_json_shape() {
        let json = r#"{"type":"UPDATE_PERSONAL","payload":{"firstName":"John"}}"#;
        let action: CvAction = serde_json::from_str(json).unwrap();
        assert_eq!(action.name(), "UPDATE_PERSONAL");

        let json = r#"{"type":"DELETE_SKILL","payload":{"id":"s1"}}"#;
        let action: CvAction = serde_json::from_str(json).unwrap();
        assert_eq!(action, CvAction::DeleteSkill { id: "s1".into() });
    }
}
