//! Validation Engine - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! The report maps them to error, warning and suggestion lists.
//! Validation is advisory: it never blocks editing, saving or export.

use serde::{Deserialize, Serialize};

use crate::document::{parse_cv_date, CvDocument, SUMMARY_MAX_CHARS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub remediation: Vec<String>,
}

impl ValidationViolation {
    fn error(rule: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            severity: ViolationSeverity::Error,
            message: message.into(),
            remediation: vec![],
        }
    }

    fn with_remediation(mut self, hint: impl Into<String>) -> Self {
        self.remediation.push(hint.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationReport {
    pub fn from_violations(violations: Vec<ValidationViolation>) -> Self {
        let messages = |severity: ViolationSeverity| -> Vec<String> {
            violations
                .iter()
                .filter(|v| v.severity == severity)
                .map(|v| v.message.clone())
                .collect()
        };
        let errors = messages(ViolationSeverity::Error);
        let warnings = messages(ViolationSeverity::Warning);
        let suggestions = messages(ViolationSeverity::Info);

        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
            violations,
        }
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, doc: &CvDocument) -> Vec<ValidationViolation>;
}

/// Fails closed on anything that is not `local@label.label` with a 2+ letter TLD.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return false;
    }
    let tld = labels[labels.len() - 1];
    tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn entry_label(primary: &str, index: usize) -> String {
    if blank(primary) {
        format!("#{}", index + 1)
    } else {
        format!("\"{}\"", primary.trim())
    }
}

// --- Concrete Rules ---

pub struct RequiredPersonalFieldsRule;

impl ValidationRule for RequiredPersonalFieldsRule {
    fn name(&self) -> &'static str { "required_personal_fields" }

    fn validate(&self, doc: &CvDocument) -> Vec<ValidationViolation> {
        let p = &doc.personal;
        [
            (&p.first_name, "First name is required"),
            (&p.last_name, "Last name is required"),
            (&p.email, "Email is required"),
            (&p.phone, "Phone number is required"),
            (&p.location, "Location is required"),
        ]
        .into_iter()
        .filter(|(value, _)| blank(value))
        .map(|(_, message)| ValidationViolation::error(self.name(), message))
        .collect()
    }
}

pub struct EmailFormatRule;

impl ValidationRule for EmailFormatRule {
    fn name(&self) -> &'static str { "email_format" }

    fn validate(&self, doc: &CvDocument) -> Vec<ValidationViolation> {
        let email = &doc.personal.email;
        if blank(email) || is_valid_email(email) {
            return vec![];
        }
        vec![ValidationViolation::error(self.name(), "Please enter a valid email address")
            .with_remediation("Use the form name@example.com")]
    }
}

pub struct SummaryLengthRule;

impl ValidationRule for SummaryLengthRule {
    fn name(&self) -> &'static str { "summary_length" }

    fn validate(&self, doc: &CvDocument) -> Vec<ValidationViolation> {
        let len = doc.personal.summary.chars().count();
        if len <= SUMMARY_MAX_CHARS {
            return vec![];
        }
        vec![ValidationViolation::error(
            self.name(),
            format!(
                "Professional summary must be at most {} characters (currently {})",
                SUMMARY_MAX_CHARS, len
            ),
        )
        .with_remediation("Keep the summary to two or three focused sentences")]
    }
}

pub struct ExperienceEntriesRule;

impl ValidationRule for ExperienceEntriesRule {
    fn name(&self) -> &'static str { "experience_entries" }

    fn validate(&self, doc: &CvDocument) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for (i, exp) in doc.experience.iter().enumerate() {
            let label = entry_label(&exp.position, i);
            if blank(&exp.company) {
                violations.push(ValidationViolation::error(
                    self.name(),
                    format!("Experience {}: company is required", label),
                ));
            }
            if blank(&exp.position) {
                violations.push(ValidationViolation::error(
                    self.name(),
                    format!("Experience {}: position is required", label),
                ));
            }
            if blank(&exp.start_date) {
                violations.push(ValidationViolation::error(
                    self.name(),
                    format!("Experience {}: start date is required", label),
                ));
            }
            if !exp.current && blank(&exp.end_date) {
                violations.push(
                    ValidationViolation::error(
                        self.name(),
                        format!("Experience {}: end date is required", label),
                    )
                    .with_remediation("Add an end date or mark this as your current role"),
                );
            }
        }
        violations
    }
}

pub struct EducationEntriesRule;

impl ValidationRule for EducationEntriesRule {
    fn name(&self) -> &'static str { "education_entries" }

    fn validate(&self, doc: &CvDocument) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for (i, edu) in doc.education.iter().enumerate() {
            let label = entry_label(&edu.degree, i);
            if blank(&edu.institution) {
                violations.push(ValidationViolation::error(
                    self.name(),
                    format!("Education {}: institution is required", label),
                ));
            }
            if blank(&edu.degree) {
                violations.push(ValidationViolation::error(
                    self.name(),
                    format!("Education {}: degree is required", label),
                ));
            }
        }
        violations
    }
}

pub struct SkillEntriesRule;

impl ValidationRule for SkillEntriesRule {
    fn name(&self) -> &'static str { "skill_entries" }

    fn validate(&self, doc: &CvDocument) -> Vec<ValidationViolation> {
        doc.skills
            .iter()
            .enumerate()
            .filter(|(_, s)| blank(&s.name))
            .map(|(i, _)| {
                ValidationViolation::error(self.name(), format!("Skill #{}: name is required", i + 1))
            })
            .collect()
    }
}

/// End date earlier than start date. Warning only.
pub struct DateOrderRule;

impl ValidationRule for DateOrderRule {
    fn name(&self) -> &'static str { "date_order" }

    fn validate(&self, doc: &CvDocument) -> Vec<ValidationViolation> {
        let experience = doc.experience.iter().enumerate().map(|(i, e)| {
            ("Experience", entry_label(&e.position, i), &e.start_date, &e.end_date, e.current)
        });
        let education = doc.education.iter().enumerate().map(|(i, e)| {
            ("Education", entry_label(&e.degree, i), &e.start_date, &e.end_date, e.current)
        });

        experience
            .chain(education)
            .filter(|(_, _, _, _, current)| !current)
            .filter_map(|(kind, label, start, end, _)| {
                let (start, end) = (parse_cv_date(start)?, parse_cv_date(end)?);
                (end < start).then(|| ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Warning,
                    message: format!("{} {}: end date is before start date", kind, label),
                    remediation: vec!["Check the dates for this entry".to_string()],
                })
            })
            .collect()
    }
}

/// Roles with neither description nor achievements parse poorly in ATS software.
pub struct AtsContentRule;

impl ValidationRule for AtsContentRule {
    fn name(&self) -> &'static str { "ats_content" }

    fn validate(&self, doc: &CvDocument) -> Vec<ValidationViolation> {
        doc.experience
            .iter()
            .enumerate()
            .filter(|(_, e)| blank(&e.description) && e.achievements.iter().all(|a| blank(a)))
            .map(|(i, e)| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Info,
                message: format!(
                    "Experience {}: add a description or achievements",
                    entry_label(&e.position, i)
                ),
                remediation: vec!["Describe outcomes with concrete numbers".to_string()],
            })
            .collect()
    }
}

/// Validator runs every rule and builds the report.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredPersonalFieldsRule),
                Box::new(EmailFormatRule),
                Box::new(SummaryLengthRule),
                Box::new(ExperienceEntriesRule),
                Box::new(EducationEntriesRule),
                Box::new(SkillEntriesRule),
                Box::new(DateOrderRule),
                Box::new(AtsContentRule),
            ],
        }
    }

    pub fn with_rule(mut self, rule: Box<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn validate(&self, doc: &CvDocument) -> ValidationReport {
        let violations = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(doc))
            .collect();
        ValidationReport::from_violations(violations)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    pub percentage: u8,
    pub completed: usize,
    pub total: usize,
    pub missing: Vec<String>,
}

/// Ten equally weighted checks: five required personal fields, the summary,
/// any profile link, and non-empty experience, education and skills.
pub fn completion_report(doc: &CvDocument) -> CompletionReport {
    let p = &doc.personal;
    let has_link = !blank(&p.linkedin) || !blank(&p.website) || !blank(&p.github);
    let checks: [(&str, bool); 10] = [
        ("first name", !blank(&p.first_name)),
        ("last name", !blank(&p.last_name)),
        ("email", !blank(&p.email)),
        ("phone", !blank(&p.phone)),
        ("location", !blank(&p.location)),
        ("summary", !blank(&p.summary)),
        ("profile link", has_link),
        ("experience", !doc.experience.is_empty()),
        ("education", !doc.education.is_empty()),
        ("skills", !doc.skills.is_empty()),
    ];

    let total = checks.len();
    let completed = checks.iter().filter(|(_, ok)| *ok).count();
    let percentage = ((completed as f64 / total as f64) * 100.0).round() as u8;

    CompletionReport {
        percentage,
        completed,
        total,
        missing: checks
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| name.to_string())
            .collect(),
    }
}

pub fn completion_percentage(doc: &CvDocument) -> u8 {
    completion_report(doc).percentage
}
