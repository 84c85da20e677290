//! Presentation helpers shared by the templates.

use crate::document::{parse_cv_date, Skill};

/// `"2021-03"` → `"Mar 2021"`. Unparseable input is returned trimmed as-is.
pub fn format_month(date: &str) -> String {
    match parse_cv_date(date) {
        Some(d) => d.format("%b %Y").to_string(),
        None => date.trim().to_string(),
    }
}

/// `"Mar 2021 - Present"`, `"Mar 2021 - Jun 2023"`, or whichever side is set.
pub fn date_range(start: &str, end: &str, current: bool) -> String {
    let start = format_month(start);
    let end = if current {
        "Present".to_string()
    } else {
        format_month(end)
    };
    match (start.is_empty(), end.is_empty()) {
        (false, false) => format!("{} - {}", start, end),
        (false, true) => start,
        (true, false) => end,
        (true, true) => String::new(),
    }
}

/// Groups skills by category, keeping first-seen category order.
/// Blank categories collect under `"Other"`.
pub fn group_skills_by_category(skills: &[Skill]) -> Vec<(String, Vec<&Skill>)> {
    let mut groups: Vec<(String, Vec<&Skill>)> = Vec::new();
    for skill in skills.iter().filter(|s| !s.name.trim().is_empty()) {
        let category = match skill.category.trim() {
            "" => "Other",
            c => c,
        };
        match groups.iter_mut().find(|(name, _)| name == category) {
            Some((_, members)) => members.push(skill),
            None => groups.push((category.to_string(), vec![skill])),
        }
    }
    groups
}

/// Joins non-blank parts with `sep`.
pub fn join_non_empty<'a, I>(parts: I, sep: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(name: &str, category: &str) -> Skill {
        Skill {
            id: name.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_format_month() {
        assert_eq!(format_month("2021-03"), "Mar 2021");
        assert_eq!(format_month("2021-12-24"), "Dec 2021");
        assert_eq!(format_month(" Summer 2020 "), "Summer 2020");
    }

    #[test]
    fn test_date_range() {
        assert_eq!(date_range("2021-03", "", true), "Mar 2021 - Present");
        assert_eq!(date_range("2021-03", "2023-06", false), "Mar 2021 - Jun 2023");
        assert_eq!(date_range("2021-03", "", false), "Mar 2021");
        assert_eq!(date_range("", "", false), "");
    }

    #[test]
    fn test_group_skills_keeps_first_seen_order() {
        let skills = vec![
            skill("Rust", "Languages"),
            skill("Postgres", "Databases"),
            skill("Go", "Languages"),
            skill("Kanban", ""),
            skill("", "Languages"),
        ];
        let groups = group_skills_by_category(&skills);
        let names: Vec<_> = groups.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(names, vec!["Languages", "Databases", "Other"]);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_join_non_empty() {
        assert_eq!(join_non_empty(["a", " ", "b"], " | "), "a | b");
    }
}
