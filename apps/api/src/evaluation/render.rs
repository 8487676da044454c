use std::fmt::Write;

use crate::models::requirement::Requirement;

/// Renders a requirement as a stable plain-text block for the evaluation prompt.
/// Absent fields are omitted entirely.
pub fn render_requirement(requirement: &Requirement) -> String {
    let mut out = String::from("Job requirements:\n");

    // write! into a String cannot fail
    let _ = writeln!(out, "Job title: {}\n", requirement.job_title.trim());

    if let Some(years) = requirement.experience_years {
        let _ = writeln!(out, "Experience: {years}+ years\n");
    }

    if let Some(education) = non_blank(&requirement.education) {
        let _ = writeln!(out, "Education: {education}\n");
    }

    if !requirement.skills.is_empty() {
        out.push_str("Skills:\n");
        for skill in &requirement.skills {
            let level = skill.level.trim();
            if level.is_empty() {
                let _ = writeln!(out, "- {}", skill.name.trim());
            } else {
                let _ = writeln!(out, "- {}: {}", skill.name.trim(), level);
            }
        }
        out.push('\n');
    }

    if let Some(description) = non_blank(&requirement.description) {
        let _ = writeln!(out, "Description:\n{description}\n");
    }

    out
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
