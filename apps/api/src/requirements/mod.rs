pub mod handlers;

use crate::models::requirement::{Requirement, RequirementPatch, SkillRequirement};

fn check_skills(skills: &[SkillRequirement]) -> Result<(), String> {
    if let Some(pos) = skills.iter().position(|s| s.name.trim().is_empty()) {
        return Err(format!("skills[{pos}].name must not be empty"));
    }
    Ok(())
}

/// Years are stored as a signed 32-bit column.
fn check_years(years: Option<u32>) -> Result<(), String> {
    match years {
        Some(y) if i32::try_from(y).is_err() => {
            Err(format!("experience_years must be at most {}", i32::MAX))
        }
        _ => Ok(()),
    }
}

/// Rejects requirements the evaluator could not render meaningfully.
pub fn validate_requirement(requirement: &Requirement) -> Result<(), String> {
    if requirement.job_title.trim().is_empty() {
        return Err("job_title must not be empty".to_string());
    }
    check_years(requirement.experience_years)?;
    check_skills(&requirement.skills)
}

pub fn validate_patch(patch: &RequirementPatch) -> Result<(), String> {
    if patch.is_empty() {
        return Err("update must change at least one field".to_string());
    }
    if patch
        .job_title
        .as_deref()
        .is_some_and(|t| t.trim().is_empty())
    {
        return Err("job_title must not be empty".to_string());
    }
    check_years(patch.experience_years)?;
    match &patch.skills {
        Some(skills) => check_skills(skills),
        None => Ok(()),
    }
}
