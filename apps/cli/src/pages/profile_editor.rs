//! Profile editor — CRUD over the candidate profile with explicit save.
//! All edits are held in an in-memory draft; nothing reaches the backend
//! until the save command.

use crate::api::profile as profile_api;
use crate::errors::AppError;
use crate::models::profile::{Education, Profile, SkillCategory, WorkExperience};
use crate::pages::{prompt_line, prompt_yes_no};
use crate::state::AppContext;

pub async fn run(ctx: &AppContext) -> Result<(), AppError> {
    if ctx.session.current_user().await.is_none() {
        println!("Please sign in first (cvwriter signin).");
        return Err(AppError::NotAuthenticated);
    }

    // 404 means a fresh account, not a failure; open with an empty draft.
    let mut draft = match profile_api::load(&ctx.api).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            println!("No stored profile yet, starting a new one.");
            Profile::minimal()
        }
        Err(e) => {
            println!("Could not load your profile: {}", e.user_message());
            return Ok(());
        }
    };

    print_summary(&draft);
    println!("Commands: set <field>, add-exp, edit-exp <n>, rm-exp <n>, add-edu, edit-edu <n>, rm-edu <n>,");
    println!("          add-skill <tech|process|lang>, rm-skill <tech|process|lang> <n>,");
    println!("          show, save, quit");

    loop {
        let input = prompt_line("profile>")?;
        let mut parts = input.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("set"), Some(field), _) => set_field(&mut draft, field)?,
            (Some("add-exp"), _, _) => {
                let entry = WorkExperience {
                    title: prompt_line("  Title")?,
                    company: prompt_line("  Company")?,
                    start_date: prompt_line("  Start (YYYY-MM)")?,
                    end_date: match prompt_line("  End (YYYY-MM, empty if current)")? {
                        s if s.is_empty() => None,
                        s => Some(s),
                    },
                    responsibilities: prompt_list("  Responsibility")?,
                    achievements: prompt_list("  Achievement")?,
                };
                draft.add_experience(entry);
            }
            (Some("rm-exp"), Some(n), _) => {
                if parse_index(n).and_then(|i| draft.remove_experience(i)).is_none() {
                    println!("No experience entry {n}");
                }
            }
            (Some("edit-exp"), Some(n), _) => {
                let Some(index) = parse_index(n).filter(|&i| i < draft.work_experience.len())
                else {
                    println!("No experience entry {n}");
                    continue;
                };
                let mut entry = draft.work_experience[index].clone();
                entry.title = prompt_default("  Title", &entry.title)?;
                entry.company = prompt_default("  Company", &entry.company)?;
                draft.update_experience(index, entry);
            }
            (Some("add-edu"), _, _) => {
                let entry = Education {
                    degree: prompt_line("  Degree")?,
                    institution: prompt_line("  Institution")?,
                    start_date: prompt_line("  Start (YYYY)")?,
                    end_date: match prompt_line("  End (YYYY, empty if ongoing)")? {
                        s if s.is_empty() => None,
                        s => Some(s),
                    },
                };
                draft.add_education(entry);
            }
            (Some("rm-edu"), Some(n), _) => {
                if parse_index(n).and_then(|i| draft.remove_education(i)).is_none() {
                    println!("No education entry {n}");
                }
            }
            (Some("edit-edu"), Some(n), _) => {
                let Some(index) = parse_index(n).filter(|&i| i < draft.education.len()) else {
                    println!("No education entry {n}");
                    continue;
                };
                let mut entry = draft.education[index].clone();
                entry.degree = prompt_default("  Degree", &entry.degree)?;
                entry.institution = prompt_default("  Institution", &entry.institution)?;
                draft.update_education(index, entry);
            }
            (Some("add-skill"), Some(cat), _) => {
                let Some(category) = skill_category(cat) else {
                    println!("Unknown skill list '{cat}'");
                    continue;
                };
                draft.add_skill(category, prompt_line("  Skill")?);
            }
            (Some("rm-skill"), Some(cat), Some(n)) => {
                let Some(category) = skill_category(cat) else {
                    println!("Unknown skill list '{cat}'");
                    continue;
                };
                if parse_index(n).and_then(|i| draft.remove_skill(category, i)).is_none() {
                    println!("No skill {n} in {cat}");
                }
            }
            (Some("show"), _, _) => print_summary(&draft),
            (Some("save"), _, _) => match profile_api::save(&ctx.api, &draft).await {
                Ok(()) => {
                    println!("Profile saved.");
                    return Ok(());
                }
                Err(e) => println!("Save failed: {}", e.user_message()),
            },
            (Some("quit"), _, _) => {
                if prompt_yes_no("Discard unsaved changes?")? {
                    return Ok(());
                }
            }
            (Some(other), _, _) => println!("Unknown command '{other}'"),
            (None, _, _) => {}
        }
    }
}

fn set_field(draft: &mut Profile, field: &str) -> Result<(), AppError> {
    let value = prompt_line(&format!("  {field}"))?;
    match field {
        "name" => draft.personal_info.full_name = value,
        "email" => draft.personal_info.email = value,
        "phone" => draft.personal_info.phone = value,
        "location" => draft.personal_info.location = value,
        "link" => draft.personal_info.linkedin_url = value,
        "summary" => draft.personal_summary = value,
        other => println!("Unknown field '{other}' (name, email, phone, location, link, summary)"),
    }
    Ok(())
}

/// Prompt that keeps the current value when the user just presses enter.
fn prompt_default(label: &str, current: &str) -> Result<String, AppError> {
    let value = prompt_line(&format!("{label} [{current}]"))?;
    Ok(if value.is_empty() {
        current.to_string()
    } else {
        value
    })
}

fn prompt_list(label: &str) -> Result<Vec<String>, AppError> {
    let mut items = Vec::new();
    loop {
        let item = prompt_line(&format!("{label} (empty to finish)"))?;
        if item.is_empty() {
            return Ok(items);
        }
        items.push(item);
    }
}

fn parse_index(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok()
}

fn skill_category(raw: &str) -> Option<SkillCategory> {
    match raw {
        "tech" => Some(SkillCategory::Technical),
        "process" => Some(SkillCategory::Process),
        "lang" => Some(SkillCategory::Language),
        _ => None,
    }
}

fn print_summary(profile: &Profile) {
    println!("\n── Profile ──");
    println!(
        "{} <{}>  {}  {}",
        profile.personal_info.full_name,
        profile.personal_info.email,
        profile.personal_info.phone,
        profile.personal_info.location
    );
    if !profile.personal_summary.is_empty() {
        println!("{}", profile.personal_summary);
    }
    for (i, exp) in profile.work_experience.iter().enumerate() {
        println!("  exp[{i}] {} at {}", exp.title, exp.company);
    }
    for (i, edu) in profile.education.iter().enumerate() {
        println!("  edu[{i}] {} at {}", edu.degree, edu.institution);
    }
    println!(
        "  skills: tech={:?} process={:?} lang={:?}",
        profile.skills.technical_skills, profile.skills.process_skills, profile.skills.languages
    );
    if !profile.is_valid() {
        println!("  (incomplete: {})", profile.missing_required_fields().join(", "));
    }
    println!();
}
