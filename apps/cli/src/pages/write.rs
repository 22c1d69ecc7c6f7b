//! Resume writer — the multi-stage wizard page.
//!
//! Flow: forced profile upload for fresh users → job description input →
//! profile validation (with the backend completion dialog when needed) →
//! generation → preview/edit → PDF → complete.

use std::path::Path;

use crate::api::completion::{self, CompletionAnswer, CompletionQuestion};
use crate::api::{profile as profile_api, resumes, save_download};
use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::pages::{prompt_line, prompt_multiline, prompt_yes_no};
use crate::state::AppContext;
use crate::workflow::{Stage, WorkflowSession};

pub async fn run(ctx: &AppContext) -> Result<(), AppError> {
    let Some(user) = ctx.session.current_user().await else {
        println!("Sign in to generate resumes, or run `cvwriter simple` for the no-account flow.");
        return Err(AppError::NotAuthenticated);
    };

    // Fresh users must put a profile in place before the wizard opens. The
    // only way past the prompt is a successful upload or the explicit
    // minimal-profile skip, both of which persist a profile.
    if ctx.session.needs_profile_upload().await {
        force_profile_upload(ctx).await?;
        ctx.session.set_needs_profile_upload(false).await;
    }

    let profile = match profile_api::load(&ctx.api).await? {
        Some(profile) => profile,
        None => Profile::minimal(),
    };

    let mut session = WorkflowSession::new();
    session.set_profile(Some(profile));

    // Stage: input. Re-prompt until the length heuristic passes.
    loop {
        let jd = prompt_multiline("Paste the job description")?;
        if session.set_job_description(&jd) {
            break;
        }
        for message in &session.validation().messages {
            println!("  {message}");
        }
    }

    // Structurally incomplete profiles go through the completion dialog
    // before generation is allowed.
    if session.needs_completion() {
        println!("Your profile is missing some information, so a few quick questions first.");
        let current = session.profile().cloned().unwrap_or_default();
        match completion::run(&ctx.api, &current, ask_question).await {
            Ok((completed, message)) => {
                if let Some(message) = message {
                    println!("{message}");
                }
                profile_api::upsert(&ctx.api, &completed).await?;
                session.set_profile(Some(completed));
            }
            Err(e) => {
                println!("Profile completion failed: {}", e.user_message());
                return Ok(());
            }
        }
    }

    match session.validate_with_backend(&ctx.api).await {
        Ok(true) => {}
        Ok(false) => {
            println!("Profile is not ready for generation:");
            for message in &session.validation().messages {
                println!("  {message}");
            }
            return Ok(());
        }
        Err(e) => {
            println!("Validation check failed: {}", e.user_message());
            return Ok(());
        }
    }

    println!("Generating resume…");
    if let Err(rejection) = session.run_generation(&ctx.api).await {
        println!("Cannot generate: {rejection}");
        return Ok(());
    }
    if session.stage() == Stage::Input {
        if let Some(error) = session.last_error() {
            println!("Generation failed: {error}");
        }
        println!("Your job description and profile were kept. Try again with `cvwriter write`.");
        return Ok(());
    }

    preview_loop(ctx, &mut session, &user.id).await
}

/// Preview stage: show the markdown and take edit/pdf/reset commands until
/// the user is done.
async fn preview_loop(
    ctx: &AppContext,
    session: &mut WorkflowSession,
    user_id: &str,
) -> Result<(), AppError> {
    println!("\n──── Generated resume ────\n");
    if let Some(markdown) = session.generated_markdown() {
        println!("{markdown}");
    }
    if let Some(id) = session.generated_resume_id() {
        println!("\nResume ID: {id}");
    }

    while session.stage() == Stage::Preview {
        let choice = prompt_line("[e]dit markdown, [d]ownload PDF, [s]tore PDF, [r]eset, [q]uit")?;
        match choice.as_str() {
            "e" => {
                let edited = prompt_multiline("Enter the updated markdown")?;
                session.edit_markdown(&edited);
                println!("Markdown updated locally. It will be used for PDF rendering.");
            }
            "d" => {
                let Some(markdown) = session.generated_markdown().map(str::to_string) else {
                    continue;
                };
                match resumes::render_pdf(&ctx.api, &markdown).await {
                    Ok(bytes) => {
                        let file_name = format!("resume_{user_id}.pdf");
                        save_download(&bytes, Path::new(&file_name))?;
                        println!("Saved {file_name}");
                        session.request_pdf();
                    }
                    Err(e) => println!("PDF generation failed: {}", e.user_message()),
                }
            }
            "s" => {
                let (Some(markdown), Some(resume_id)) = (
                    session.generated_markdown().map(str::to_string),
                    session.generated_resume_id(),
                ) else {
                    continue;
                };
                match resumes::render_and_store_pdf(&ctx.api, &markdown, resume_id).await {
                    Ok(stored) => {
                        println!("PDF stored.");
                        if let Some(url) = stored.storage_url {
                            println!("Download: {url}");
                        }
                        session.request_pdf();
                    }
                    Err(e) => println!("PDF storage failed: {}", e.user_message()),
                }
            }
            "r" => {
                if prompt_yes_no("Discard this resume and start over?")? {
                    session.reset();
                    println!("Wizard reset. Run `cvwriter write` to start again.");
                    return Ok(());
                }
            }
            "q" => return Ok(()),
            _ => println!("Unknown choice '{choice}'"),
        }
    }

    if session.stage() == Stage::Complete {
        println!("All done, your resume is ready.");
    }
    Ok(())
}

/// Upload prompt for users with no stored profile. Loops until a profile is
/// in place; invalid files are reported and re-prompted, never applied.
async fn force_profile_upload(ctx: &AppContext) -> Result<(), AppError> {
    println!("No profile found for your account. Upload one to continue.");
    loop {
        let answer = prompt_line("Path to a profile JSON file (or 'skip' for an empty profile)")?;
        if answer.eq_ignore_ascii_case("skip") {
            let minimal = Profile::minimal();
            profile_api::upsert(&ctx.api, &minimal).await?;
            println!("Empty profile created. Fill it in with `cvwriter profile`.");
            return Ok(());
        }

        match Profile::from_json_file(Path::new(&answer)) {
            Ok(profile) => {
                profile_api::upsert(&ctx.api, &profile).await?;
                println!("Profile uploaded.");
                return Ok(());
            }
            Err(e) => println!("  {e}"),
        }
    }
}

/// stdin prompt for one completion-dialog question.
fn ask_question(question: &CompletionQuestion) -> CompletionAnswer {
    let kind = if question.required {
        "Required"
    } else {
        "Recommended"
    };
    println!("\n[{kind}] {}", question.question);
    if !question.context.is_empty() {
        println!("  ({})", question.context);
    }
    if !question.suggestions.is_empty() {
        println!("  Suggestions: {}", question.suggestions.join(", "));
    }

    match prompt_line("Answer (empty to skip)") {
        Ok(answer) if answer.is_empty() => CompletionAnswer::Skip,
        Ok(answer) => CompletionAnswer::Response(answer),
        Err(_) => CompletionAnswer::Skip,
    }
}
