//! Simple generator — the no-account flow. Takes a job offer URL and a
//! profile JSON file, calls the flexible generation endpoint anonymously,
//! and prints the result.

use std::path::Path;

use crate::api::{resumes, ApiClient};
use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::pages::prompt_line;
use crate::state::AppContext;

pub async fn run(ctx: &AppContext) -> Result<(), AppError> {
    let api = ApiClient::anonymous(&ctx.config.api_base_url);

    let job_offer_url = prompt_line("Job offer URL (optional, empty to skip)")?;
    let path = prompt_line("Path to your profile JSON file")?;

    // Parse before upload: a malformed file is rejected here and nothing is
    // sent to the backend.
    let raw = std::fs::read_to_string(Path::new(&path))?;
    Profile::from_json_str(&raw)?;

    let file_name = Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("profile.json")
        .to_string();

    println!("Generating resume…");
    match resumes::generate_flexible(&api, &job_offer_url, raw.into_bytes(), &file_name).await {
        Ok(generated) => {
            println!("\n──── Generated resume ────\n");
            println!("{}", generated.markdown);
            println!("\nResume ID: {}", generated.resume_id);
            if let Some(url) = generated.storage_url {
                println!("PDF ready: {url}");
            } else {
                println!("PDF still generating server-side.");
            }
            Ok(())
        }
        Err(e) => {
            println!("Generation failed: {}", e.user_message());
            Ok(())
        }
    }
}
