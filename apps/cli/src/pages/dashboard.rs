//! Dashboard — greets the signed-in user and lists saved resumes.

use crate::api::resumes;
use crate::errors::AppError;
use crate::state::AppContext;

pub async fn run(ctx: &AppContext) -> Result<(), AppError> {
    let Some(user) = ctx.session.current_user().await else {
        println!("Please sign in first (cvwriter signin).");
        return Err(AppError::NotAuthenticated);
    };

    println!("Welcome back, {}!", user.greeting_name());
    println!("Ready to create your next resume? Run `cvwriter write` to start.\n");

    match resumes::list(&ctx.api).await {
        Ok(records) if records.is_empty() => println!("No saved resumes yet."),
        Ok(records) => {
            println!("Your saved resumes:");
            for r in records {
                let id = r.resume_id.to_string();
                let short_id = &id[..8.min(id.len())];
                print!("  {short_id}…  created {}", r.created_at.format("%Y-%m-%d"));
                if let Some(job_url) = &r.job_url {
                    print!("  job: {job_url}");
                }
                if let Some(storage_url) = &r.storage_url {
                    print!("  pdf: {storage_url}");
                }
                println!();
            }
        }
        Err(e) => println!("Could not load saved resumes: {}", e.user_message()),
    }

    Ok(())
}
