//! Sign-in page — hosted OAuth (open the URL, paste the callback code) or a
//! direct email/password grant. Either way the resulting session lands in
//! the session store and is persisted for the next run.

use crate::errors::AppError;
use crate::pages::prompt_line;
use crate::state::AppContext;

pub async fn run(ctx: &AppContext) -> Result<(), AppError> {
    if let Some(user) = ctx.session.current_user().await {
        println!("Already signed in as {}.", user.greeting_name());
        return Ok(());
    }

    let provider = ctx.session.provider();
    let method = prompt_line("Sign in with [o]auth or [p]assword")?;

    let (user, tokens) = match method.as_str() {
        "o" | "oauth" => {
            let url = provider.authorize_url("google", &ctx.config.oauth_redirect_url)?;
            println!("Open this URL in your browser and authorize:");
            println!("  {url}");
            let code = prompt_line("Paste the code from the callback URL")?;
            provider.exchange_code(&code).await?
        }
        "p" | "password" => {
            let email = prompt_line("Email")?;
            let password = prompt_line("Password")?;
            provider.sign_in_with_password(&email, &password).await?
        }
        other => {
            println!("Unknown method '{other}'");
            return Ok(());
        }
    };

    ctx.session.accept_session(user.clone(), tokens).await;
    println!("Signed in as {}.", user.greeting_name());

    if ctx.session.needs_profile_upload().await {
        println!("No profile stored yet; `cvwriter write` will ask for an upload.");
    }
    Ok(())
}
