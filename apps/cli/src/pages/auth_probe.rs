//! Dev-only auth probe: prints session state and exercises a token fetch.
//! Not linked from anywhere user-facing.

use crate::api::TokenProvider;
use crate::errors::AppError;
use crate::state::AppContext;

pub async fn run(ctx: &AppContext) -> Result<(), AppError> {
    println!("initialized: {}", ctx.session.is_initialized().await);
    match ctx.session.current_user().await {
        Some(user) => {
            println!("user: {} ({})", user.id, user.email.as_deref().unwrap_or("no email"));
            println!("needs_profile_upload: {}", ctx.session.needs_profile_upload().await);
        }
        None => println!("user: none"),
    }

    match ctx.session.access_token().await {
        Ok(token) => {
            let prefix: String = token.chars().take(8).collect();
            println!("access token: {prefix}… ({} chars)", token.chars().count());

            // Round-trip the token through the provider to prove it is live.
            match ctx.session.provider().get_user(&token).await {
                Ok(user) => println!("provider says: {}", user.greeting_name()),
                Err(e) => println!("provider rejected the token: {e}"),
            }
        }
        Err(e) => println!("access token: unavailable ({e})"),
    }
    Ok(())
}
