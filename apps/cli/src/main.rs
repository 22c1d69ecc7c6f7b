mod api;
mod auth;
mod config;
mod errors;
mod models;
mod pages;
mod state;
mod workflow;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::{ApiClient, TokenProvider};
use crate::auth::provider::AuthProviderClient;
use crate::auth::SessionStore;
use crate::config::Config;
use crate::state::AppContext;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cvwriter v{}", env!("CARGO_PKG_VERSION"));

    let provider = AuthProviderClient::new(config.auth_url.clone(), config.auth_anon_key.clone());
    let session = Arc::new(SessionStore::new(
        provider,
        config.api_base_url.clone(),
        PathBuf::from(&config.session_file),
    ));
    session.initialize().await;

    let token_provider: Arc<dyn TokenProvider> = session.clone();
    let api = ApiClient::new(&config.api_base_url, token_provider);

    let ctx = AppContext {
        config,
        session: Arc::clone(&session),
        api,
    };

    let page = std::env::args().nth(1);
    let result = match page.as_deref() {
        Some("dashboard") => pages::dashboard::run(&ctx).await,
        Some("write") => pages::write::run(&ctx).await,
        Some("simple") => pages::simple::run(&ctx).await,
        Some("profile") => pages::profile_editor::run(&ctx).await,
        Some("signin") => pages::signin::run(&ctx).await,
        Some("signout") => {
            ctx.session.sign_out().await;
            println!("Signed out.");
            Ok(())
        }
        Some("auth-probe") => pages::auth_probe::run(&ctx).await,
        Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown page: {unknown}\n");
            print_help();
            Ok(())
        }
    };

    session.shutdown();

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!("cvwriter — AI resume writer client");
    println!();
    println!("USAGE:");
    println!("    cvwriter <PAGE>");
    println!();
    println!("PAGES:");
    println!("    signin      Sign in via OAuth or email/password");
    println!("    signout     Clear the current session");
    println!("    dashboard   Greeting and saved-resume list");
    println!("    write       The resume wizard (requires sign-in)");
    println!("    simple      Generate without an account");
    println!("    profile     Edit your stored profile");
}
