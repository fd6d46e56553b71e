//! services/client/src/bin/peerconnect.rs

use client_lib::{
    adapters::{HttpProfileStore, LocalIdentityProvider},
    app::{flows, App},
    config::Config,
    error::ClientError,
};
use peerconnect_core::resolution::{Route, View};
use std::io::Write;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded.");

    // --- 2. Initialize Adapters ---
    let store = Arc::new(HttpProfileStore::new(
        config.api_base.clone(),
        config.http_timeout,
    )?);
    let identity = Arc::new(LocalIdentityProvider::new(config.identity.clone()));

    // --- 3. Wire the Application ---
    let app = App::start(config.clone(), store, identity);
    let state = app.state.clone();

    // --- 4. Sign In and Route ---
    let session = flows::sign_in(&state).await?;
    info!(email = %session.email, "Signed in.");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match flows::route(&state, View::Dashboard).await {
        Route::Dashboard(_) => {
            let dashboard = flows::load_dashboard(&state).await?;
            if let Some(me) = &dashboard.me {
                writeln!(out, "{} <{}>", me.full_name, me.email)?;
                writeln!(out, "Skills: {}", me.skills.join(", "))?;
            }
            writeln!(out, "People you may like:")?;
            if dashboard.matches.is_empty() {
                writeln!(out, "  (no other users yet)")?;
            }
            for entry in &dashboard.matches {
                let candidate = &entry.result.candidate;
                writeln!(
                    out,
                    "  [{}] {} <{}> {}",
                    entry.result.score,
                    candidate.full_name,
                    candidate.email,
                    candidate.headline.as_deref().unwrap_or("-"),
                )?;
                if !entry.shared_skills.is_empty() {
                    writeln!(out, "      shared: {}", entry.shared_skills.join(", "))?;
                }
            }
        }
        Route::CreateProfile => {
            writeln!(out, "No profile found for {}. Create one to get matched.", session.email)?;
        }
        Route::Retry(e) => {
            writeln!(out, "Could not load your profile ({}). Try again.", e)?;
        }
        other => {
            writeln!(out, "Unexpected route: {:?}", other)?;
        }
    }
    drop(out);

    // --- 5. Shut Down ---
    app.shutdown().await;
    Ok(())
}
