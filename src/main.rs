use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use unirec_client::{
    app::{App, Destination},
    config::Config,
    services::HttpApiClient,
    store::{FileStore, SessionStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    tracing::info!(api = %config.api_base_url, state_dir = %config.state_dir.display(), "Starting client");

    let api = Arc::new(HttpApiClient::from_config(&config).context("Failed to build HTTP client")?);
    let backend = FileStore::open(&config.state_dir).context("Failed to open state directory")?;
    let mut app = App::new(api, SessionStore::new(Arc::new(backend)), &config);
    app.boot()?;

    if !app.is_authenticated() {
        let (Some(email), Some(password)) = (&config.login_email, &config.login_password) else {
            tracing::info!("No saved session; set LOGIN_EMAIL and LOGIN_PASSWORD to sign in");
            return Ok(());
        };
        app.navigate(Destination::Login)?;
        if let Err(e) = app.login(email, password).await {
            let message = app
                .auth()
                .and_then(|auth| auth.error())
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string());
            anyhow::bail!("Login failed: {}", message);
        }
    }

    app.settle().await;

    let Some(workspace) = app.workspace() else {
        anyhow::bail!("Session ended unexpectedly");
    };
    let feed = workspace.feed();
    tracing::info!(
        user = %workspace.user().name,
        filter = %feed.filter(),
        items = feed.items().len(),
        "Feed ready"
    );
    for item in feed.items() {
        tracing::info!(
            domain = %item.domain(),
            item_id = item.key.item_id,
            match_percent = item.match_percent(),
            exploration = item.exploration,
            "{}",
            item.title
        );
    }
    if let Some(status) = workspace.status() {
        let models: Vec<&str> = status.loaded_models().collect();
        tracing::info!(status = %status.status, models = ?models, "Service status");
    }

    Ok(())
}
