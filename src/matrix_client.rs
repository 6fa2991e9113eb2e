// ABOUTME: Matrix client initialization and authentication
// ABOUTME: Handles client creation with the sqlite store and login via password or token

use aibot_core::config::MatrixConfig;
use anyhow::{Context, Result};
use matrix_sdk::{
    authentication::{matrix::MatrixSession, SessionTokens},
    ruma::OwnedUserId,
    AuthSession, Client, SessionMeta,
};

pub async fn create_client(config: &MatrixConfig) -> Result<Client> {
    let store_path = config.store_path();
    std::fs::create_dir_all(&store_path).context("Failed to create Matrix store directory")?;

    tracing::info!(path = %store_path.display(), "Using Matrix store directory");

    let client = Client::builder()
        .homeserver_url(&config.home_server)
        .sqlite_store(&store_path, None)
        .build()
        .await
        .context("Failed to create Matrix client")?;

    tracing::info!("Matrix client created successfully");

    Ok(client)
}

pub async fn login(client: &Client, config: &MatrixConfig) -> Result<()> {
    if let Some(token) = config.access_token.as_deref() {
        tracing::info!("Logging in with access token");
        let user_id: OwnedUserId = config
            .user_id
            .parse()
            .with_context(|| format!("Invalid Matrix user ID: {}", config.user_id))?;
        let session = AuthSession::Matrix(MatrixSession {
            meta: SessionMeta {
                user_id,
                device_id: config.device_name.clone().into(),
            },
            tokens: SessionTokens {
                access_token: token.to_string(),
                refresh_token: None,
            },
        });
        client
            .restore_session(session)
            .await
            .context("Failed to restore session")?;
    } else if let Some(pwd) = config.password.as_deref() {
        tracing::info!("Logging in with password");
        client
            .matrix_auth()
            .login_username(&config.user_id, pwd)
            .device_id(&config.device_name)
            .initial_device_display_name(&config.device_name)
            .send()
            .await
            .context("Failed to log in")?;
    } else {
        anyhow::bail!("Either MATRIX_PASSWORD or MATRIX_ACCESS_TOKEN is required");
    }

    let user_id = client
        .user_id()
        .context("Login succeeded but user_id not available")?;
    tracing::info!(user_id = %user_id, "Logged in successfully");

    Ok(())
}
