//! # LoopBack Client Demo
//!
//! Walks through a full session against either a remote LoopBack server
//! (`LB_BASE_URL`) or the in-process backend:
//! 1.  Building the [`Services`] registry.
//! 2.  Signing up and logging in.
//! 3.  Creating and reading an entity with the session's token.
//! 4.  Resolving `$currentUser`, then logging out.

use std::sync::Arc;

use lb_client::backend::{self, BackendConfig};
use lb_client::clients::{LoginOptions, ModelClient};
use lb_client::error::ClientError;
use lb_client::framework::{HttpTransport, Transport};
use lb_client::lifecycle::tracing::setup_tracing;
use lb_client::lifecycle::{ClientConfig, Services};
use lb_client::model::{Entity, ModelDefinition, Params, USER_BASE};
use serde_json::json;
use tracing::{info, Instrument};

fn entity(value: serde_json::Value) -> Entity {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();
    let config = ClientConfig::from_env();

    let definitions = vec![
        ModelDefinition::new("user").base(USER_BASE),
        ModelDefinition::new("note"),
    ];

    let (transport, backend_handle) = match &config.base_url {
        Some(base_url) => {
            info!(%base_url, "Using remote backend");
            (Arc::new(HttpTransport::new(base_url.clone())) as Arc<dyn Transport>, None)
        }
        None => {
            info!("Using in-process backend");
            let (client, handle) =
                backend::spawn(BackendConfig::from_definitions(&definitions).enable_auth(true));
            (Arc::new(client) as Arc<dyn Transport>, Some(handle))
        }
    };

    let mut builder = Services::builder(transport).config(config);
    for definition in definitions {
        builder = builder.model(definition);
    }
    let services = builder.build().map_err(|e| e.to_string())?;
    run(&services).await.map_err(|e| e.to_string())?;

    // Dropping the registry closes the backend's channel; wait for it to stop
    drop(services);
    if let Some(handle) = backend_handle {
        handle.await.map_err(|e| format!("Backend task failed: {e:?}"))?;
    }
    info!("Demo complete");
    Ok(())
}

async fn run(services: &Services) -> Result<(), ClientError> {
    let users = services
        .user()
        .ok_or_else(|| ClientError::UnknownModel(USER_BASE.to_string()))?;
    let credentials = entity(json!({"email": "demo@example.com", "password": "a-password"}));

    let span = tracing::info_span!("signup");
    async {
        info!("Creating demo user");
        match users.create(credentials.clone()).promise().await {
            Ok(user) => info!(id = %user["id"], "User created"),
            // A remote server may already know the demo user
            Err(e) => info!(error = %e, "Signup skipped"),
        }
    }
    .instrument(span)
    .await;

    let token = users
        .login(credentials, LoginOptions::default())
        .promise()
        .await?;
    info!(user_id = %token["userId"], "Logged in");

    let notes = services.resource("Note")?;
    let note = notes.create(entity(json!({"title": "hello"}))).promise().await?;
    let id = note["id"].clone();
    let fetched = notes.get(id).promise().await?;
    info!(title = %fetched["title"], "Note read back");

    let listed = notes.query(Params::new());
    let all = listed.promise().await?;
    info!(count = all.len(), "Notes listed");

    let me = services.ensure_current_user().await?;
    info!(email = %me["email"], "Current user resolved");

    users.logout().promise().await?;
    info!(
        authenticated = services.auth().is_authenticated(),
        current_user = services.current_user().is_some(),
        "Logged out"
    );
    Ok(())
}
