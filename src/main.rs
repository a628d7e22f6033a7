use std::sync::Arc;

use anyhow::{Context, Result};

use minwon_kiosk::{
    cli::args_from_env,
    config::Config,
    console::StdConsole,
    gateway::{
        credentials::{CredentialProvider, EnvCredentialProvider},
        openai::OpenAiChatClient,
    },
    logging::init_tracing,
    registry::Registry,
    session::Kiosk,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = args_from_env()?;
    let mut config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    if let Some(registry_path) = args.registry_path {
        config.registry.path = registry_path;
    }

    let logging = init_tracing(&config.logging)?;
    tracing::info!(target: "kiosk", run_id = %logging.run_id(), "kiosk_starting");

    let credential = EnvCredentialProvider
        .resolve(&config.gateway.credential)
        .await
        .context("failed to resolve chat service credential")?;
    let client =
        OpenAiChatClient::new(&config.gateway, credential).context("failed to construct chat client")?;

    let registry = Registry::load(&config.registry.path);
    tracing::info!(
        target: "kiosk",
        records = registry.len(),
        path = %config.registry.path.display(),
        "registry_loaded"
    );

    let kiosk = Kiosk::new(config.session.clone(), registry, Arc::new(client));
    let mut console = StdConsole::new();
    kiosk.run(&mut console).await
}
