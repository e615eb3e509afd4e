use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webauthn_rp::storage::{InMemoryTrustAnchorStore, TrustAnchorStore};
use webauthn_rp::{MdsConfig, MdsRefresher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug,webauthn_rp=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MdsConfig::from_env()?;
    tracing::info!("Fetching metadata from {}", config.blob_url);

    let refresher = MdsRefresher::new(config)?;
    let store = InMemoryTrustAnchorStore::new();
    let count = refresher.refresh(&store).await?;

    println!("Installed {count} trusted authenticator models");
    for aaguid in store.list_aaguids().await? {
        if let Some(entry) = store.get_entry(&aaguid).await? {
            println!("  {aaguid}  {}", entry.description);
        }
    }
    Ok(())
}
