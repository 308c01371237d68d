//! Process bootstrap for the Parlor servers.
//!
//! Addresses and paths come from the environment; everything else is
//! wiring. Runs against the in-memory store until a database-backed
//! `SessionStore` is plugged in here.

use std::sync::Arc;

use parlor::{ParlorServer, RelayAdvert, ServerConfig};
use parlor_session::MemoryStore;
use tracing_subscriber::EnvFilter;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let advert_ip: [u8; 4] = env_or("PARLOR_RELAY_ADVERT_IP", "127.0.0.1")
        .parse::<std::net::Ipv4Addr>()?
        .octets();
    let advert_port: u16 =
        env_or("PARLOR_RELAY_ADVERT_PORT", "8690").parse()?;

    let config = ServerConfig {
        lobby_addr: env_or("PARLOR_LOBBY_ADDR", "0.0.0.0:8300"),
        relay_addr: env_or("PARLOR_RELAY_ADDR", "0.0.0.0:8690"),
        relay_advert: RelayAdvert {
            ip: advert_ip,
            port: advert_port,
        },
        content_root: env_or("PARLOR_CONTENT_ROOT", "htm"),
        sweeps: Default::default(),
    };

    let store = Arc::new(MemoryStore::new());
    let server = ParlorServer::bind(config, store).await?;
    tracing::info!(
        lobby = %server.lobby_addr(),
        relay = %server.relay_addr(),
        "parlor started"
    );
    server.run().await;
    Ok(())
}
