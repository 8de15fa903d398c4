mod handler;

use async_std::net::TcpStream;
use tracing_subscriber::EnvFilter;

use rawhttp::config::{ServerConfig, config, set_config};
use rawhttp::net::serve_with;

const DEFAULT_CONFIG_PATH: &str = "rawhttp.toml";

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let loaded = ServerConfig::load(&path);
    let level = loaded.as_ref().map_or("info", |cfg| cfg.log_level.as_str());
    init_logging(level);

    let cfg = loaded.unwrap_or_else(|err| {
        tracing::warn!(%err, "falling back to default config");
        ServerConfig::default()
    });
    set_config(cfg);

    let server = serve_with(config(), handler::handle::<TcpStream>).await?;
    tracing::info!(address = %server.local_addr(), "server started");

    server.wait().await;
    Ok(())
}
