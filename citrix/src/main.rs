use citrix::CitrixProvider;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // With PLUGIN_LOG_FILE set the plugin runtime installs its own subscriber
    if env::var_os("PLUGIN_LOG_FILE").is_none() {
        let level = env::var("TF_LOG")
            .ok()
            .and_then(|v| v.parse::<tracing::Level>().ok())
            .unwrap_or(tracing::Level::INFO);

        // stdout carries the plugin handshake
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .init();
    }

    tf_provider::serve("citrix", CitrixProvider::new()).await?;

    Ok(())
}
