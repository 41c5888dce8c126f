//! HTTP API for mood-based playlist generation.

use moodtape::{config::ConfigBuilder, server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = ConfigBuilder::new().build()?;
    server::serve(&config).await?;
    Ok(())
}
