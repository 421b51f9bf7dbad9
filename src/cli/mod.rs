pub mod folder;
pub mod host;
pub mod refresh_pricing;
pub mod status;
pub mod wallet;

use crate::core::settings::Settings;
use crate::sia::DaemonClient;
use anyhow::{Context, Result};

fn connect(settings: &Settings) -> Result<DaemonClient> {
    let client = DaemonClient::new(&settings.daemon).context("Failed to build daemon client")?;
    tracing::debug!(url = client.base_url(), "Using daemon API");
    Ok(client)
}
