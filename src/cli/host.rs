use crate::cli::connect;
use crate::core::settings::Settings;
use anyhow::{Context, Result};

pub async fn announce(settings: &Settings, address: Option<String>) -> Result<()> {
    let client = connect(settings)?;

    client
        .announce_host(address.as_deref())
        .await
        .context("Failed to announce host")?;

    match address {
        Some(address) => println!("Host announced at {}", address),
        None => println!("Host announced"),
    }
    Ok(())
}

pub async fn stop(settings: &Settings) -> Result<()> {
    let client = connect(settings)?;

    client
        .stop_daemon()
        .await
        .context("Failed to stop daemon - is it running?")?;

    println!("Daemon stopping");
    Ok(())
}
