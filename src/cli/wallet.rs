use crate::cli::connect;
use crate::core::settings::Settings;
use anyhow::{Context, Result};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum WalletCommand {
    /// Generate a new receive address
    Address,

    /// List addresses derived from the wallet seed
    Addresses {
        /// Number of addresses to derive
        #[arg(long, default_value = "1")]
        count: u32,
    },

    /// Show the unlock conditions of an address
    UnlockConditions {
        address: String,
    },

    /// Unlock the wallet
    Unlock {
        /// Wallet encryption password
        #[arg(long, env = "SIA_WALLET_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a new wallet and print its seed
    Init {
        /// Encryption password (the seed is used when omitted)
        #[arg(long, env = "SIA_WALLET_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Restore a wallet from an existing seed
    Recover {
        /// Seed phrase
        #[arg(long)]
        seed: String,

        /// Encryption password (the seed is used when omitted)
        #[arg(long, env = "SIA_WALLET_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

pub async fn run(settings: &Settings, command: WalletCommand) -> Result<()> {
    let client = connect(settings)?;

    match command {
        WalletCommand::Address => {
            let address = client
                .wallet_address()
                .await
                .context("Failed to generate address")?;
            println!("{}", address.address);
        }
        WalletCommand::Addresses { count } => {
            let addresses = client
                .wallet_seed_addresses(count)
                .await
                .context("Failed to list seed addresses")?;
            for address in addresses.addresses {
                println!("{}", address);
            }
        }
        WalletCommand::UnlockConditions { address } => {
            let conditions = client
                .unlock_conditions(&address)
                .await
                .with_context(|| format!("Failed to fetch unlock conditions for {}", address))?;
            println!("{}", serde_json::to_string_pretty(&conditions)?);
        }
        WalletCommand::Unlock { password } => {
            client
                .unlock_wallet(&password)
                .await
                .context("Failed to unlock wallet")?;
            println!("Wallet unlocked");
        }
        WalletCommand::Init { password } => {
            let seed = client
                .init_wallet(password.as_deref().unwrap_or_default())
                .await
                .context("Failed to initialize wallet")?;
            println!("Wallet created. Write down the seed and keep it safe:");
            println!();
            println!("{}", seed.primaryseed);
        }
        WalletCommand::Recover { seed, password } => {
            client
                .recover_wallet(&seed, password.as_deref().unwrap_or_default())
                .await
                .context("Failed to recover wallet")?;
            println!("Wallet recovered, rescan in progress");
        }
    }

    Ok(())
}
