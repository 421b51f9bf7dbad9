use crate::cli::connect;
use crate::core::models::{
    ConsensusInfo, ContractSummary, DataUnit, DaemonVersion, HostDbInfo, HostStorage, TpoolFee,
    HASTINGS_PER_SC,
};
use crate::core::settings::Settings;
use crate::error::{DaemonError, SyncError};
use crate::sia::HostApi;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct StatusOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    daemon: Option<DaemonVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    consensus: Option<ConsensusInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wallet: Option<WalletStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<HostStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage: Option<StorageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contracts: Option<ContractSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostdb: Option<HostDbInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tpool_fee: Option<TpoolFee>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: BTreeMap<&'static str, String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    fetched_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct WalletStatus {
    unlocked: bool,
    rescanning: bool,
    confirmed_sc: String,
    incoming_sc: String,
    outgoing_sc: String,
}

#[derive(Serialize)]
struct HostStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    netaddress: Option<String>,
    accepting_contracts: bool,
    connectability: String,
    working: String,
}

#[derive(Serialize)]
struct StorageStatus {
    folders: usize,
    capacity_tb: Decimal,
    used_tb: Decimal,
}

fn capture<T>(
    errors: &mut BTreeMap<&'static str, String>,
    section: &'static str,
    result: Result<T, DaemonError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.insert(section, e.to_string());
            None
        }
    }
}

/// Formats a hastings amount as siacoins with three decimals.
pub fn format_sc(hastings: &str) -> String {
    let Ok(value) = hastings.trim().parse::<u128>() else {
        return hastings.to_string();
    };

    let per_sc = HASTINGS_PER_SC as u128;
    let whole = value / per_sc;
    let milli = (value % per_sc) / (per_sc / 1_000);
    format!("{}.{:03}", whole, milli)
}

fn terabytes(bytes: u64, unit: DataUnit) -> Decimal {
    (Decimal::from(bytes) / unit.bytes_per_terabyte()).round_dp(2)
}

pub async fn run(settings: &Settings, json: bool) -> Result<()> {
    let client = connect(settings)?;

    if !client.check_credentials().await {
        return Err(SyncError::InvalidCredentials.into());
    }

    let (daemon, consensus, wallet, host, storage, contracts, hostdb, tpool_fee) = tokio::join!(
        client.daemon_version(),
        client.consensus(),
        client.wallet(),
        client.host(),
        client.host_storage(),
        client.host_contracts(),
        client.hostdb(),
        client.tpool_fee(),
    );

    let mut errors = BTreeMap::new();
    let unit = settings.data_unit;

    let output = StatusOutput {
        daemon: capture(&mut errors, "daemon", daemon),
        consensus: capture(&mut errors, "consensus", consensus),
        wallet: capture(&mut errors, "wallet", wallet).map(|w| WalletStatus {
            unlocked: w.unlocked,
            rescanning: w.rescanning,
            confirmed_sc: format_sc(&w.confirmedsiacoinbalance),
            incoming_sc: format_sc(&w.unconfirmedincomingsiacoins),
            outgoing_sc: format_sc(&w.unconfirmedoutgoingsiacoins),
        }),
        host: capture(&mut errors, "host", host).map(|h| HostStatus {
            netaddress: h.netaddress(),
            accepting_contracts: h.internalsettings.accepting_contracts(),
            connectability: h.connectabilitystatus,
            working: h.workingstatus,
        }),
        storage: capture(&mut errors, "storage", storage).map(|s: HostStorage| StorageStatus {
            folders: s.folders.len(),
            capacity_tb: terabytes(s.total_capacity(), unit),
            used_tb: terabytes(s.used_capacity(), unit),
        }),
        contracts: capture(&mut errors, "contracts", contracts)
            .map(|c| ContractSummary::from_contracts(&c)),
        hostdb: capture(&mut errors, "hostdb", hostdb),
        tpool_fee: capture(&mut errors, "tpool_fee", tpool_fee),
        errors,
        fetched_at: Utc::now(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

fn print_text_output(output: &StatusOutput) {
    if let Some(daemon) = &output.daemon {
        println!("Daemon     {}", daemon.version);
    }

    if let Some(consensus) = &output.consensus {
        let sync = if consensus.synced { "synced" } else { "syncing" };
        println!("Consensus  height {} ({})", consensus.height, sync);
    }

    if let Some(wallet) = &output.wallet {
        let lock = if wallet.unlocked { "unlocked" } else { "locked" };
        println!("Wallet     {} SC ({})", wallet.confirmed_sc, lock);
        if wallet.rescanning {
            println!("           rescanning");
        }
    }

    if let Some(host) = &output.host {
        println!(
            "Host       {} [{}]",
            host.netaddress.as_deref().unwrap_or("(no address)"),
            if host.accepting_contracts {
                "accepting contracts"
            } else {
                "not accepting contracts"
            }
        );
        if !host.connectability.is_empty() || !host.working.is_empty() {
            println!("           {} / {}", host.connectability, host.working);
        }
    }

    if let Some(storage) = &output.storage {
        println!(
            "Storage    {} / {} TB in {} folder(s)",
            storage.used_tb, storage.capacity_tb, storage.folders
        );
    }

    if let Some(contracts) = &output.contracts {
        println!("Contracts  {}", contracts.total);
        for (status, count) in &contracts.by_status {
            println!("           {:<24} {}", status, count);
        }
    }

    if let Some(hostdb) = &output.hostdb {
        if !hostdb.initialscancomplete {
            println!("HostDB     initial scan in progress");
        }
    }

    if let Some(fee) = &output.tpool_fee {
        println!(
            "Tx fee     {} - {} SC/byte",
            format_sc(&fee.minimum),
            format_sc(&fee.maximum)
        );
    }

    for (section, error) in &output.errors {
        println!("Error ({}): {}", section, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sc() {
        assert_eq!(format_sc("0"), "0.000");
        assert_eq!(format_sc("1000000000000000000000000"), "1.000");
        assert_eq!(format_sc("1500000000000000000000000"), "1.500");
        assert_eq!(format_sc("123456789000000000000000000000"), "123456.789");
        assert_eq!(format_sc("not-a-number"), "not-a-number");
    }

    #[test]
    fn test_terabytes_follow_data_unit() {
        assert_eq!(
            terabytes(2_000_000_000_000, DataUnit::Decimal),
            Decimal::from(2)
        );
        assert_eq!(
            terabytes(1_099_511_627_776, DataUnit::Binary),
            Decimal::from(1)
        );
    }

    #[test]
    fn test_capture_records_errors() {
        let mut errors = BTreeMap::new();
        let ok: Option<u32> = capture(&mut errors, "ok", Ok(1));
        let failed: Option<u32> = capture(
            &mut errors,
            "wallet",
            Err(DaemonError::Api {
                status: 490,
                message: "wallet is locked".to_string(),
            }),
        );

        assert_eq!(ok, Some(1));
        assert!(failed.is_none());
        assert!(errors["wallet"].contains("wallet is locked"));
        assert!(!errors.contains_key("ok"));
    }
}
