use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Hastings per siacoin.
pub const HASTINGS_PER_SC: i128 = 1_000_000_000_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataUnit {
    Decimal,
    #[default]
    Binary,
}

impl DataUnit {
    pub fn bytes(&self) -> u64 {
        match self {
            DataUnit::Decimal => 1_000_000_000_000,
            DataUnit::Binary => 1 << 40,
        }
    }

    pub fn bytes_per_terabyte(&self) -> Decimal {
        Decimal::from(self.bytes())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusInfo {
    pub synced: bool,
    pub height: u64,
    pub currentblock: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockInfo {
    pub id: String,
    pub height: u64,
    pub parentid: String,
    pub timestamp: i64,
}

impl BlockInfo {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonVersion {
    pub version: String,
    pub gitrevision: String,
    pub buildtime: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayPeer {
    pub netaddress: String,
    pub version: String,
    pub inbound: bool,
    pub local: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayInfo {
    pub netaddress: String,
    pub peers: Vec<GatewayPeer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostDbInfo {
    pub initialscancomplete: bool,
}

/// The daemon's `internalsettings`, kept as raw JSON so pricing can look
/// keys up by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostSettings(pub Map<String, Value>);

impl HostSettings {
    /// Value of a setting rendered as a string; numbers are stringified.
    pub fn value_of(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn netaddress(&self) -> Option<&str> {
        self.0
            .get("netaddress")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn accepting_contracts(&self) -> bool {
        self.0
            .get("acceptingcontracts")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostInfo {
    pub internalsettings: HostSettings,
    pub externalsettings: Value,
    pub financialmetrics: Value,
    pub connectabilitystatus: String,
    pub workingstatus: String,
}

impl HostInfo {
    /// Address the host is announced under, falling back to the external one.
    pub fn netaddress(&self) -> Option<String> {
        self.internalsettings
            .netaddress()
            .map(str::to_string)
            .or_else(|| {
                self.externalsettings
                    .get("netaddress")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostContract {
    pub obligationid: String,
    pub obligationstatus: String,
    pub contractcost: String,
    pub datasize: u64,
    pub lockedcollateral: String,
    pub negotiationheight: u64,
    pub expirationheight: u64,
    pub proofdeadline: u64,
    pub potentialstoragerevenue: String,
    pub proofconfirmed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostContracts {
    pub contracts: Vec<HostContract>,
}

/// Contract counts by obligation status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContractSummary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
}

impl ContractSummary {
    pub fn from_contracts(contracts: &[HostContract]) -> Self {
        let mut by_status = BTreeMap::new();
        for contract in contracts {
            let status = if contract.obligationstatus.is_empty() {
                "unknown".to_string()
            } else {
                contract.obligationstatus.clone()
            };
            *by_status.entry(status).or_insert(0) += 1;
        }

        Self {
            total: contracts.len(),
            by_status,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageFolder {
    pub path: String,
    pub index: u64,
    pub capacity: u64,
    pub capacityremaining: u64,
    pub failedreads: u64,
    pub failedwrites: u64,
    pub successfulreads: u64,
    pub successfulwrites: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostStorage {
    pub folders: Vec<StorageFolder>,
}

impl HostStorage {
    pub fn total_capacity(&self) -> u64 {
        self.folders.iter().map(|f| f.capacity).sum()
    }

    pub fn used_capacity(&self) -> u64 {
        self.folders
            .iter()
            .map(|f| f.capacity.saturating_sub(f.capacityremaining))
            .sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletInfo {
    pub encrypted: bool,
    pub unlocked: bool,
    pub rescanning: bool,
    pub height: u64,
    pub confirmedsiacoinbalance: String,
    pub unconfirmedoutgoingsiacoins: String,
    pub unconfirmedincomingsiacoins: String,
    pub siafundbalance: String,
    pub dustthreshold: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TpoolFee {
    pub minimum: String,
    pub maximum: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletAddress {
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletAddresses {
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletSeed {
    pub primaryseed: String,
}

/// Explorer's public view of this host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerHost {
    pub public_key: String,
    pub net_address: String,
    pub online: bool,
    pub version: String,
    pub estimated_uptime: f64,
    pub last_scan: Option<DateTime<Utc>>,
    pub first_seen_timestamp: Option<DateTime<Utc>>,
}

/// Value of one unit of each currency in SC.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    sc_per_unit: BTreeMap<String, Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(sc_per_unit: BTreeMap<String, Decimal>) -> Self {
        let sc_per_unit = sc_per_unit
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();

        Self {
            sc_per_unit,
            fetched_at: Utc::now(),
        }
    }

    /// Builds a rate from the price of one SC in each currency.
    pub fn from_coin_prices(prices: &BTreeMap<String, Decimal>) -> Self {
        let inverted = prices
            .iter()
            .filter(|(_, price)| !price.is_zero())
            .filter_map(|(currency, price)| {
                Decimal::ONE
                    .checked_div(*price)
                    .map(|sc| (currency.clone(), sc))
            })
            .collect();

        Self::new(inverted)
    }

    pub fn sc_per_unit(&self, currency: &str) -> Option<Decimal> {
        self.sc_per_unit.get(&currency.to_lowercase()).copied()
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.sc_per_unit.keys().map(String::as_str)
    }
}
