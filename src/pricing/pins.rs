use crate::core::models::{DataUnit, ExchangeRate, HostSettings, HASTINGS_PER_SC};
use crate::core::settings::PriceEntry;
use crate::error::PricingError;
use crate::sia::Form;
use num_bigint::BigUint;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

/// ~10 minute blocks.
pub const BLOCKS_PER_MONTH: u64 = 4320;
pub const WINDOW_SIZE: u64 = 144;

const MAX_COLLATERAL_KEY: &str = "maxcollateral";
const COLLATERAL_KEY: &str = "collateral";

/// How a pinned amount maps onto the daemon's native unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinUnit {
    /// Price per TB per month, stored per byte per block.
    PerTerabyteMonth,
    /// Price per TB, stored per byte.
    PerTerabyte,
    /// Plain siacoin amount.
    Siacoin,
}

impl PinUnit {
    pub fn for_key(key: &str) -> Self {
        match key {
            "minstorageprice" | "collateral" => PinUnit::PerTerabyteMonth,
            "mindownloadbandwidthprice" | "minuploadbandwidthprice" => PinUnit::PerTerabyte,
            _ => PinUnit::Siacoin,
        }
    }
}

fn hastings_per_sc() -> BigUint {
    BigUint::from(HASTINGS_PER_SC.unsigned_abs())
}

/// A hastings amount kept as an exact fraction until it is truncated for
/// the daemon. Host settings routinely exceed what fits in a `Decimal`.
#[derive(Debug, Clone)]
pub struct Hastings {
    numer: BigUint,
    denom: BigUint,
}

impl Hastings {
    pub fn from_siacoins(siacoins: Decimal) -> Result<Self, String> {
        if siacoins.is_sign_negative() && !siacoins.is_zero() {
            return Err(format!("negative amount {}", siacoins));
        }

        Ok(Self {
            numer: BigUint::from(siacoins.mantissa().unsigned_abs()) * hastings_per_sc(),
            denom: BigUint::from(10u32).pow(siacoins.scale()),
        })
    }

    pub fn times(mut self, factor: u64) -> Self {
        self.numer *= factor;
        self
    }

    pub fn per(mut self, divisor: u64) -> Self {
        self.denom *= divisor;
        self
    }

    /// Whole hastings, rounded toward zero.
    pub fn trunc(&self) -> BigUint {
        &self.numer / &self.denom
    }
}

/// Converts a pinned amount in `currency` to hastings.
pub fn to_hastings(
    amount: &str,
    currency: &str,
    rate: Option<&ExchangeRate>,
) -> Result<Hastings, String> {
    let amount = Decimal::from_str(amount.trim())
        .map_err(|e| format!("invalid amount {:?}: {}", amount, e))?;

    let currency = currency.trim().to_lowercase();
    let siacoins = if currency == "sc" {
        amount
    } else {
        let rate = rate.ok_or_else(|| format!("no exchange rate loaded for {}", currency))?;
        let sc_per_unit = rate
            .sc_per_unit(&currency)
            .ok_or_else(|| format!("unknown currency {}", currency))?;
        amount
            .checked_mul(sc_per_unit)
            .ok_or_else(|| format!("siacoin value of {} {} is out of range", amount, currency))?
    };

    Hastings::from_siacoins(siacoins)
}

/// Daemon-native value of a pin: hastings, divided down to per byte (per
/// block) where the key calls for it.
pub fn native_value(
    key: &str,
    pin: &PriceEntry,
    amount: &str,
    rate: Option<&ExchangeRate>,
    unit: DataUnit,
) -> Result<Hastings, String> {
    let hastings = to_hastings(amount, &pin.currency, rate)?;

    Ok(match PinUnit::for_key(key) {
        PinUnit::PerTerabyteMonth => hastings.per(unit.bytes()).per(BLOCKS_PER_MONTH),
        PinUnit::PerTerabyte => hastings.per(unit.bytes()),
        PinUnit::Siacoin => hastings,
    })
}

/// `maxcollateral` derived from a per byte per block collateral value.
pub fn max_collateral(collateral: &Hastings) -> Hastings {
    collateral
        .clone()
        .times(1_000_000_000_000)
        .times(4)
        .times(BLOCKS_PER_MONTH)
        .times(6)
}

pub fn integer_string(value: &Hastings) -> String {
    value.trunc().to_string()
}

/// Integer part of a daemon-reported value, without leading zeros.
pub fn daemon_integer_string(raw: &str) -> Option<String> {
    let whole = raw.trim().split('.').next()?;
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let trimmed = whole.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
}

/// Computes the host configuration update implied by `pins`. Returns
/// `None` when the daemon already matches every pin.
pub fn plan_update(
    pins: &BTreeMap<String, PriceEntry>,
    current: &HostSettings,
    rate: Option<&ExchangeRate>,
    unit: DataUnit,
) -> Result<Option<Form>, PricingError> {
    let mut update = Form::new();

    for (key, pin) in pins {
        let Some(amount) = pin.amount() else {
            tracing::debug!(key = %key, "Skipping malformed price pin");
            continue;
        };

        // derived from collateral, never pinned directly
        if key == MAX_COLLATERAL_KEY {
            tracing::debug!("Ignoring legacy maxcollateral pin");
            continue;
        }

        let value = native_value(key, pin, amount, rate, unit).map_err(|reason| {
            tracing::error!(key = %key, error = %reason, "Unable to set pricing");
            PricingError::conversion(key, reason)
        })?;
        let new_value = integer_string(&value);

        let Some(current_value) = current.value_of(key).as_deref().and_then(daemon_integer_string)
        else {
            tracing::warn!(key = %key, "Daemon does not report a value for pinned setting");
            continue;
        };

        if new_value == current_value {
            continue;
        }

        if key == COLLATERAL_KEY {
            let max = integer_string(&max_collateral(&value));
            tracing::debug!(maxcollateral = %max, "Derived max collateral");
            update.insert(MAX_COLLATERAL_KEY.to_string(), max);
        }

        tracing::debug!(key = %key, from = %current_value, to = %new_value, "Pinned price changed");
        update.insert(key.clone(), new_value);
    }

    if update.is_empty() {
        return Ok(None);
    }

    update.insert("windowsize".to_string(), WINDOW_SIZE.to_string());
    Ok(Some(update))
}
