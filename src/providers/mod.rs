mod siacentral;

use crate::core::models::{ExchangeRate, ExplorerHost};
use crate::error::PriceSourceError;
use async_trait::async_trait;

pub use siacentral::SiaCentralClient;

/// External service supplying exchange rates, bootstrap peers and the
/// explorer's view of a host.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn coin_price(&self) -> Result<ExchangeRate, PriceSourceError>;
    async fn bootstrap_peers(&self) -> Result<Vec<String>, PriceSourceError>;
    async fn explorer_host(&self, netaddress: &str) -> Result<ExplorerHost, PriceSourceError>;
}
