use std::{sync::Arc, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    contracts::Contracts,
    model::{Address, NftItem},
    utils::logger::TracingMode,
};

pub type SharedConf = Arc<Conf>;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Conf {
    pub rpc_url: String,
    /// The user's account. Unset means "not connected".
    pub account: Option<Address>,
    pub gof_address: Address,
    pub collateral_address: Address,
    pub nft_address: Option<Address>,
    pub poll_interval_ms: u64,
    pub wait_for_receipt: bool,
    pub receipt_poll_ms: u64,
    pub receipt_timeout_secs: u64,
    pub log_format: TracingMode,
    #[serde(default)]
    pub gallery: Vec<NftItem>,
}

/// Values given on the command line, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfOverrides {
    pub rpc_url: Option<String>,
    pub account: Option<String>,
}

impl Conf {
    pub fn new(config_file: &str, overrides: ConfOverrides) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("rpc_url", "http://localhost:8545/")?
            .set_default("poll_interval_ms", 4000_i64)?
            .set_default("wait_for_receipt", false)?
            .set_default("receipt_poll_ms", 1000_i64)?
            .set_default("receipt_timeout_secs", 120_i64)?
            .set_default("log_format", "full")?
            // Priority order: config file, then environment variables, then CLI
            .add_source(File::with_name(config_file).required(false))
            .add_source(
                Environment::with_prefix("goldoracle")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("rpc_url", overrides.rpc_url)?
            .set_override_option("account", overrides.account)?
            .build()?;

        s.try_deserialize()
    }

    pub fn new_shared(
        config_file: &str,
        overrides: ConfOverrides,
    ) -> Result<SharedConf, ConfigError> {
        Self::new(config_file, overrides).map(Arc::new)
    }

    pub fn contracts(&self) -> Contracts {
        Contracts {
            gof: self.gof_address,
            collateral: self.collateral_address,
            nft: self.nft_address,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    /// Account used for queries; the zero address when not connected.
    pub fn owner(&self) -> Address {
        self.account.unwrap_or_default()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
