//! Sale deployment
//!
//! Deploys a token, a crowdsale selling it, and moves the whole supply into
//! the sale, in three transactions from the operator.

use crate::core::{parse_units, Call, Chain, ChainError, Transaction, UnitsError};
use crate::sale::TOKEN_DECIMALS;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Deployment config errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid amount: {0}")]
    Units(#[from] UnitsError),
    #[error("Invalid opening delay: {0} seconds")]
    InvalidDelay(i64),
}

/// Deployment errors
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("Deployment of {0} returned no address")]
    MissingAddress(&'static str),
}

/// Parameters of a sale deployment
///
/// Amounts are decimal strings in whole units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub token_name: String,
    pub token_symbol: String,
    /// Total token supply, all of it offered for sale
    pub max_supply: String,
    /// Coins per whole token
    pub price: String,
    /// Seconds between deployment and the sale opening
    pub open_delay_secs: i64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            token_name: "Henry token".to_string(),
            token_symbol: "HENRY".to_string(),
            max_supply: "1000000".to_string(),
            price: "0.025".to_string(),
            open_delay_secs: 60,
        }
    }
}

impl DeployConfig {
    /// Load a config from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Supply in token base units
    pub fn supply_units(&self) -> Result<u128, ConfigError> {
        Ok(parse_units(&self.max_supply, TOKEN_DECIMALS as u32)?)
    }

    /// Opening time of a sale deployed at `now`
    pub fn open_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ConfigError> {
        Duration::try_seconds(self.open_delay_secs)
            .and_then(|delay| now.checked_add_signed(delay))
            .ok_or(ConfigError::InvalidDelay(self.open_delay_secs))
    }

    /// Price in native base units per whole token
    pub fn price_units(&self) -> Result<u128, ConfigError> {
        Ok(parse_units(&self.price, TOKEN_DECIMALS as u32)?)
    }
}

/// Addresses created by a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub token: String,
    pub sale: String,
    pub sale_open_at: DateTime<Utc>,
}

/// Deploy token and sale, then fund the sale with the whole supply
///
/// Each step is its own transaction, so a failure leaves the earlier steps
/// committed.
pub fn deploy_sale(
    chain: &mut Chain,
    operator: &str,
    config: &DeployConfig,
    now: DateTime<Utc>,
) -> Result<Deployment, DeployError> {
    let supply = config.supply_units()?;
    let price = config.price_units()?;
    let sale_open_at = config.open_at(now)?;

    let token = chain
        .submit(Transaction::new(
            operator,
            Call::DeployToken {
                name: config.token_name.clone(),
                symbol: config.token_symbol.clone(),
                decimals: TOKEN_DECIMALS,
                total_supply: supply,
            },
            now,
        ))?
        .created
        .ok_or(DeployError::MissingAddress("token"))?;

    let sale = chain
        .submit(Transaction::new(
            operator,
            Call::DeployCrowdsale {
                token: token.clone(),
                price,
                max_tokens: supply,
                sale_open_at,
            },
            now,
        ))?
        .created
        .ok_or(DeployError::MissingAddress("crowdsale"))?;

    chain.submit(Transaction::new(
        operator,
        Call::TransferToken {
            token: token.clone(),
            to: sale.clone(),
            amount: supply,
        },
        now,
    ))?;

    log::info!(
        "Deployed {} at {} and sale at {}, opening {}",
        config.token_symbol,
        token,
        sale,
        sale_open_at
    );

    Ok(Deployment {
        token,
        sale,
        sale_open_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::SCALE;
    use std::io::Write;

    #[test]
    fn test_default_deployment() {
        let mut chain = Chain::new();
        let now = Utc::now();

        let deployment = deploy_sale(&mut chain, "deployer", &DeployConfig::default(), now).unwrap();

        let sale = chain.sale(&deployment.sale).unwrap();
        assert_eq!(sale.token(), deployment.token);
        assert_eq!(sale.price(), 25 * SCALE / 1000);
        assert_eq!(sale.max_tokens(), 1_000_000 * SCALE);
        assert_eq!(sale.sale_open_at(), now + Duration::seconds(60));
        assert_eq!(sale.operator(), "deployer");
        assert_eq!(
            chain
                .token_balance(&deployment.token, &deployment.sale)
                .unwrap(),
            1_000_000 * SCALE
        );
        assert_eq!(
            chain.token_balance(&deployment.token, "deployer").unwrap(),
            0
        );
        assert_eq!(chain.height(), 3);
    }

    #[test]
    fn test_invalid_price() {
        let mut chain = Chain::new();
        let config = DeployConfig {
            price: "not a number".to_string(),
            ..Default::default()
        };

        let result = deploy_sale(&mut chain, "deployer", &config, Utc::now());
        assert!(matches!(
            result,
            Err(DeployError::Config(ConfigError::Units(_)))
        ));
        assert_eq!(chain.height(), 0);
    }

    #[test]
    fn test_out_of_range_delay() {
        let now = Utc::now();

        for delay in [i64::MAX, 400_000_000_000_000, i64::MIN] {
            let mut chain = Chain::new();
            let config = DeployConfig {
                open_delay_secs: delay,
                ..Default::default()
            };

            let result = deploy_sale(&mut chain, "deployer", &config, now);
            assert!(matches!(
                result,
                Err(DeployError::Config(ConfigError::InvalidDelay(d))) if d == delay
            ));
            assert_eq!(chain.height(), 0);
        }
    }

    #[test]
    fn test_zero_price_rejected_by_sale() {
        let mut chain = Chain::new();
        let config = DeployConfig {
            price: "0".to_string(),
            ..Default::default()
        };

        let result = deploy_sale(&mut chain, "deployer", &config, Utc::now());
        assert!(matches!(result, Err(DeployError::Chain(_))));
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"token_symbol": "ABC", "price": "1.5"}}"#).unwrap();

        let config = DeployConfig::load(file.path()).unwrap();
        assert_eq!(config.token_symbol, "ABC");
        assert_eq!(config.price_units().unwrap(), 3 * SCALE / 2);
        assert_eq!(config.token_name, "Henry token");
        assert_eq!(config.open_delay_secs, 60);
    }
}
