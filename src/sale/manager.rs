//! Crowdsale deployment and lookup
//!
//! Handles sale deployment at deterministic addresses.

use crate::crypto::derive_address;
use crate::sale::crowdsale::{Crowdsale, SaleError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Manages all deployed crowdsales
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleManager {
    /// All deployed sales
    sales: HashMap<String, Crowdsale>,
    /// Deployment counter for address generation
    nonce: u64,
}

impl SaleManager {
    /// Create a new sale manager
    pub fn new() -> Self {
        Self {
            sales: HashMap::new(),
            nonce: 0,
        }
    }

    /// Deploy a new sale operated by `operator`
    pub fn deploy(
        &mut self,
        token: &str,
        operator: &str,
        price: u128,
        max_tokens: u128,
        sale_open_at: DateTime<Utc>,
        height: u64,
    ) -> Result<String, SaleError> {
        let address = derive_address(&format!("sale:{}:{}", operator, self.nonce));

        let sale = Crowdsale::new(
            address.clone(),
            token.to_string(),
            operator.to_string(),
            price,
            max_tokens,
            sale_open_at,
            height,
        )?;
        self.nonce += 1;
        self.sales.insert(address.clone(), sale);

        log::info!(
            "Crowdsale deployed at {} selling {} (opens {})",
            address,
            token,
            sale_open_at
        );
        Ok(address)
    }

    /// Get a sale by address
    pub fn get(&self, address: &str) -> Option<&Crowdsale> {
        self.sales.get(address)
    }

    /// Get mutable reference to a sale
    pub fn get_mut(&mut self, address: &str) -> Option<&mut Crowdsale> {
        self.sales.get_mut(address)
    }

    /// Check if an address belongs to a sale
    pub fn exists(&self, address: &str) -> bool {
        self.sales.contains_key(address)
    }

    /// Get all sale addresses
    pub fn list(&self) -> Vec<String> {
        self.sales.keys().cloned().collect()
    }

    /// Get sale count
    pub fn count(&self) -> usize {
        self.sales.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::math::SCALE;

    #[test]
    fn test_sale_deployment() {
        let mut manager = SaleManager::new();

        let address = manager
            .deploy("0xTOKEN", "deployer", SCALE, 1_000_000 * SCALE, Utc::now(), 1)
            .unwrap();

        assert!(address.starts_with("0x"));
        assert_eq!(manager.count(), 1);
        let sale = manager.get(&address).unwrap();
        assert_eq!(sale.operator(), "deployer");
        assert_eq!(sale.address(), address);
    }

    #[test]
    fn test_repeated_deployments_get_new_addresses() {
        let mut manager = SaleManager::new();

        let first = manager
            .deploy("0xTOKEN", "deployer", SCALE, SCALE, Utc::now(), 1)
            .unwrap();
        let second = manager
            .deploy("0xTOKEN", "deployer", SCALE, SCALE, Utc::now(), 2)
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(manager.count(), 2);
    }

    #[test]
    fn test_failed_deployment_keeps_nonce() {
        let mut manager = SaleManager::new();

        let result = manager.deploy("0xTOKEN", "deployer", 0, SCALE, Utc::now(), 1);
        assert!(matches!(result, Err(SaleError::InvalidPrice)));
        assert_eq!(manager.count(), 0);

        let address = manager
            .deploy("0xTOKEN", "deployer", SCALE, SCALE, Utc::now(), 1)
            .unwrap();
        assert_eq!(address, derive_address("sale:deployer:0"));
    }
}
