//! ATM Configuration - passed from higher layers
//!
//! Built with the `with_*` methods, or read from the environment:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `BEEATM_CONTRACT_ADDRESS` | ledger contract address |
//! | `BEEATM_CATALOG` | path to a JSON campaign list |

use serde::Deserialize;
use std::env;

use crate::campaigns::{Campaign, Catalog};
use crate::error::{AtmError, AtmResult};
use crate::ledger::Address;
use crate::units::to_smallest_unit;

/// Local development deployment of the balance contract.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

pub const ENV_CONTRACT_ADDRESS: &str = "BEEATM_CONTRACT_ADDRESS";
pub const ENV_CATALOG: &str = "BEEATM_CATALOG";

pub fn default_contract_address() -> Address {
    Address::parse(DEFAULT_CONTRACT_ADDRESS).expect("default contract address is well-formed")
}

#[derive(Debug, Clone)]
pub struct AtmConfig {
    pub contract_address: Address,
    pub catalog: Catalog,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self { contract_address: default_contract_address(), catalog: Catalog::default() }
    }
}

/// Catalog file entry; goals are written as decimal amounts.
#[derive(Debug, Deserialize)]
struct CampaignEntry {
    id: u32,
    name: String,
    goal: String,
    #[serde(default)]
    description: String,
}

impl AtmConfig {
    pub fn new() -> Self { Self::default() }
    pub fn with_contract_address(mut self, address: Address) -> Self { self.contract_address = address; self }
    pub fn with_catalog(mut self, catalog: Catalog) -> Self { self.catalog = catalog; self }

    /// Defaults overridden by any `BEEATM_*` variables that are set and non-empty.
    pub fn from_env() -> AtmResult<Self> {
        let mut config = Self::default();
        if let Some(addr) = var(ENV_CONTRACT_ADDRESS) {
            config.contract_address = Address::parse(&addr).map_err(|e| AtmError::Config(format!("{ENV_CONTRACT_ADDRESS}: {e}")))?;
        }
        if let Some(path) = var(ENV_CATALOG) {
            let raw = std::fs::read_to_string(&path).map_err(|e| AtmError::Config(format!("catalog read {path}: {e}")))?;
            config.catalog = parse_catalog(&raw)?;
        }
        Ok(config)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a JSON array of `{id, name, goal, description}` campaigns.
pub fn parse_catalog(raw: &str) -> AtmResult<Catalog> {
    let entries: Vec<CampaignEntry> = serde_json::from_str(raw).map_err(|e| AtmError::Config(format!("catalog json: {e}")))?;
    let campaigns = entries
        .into_iter()
        .map(|e| {
            let goal = to_smallest_unit(&e.goal).map_err(|err| AtmError::Config(format!("campaign {} goal: {err}", e.id)))?;
            Ok(Campaign { id: e.id, name: e.name, goal, description: e.description })
        })
        .collect::<AtmResult<Vec<_>>>()?;
    Catalog::new(campaigns)
}
