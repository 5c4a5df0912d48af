//! External collaborators: the wallet provider and the ledger contract.
//!
//! # Architecture
//!
//! ```text
//! WalletProvider ── request_accounts / existing_accounts
//!       │
//!       └── contract(address, signer) ──▶ LedgerContract
//!                                            ├── query_balance
//!                                            ├── submit_deposit / submit_withdraw ──▶ TxHandle
//!                                            └── await_confirmation(TxHandle)
//! ```
//!
//! Amounts crossing this boundary are always base units.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::LedgerError;

/// A 20-byte account or contract address, kept in its `0x`-prefixed hex form.
///
/// Hex case is preserved for display (checksummed addresses stay readable) but
/// ignored by equality and hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool { self.0.eq_ignore_ascii_case(&other.0) }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl Address {
    pub const BYTES: usize = 20;

    pub fn parse(value: &str) -> Result<Self, String> {
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or_else(|| format!("address {value:?} lacks 0x prefix"))?;
        let bytes = hex::decode(digits).map_err(|e| format!("address {value:?}: {e}"))?;
        if bytes.len() != Self::BYTES {
            return Err(format!("address {value:?} is {} bytes, expected {}", bytes.len(), Self::BYTES));
        }
        Ok(Self(format!("0x{digits}")))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl FromStr for Address {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl TryFrom<String> for Address {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(&value) }
}

impl From<Address> for String {
    fn from(value: Address) -> Self { value.0 }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Handle to a submitted, not yet confirmed, transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle {
    pub hash: String,
}

impl TxHandle {
    pub fn new(hash: impl Into<String>) -> Self { Self { hash: hash.into() } }
}

/// The fixed-address contract holding the account's balance.
#[async_trait]
pub trait LedgerContract: Send + Sync {
    async fn query_balance(&self) -> Result<u128, LedgerError>;
    async fn submit_deposit(&self, amount: u128) -> Result<TxHandle, LedgerError>;
    async fn submit_withdraw(&self, amount: u128) -> Result<TxHandle, LedgerError>;
    async fn await_confirmation(&self, tx: &TxHandle) -> Result<(), LedgerError>;
}

/// Wallet provider injected by the host environment.
///
/// Account lists are returned raw; the session validates each address.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn is_present(&self) -> bool;

    /// Prompt the user for account access. Rejection is an error.
    async fn request_accounts(&self) -> Result<Vec<String>, LedgerError>;

    /// Accounts already authorized for this client, without prompting.
    async fn existing_accounts(&self) -> Result<Vec<String>, LedgerError>;

    /// Read/write handle to the contract at `address`, signing as `signer`.
    fn contract(&self, address: &Address, signer: &Address) -> Result<Arc<dyn LedgerContract>, LedgerError>;
}
