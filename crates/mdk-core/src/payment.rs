//! Payment Types
//!
//! Value types shared by the node backends, the relay, and the upstream
//! API client. Amounts are carried in millisatoshis, the smallest unit
//! the node reports; conversion to whole satoshis happens only at the
//! upstream boundary.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// Hex-encoded SHA-256 payment hash identifying a Lightning payment
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentHash(String);

impl PaymentHash {
    /// Derive the payment hash from a preimage
    pub fn from_preimage(preimage: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(preimage)))
    }

    /// Parse a hex-encoded payment hash
    pub fn from_hex(s: impl Into<String>) -> Result<Self> {
        let s = s.into().to_lowercase();
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidPaymentHash(s));
        }
        Ok(Self(s))
    }

    /// Generate a hash from a random preimage (for development nodes)
    pub fn generate() -> Self {
        let preimage = uuid::Uuid::new_v4();
        Self::from_preimage(preimage.as_bytes())
    }

    /// Get the hash as a hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaymentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An amount in millisatoshis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// Amount from millisatoshis
    pub const fn from_msat(msat: u64) -> Self {
        Self(msat)
    }

    /// Amount from whole satoshis
    pub const fn from_sat(sat: u64) -> Self {
        Self(sat * 1000)
    }

    /// Value in millisatoshis
    pub const fn as_msat(self) -> u64 {
        self.0
    }

    /// Value in whole satoshis, truncating sub-satoshi precision
    pub const fn to_sat(self) -> u64 {
        self.0 / 1000
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} msat", self.0)
    }
}

/// A payment the node has settled and reported
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedPayment {
    /// Payment hash of the settled invoice
    pub payment_hash: PaymentHash,

    /// Settled amount in millisatoshis
    pub amount: Amount,
}

impl ReceivedPayment {
    pub fn new(payment_hash: PaymentHash, amount: Amount) -> Self {
        Self {
            payment_hash,
            amount,
        }
    }
}

/// One confirmed payment as reported to the upstream API
///
/// The upstream accounts in whole satoshis, so the node amount is
/// converted here and nowhere else.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceivedEntry {
    /// Payment hash of the settled invoice
    pub payment_hash: PaymentHash,

    /// Amount in whole satoshis
    pub amount_sats: u64,

    /// Whether the payment settled against the sandbox environment
    pub sandbox: bool,
}

impl PaymentReceivedEntry {
    /// Build an upstream entry from a node-reported payment
    pub fn from_payment(payment: &ReceivedPayment, sandbox: bool) -> Self {
        Self {
            payment_hash: payment.payment_hash.clone(),
            amount_sats: payment.amount.to_sat(),
            sandbox,
        }
    }
}
