// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain executor types shared by the trait and its Lotus implementation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of a successful chain submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionReceipt {
    /// Message cid assigned by the node.
    pub cid: String,
    pub gas_limit: i64,
    /// attoFIL string.
    pub gas_fee_cap: String,
    /// attoFIL string.
    pub gas_premium: String,
}

/// A message still waiting in the node's message pool.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub cid: String,
    pub sender: String,
    pub nonce: u64,
    pub gas_limit: i64,
    pub gas_fee_cap: String,
    pub gas_premium: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The node rejected the call or returned an RPC-level error.
    #[error("node rpc error: {0}")]
    Rpc(String),

    /// The call did not complete within the configured deadline.
    #[error("chain call timed out")]
    Timeout,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("insufficient funds: {available} available, {requested} requested")]
    InsufficientFunds { available: String, requested: String },

    /// The message is no longer in the pending pool (landed or evicted).
    #[error("message {0} is not pending")]
    NotPending(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

const ATTO_PER_MILLI: i128 = 1_000_000_000_000_000;

/// Convert a FIL amount to an attoFIL decimal string.
///
/// Precision is milliFIL: the amount is rounded to the nearest 0.001 FIL
/// before scaling, so the float never touches the 18-digit tail.
pub fn fil_to_atto(amount: f64) -> Result<String, ExecutorError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ExecutorError::InvalidAmount(amount.to_string()));
    }
    let milli = (amount * 1000.0).round() as i128;
    if milli == 0 {
        return Err(ExecutorError::InvalidAmount(format!(
            "{amount} is below the 0.001 FIL resolution"
        )));
    }
    Ok((milli * ATTO_PER_MILLI).to_string())
}

/// Convert an attoFIL decimal string to an approximate FIL amount.
pub fn atto_to_fil(atto: &str) -> Result<f64, ExecutorError> {
    let value: i128 = atto
        .trim()
        .parse()
        .map_err(|_| ExecutorError::InvalidAmount(atto.to_string()))?;
    Ok(value as f64 / 1e18)
}

/// Default gas bump for replacing a stuck message: premium rises by 25%
/// (plus one attoFIL so the node always sees a strict increase), and the
/// fee cap is lifted to at least the new premium.
pub fn bump_gas(gas_fee_cap: &str, gas_premium: &str) -> Result<(String, String), ExecutorError> {
    let premium: i128 = gas_premium
        .trim()
        .parse()
        .map_err(|_| ExecutorError::InvalidAmount(gas_premium.to_string()))?;
    let fee_cap: i128 = gas_fee_cap
        .trim()
        .parse()
        .map_err(|_| ExecutorError::InvalidAmount(gas_fee_cap.to_string()))?;

    let new_premium = premium + premium / 4 + 1;
    let new_fee_cap = fee_cap.max(new_premium);
    Ok((new_fee_cap.to_string(), new_premium.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_fil_converts_exactly() {
        assert_eq!(fil_to_atto(1.0).unwrap(), "1000000000000000000");
        assert_eq!(fil_to_atto(25.0).unwrap(), "25000000000000000000");
    }

    #[test]
    fn milli_fil_resolution() {
        assert_eq!(fil_to_atto(0.001).unwrap(), "1000000000000000");
        assert_eq!(fil_to_atto(2.5).unwrap(), "2500000000000000000");
        // Rounded to the nearest milliFIL.
        assert_eq!(fil_to_atto(0.0014).unwrap(), "1000000000000000");
    }

    #[test]
    fn zero_and_negative_amounts_are_invalid() {
        assert!(fil_to_atto(0.0).is_err());
        assert!(fil_to_atto(-1.0).is_err());
        assert!(fil_to_atto(f64::NAN).is_err());
        assert!(fil_to_atto(0.0001).is_err());
    }

    #[test]
    fn gas_bump_raises_premium_and_covers_fee_cap() {
        let (fee_cap, premium) = bump_gas("100", "100").unwrap();
        assert_eq!(premium, "126");
        assert_eq!(fee_cap, "126");

        // A roomy fee cap is left alone.
        let (fee_cap, premium) = bump_gas("1000", "100").unwrap();
        assert_eq!(premium, "126");
        assert_eq!(fee_cap, "1000");
    }

    #[test]
    fn atto_parses_back() {
        let fil = atto_to_fil("2500000000000000000").unwrap();
        assert!((fil - 2.5).abs() < 1e-9);
        assert!(atto_to_fil("not-a-number").is_err());
    }
}
