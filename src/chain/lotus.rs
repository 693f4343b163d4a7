// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Lotus node executor speaking JSON-RPC v0.
//!
//! Transfers go through `Filecoin.MpoolPushMessage`, which fills nonce and
//! gas estimates server-side. Withdrawals are a `WithdrawBalance` (method 16)
//! actor call on the miner, sent from the owner address. Fee replacement
//! mirrors `lotus mpool replace`: find the pending message, bump its gas
//! terms, re-sign, re-push with the same nonce.

use std::time::Duration;

use base64ct::{Base64, Encoding};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::executor::LedgerExecutor;
use super::types::{fil_to_atto, ExecutorError, PendingMessage, SubmissionReceipt};
use async_trait::async_trait;

/// Actor method number of `WithdrawBalance` on the miner actor.
const METHOD_WITHDRAW_BALANCE: u64 = 16;

/// Method number of a plain value transfer.
const METHOD_SEND: u64 = 0;

#[derive(Serialize)]
struct MessagePrototype {
    #[serde(rename = "Version")]
    version: u64,
    #[serde(rename = "To")]
    to: String,
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "Nonce")]
    nonce: u64,
    #[serde(rename = "Value")]
    value: String,
    #[serde(rename = "GasLimit")]
    gas_limit: i64,
    #[serde(rename = "GasFeeCap")]
    gas_fee_cap: String,
    #[serde(rename = "GasPremium")]
    gas_premium: String,
    #[serde(rename = "Method")]
    method: u64,
    #[serde(rename = "Params")]
    params: Option<String>,
}

impl MessagePrototype {
    /// A zeroed prototype; `MpoolPushMessage` fills nonce and gas.
    fn new(from: &str, to: &str, value: String, method: u64, params: Option<String>) -> Self {
        Self {
            version: 0,
            to: to.to_string(),
            from: from.to_string(),
            nonce: 0,
            value,
            gas_limit: 0,
            gas_fee_cap: "0".to_string(),
            gas_premium: "0".to_string(),
            method,
            params,
        }
    }
}

#[derive(Deserialize)]
struct SignedMessage {
    #[serde(rename = "Message")]
    message: MessageBody,
    #[serde(rename = "CID")]
    cid: CidRef,
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(rename = "GasLimit")]
    gas_limit: i64,
    #[serde(rename = "GasFeeCap")]
    gas_fee_cap: String,
    #[serde(rename = "GasPremium")]
    gas_premium: String,
}

#[derive(Serialize, Deserialize)]
struct CidRef {
    #[serde(rename = "/")]
    cid: String,
}

#[derive(Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC executor against a Lotus node.
pub struct LotusExecutor {
    http: Client,
    endpoint: Url,
    token: Option<String>,
    timeout: Duration,
}

impl LotusExecutor {
    pub fn new(
        endpoint: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ExecutorError> {
        let endpoint: Url = endpoint
            .parse()
            .map_err(|e: url::ParseError| ExecutorError::Rpc(format!("invalid endpoint: {e}")))?;
        Ok(Self {
            http: Client::new(),
            endpoint,
            token,
            timeout,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ExecutorError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let mut request = self.http.post(self.endpoint.clone()).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = tokio::time::timeout(self.timeout, async {
            let response = request
                .send()
                .await
                .map_err(|e| ExecutorError::Rpc(e.to_string()))?;
            response
                .json::<RpcResponse<T>>()
                .await
                .map_err(|e| ExecutorError::Rpc(format!("malformed response: {e}")))
        })
        .await
        .map_err(|_| ExecutorError::Timeout)??;

        if let Some(error) = response.error {
            return Err(ExecutorError::Rpc(error.message));
        }
        response
            .result
            .ok_or_else(|| ExecutorError::Rpc(format!("{method}: empty result")))
    }

    /// All messages currently in the node's pool.
    async fn pending_pool(&self) -> Result<Vec<Value>, ExecutorError> {
        // Empty tipset key = current head.
        self.call("Filecoin.MpoolPending", json!([[]])).await
    }

    async fn push_prototype(
        &self,
        message: &MessagePrototype,
    ) -> Result<SubmissionReceipt, ExecutorError> {
        let signed: SignedMessage = self
            .call(
                "Filecoin.MpoolPushMessage",
                json!([message, serde_json::Value::Null]),
            )
            .await?;
        Ok(SubmissionReceipt {
            cid: signed.cid.cid,
            gas_limit: signed.message.gas_limit,
            gas_fee_cap: signed.message.gas_fee_cap,
            gas_premium: signed.message.gas_premium,
        })
    }
}

fn require_address(address: &str) -> Result<(), ExecutorError> {
    // Filecoin addresses are network prefix + protocol digit + payload.
    if address.len() < 3 || !address.starts_with(['f', 't']) {
        return Err(ExecutorError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

fn parse_atto(value: &str) -> Result<i128, ExecutorError> {
    value
        .trim()
        .parse()
        .map_err(|_| ExecutorError::Rpc(format!("unparseable balance: {value}")))
}

/// CBOR-encode miner `WithdrawBalanceParams`: a one-element array holding
/// the amount as a Filecoin big-int byte string (sign byte + big-endian
/// magnitude). Returned base64-encoded, as the JSON wire form expects.
fn withdraw_params(atto: &str) -> Result<String, ExecutorError> {
    let amount = parse_atto(atto)?;
    if amount < 0 {
        return Err(ExecutorError::InvalidAmount(atto.to_string()));
    }

    let mut magnitude = Vec::new();
    if amount > 0 {
        let bytes = amount.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        magnitude.push(0x00); // positive sign
        magnitude.extend_from_slice(&bytes[first..]);
    }

    let mut cbor = vec![0x81]; // array(1)
    if magnitude.len() < 24 {
        cbor.push(0x40 | magnitude.len() as u8);
    } else {
        cbor.push(0x58);
        cbor.push(magnitude.len() as u8);
    }
    cbor.extend_from_slice(&magnitude);

    Ok(Base64::encode_string(&cbor))
}

#[async_trait]
impl LedgerExecutor for LotusExecutor {
    async fn send(
        &self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<SubmissionReceipt, ExecutorError> {
        require_address(from)?;
        require_address(to)?;
        let value = fil_to_atto(amount)?;

        let available = parse_atto(&self.balance(from).await?)?;
        if available < parse_atto(&value)? {
            return Err(ExecutorError::InsufficientFunds {
                available: available.to_string(),
                requested: value,
            });
        }

        let message = MessagePrototype::new(from, to, value, METHOD_SEND, None);
        self.push_prototype(&message).await
    }

    async fn withdraw(
        &self,
        miner: &str,
        owner: &str,
        amount: f64,
    ) -> Result<SubmissionReceipt, ExecutorError> {
        require_address(miner)?;
        require_address(owner)?;
        let requested = fil_to_atto(amount)?;

        let available = parse_atto(&self.miner_available(miner).await?)?;
        if available < parse_atto(&requested)? {
            return Err(ExecutorError::InsufficientFunds {
                available: available.to_string(),
                requested,
            });
        }

        let params = withdraw_params(&requested)?;
        let message = MessagePrototype::new(
            owner,
            miner,
            "0".to_string(),
            METHOD_WITHDRAW_BALANCE,
            Some(params),
        );
        self.push_prototype(&message).await
    }

    async fn balance(&self, address: &str) -> Result<String, ExecutorError> {
        require_address(address)?;
        self.call("Filecoin.WalletBalance", json!([address])).await
    }

    async fn miner_available(&self, miner: &str) -> Result<String, ExecutorError> {
        require_address(miner)?;
        self.call("Filecoin.StateMinerAvailableBalance", json!([miner, []]))
            .await
    }

    async fn pending_message(&self, cid: &str) -> Result<PendingMessage, ExecutorError> {
        let pool = self.pending_pool().await?;
        let entry = pool
            .into_iter()
            .find(|m| m["CID"]["/"].as_str() == Some(cid))
            .ok_or_else(|| ExecutorError::NotPending(cid.to_string()))?;

        let message = &entry["Message"];
        Ok(PendingMessage {
            cid: cid.to_string(),
            sender: message["From"].as_str().unwrap_or_default().to_string(),
            nonce: message["Nonce"].as_u64().unwrap_or_default(),
            gas_limit: message["GasLimit"].as_i64().unwrap_or_default(),
            gas_fee_cap: message["GasFeeCap"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            gas_premium: message["GasPremium"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn replace_fee(
        &self,
        sender: &str,
        nonce: u64,
        gas_limit: i64,
        gas_fee_cap: &str,
        gas_premium: &str,
    ) -> Result<String, ExecutorError> {
        require_address(sender)?;

        let pool = self.pending_pool().await?;
        let entry = pool
            .into_iter()
            .find(|m| {
                m["Message"]["From"].as_str() == Some(sender)
                    && m["Message"]["Nonce"].as_u64() == Some(nonce)
            })
            .ok_or_else(|| ExecutorError::NotPending(format!("{sender} nonce {nonce}")))?;

        // Same message content, new gas terms, same nonce: the node accepts
        // it as a replacement.
        let mut message = entry["Message"].clone();
        message["GasLimit"] = json!(gas_limit);
        message["GasFeeCap"] = json!(gas_fee_cap);
        message["GasPremium"] = json!(gas_premium);

        let signed: Value = self
            .call("Filecoin.WalletSignMessage", json!([sender, message]))
            .await?;
        let cid: CidRef = self.call("Filecoin.MpoolPush", json!([signed])).await?;
        Ok(cid.cid)
    }
}
