//! JSON-RPC implementation of [`ChainReader`].
//!
//! Receipts come from `eth_getTransactionReceipt`; batched reads are a
//! JSON-RPC batch of `eth_call` requests, which gives one HTTP round
//! trip with per-element success or failure. Responses are matched back
//! to requests by id because nodes may answer a batch in any order.

use std::time::Duration;

use alloy_primitives::B256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::chain::registry::ChainEndpoint;
use crate::chain::{CallOutcome, ChainReader, ContractCall, LogEntry, TransactionReceipt};
use crate::domain::ChainAddress;
use crate::error::LedgerError;

/// Outgoing JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Value,
}

/// Incoming JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// [`ChainReader`] backed by HTTP JSON-RPC endpoints.
#[derive(Debug, Clone)]
pub struct RpcChainReader {
    http: reqwest::Client,
}

impl RpcChainReader {
    /// Creates a reader with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Internal`] when the HTTP client cannot be
    /// constructed.
    pub fn new(timeout_secs: u64) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LedgerError::Internal(format!("http client: {e}")))?;
        Ok(Self { http })
    }

    async fn post_single(
        &self,
        endpoint: &ChainEndpoint,
        request: &RpcRequest,
    ) -> Result<RpcResponse, LedgerError> {
        self.http
            .post(&endpoint.rpc_url)
            .json(request)
            .send()
            .await
            .map_err(|e| unreachable_endpoint(endpoint, &e))?
            .json::<RpcResponse>()
            .await
            .map_err(|e| unreachable_endpoint(endpoint, &e))
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn transaction_receipt(
        &self,
        endpoint: &ChainEndpoint,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, LedgerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 0,
            method: "eth_getTransactionReceipt",
            params: json!([tx_hash]),
        };
        let response = self.post_single(endpoint, &request).await?;
        if let Some(err) = response.error {
            return Err(LedgerError::ChainUnavailable(format!(
                "{}: rpc error {}: {}",
                endpoint.name, err.code, err.message
            )));
        }
        match response.result {
            None | Some(Value::Null) => Ok(None),
            Some(value) => parse_receipt(&value).map(Some),
        }
    }

    async fn call_batch(
        &self,
        endpoint: &ChainEndpoint,
        calls: &[ContractCall],
    ) -> Result<Vec<CallOutcome>, LedgerError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        let batch = build_call_batch(calls);
        let responses: Vec<RpcResponse> = self
            .http
            .post(&endpoint.rpc_url)
            .json(&batch)
            .send()
            .await
            .map_err(|e| unreachable_endpoint(endpoint, &e))?
            .json()
            .await
            .map_err(|e| unreachable_endpoint(endpoint, &e))?;
        assemble_outcomes(responses, calls.len())
    }
}

fn unreachable_endpoint(endpoint: &ChainEndpoint, err: &dyn std::fmt::Display) -> LedgerError {
    LedgerError::ChainUnavailable(format!("{}: {err}", endpoint.name))
}

fn malformed(what: &str) -> LedgerError {
    LedgerError::ChainUnavailable(format!("malformed rpc payload: {what}"))
}

fn build_call_batch(calls: &[ContractCall]) -> Vec<RpcRequest> {
    calls
        .iter()
        .enumerate()
        .map(|(index, call)| RpcRequest {
            jsonrpc: "2.0",
            id: index as u64,
            method: "eth_call",
            params: json!([
                {
                    "to": call.to.as_str(),
                    "data": format!("0x{}", hex::encode(&call.data)),
                },
                "latest",
            ]),
        })
        .collect()
}

/// Reorders batch responses to request order and maps each element to a
/// [`CallOutcome`].
fn assemble_outcomes(
    responses: Vec<RpcResponse>,
    expected: usize,
) -> Result<Vec<CallOutcome>, LedgerError> {
    let mut slots: Vec<Option<CallOutcome>> = std::iter::repeat_with(|| None)
        .take(expected)
        .collect();
    for response in responses {
        let index = usize::try_from(response.id).map_err(|_| malformed("batch id"))?;
        let slot = slots.get_mut(index).ok_or_else(|| malformed("batch id"))?;
        let outcome = match (response.error, response.result) {
            (Some(err), _) => CallOutcome::Failed(err.message),
            (None, Some(Value::String(data))) => CallOutcome::Returned(decode_hex(&data)?),
            (None, _) => return Err(malformed("call result")),
        };
        *slot = Some(outcome);
    }
    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| malformed("incomplete batch response"))
}

fn parse_receipt(value: &Value) -> Result<TransactionReceipt, LedgerError> {
    let tx_hash = value
        .get("transactionHash")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("transactionHash"))?
        .to_ascii_lowercase();
    let from = value
        .get("from")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("from"))?;
    let from = ChainAddress::parse(from).map_err(|_| malformed("from"))?;
    let succeeded = matches!(value.get("status").and_then(Value::as_str), Some("0x1"));
    let logs = value
        .get("logs")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(parse_log).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();
    Ok(TransactionReceipt {
        tx_hash,
        from,
        succeeded,
        logs,
    })
}

fn parse_log(value: &Value) -> Result<LogEntry, LedgerError> {
    let address = value
        .get("address")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("log address"))?;
    let address = ChainAddress::parse(address).map_err(|_| malformed("log address"))?;
    let topics = value
        .get("topics")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("log topics"))?
        .iter()
        .map(|topic| {
            let raw = topic.as_str().ok_or_else(|| malformed("log topic"))?;
            let bytes: [u8; 32] = decode_hex(raw)?
                .try_into()
                .map_err(|_| malformed("log topic"))?;
            Ok(B256::from(bytes))
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;
    let data = value
        .get("data")
        .and_then(Value::as_str)
        .map(decode_hex)
        .transpose()?
        .unwrap_or_default();
    Ok(LogEntry {
        address,
        topics,
        data,
    })
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, LedgerError> {
    let body = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(body).map_err(|_| malformed("hex payload"))
}
