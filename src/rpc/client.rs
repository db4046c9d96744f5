use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{ContractCall, ContractReader, ContractWriter};
use crate::{
    model::{address_hex, Address, TxHash},
    utils::conf::Conf,
};

/// How long to wait for a transaction to be mined after submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptPolicy {
    /// Return as soon as the node accepted the transaction.
    Submitted,
    /// Poll `eth_getTransactionReceipt` until the transaction is mined, and fail if it
    /// reverted.
    Mined { poll: Duration, timeout: Duration },
}

#[derive(Debug)]
pub struct JsonRpcHttpClient {
    pub url: Url,
    pub reqwest_client: reqwest::Client,
    pub receipt_policy: ReceiptPolicy,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: Option<String>,
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("0x1")
    }
}

impl JsonRpcHttpClient {
    pub fn new(url: String) -> Result<Self> {
        Ok(Self {
            url: Url::parse(&url).with_context(|| format!("parsing rpc url {url}"))?,
            reqwest_client: reqwest::Client::new(),
            receipt_policy: ReceiptPolicy::Submitted,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_conf(conf: &Conf) -> Result<Self> {
        let mut client = Self::new(conf.rpc_url.clone())?;
        if conf.wait_for_receipt {
            client.receipt_policy = ReceiptPolicy::Mined {
                poll: Duration::from_millis(conf.receipt_poll_ms),
                timeout: Duration::from_secs(conf.receipt_timeout_secs),
            };
        }
        Ok(client)
    }

    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .reqwest_client
            .post(self.url.clone())
            .body(serde_json::to_string(&body)?)
            .header("Content-Type", "application/json")
            .send()
            .await
            .with_context(|| format!("sending {method}"))?
            .json::<RpcResponse>()
            .await
            .with_context(|| format!("reading {method} response"))?;

        if let Some(error) = response.error {
            bail!("{method} failed with code {}: {}", error.code, error.message);
        }
        serde_json::from_value(response.result)
            .with_context(|| format!("decoding {method} result"))
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let hex_id: String = self.request("eth_chainId", json!([])).await?;
        u64::from_str_radix(hex_id.trim_start_matches("0x"), 16)
            .with_context(|| format!("parsing chain id {hex_id}"))
    }

    pub async fn get_transaction_receipt(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<TransactionReceipt>> {
        self.request("eth_getTransactionReceipt", json!([tx_hash.0]))
            .await
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: &TxHash,
        poll: Duration,
    ) -> Result<TransactionReceipt> {
        loop {
            if let Some(receipt) = self.get_transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            debug!("Transaction {} not mined yet", tx_hash);
            tokio::time::sleep(poll).await;
        }
    }
}

impl ContractReader for JsonRpcHttpClient {
    async fn call(&self, call: &ContractCall) -> Result<Vec<u8>> {
        let data: String = self
            .request(
                "eth_call",
                json!([{ "to": address_hex(&call.to), "data": call.data_hex() }, "latest"]),
            )
            .await
            .with_context(|| format!("calling {call}"))?;
        decode_hex(&data)
    }
}

impl ContractWriter for JsonRpcHttpClient {
    async fn send(&self, from: Address, call: &ContractCall) -> Result<TxHash> {
        let tx_hash: String = self
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": address_hex(&from),
                    "to": address_hex(&call.to),
                    "data": call.data_hex(),
                }]),
            )
            .await
            .with_context(|| format!("sending transaction {call}"))?;
        let tx_hash = TxHash(tx_hash);
        info!("Submitted {} as {}", call, tx_hash);

        if let ReceiptPolicy::Mined { poll, timeout } = self.receipt_policy {
            let receipt = tokio::time::timeout(timeout, self.wait_for_receipt(&tx_hash, poll))
                .await
                .with_context(|| format!("waiting for receipt of {tx_hash}"))??;
            if !receipt.succeeded() {
                bail!("transaction {} reverted", receipt.transaction_hash);
            }
            debug!(
                "Transaction {} mined in block {:?}",
                tx_hash, receipt.block_number
            );
        }
        Ok(tx_hash)
    }
}

pub fn decode_hex(data: &str) -> Result<Vec<u8>> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped).with_context(|| format!("decoding hex {data}"))
}
