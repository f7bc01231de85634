//! Access API client with timeout and failover.
//!
//! # Responsibilities
//! - Talk to the Access REST API (primary endpoint, then failovers)
//! - Bound every request with a timeout
//! - Sign and send transactions, poll their results until sealed
//! - Provide health check for chain connectivity

use alloy::primitives::B256;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{interval, timeout};

use crate::config::AccessConfig;
use crate::flow::transaction::{sign_transaction, SignedTransaction, TransactionSignature};
use crate::flow::transport::{TransactionRequest, Transport};
use crate::flow::types::{
    AccountInfo, AccountKey, Address, Event, FlowError, FlowResult, TxId, TxStatus,
};
use crate::observability::metrics;

/// Access API client with failover support.
#[derive(Clone)]
pub struct FlowClient {
    http: reqwest::Client,
    /// Primary endpoint first, then failovers. No trailing slash.
    endpoints: Vec<String>,
    config: AccessConfig,
    timeout_duration: Duration,
    poll_interval: Duration,
}

impl FlowClient {
    /// Create a new client.
    ///
    /// Does not contact the chain; use `is_healthy` for that.
    pub fn new(config: AccessConfig) -> FlowResult<Self> {
        let mut endpoints = Vec::new();

        config.rest_url.parse::<url::Url>().map_err(|e| {
            FlowError::Rpc(format!("Invalid Access API URL '{}': {}", config.rest_url, e))
        })?;
        endpoints.push(config.rest_url.trim_end_matches('/').to_string());

        for url_str in &config.failover_urls {
            if url_str.parse::<url::Url>().is_ok() {
                endpoints.push(url_str.trim_end_matches('/').to_string());
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover Access API URL");
            }
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| FlowError::Rpc(format!("HTTP client setup failed: {}", e)))?;

        tracing::info!(
            rest_url = %config.rest_url,
            failovers = endpoints.len() - 1,
            "Flow client initialized"
        );

        Ok(Self {
            http,
            endpoints,
            timeout_duration: config.request_timeout(),
            poll_interval: config.poll_interval(),
            config,
        })
    }

    /// Send one request, trying each endpoint in order.
    ///
    /// Client errors (4xx) are returned at once; the request itself is wrong
    /// and another endpoint will say the same.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> FlowResult<T> {
        let mut last_error = String::from("no endpoints configured");

        for (i, base) in self.endpoints.iter().enumerate() {
            let mut request = self.http.request(method.clone(), format!("{}{}", base, path));
            if let Some(body) = body {
                request = request.json(body);
            }

            match timeout(self.timeout_duration, request.send()).await {
                Ok(Ok(response)) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .map_err(|e| FlowError::Decode(e.to_string()));
                    }
                    let message = response.text().await.unwrap_or_default();
                    if status.is_client_error() {
                        return Err(FlowError::Rejected {
                            status: status.as_u16(),
                            message,
                        });
                    }
                    tracing::warn!(endpoint_idx = i, status = %status, "Access API error, trying next endpoint");
                    last_error = format!("status {}: {}", status, message);
                }
                Ok(Err(e)) => {
                    tracing::warn!(endpoint_idx = i, error = %e, "Access API request failed, trying next endpoint");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(endpoint_idx = i, "Access API timeout, trying next endpoint");
                    last_error = format!("timeout after {} seconds", self.config.request_timeout_secs);
                }
            }
        }

        Err(FlowError::Rpc(format!(
            "All Access API endpoints failed for {}: {}",
            path, last_error
        )))
    }

    /// Id of the latest sealed block, used as transaction reference block.
    pub async fn latest_sealed_block_id(&self) -> FlowResult<B256> {
        let blocks: Vec<BlockResponse> = self
            .execute(Method::GET, "/v1/blocks?height=sealed", None)
            .await?;
        let block = blocks
            .into_iter()
            .next()
            .ok_or_else(|| FlowError::Decode("empty sealed block response".to_string()))?;
        block
            .header
            .id
            .parse()
            .map_err(|e| FlowError::Decode(format!("Invalid block id '{}': {}", block.header.id, e)))
    }

    async fn transaction_result(&self, tx_id: &TxId) -> FlowResult<TransactionResultResponse> {
        self.execute(Method::GET, &format!("/v1/transaction_results/{}", tx_id), None)
            .await
    }

    /// Check if the Access API is reachable.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.latest_sealed_block_id().await.is_ok();
        metrics::record_access_health(healthy);
        healthy
    }

    /// Get the configuration.
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }
}

impl std::fmt::Debug for FlowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowClient")
            .field("rest_url", &self.config.rest_url)
            .field("failovers", &(self.endpoints.len() - 1))
            .field("timeout_secs", &self.config.request_timeout_secs)
            .finish()
    }
}

#[async_trait]
impl Transport for FlowClient {
    async fn submit(&self, request: TransactionRequest) -> FlowResult<TxId> {
        let reference_block_id = self.latest_sealed_block_id().await?;
        let signed = sign_transaction(&request, reference_block_id)?;
        let body = serde_json::to_value(TransactionBody::from(&signed))
            .map_err(|e| FlowError::Decode(e.to_string()))?;

        let response: SubmitResponse = self
            .execute(Method::POST, "/v1/transactions", Some(&body))
            .await?;
        let tx_id: TxId = response.id.parse()?;

        tracing::debug!(
            tx_id = %tx_id,
            proposer = %signed.proposer,
            sequence_number = signed.sequence_number,
            "Transaction sent"
        );
        Ok(tx_id)
    }

    async fn status(&self, tx_id: &TxId) -> FlowResult<TxStatus> {
        match self.transaction_result(tx_id).await {
            Ok(result) => Ok(TxStatus::from_name(&result.status)),
            // Not indexed yet
            Err(FlowError::Rejected { status: 404, .. }) => Ok(TxStatus::Unknown),
            Err(e) => Err(e),
        }
    }

    async fn wait_sealed(&self, tx_id: &TxId) -> FlowResult<Vec<Event>> {
        let mut ticker = interval(self.poll_interval);

        loop {
            ticker.tick().await;

            let result = match self.transaction_result(tx_id).await {
                Ok(result) => result,
                Err(FlowError::Rejected { status: 404, .. }) => {
                    tracing::debug!(tx_id = %tx_id, "Transaction not indexed yet");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let status = TxStatus::from_name(&result.status);
            if status.is_terminal() {
                if !result.error_message.is_empty() {
                    tracing::warn!(
                        tx_id = %tx_id,
                        error = %result.error_message,
                        "Transaction sealed with an execution error"
                    );
                }
                return result.events.into_iter().map(decode_event).collect();
            }

            tracing::debug!(tx_id = %tx_id, status = ?status, "Waiting for seal");
        }
    }

    async fn account(&self, address: &Address) -> FlowResult<AccountInfo> {
        let response: AccountResponse = self
            .execute(
                Method::GET,
                &format!("/v1/accounts/{}?expand=keys", address.to_bare_hex()),
                None,
            )
            .await?;

        let keys = response
            .keys
            .iter()
            .map(|k| {
                Ok(AccountKey {
                    index: parse_number(&k.index)?,
                    sequence_number: parse_number(&k.sequence_number)?,
                })
            })
            .collect::<FlowResult<Vec<_>>>()?;

        Ok(AccountInfo {
            address: response.address.parse()?,
            keys,
        })
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> FlowResult<T> {
    value
        .parse()
        .map_err(|_| FlowError::Decode(format!("Invalid number '{}'", value)))
}

fn decode_event(event: EventResponse) -> FlowResult<Event> {
    let raw = BASE64
        .decode(&event.payload)
        .map_err(|e| FlowError::Decode(format!("Invalid event payload encoding: {}", e)))?;
    let payload = serde_json::from_slice(&raw)
        .map_err(|e| FlowError::Decode(format!("Invalid event payload: {}", e)))?;
    Ok(Event {
        kind: event.kind,
        payload,
    })
}

// --- Wire format ---

#[derive(Debug, Deserialize)]
struct BlockResponse {
    header: BlockHeader,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TransactionResultResponse {
    status: String,
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    events: Vec<EventResponse>,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    #[serde(rename = "type")]
    kind: String,
    payload: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    address: String,
    #[serde(default)]
    keys: Vec<AccountKeyResponse>,
}

#[derive(Debug, Deserialize)]
struct AccountKeyResponse {
    index: String,
    sequence_number: String,
}

#[derive(Debug, Serialize)]
struct TransactionBody {
    script: String,
    arguments: Vec<String>,
    reference_block_id: String,
    gas_limit: String,
    payer: String,
    proposal_key: ProposalKeyBody,
    authorizers: Vec<String>,
    payload_signatures: Vec<SignatureBody>,
    envelope_signatures: Vec<SignatureBody>,
}

#[derive(Debug, Serialize)]
struct ProposalKeyBody {
    address: String,
    key_index: String,
    sequence_number: String,
}

#[derive(Debug, Serialize)]
struct SignatureBody {
    address: String,
    key_index: String,
    signature: String,
}

impl From<&TransactionSignature> for SignatureBody {
    fn from(sig: &TransactionSignature) -> Self {
        Self {
            address: sig.address.to_bare_hex(),
            key_index: sig.key_id.to_string(),
            signature: BASE64.encode(&sig.signature),
        }
    }
}

impl From<&SignedTransaction> for TransactionBody {
    fn from(tx: &SignedTransaction) -> Self {
        Self {
            script: BASE64.encode(&tx.script),
            arguments: tx.arguments.iter().map(|a| BASE64.encode(a)).collect(),
            reference_block_id: alloy::primitives::hex::encode(tx.reference_block_id),
            gas_limit: tx.gas_limit.to_string(),
            payer: tx.payer.to_bare_hex(),
            proposal_key: ProposalKeyBody {
                address: tx.proposer.to_bare_hex(),
                key_index: tx.proposer_key_id.to_string(),
                sequence_number: tx.sequence_number.to_string(),
            },
            authorizers: tx.authorizers.iter().map(|a| a.to_bare_hex()).collect(),
            payload_signatures: tx.payload_signatures.iter().map(Into::into).collect(),
            envelope_signatures: tx.envelope_signatures.iter().map(Into::into).collect(),
        }
    }
}
