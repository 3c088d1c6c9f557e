// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Solana memo-program ledger adapter.
//!
//! Each submission is one legacy transaction carrying a memo instruction,
//! signed by the configured fee payer and polled until it reaches the
//! configured commitment.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use solana_commitment_config::CommitmentConfig;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use strum::{Display, EnumString};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use meterline_config::model::LedgerConfig;
use meterline_core::MeterError;
use meterline_core::traits::{LedgerAdapter, PluginAdapter};

use crate::error::map_client_error;
use crate::memo::memo_transaction;

/// Default interval between signature status polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Solana commitment levels, ordered by finality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn config(self) -> CommitmentConfig {
        match self {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// RPC-backed [`LedgerAdapter`] that records memos on Solana.
pub struct SolanaLedger {
    rpc: RpcClient,
    payer: Keypair,
    payer_address: String,
    commitment: Commitment,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl fmt::Debug for SolanaLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaLedger")
            .field("rpc_url", &self.rpc.url())
            .field("payer", &self.payer_address)
            .field("commitment", &self.commitment)
            .field("confirm_timeout", &self.confirm_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

/// Decode a base58 64-byte Solana keypair.
pub fn decode_payer_key(encoded: &str) -> Result<Keypair, MeterError> {
    let bytes = bs58::decode(encoded.trim())
        .into_vec()
        .map_err(|e| MeterError::Config(format!("payer key is not valid base58: {e}")))?;
    if bytes.len() != 64 {
        return Err(MeterError::Config(format!(
            "payer key must be a 64-byte keypair, got {} bytes",
            bytes.len()
        )));
    }
    Keypair::try_from(bytes.as_slice())
        .map_err(|e| MeterError::Config(format!("payer key is not a valid keypair: {e}")))
}

impl SolanaLedger {
    /// Build from `[ledger]` configuration. The payer key is required.
    pub fn new(config: &LedgerConfig) -> Result<Self, MeterError> {
        let encoded = config.payer_secret_key.as_deref().ok_or_else(|| {
            MeterError::Config("no payer configured for on-chain recording".into())
        })?;
        Self::with_payer(config, decode_payer_key(encoded)?)
    }

    /// Build with an explicit fee payer, ignoring `payer_secret_key`.
    pub fn with_payer(config: &LedgerConfig, payer: Keypair) -> Result<Self, MeterError> {
        let commitment: Commitment = config.commitment.parse().map_err(|_| {
            MeterError::Config(format!("unknown commitment `{}`", config.commitment))
        })?;
        let rpc = RpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            commitment.config(),
        );
        let payer_address = payer.pubkey().to_string();

        debug!(
            rpc_url = %config.rpc_url,
            %commitment,
            payer = %payer_address,
            "solana ledger configured"
        );

        Ok(Self {
            rpc,
            payer,
            payer_address,
            commitment,
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override how long to wait for confirmation.
    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    /// Override the signature status polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Base58 address of the fee payer.
    pub fn payer_address(&self) -> &str {
        &self.payer_address
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    async fn await_confirmation(&self, signature: &Signature) -> Result<(), MeterError> {
        let deadline = Instant::now() + self.confirm_timeout;

        loop {
            let status = self
                .rpc
                .get_signature_status_with_commitment(signature, self.commitment.config())
                .await
                .map_err(|e| map_client_error("getSignatureStatuses", e))?;
            match status {
                Some(Ok(())) => {
                    debug!(%signature, "transaction confirmed");
                    return Ok(());
                }
                Some(Err(err)) => {
                    return Err(MeterError::Submission {
                        message: format!("transaction {signature} failed: {err}"),
                    });
                }
                None => {}
            }

            if Instant::now() >= deadline {
                warn!(%signature, timeout = ?self.confirm_timeout, "confirmation timed out");
                return Err(MeterError::Timeout {
                    duration: self.confirm_timeout,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl PluginAdapter for SolanaLedger {
    fn name(&self) -> &str {
        "solana-memo"
    }
}

#[async_trait]
impl LedgerAdapter for SolanaLedger {
    async fn submit_memo(&self, memo: &str) -> Result<String, MeterError> {
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| map_client_error("getLatestBlockhash", e))?;
        let tx = memo_transaction(&self.payer, blockhash, memo)?;

        // The client rejects a node that echoes a different signature.
        let signature = self
            .rpc
            .send_transaction(&tx)
            .await
            .map_err(|e| map_client_error("sendTransaction", e))?;

        self.await_confirmation(&signature).await?;
        info!(%signature, memo_bytes = memo.len(), "memo recorded on ledger");
        Ok(signature.to_string())
    }

    async fn current_slot(&self) -> Result<u64, MeterError> {
        self.rpc
            .get_slot()
            .await
            .map_err(|e| map_client_error("getSlot", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn config(url: &str, payer: &Keypair) -> LedgerConfig {
        LedgerConfig {
            rpc_url: url.to_string(),
            payer_secret_key: Some(payer.to_base58_string()),
            ..LedgerConfig::default()
        }
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
    }

    fn rpc_method(name: &str) -> wiremock::matchers::BodyPartialJsonMatcher {
        body_partial_json(json!({"method": name}))
    }

    /// Decodes the submitted transaction and answers with its own signature.
    fn echo_signature(request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let wire = BASE64.decode(body["params"][0].as_str().unwrap()).unwrap();
        rpc_result(json!(bs58::encode(&wire[1..65]).into_string()))
    }

    async fn mount_node(server: &MockServer) {
        let blockhash = bs58::encode([4u8; 32]).into_string();
        Mock::given(method("POST"))
            .and(rpc_method("getLatestBlockhash"))
            .respond_with(rpc_result(json!({
                "context": {"slot": 100},
                "value": {"blockhash": blockhash, "lastValidBlockHeight": 150}
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(rpc_method("sendTransaction"))
            .respond_with(echo_signature)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(rpc_method("getVersion"))
            .respond_with(rpc_result(json!({"solana-core": "3.0.0", "feature-set": 0})))
            .mount(server)
            .await;
    }

    fn status(confirmation: &str, err: Value) -> Value {
        let (status, confirmations) = match (&err, confirmation) {
            (Value::Null, "finalized") => (json!({"Ok": null}), Value::Null),
            (Value::Null, "processed") => (json!({"Ok": null}), json!(0)),
            (Value::Null, _) => (json!({"Ok": null}), json!(1)),
            (_, _) => (json!({"Err": err.clone()}), json!(1)),
        };
        json!({
            "context": {"slot": 101},
            "value": [{
                "slot": 101,
                "confirmations": confirmations,
                "status": status,
                "err": err,
                "confirmationStatus": confirmation,
            }]
        })
    }

    fn ledger(server: &MockServer, payer: Keypair) -> SolanaLedger {
        SolanaLedger::with_payer(&config(&server.uri(), &payer), payer)
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    fn requests_for(requests: &[Request], name: &str) -> Vec<Value> {
        requests
            .iter()
            .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap())
            .filter(|body| body["method"] == name)
            .collect()
    }

    #[tokio::test]
    async fn submit_memo_waits_for_commitment() {
        let server = MockServer::start().await;
        mount_node(&server).await;

        Mock::given(method("POST"))
            .and(rpc_method("getSignatureStatuses"))
            .respond_with(rpc_result(json!({"context": {"slot": 100}, "value": [null]})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(rpc_method("getSignatureStatuses"))
            .respond_with(rpc_result(status("processed", Value::Null)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(rpc_method("getSignatureStatuses"))
            .respond_with(rpc_result(status("confirmed", Value::Null)))
            .mount(&server)
            .await;

        let tx_id = ledger(&server, Keypair::new())
            .submit_memo("meterline|v1|1")
            .await
            .unwrap();
        assert!(tx_id.parse::<Signature>().is_ok());

        let requests = server.received_requests().await.unwrap();
        let polls = requests_for(&requests, "getSignatureStatuses");
        assert_eq!(polls.len(), 3);
        assert_eq!(polls[0]["params"][0][0], tx_id);
    }

    #[tokio::test]
    async fn sent_transaction_carries_memo_and_payer_signature() {
        let server = MockServer::start().await;
        mount_node(&server).await;
        Mock::given(method("POST"))
            .and(rpc_method("getSignatureStatuses"))
            .respond_with(rpc_result(status("finalized", Value::Null)))
            .mount(&server)
            .await;

        let payer = Keypair::new();
        let payer_bytes = payer.pubkey().to_bytes();
        let memo = "meterline|v1|2|0123456789abcdef|10|20|k1";
        let tx_id = ledger(&server, payer).submit_memo(memo).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let send = requests_for(&requests, "sendTransaction").remove(0);
        assert_eq!(send["params"][1]["encoding"], "base64");

        let wire = BASE64.decode(send["params"][0].as_str().unwrap()).unwrap();
        assert_eq!(wire[0], 1);
        // signature count + signature + header + account count
        assert_eq!(&wire[69..101], &payer_bytes);
        assert!(wire.ends_with(memo.as_bytes()));
        assert_eq!(tx_id, bs58::encode(&wire[1..65]).into_string());

        let key = VerifyingKey::from_bytes(&payer_bytes).unwrap();
        let signature = DalekSignature::from_slice(&wire[1..65]).unwrap();
        key.verify_strict(&wire[65..], &signature).unwrap();
    }

    #[tokio::test]
    async fn failed_transaction_is_submission_error() {
        let server = MockServer::start().await;
        mount_node(&server).await;
        Mock::given(method("POST"))
            .and(rpc_method("getSignatureStatuses"))
            .respond_with(rpc_result(status(
                "confirmed",
                json!({"InstructionError": [0, "InvalidInstructionData"]}),
            )))
            .mount(&server)
            .await;

        let err = ledger(&server, Keypair::new())
            .submit_memo("m")
            .await
            .unwrap_err();
        assert!(matches!(err, MeterError::Submission { .. }));
    }

    #[tokio::test]
    async fn preflight_rejection_is_submission_error() {
        let server = MockServer::start().await;
        let blockhash = bs58::encode([4u8; 32]).into_string();
        Mock::given(method("POST"))
            .and(rpc_method("getLatestBlockhash"))
            .respond_with(rpc_result(json!({
                "context": {"slot": 100},
                "value": {"blockhash": blockhash, "lastValidBlockHeight": 150}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(rpc_method("sendTransaction"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32003, "message": "Transaction signature verification failure"}
            })))
            .mount(&server)
            .await;

        match ledger(&server, Keypair::new()).submit_memo("m").await {
            Err(MeterError::Submission { message }) => {
                assert!(message.contains("-32003"), "{message}");
            }
            other => panic!("expected Submission, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfirmed_transaction_times_out() {
        let server = MockServer::start().await;
        mount_node(&server).await;
        Mock::given(method("POST"))
            .and(rpc_method("getSignatureStatuses"))
            .respond_with(rpc_result(status("processed", Value::Null)))
            .mount(&server)
            .await;

        let err = ledger(&server, Keypair::new())
            .with_confirm_timeout(Duration::from_millis(100))
            .submit_memo("m")
            .await
            .unwrap_err();
        match err {
            MeterError::Timeout { duration } => assert_eq!(duration, Duration::from_millis(100)),
            other => panic!("expected Timeout, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn current_slot_reads_from_node() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(rpc_method("getSlot"))
            .respond_with(rpc_result(json!(987_654)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(rpc_method("getVersion"))
            .respond_with(rpc_result(json!({"solana-core": "3.0.0", "feature-set": 0})))
            .mount(&server)
            .await;

        let ledger = ledger(&server, Keypair::new());
        assert_eq!(ledger.current_slot().await.unwrap(), 987_654);
        assert_eq!(ledger.name(), "solana-memo");

        let requests = server.received_requests().await.unwrap();
        let get_slot = requests_for(&requests, "getSlot").remove(0);
        assert_eq!(get_slot["params"][0]["commitment"], "confirmed");
    }

    #[tokio::test]
    async fn http_failure_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = ledger(&server, Keypair::new())
            .current_slot()
            .await
            .unwrap_err();
        assert!(matches!(err, MeterError::Network { .. }));
        assert!(err.is_ledger_failure());
    }

    #[test]
    fn missing_payer_is_config_error() {
        let config = LedgerConfig::default();
        assert!(matches!(SolanaLedger::new(&config), Err(MeterError::Config(_))));
    }

    #[test]
    fn seed_only_payer_is_rejected() {
        let payer = Keypair::new();
        let seed = bs58::encode(&payer.to_bytes()[..32]).into_string();
        match decode_payer_key(&seed) {
            Err(MeterError::Config(msg)) => assert!(msg.contains("64-byte")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn configured_payer_is_loaded() {
        let payer = Keypair::new();
        let expected = payer.pubkey().to_string();
        let ledger = SolanaLedger::new(&config("http://localhost:8899", &payer)).unwrap();
        assert_eq!(ledger.payer_address(), expected);
        assert_eq!(ledger.commitment(), Commitment::Confirmed);
        assert!(!format!("{ledger:?}").contains(&payer.to_base58_string()));
    }

    #[test]
    fn commitment_levels() {
        assert!(Commitment::Finalized > Commitment::Confirmed);
        assert!(Commitment::Confirmed > Commitment::Processed);
        assert_eq!("finalized".parse::<Commitment>().unwrap(), Commitment::Finalized);
        assert_eq!(Commitment::Processed.config(), CommitmentConfig::processed());
    }
}
