// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup-built metering context shared by the request path.

use std::sync::Arc;

use tracing::info;

use meterline_config::MeterlineConfig;
use meterline_config::validation::validate_config;
use meterline_core::{CompletedExchange, LedgerAdapter, MeterError};
use meterline_cost::PricingEngine;
use meterline_ledger::SolanaLedger;
use meterline_recorder::{
    BatchRecorder, FlushStats, LedgerStatus, PendingBatch, RecordResult, RecorderSettings,
};
use meterline_signer::AgentSigner;
use meterline_tokens::TokenCounter;

use crate::attestation::{AttestationBuilder, AttestationReceipt};

/// Reject configs that `load_and_validate` would reject, so hand-built
/// configs cannot reach the pricing engine or recorder.
fn ensure_valid(config: &MeterlineConfig) -> Result<(), MeterError> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        MeterError::Config(messages.join("; "))
    })
}

/// Result of metering one exchange.
#[derive(Debug, Clone)]
pub struct UsageReceipt {
    pub receipt: AttestationReceipt,
    /// What the recorder did with the attestation. Ledger failures land here.
    pub record: RecordResult,
}

/// Signer, counter, pricing, and recorder for one process.
#[derive(Debug)]
pub struct MeteringContext {
    builder: AttestationBuilder,
    recorder: BatchRecorder,
}

impl MeteringContext {
    /// Build from configuration. Must be called inside a Tokio runtime when
    /// ledger recording is enabled.
    ///
    /// Recording is disabled, not an error, when `ledger.enabled` is off or
    /// no payer key is configured. A malformed key, or any value rejected by
    /// config validation, is a `Config` error.
    pub fn from_config(config: &MeterlineConfig) -> Result<Self, MeterError> {
        ensure_valid(config)?;
        let recorder = match (config.ledger.enabled, &config.ledger.payer_secret_key) {
            (true, Some(_)) => {
                let ledger = Arc::new(SolanaLedger::new(&config.ledger)?);
                info!(
                    rpc_url = %config.ledger.rpc_url,
                    payer = ledger.payer_address(),
                    "on-chain recording enabled"
                );
                BatchRecorder::new(ledger, RecorderSettings::from_config(&config.batch))?
            }
            (true, None) => {
                info!("no payer key configured, on-chain recording disabled");
                BatchRecorder::disabled()
            }
            (false, _) => {
                info!("on-chain recording disabled by configuration");
                BatchRecorder::disabled()
            }
        };
        Self::assemble(config, recorder)
    }

    /// Build with an explicit ledger, ignoring `[ledger]`.
    pub fn with_ledger(
        config: &MeterlineConfig,
        ledger: Arc<dyn LedgerAdapter>,
    ) -> Result<Self, MeterError> {
        ensure_valid(config)?;
        let recorder = BatchRecorder::new(ledger, RecorderSettings::from_config(&config.batch))?;
        Self::assemble(config, recorder)
    }

    fn assemble(config: &MeterlineConfig, recorder: BatchRecorder) -> Result<Self, MeterError> {
        let signer = Arc::new(AgentSigner::from_config(&config.signer)?);
        let counter = TokenCounter::new()?;
        let pricing = PricingEngine::new(&config.pricing);
        info!(
            agent_id = signer.agent_id(),
            recording = recorder.is_enabled(),
            "metering context ready"
        );
        Ok(Self {
            builder: AttestationBuilder::new(counter, pricing, signer),
            recorder,
        })
    }

    pub fn signer(&self) -> &AgentSigner {
        self.builder.signer()
    }

    pub fn builder(&self) -> &AttestationBuilder {
        &self.builder
    }

    pub fn recorder(&self) -> &BatchRecorder {
        &self.recorder
    }

    /// Meter one completed exchange.
    ///
    /// Building and signing errors are returned. Once signed, the attestation
    /// is batched, or submitted on its own when `immediate` is set; only the
    /// immediate path waits on the ledger.
    pub async fn record_usage(
        &self,
        exchange: CompletedExchange,
        immediate: bool,
    ) -> Result<UsageReceipt, MeterError> {
        let receipt = self.builder.build(exchange)?;
        let attestation = receipt.attestation.clone();
        let record = if immediate {
            self.recorder.record_immediate(attestation).await
        } else {
            self.recorder.record(attestation)
        };
        Ok(UsageReceipt { receipt, record })
    }

    pub async fn status(&self) -> LedgerStatus {
        self.recorder.status().await
    }

    pub fn pending_batch(&self) -> PendingBatch {
        self.recorder.pending_batch()
    }

    pub fn stats(&self) -> FlushStats {
        self.recorder.stats()
    }

    /// Flush what is pending and stop recording.
    pub async fn close(&self) -> RecordResult {
        self.recorder.close().await
    }
}
