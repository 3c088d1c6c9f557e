// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the metering pipeline crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Upstream AI provider that served a metered exchange.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
}

/// Role of a chat message author.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role, as it is fed to the tokenizer.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A typed content block within a structured message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// An image. Its payload never contributes to the token count.
    Image {
        #[serde(default)]
        source: Option<serde_json::Value>,
    },
    /// Any block type the counter does not know how to price.
    #[serde(other)]
    Other,
}

/// Message content: either plain text or an ordered list of typed blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A single chat message handed in by the request-handling layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<MessageContent>,
    /// Optional participant name (OpenAI `name` field).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a plain-text message.
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(content.into())),
            name: None,
        }
    }

    /// Create a message with an ordered list of content blocks.
    pub fn blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Blocks(blocks)),
            name: None,
        }
    }

    /// Attach a participant name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Derived cost of one exchange. Never persisted apart from its attestation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input_usd: f64,
    pub output_usd: f64,
    pub total_usd: f64,
    /// Total cost in the ledger's smallest unit (lamports), rounded up.
    pub total_ledger_units: u64,
}

/// A completed provider exchange, as handed in by the proxy layer.
#[derive(Debug, Clone)]
pub struct CompletedExchange {
    pub provider: Provider,
    pub model: String,
    /// Request body as sent to the provider. Hashed into the attestation.
    pub request_body: serde_json::Value,
    /// Provider-reported input token count.
    pub input_tokens: u64,
    /// Provider-reported output token count.
    pub output_tokens: u64,
    pub agent_wallet: String,
    pub task_id: Option<String>,
}
