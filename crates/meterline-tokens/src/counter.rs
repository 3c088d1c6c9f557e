// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! BPE-backed token counting for chat and structured message formats.

use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

use meterline_core::{ContentBlock, MeterError, Message, MessageContent};

use crate::family::{self, ChatFormat, Encoding, MatchKind, ModelFamily};

/// Flat charge for one image block.
pub const IMAGE_BLOCK_TOKENS: u64 = 765;

/// Tokens that prime the assistant reply in chat format.
const REPLY_PRIMING_TOKENS: i64 = 3;

/// Overhead of a non-empty system prompt in structured format.
const SYSTEM_PROMPT_OVERHEAD: u64 = 4;

/// Per-message overhead in structured format, on top of the encoded role.
const STRUCTURED_MESSAGE_OVERHEAD: u64 = 2;

/// Counts tokens with the tokenizer each model family uses.
///
/// Both BPE tables are loaded once at construction; counting afterwards
/// never fails and holds no mutable state.
pub struct TokenCounter {
    cl100k: CoreBPE,
    o200k: CoreBPE,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").finish_non_exhaustive()
    }
}

impl TokenCounter {
    /// Load the `cl100k_base` and `o200k_base` tables.
    pub fn new() -> Result<Self, MeterError> {
        let cl100k = tiktoken_rs::cl100k_base()
            .map_err(|e| MeterError::Tokenizer(format!("failed to load cl100k_base: {e}")))?;
        let o200k = tiktoken_rs::o200k_base()
            .map_err(|e| MeterError::Tokenizer(format!("failed to load o200k_base: {e}")))?;
        debug!("token encoders loaded");
        Ok(Self { cl100k, o200k })
    }

    /// Resolve `model` to its family, warning when nothing matches.
    pub fn family_for(&self, model: &str) -> ModelFamily {
        let resolution = family::resolve(model);
        if resolution.matched == MatchKind::Fallback {
            warn!(
                model,
                encoding = %resolution.family.encoding,
                "unknown model, falling back to default tokenizer"
            );
        }
        resolution.family
    }

    fn encoder(&self, encoding: Encoding) -> &CoreBPE {
        match encoding {
            Encoding::Cl100kBase => &self.cl100k,
            Encoding::O200kBase => &self.o200k,
        }
    }

    fn encode_len(&self, bpe: &CoreBPE, text: &str) -> u64 {
        if text.is_empty() {
            return 0;
        }
        bpe.encode_ordinary(text).len() as u64
    }

    /// Token count of plain text under `model`'s tokenizer.
    pub fn count_tokens(&self, text: &str, model: &str) -> u64 {
        let family = self.family_for(model);
        self.encode_len(self.encoder(family.encoding), text)
    }

    /// Token count of text plus images within one message's content.
    fn content_tokens(&self, bpe: &CoreBPE, content: Option<&MessageContent>) -> u64 {
        match content {
            None => 0,
            Some(MessageContent::Text(text)) => self.encode_len(bpe, text),
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => self.encode_len(bpe, text),
                    ContentBlock::Image { .. } => IMAGE_BLOCK_TOKENS,
                    ContentBlock::Other => 0,
                })
                .sum(),
        }
    }

    /// Chat-completion count: per-message framing, role, content, the name
    /// adjustment, and the trailing reply priming.
    pub fn count_chat_tokens(&self, messages: &[Message], model: &str) -> u64 {
        let family = self.family_for(model);
        let bpe = self.encoder(family.encoding);
        let format: ChatFormat = family.chat_format;

        // Signed accumulator: legacy framing subtracts one token per name.
        let mut total: i64 = 0;
        for message in messages {
            total += format.tokens_per_message();
            total += self.encode_len(bpe, message.role.as_str()) as i64;
            total += self.content_tokens(bpe, message.content.as_ref()) as i64;
            if let Some(name) = &message.name {
                total += self.encode_len(bpe, name) as i64;
                total += format.tokens_per_name();
            }
        }
        total += REPLY_PRIMING_TOKENS;

        u64::try_from(total).unwrap_or(0)
    }

    /// Structured-message count with a separate system prompt.
    pub fn count_structured_tokens(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
        model: &str,
    ) -> u64 {
        let family = self.family_for(model);
        let bpe = self.encoder(family.encoding);

        let system = match system_prompt {
            Some(prompt) if !prompt.is_empty() => {
                SYSTEM_PROMPT_OVERHEAD + self.encode_len(bpe, prompt)
            }
            _ => 0,
        };

        messages.iter().fold(system, |acc, message| {
            acc + self.encode_len(bpe, message.role.as_str())
                + STRUCTURED_MESSAGE_OVERHEAD
                + self.content_tokens(bpe, message.content.as_ref())
        })
    }
}
