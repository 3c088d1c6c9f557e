// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model-to-tokenizer family resolution.
//!
//! Resolution order: strip a trailing date suffix, then exact match against
//! [`MODEL_FAMILIES`], then the longest case-sensitive prefix, then
//! [`DEFAULT_FAMILY`].

use std::sync::LazyLock;

use regex::Regex;
use strum::Display;

static DASHED_DATE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{4}-\d{2}-\d{2}$").expect("static regex"));
static COMPACT_DATE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{8}$").expect("static regex"));

/// BPE vocabulary used by a tokenizer family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Encoding {
    #[strum(serialize = "cl100k_base")]
    Cl100kBase,
    #[strum(serialize = "o200k_base")]
    O200kBase,
}

/// Chat framing overhead generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ChatFormat {
    /// gpt-4 and later: 3 tokens per message, +1 per name.
    Current,
    /// Older framing: 4 tokens per message, -1 per name.
    Legacy,
}

impl ChatFormat {
    pub fn tokens_per_message(self) -> i64 {
        match self {
            ChatFormat::Current => 3,
            ChatFormat::Legacy => 4,
        }
    }

    pub fn tokens_per_name(self) -> i64 {
        match self {
            ChatFormat::Current => 1,
            ChatFormat::Legacy => -1,
        }
    }
}

/// A known model family: a model id (or prefix) bound to its tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelFamily {
    pub prefix: &'static str,
    pub encoding: Encoding,
    pub chat_format: ChatFormat,
}

const fn family(prefix: &'static str, encoding: Encoding, chat_format: ChatFormat) -> ModelFamily {
    ModelFamily {
        prefix,
        encoding,
        chat_format,
    }
}

use ChatFormat::{Current, Legacy};
use Encoding::{Cl100kBase, O200kBase};

/// Known families, in evaluation order for exact matching.
///
/// Anthropic and Google models have no public BPE; `cl100k_base` is used as
/// an approximation.
pub const MODEL_FAMILIES: &[ModelFamily] = &[
    // OpenAI
    family("gpt-5", O200kBase, Current),
    family("gpt-4.1", O200kBase, Current),
    family("gpt-4o", O200kBase, Current),
    family("gpt-4o-mini", O200kBase, Current),
    family("chatgpt-4o", O200kBase, Current),
    family("o1", O200kBase, Current),
    family("o3", O200kBase, Current),
    family("o4-mini", O200kBase, Current),
    family("gpt-4-turbo", Cl100kBase, Current),
    family("gpt-4-turbo-preview", Cl100kBase, Current),
    family("gpt-4-32k", Cl100kBase, Current),
    family("gpt-4", Cl100kBase, Current),
    family("gpt-3.5-turbo", Cl100kBase, Legacy),
    family("gpt-3.5-turbo-16k", Cl100kBase, Legacy),
    // Anthropic
    family("claude-3-opus", Cl100kBase, Legacy),
    family("claude-3-sonnet", Cl100kBase, Legacy),
    family("claude-3-haiku", Cl100kBase, Legacy),
    family("claude-3-5-sonnet", Cl100kBase, Legacy),
    family("claude-3-5-haiku", Cl100kBase, Legacy),
    family("claude-3-7-sonnet", Cl100kBase, Legacy),
    family("claude-sonnet-4", Cl100kBase, Legacy),
    family("claude-opus-4", Cl100kBase, Legacy),
    // Google
    family("gemini-1.5-pro", Cl100kBase, Legacy),
    family("gemini-1.5-flash", Cl100kBase, Legacy),
];

/// Used when no family matches.
pub const DEFAULT_FAMILY: ModelFamily = family("", Cl100kBase, Legacy);

/// How a model id was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Prefix,
    Fallback,
}

/// Outcome of resolving a model id to a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub family: ModelFamily,
    pub matched: MatchKind,
}

/// Remove a trailing `-YYYY-MM-DD`, then a trailing `-YYYYMMDD`.
pub fn strip_date_suffix(model: &str) -> &str {
    let model = match DASHED_DATE_SUFFIX.find(model) {
        Some(m) => &model[..m.start()],
        None => model,
    };
    match COMPACT_DATE_SUFFIX.find(model) {
        Some(m) => &model[..m.start()],
        None => model,
    }
}

/// Resolve a model id against [`MODEL_FAMILIES`].
pub fn resolve(model: &str) -> Resolution {
    let base = strip_date_suffix(model);

    if let Some(family) = MODEL_FAMILIES.iter().find(|f| f.prefix == base) {
        return Resolution {
            family: *family,
            matched: MatchKind::Exact,
        };
    }

    MODEL_FAMILIES
        .iter()
        .filter(|f| base.starts_with(f.prefix))
        .max_by_key(|f| f.prefix.len())
        .map(|family| Resolution {
            family: *family,
            matched: MatchKind::Prefix,
        })
        .unwrap_or(Resolution {
            family: DEFAULT_FAMILY,
            matched: MatchKind::Fallback,
        })
}
