//! AI market summaries
//!
//! Builds an analyst prompt from recent bars, sends it to an
//! OpenAI-compatible chat completion endpoint and caches the answer. Calls
//! are capped per UTC day and spaced by a cooldown.

mod openai;
mod summary;
mod usage;

pub use openai::{OpenAiClient, OpenAiConfig};
pub use summary::{build_prompt, MarketSummary, PriceStats, SummaryService, SYSTEM_PROMPT};
pub use usage::{LimitReason, UsageDecision, UsageRecord, UsageTracker};

use crate::storage::StoreError;
use async_trait::async_trait;
use thiserror::Error;

/// AI summary errors
#[derive(Debug, Error)]
pub enum AiError {
    /// No API key configured
    #[error("LLM API not configured: set {0}")]
    NotConfigured(String),
    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success response from the LLM API
    #[error("LLM API returned {status}: {body}")]
    Status { status: u16, body: String },
    /// Response without usable content
    #[error("Malformed LLM response: {0}")]
    Malformed(String),
    /// Fewer than two prices in the lookback window
    #[error("Insufficient data: {points} points (need at least 2)")]
    InsufficientData { points: usize },
    /// Daily cap or cooldown in effect
    #[error("Rate limited ({reason}), retry in {wait_secs}s")]
    RateLimited { reason: LimitReason, wait_secs: u64 },
    /// Usage file could not be written
    #[error("Usage file error: {0}")]
    Usage(#[from] std::io::Error),
    /// Bar query failed
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Chat completion backend
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier reported alongside summaries
    fn model(&self) -> &str;

    /// Complete a single-turn conversation
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AiError>;
}
