//! Extraction and generation boundaries of the assistant. The dialogue core
//! only sees the [`SlotExtractor`] and [`AnswerGenerator`] contracts; whether
//! they are backed by a language model or a rules engine is a deployment
//! choice.

mod llm;
mod scripted;

use anyhow::Result;
use bookline_core::{BookingInfo, ExtractError};
use bookline_retrieval::RetrievedChunk;

pub use llm::{LlmAnswerGenerator, LlmConfig, LlmSlotExtractor};
pub use scripted::{ExtractiveGenerator, ScriptedExtractor};

/// Given the combined-input blob (known slots rendered as statements plus the
/// raw new message), produce a best-guess value for every booking field.
/// Implementations must populate all five fields; absence is expressed as a
/// placeholder value, not a missing key.
pub trait SlotExtractor: Send + Sync {
    async fn extract(&self, input: &str) -> Result<BookingInfo, ExtractError>;
}

/// Produce a grounded answer for a Q&A turn from the windowed conversation
/// context and the retrieved chunks. Failures propagate; the dialogue layer
/// does not retry.
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, query: &str, context: &[RetrievedChunk]) -> Result<String>;
}

/// Runtime-selected extractor backend.
#[derive(Clone)]
pub enum Extractor {
    Llm(LlmSlotExtractor),
    Scripted(ScriptedExtractor),
}

impl SlotExtractor for Extractor {
    async fn extract(&self, input: &str) -> Result<BookingInfo, ExtractError> {
        match self {
            Self::Llm(inner) => inner.extract(input).await,
            Self::Scripted(inner) => inner.extract(input).await,
        }
    }
}

/// Runtime-selected generator backend.
#[derive(Clone)]
pub enum Generator {
    Llm(LlmAnswerGenerator),
    Extractive(ExtractiveGenerator),
}

impl AnswerGenerator for Generator {
    async fn answer(&self, query: &str, context: &[RetrievedChunk]) -> Result<String> {
        match self {
            Self::Llm(inner) => inner.answer(query, context).await,
            Self::Extractive(inner) => inner.answer(query, context).await,
        }
    }
}
