//! Per-turn orchestration: mode routing between the booking flow and the
//! retrieval-augmented Q&A fallback, slot merging, history bookkeeping and
//! session persistence.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use bookline_core::{
    booking_url, combined_extraction_input, completion_reply, extraction_failure_prompt,
    merge_extracted, missing_fields_prompt, qa_context, schema_failure_prompt, wants_booking,
    ChatTurn, Denylist, ExtractError, SessionState,
};
use bookline_extract::{AnswerGenerator, SlotExtractor};
use bookline_observability::AppMetrics;
use bookline_retrieval::{KnowledgeRetriever, RetrievedChunk};
use bookline_storage::SessionRepository;
use tracing::{info, instrument, warn};

const QA_RETRIEVAL_K: usize = 3;

#[derive(Clone)]
pub struct BookingAgent<S, E, G>
where
    S: SessionRepository,
    E: SlotExtractor,
    G: AnswerGenerator,
{
    retriever: Arc<KnowledgeRetriever>,
    extractor: E,
    generator: G,
    denylist: Arc<Denylist>,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
}

impl<S, E, G> BookingAgent<S, E, G>
where
    S: SessionRepository,
    E: SlotExtractor,
    G: AnswerGenerator,
{
    pub fn new(
        retriever: Arc<KnowledgeRetriever>,
        extractor: E,
        generator: G,
        denylist: Arc<Denylist>,
        store: Arc<S>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            retriever,
            extractor,
            generator,
            denylist,
            store,
            metrics,
        }
    }

    /// Handles one inbound message for the given session and returns the
    /// reply text. Booking-flow failures are recovered into prompts here;
    /// Q&A generation failures propagate to the caller.
    #[instrument(skip(self, message))]
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
        base_url: &str,
    ) -> Result<String> {
        let started = Instant::now();
        self.metrics.inc_request();

        let mut state = self
            .store
            .load_session(session_id)
            .await?
            .unwrap_or_default();

        state.conversation_history.push(ChatTurn::user(message));

        let booking_turn = wants_booking(message) || state.booking_in_progress;
        let reply = if booking_turn {
            self.handle_booking_turn(&mut state, message, base_url).await
        } else {
            self.handle_qa_turn(&state, message).await?
        };

        state.conversation_history.push(ChatTurn::assistant(&reply));
        self.store.save_session(session_id, &state).await?;

        self.metrics.observe_latency(started.elapsed());
        info!(
            session_id = %session_id,
            booking = booking_turn,
            in_progress = state.booking_in_progress,
            "turn handled"
        );

        Ok(reply)
    }

    async fn handle_booking_turn(
        &self,
        state: &mut SessionState,
        message: &str,
        base_url: &str,
    ) -> String {
        state.booking_in_progress = true;

        let combined = combined_extraction_input(&state.slots, message);
        match self.extractor.extract(&combined).await {
            Ok(info) => {
                let missing = merge_extracted(&mut state.slots, &info, &self.denylist);
                if missing.is_empty() {
                    state.booking_in_progress = false;
                    self.metrics.inc_booking_completed();
                    completion_reply(&booking_url(base_url, &state.slots))
                } else {
                    missing_fields_prompt(&missing)
                }
            }
            Err(ExtractError::SchemaInvalid(fields)) => {
                self.metrics.inc_extraction_failure();
                schema_failure_prompt(&fields)
            }
            Err(ExtractError::Transport(reason)) => {
                self.metrics.inc_extraction_failure();
                warn!(reason = %reason, "slot extraction failed");
                extraction_failure_prompt()
            }
        }
    }

    async fn handle_qa_turn(&self, state: &SessionState, message: &str) -> Result<String> {
        let query = qa_context(&state.conversation_history, message);
        let retrieved = self.retriever.search(&query, QA_RETRIEVAL_K);
        self.metrics.add_retrieval_hits(retrieved.len());

        self.generator.answer(&query, &retrieved).await
    }

    /// Current state for the diagnostics endpoint; a fresh default when the
    /// session has never been written.
    pub async fn session(&self, session_id: &str) -> Result<SessionState> {
        Ok(self
            .store
            .load_session(session_id)
            .await?
            .unwrap_or_default())
    }

    pub async fn clear_session(&self, session_id: &str) -> Result<()> {
        self.store.clear_session(session_id).await
    }

    pub fn kb_search(&self, query: &str, limit: usize) -> Vec<RetrievedChunk> {
        self.retriever.search(query, limit)
    }
}
