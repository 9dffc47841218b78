use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::event_bus::{Event, EventBus, EventEmitter};
use crate::formatter::{self, FormattedResponse};
use crate::history::ConversationHistory;
use crate::impl_event_emitter;
use crate::llm_manager::LLMManager;

const PROMPT_PREAMBLE: &str = "You are a professional nutritionist. Provide meal plans with \
    categories like Breakfast, Lunch, Dinner and Snacks. For each meal include ingredients (3-5) \
    and simple preparation steps (under 100 characters). Format each category clearly.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlannerError {
    #[error("Please describe the meal you want")]
    EmptyMessage,
    #[error("A meal plan is already being prepared")]
    Busy,
}

/// Result of one submitted request.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub request: String,
    /// Model reply, or the user-facing error message on failure.
    pub response: String,
    pub formatted: FormattedResponse,
    pub succeeded: bool,
}

/// Embed the user's message in the nutritionist instruction.
pub fn build_prompt(message: &str) -> String {
    format!("{} User request: {}", PROMPT_PREAMBLE, message)
}

/// Sends meal requests one at a time and records the answered ones.
pub struct MealPlanner {
    llm_manager: Arc<LLMManager>,
    history: RwLock<ConversationHistory>,
    busy: AtomicBool,
    event_bus: Option<Arc<EventBus>>,
}

/// Clears the busy flag however the request ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MealPlanner {
    pub fn new(llm_manager: Arc<LLMManager>) -> Self {
        Self {
            llm_manager,
            history: RwLock::new(ConversationHistory::new()),
            busy: AtomicBool::new(false),
            event_bus: None,
        }
    }

    /// Whether a request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn history(&self) -> ConversationHistory {
        self.history.read().await.clone()
    }

    /// Forget every recorded request, as when the user signs out.
    pub async fn clear_history(&self) {
        *self.history.write().await = ConversationHistory::new();
    }

    /// Submit one meal request.
    ///
    /// Blank messages and submissions while another request is in flight
    /// are rejected. A failed call is reported in the outcome as an
    /// "⚠️ Error: ..." message and leaves the history untouched.
    pub async fn request_plan(&self, message: &str) -> Result<PlanOutcome, PlannerError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PlannerError::EmptyMessage);
        }
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(PlannerError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let _ = self
            .emit_event(Event::MealRequested {
                request: message.to_string(),
            })
            .await;

        match self.llm_manager.send_prompt(&build_prompt(message)).await {
            Ok(reply) => {
                let formatted = formatter::format_response(&reply);
                self.history.write().await.push(message, reply.as_str());
                info!(
                    "Planned '{}' with {} meal sections",
                    message,
                    formatted.meals().len()
                );
                let _ = self
                    .emit_event(Event::MealPlanned {
                        request: message.to_string(),
                        sections: formatted.meals().len(),
                        fallback: formatted.is_fallback(),
                    })
                    .await;
                Ok(PlanOutcome {
                    request: message.to_string(),
                    response: reply,
                    formatted,
                    succeeded: true,
                })
            }
            Err(e) => {
                error!("API Error: {:#}", e);
                let response = format!("⚠️ {}: {:#}", formatter::ERROR_MARKER, e);
                let _ = self
                    .emit_event(Event::MealFailed {
                        request: message.to_string(),
                        error: format!("{:#}", e),
                    })
                    .await;
                Ok(PlanOutcome {
                    request: message.to_string(),
                    formatted: formatter::format_response(&response),
                    response,
                    succeeded: false,
                })
            }
        }
    }
}

impl_event_emitter!(MealPlanner);
