//! Structured, run-to-completion interactions that replace the normal chat
//! reply when a user's intent is conclusive.

mod appointment_booking;
mod clinical_trial_search;

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub use appointment_booking::AppointmentBookingWorkflow;
pub use clinical_trial_search::ClinicalTrialSearchWorkflow;

use crate::classifier::Confidence;
use crate::llm::{
    ChatCompletionRequest, ChatMessage, LlmCallKind, LlmGateway, complete_with_telemetry,
    log_telemetry,
};
use crate::session::Message;

pub type WorkflowFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How many trailing messages a trigger check sees.
pub const TRIGGER_CONTEXT_MESSAGES: usize = 5;

const CONFIRMATION_KEYWORDS: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "sure",
    "okay",
    "ok",
    "sounds good",
    "that works",
    "let's do it",
    "let's do that",
    "i'd like that",
    "please",
    "that would be great",
    "sounds great",
];
const CONFIRMATION_SYSTEM_PROMPT: &str =
    "You are a confirmation detector. Respond with only 'yes' or 'no'.";
const CONFIRMATION_TEMPERATURE: f32 = 0.1;
const CONFIRMATION_MAX_TOKENS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowId {
    AppointmentBooking,
    ClinicalTrialSearch,
}

impl WorkflowId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AppointmentBooking => "appointment_booking",
            Self::ClinicalTrialSearch => "clinical_trial_search",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDecision {
    pub should_trigger: bool,
    pub confidence: Confidence,
    pub reasoning: String,
    /// Workflow-specific data handed to `execute`.
    pub context: Map<String, Value>,
}

impl TriggerDecision {
    pub fn skip(confidence: Confidence, reasoning: impl Into<String>) -> Self {
        Self {
            should_trigger: false,
            confidence,
            reasoning: reasoning.into(),
            context: Map::new(),
        }
    }

    /// Workflows only run on a positive, high-confidence decision.
    pub fn is_conclusive(&self) -> bool {
        self.should_trigger && self.confidence == Confidence::High
    }
}

#[derive(Clone, Copy)]
pub struct TriggerInput<'a> {
    pub gateway: &'a dyn LlmGateway,
    pub model: &'a str,
    pub user_input: &'a str,
    pub recent_context: &'a [Message],
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowOutcome {
    pub workflow: WorkflowId,
    pub result: Value,
    /// Chat summary appended as the turn's assistant message.
    pub message: String,
}

pub trait Workflow: Send + Sync {
    fn id(&self) -> WorkflowId;

    fn name(&self) -> &'static str;

    fn should_trigger<'a>(&'a self, input: TriggerInput<'a>)
    -> WorkflowFuture<'a, TriggerDecision>;

    fn execute(&self, context: &Map<String, Value>, now: DateTime<Utc>) -> WorkflowOutcome;
}

/// Ordered set of workflows. Trigger checks run in registration order and
/// the first conclusive one wins.
pub struct WorkflowRegistry {
    workflows: Vec<Box<dyn Workflow>>,
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new(vec![
            Box::new(AppointmentBookingWorkflow),
            Box::new(ClinicalTrialSearchWorkflow),
        ])
    }
}

impl WorkflowRegistry {
    pub fn new(workflows: Vec<Box<dyn Workflow>>) -> Self {
        Self { workflows }
    }

    pub fn get(&self, id: WorkflowId) -> Option<&dyn Workflow> {
        self.workflows
            .iter()
            .find(|workflow| workflow.id() == id)
            .map(|workflow| workflow.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Workflow> {
        self.workflows.iter().map(|workflow| workflow.as_ref())
    }

    pub fn ids(&self) -> Vec<WorkflowId> {
        self.iter().map(|workflow| workflow.id()).collect()
    }
}

/// Whether an assistant reply reads like an offer to book an appointment.
pub fn detect_booking_offer(reply: &str) -> bool {
    let lowered = reply.to_lowercase();
    let has = |needle: &str| lowered.contains(needle);

    (has("book") && has("appointment"))
        || (has("schedule") && has("appointment"))
        || has("help you book")
        || has("help with booking")
        || (has("appointment") && (has("help") || has("can")))
}

pub fn has_confirmation_keyword(user_input: &str) -> bool {
    let lowered = user_input.to_lowercase();
    CONFIRMATION_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Keyword pre-check followed by a yes/no model check. A failed model call
/// falls back to the keyword result.
pub async fn confirm_offer(gateway: &dyn LlmGateway, model: &str, user_input: &str) -> bool {
    if !has_confirmation_keyword(user_input) {
        return false;
    }

    let prompt = format!(
        "User message: \"{user_input}\"\n\n\
         Previous conversation context suggests the assistant just offered to help with something (like booking an appointment).\n\n\
         Does the user's message indicate they are confirming/agreeing to proceed? \n\
         Respond with only \"yes\" or \"no\"."
    );
    let request = ChatCompletionRequest::new(
        model,
        vec![
            ChatMessage::system(CONFIRMATION_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ],
        CONFIRMATION_TEMPERATURE,
    )
    .with_max_tokens(CONFIRMATION_MAX_TOKENS);

    let (result, telemetry) =
        complete_with_telemetry(gateway, LlmCallKind::Confirmation, request).await;
    log_telemetry(&telemetry);

    match result {
        Ok(completion) => completion.content.trim().eq_ignore_ascii_case("yes"),
        Err(err) => {
            warn!("confirmation check failed, accepting keyword match: {err}");
            true
        }
    }
}
