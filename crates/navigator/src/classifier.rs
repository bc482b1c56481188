use std::sync::LazyLock;

use jsonschema::JSONSchema;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{
    ChatCompletionRequest, ChatMessage, LlmCallKind, LlmGateway, complete_with_telemetry,
    log_telemetry,
};
use crate::session::Message;
use crate::tools::ToolKind;

/// Classification only runs once the conversation holds at least this many
/// messages, counting the user message of the current turn.
pub const MIN_HISTORY_FOR_CLASSIFICATION: usize = 2;
pub const CLASSIFIER_TEMPERATURE: f32 = 0.3;
pub const CLASSIFIER_MAX_TOKENS: u32 = 200;
const CONTEXT_MESSAGES: usize = 3;
const CONTEXT_SNIPPET_MAX_CHARS: usize = 200;

const CLASSIFIER_SYSTEM_PROMPT: &str =
    "You are a healthcare intent classifier. Respond only with valid JSON.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Appointment,
    Results,
    Resources,
    Caregiver,
    General,
}

impl Track {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Appointment => "appointment",
            Self::Results => "results",
            Self::Resources => "resources",
            Self::Caregiver => "caregiver",
            Self::General => "general",
        }
    }

    /// The tool a track can be augmented with. `General` has none.
    pub const fn tool_kind(self) -> Option<ToolKind> {
        match self {
            Self::Appointment => Some(ToolKind::AppointmentPreparation),
            Self::Results => Some(ToolKind::ResultsExplanation),
            Self::Resources => Some(ToolKind::ResourceFinder),
            Self::Caregiver => Some(ToolKind::CaregiverSupport),
            Self::General => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TrackClassification {
    pub track: Track,
    pub confidence: Confidence,
    pub reasoning: String,
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classifier output is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("classifier schema failed to compile: {0}")]
    SchemaCompile(String),
    #[error("classifier output failed schema validation: {0:?}")]
    SchemaViolation(Vec<String>),
}

pub fn should_classify(history_len: usize) -> bool {
    history_len >= MIN_HISTORY_FOR_CLASSIFICATION
}

/// Classifies the latest user message. Any call or parse failure yields
/// `None`; the turn then proceeds as if no track was detected.
pub async fn classify(
    gateway: &dyn LlmGateway,
    model: &str,
    latest_user_message: &str,
    recent_history: &[Message],
) -> Option<TrackClassification> {
    let request = ChatCompletionRequest::new(
        model,
        vec![
            ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
            ChatMessage::user(classification_prompt(latest_user_message, recent_history)),
        ],
        CLASSIFIER_TEMPERATURE,
    )
    .with_max_tokens(CLASSIFIER_MAX_TOKENS);

    let (result, telemetry) =
        complete_with_telemetry(gateway, LlmCallKind::Classification, request).await;
    log_telemetry(&telemetry);

    let completion = match result {
        Ok(completion) => completion,
        Err(err) => {
            warn!("track classification request failed: {err}");
            return None;
        }
    };

    match parse_classification(&completion.content) {
        Ok(classification) => {
            debug!(
                track = classification.track.as_str(),
                confidence = ?classification.confidence,
                "track classified"
            );
            Some(classification)
        }
        Err(err) => {
            warn!("track classification output rejected: {err}");
            None
        }
    }
}

pub fn classification_prompt(latest_user_message: &str, recent_history: &[Message]) -> String {
    let context = context_snippets(recent_history);
    let context = serde_json::to_string(&context).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Based on this conversation, determine what kind of help the user needs most:

User's latest message: "{latest_user_message}"

Conversation context: {context}

Determine which track fits best:
1. "appointment" - User needs help preparing for or booking appointments
2. "results" - User needs help understanding test results or medical information
3. "resources" - User needs to find resources, support groups, or services
4. "caregiver" - User needs caregiver support or advice
5. "general" - General health navigation or unclear

Respond ONLY with valid JSON in this exact format:
{{
    "track": "appointment|results|resources|caregiver|general",
    "confidence": "high|medium|low",
    "reasoning": "brief explanation"
}}"#
    )
}

fn context_snippets(recent_history: &[Message]) -> Vec<String> {
    let start = recent_history.len().saturating_sub(CONTEXT_MESSAGES);
    recent_history[start..]
        .iter()
        .map(|message| {
            message
                .content
                .chars()
                .take(CONTEXT_SNIPPET_MAX_CHARS)
                .collect()
        })
        .collect()
}

pub fn parse_classification(raw: &str) -> Result<TrackClassification, ClassificationError> {
    let payload: Value = serde_json::from_str(raw.trim())?;
    let validator = CLASSIFICATION_VALIDATOR
        .as_ref()
        .map_err(|message| ClassificationError::SchemaCompile(message.clone()))?;

    if let Err(validation_errors) = validator.validate(&payload) {
        let errors = validation_errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(ClassificationError::SchemaViolation(errors));
    }

    Ok(serde_json::from_value(payload)?)
}

pub fn classification_schema() -> Value {
    serde_json::to_value(schema_for!(TrackClassification))
        .expect("track classification schema should be serializable")
}

static CLASSIFICATION_VALIDATOR: LazyLock<Result<JSONSchema, String>> = LazyLock::new(|| {
    JSONSchema::compile(&classification_schema()).map_err(|err| err.to_string())
});
