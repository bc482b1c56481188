use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::augment::{compose_assistant_reply, selected_tool};
use crate::classifier::{Confidence, Track, TrackClassification, classify, should_classify};
use crate::config::NavigatorConfig;
use crate::llm::{
    ChatCompletionRequest, ChatMessage, LlmGateway, LlmGatewayError, OpenAiConfigError,
    OpenAiGateway, log_telemetry, stream_telemetry,
};
use crate::session::{Message, SessionSettings, SessionState};
use crate::templates::SYSTEM_PROMPT;
use crate::tools::ToolKind;
use crate::workflows::{
    TRIGGER_CONTEXT_MESSAGES, TriggerInput, WorkflowId, WorkflowOutcome, WorkflowRegistry,
    confirm_offer, detect_booking_offer,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("OPENAI_API_KEY is not configured; model calls are disabled")]
    MissingCredential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingClassification,
    AwaitingModelStream,
    Augmenting,
    Appended,
}

impl TurnPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingClassification => "awaiting_classification",
            Self::AwaitingModelStream => "awaiting_model_stream",
            Self::Augmenting => "augmenting",
            Self::Appended => "appended",
        }
    }
}

/// Streamed reply progress, reported after every fragment.
#[derive(Debug, Clone, Copy)]
pub struct ReplyProgress<'a> {
    pub fragment: &'a str,
    pub partial: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Chat,
    Workflow(WorkflowId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub kind: TurnKind,
    /// The assistant message appended for this turn.
    pub assistant_message: String,
    pub classifier_invoked: bool,
    pub classification: Option<TrackClassification>,
    pub augmented_tool: Option<ToolKind>,
    /// Set when the reply call failed and the message is the apology.
    pub reply_error: Option<String>,
    pub workflow_result: Option<serde_json::Value>,
}

impl TurnOutcome {
    pub fn reply_failed(&self) -> bool {
        self.reply_error.is_some()
    }
}

/// Runs one user turn at a time against a caller-owned [`SessionState`].
pub struct Navigator {
    gateway: Option<Arc<dyn LlmGateway>>,
    classifier_model: String,
    workflows: Option<WorkflowRegistry>,
    clock: fn() -> DateTime<Utc>,
}

impl Navigator {
    pub fn new(gateway: Option<Arc<dyn LlmGateway>>, classifier_model: impl Into<String>) -> Self {
        Self {
            gateway,
            classifier_model: classifier_model.into(),
            workflows: None,
            clock: Utc::now,
        }
    }

    /// Builds the OpenAI-backed navigator. A missing credential leaves the
    /// navigator without a gateway; every turn then fails with
    /// [`TurnError::MissingCredential`].
    pub fn from_config(config: &NavigatorConfig) -> Result<Self, OpenAiConfigError> {
        let gateway = match config.gateway_config() {
            Some(gateway_config) => {
                Some(Arc::new(OpenAiGateway::new(gateway_config)?) as Arc<dyn LlmGateway>)
            }
            None => None,
        };

        let navigator = Self::new(gateway, config.classifier_model.clone());
        Ok(if config.workflows_enabled {
            navigator.with_workflows(WorkflowRegistry::default())
        } else {
            navigator
        })
    }

    pub fn with_workflows(mut self, workflows: WorkflowRegistry) -> Self {
        self.workflows = Some(workflows);
        self
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn has_credential(&self) -> bool {
        self.gateway.is_some()
    }

    pub fn workflows_enabled(&self) -> bool {
        self.workflows.is_some()
    }

    /// Appends exactly one user and one assistant message, or nothing when
    /// no credential is configured.
    pub async fn submit_turn<F>(
        &self,
        session: &mut SessionState,
        settings: &SessionSettings,
        user_input: &str,
        mut on_progress: F,
    ) -> Result<TurnOutcome, TurnError>
    where
        F: FnMut(ReplyProgress<'_>),
    {
        let Some(gateway) = self.gateway.as_deref() else {
            warn!("turn refused: no model credential configured");
            return Err(TurnError::MissingCredential);
        };

        session.append_user(user_input);

        if let Some(workflows) = &self.workflows {
            if let Some(outcome) = self
                .run_workflow_if_triggered(gateway, workflows, session, user_input)
                .await
            {
                session.append_assistant(outcome.message.clone());
                info!(
                    session_id = %session.session_id(),
                    workflow = outcome.workflow.as_str(),
                    "workflow turn completed"
                );
                return Ok(TurnOutcome {
                    kind: TurnKind::Workflow(outcome.workflow),
                    assistant_message: outcome.message,
                    classifier_invoked: false,
                    classification: None,
                    augmented_tool: None,
                    reply_error: None,
                    workflow_result: Some(outcome.result),
                });
            }
        }

        self.run_chat_turn(gateway, session, settings, user_input, &mut on_progress)
            .await
    }

    async fn run_chat_turn<F>(
        &self,
        gateway: &dyn LlmGateway,
        session: &mut SessionState,
        settings: &SessionSettings,
        user_input: &str,
        on_progress: &mut F,
    ) -> Result<TurnOutcome, TurnError>
    where
        F: FnMut(ReplyProgress<'_>),
    {
        let mut phase = TurnPhase::Idle;
        let classifier_invoked = should_classify(session.len());
        let classification = if classifier_invoked {
            transition(&mut phase, TurnPhase::AwaitingClassification);
            classify(
                gateway,
                &self.classifier_model,
                user_input,
                session.messages(),
            )
            .await
        } else {
            None
        };

        transition(&mut phase, TurnPhase::AwaitingModelStream);
        let request = ChatCompletionRequest::new(
            settings.model().as_str(),
            outgoing_messages(session.messages(), classification.as_ref()),
            settings.temperature(),
        );

        let (assistant_message, augmented_tool, reply_error) =
            match stream_reply(gateway, request, on_progress).await {
                Ok(reply) => {
                    transition(&mut phase, TurnPhase::Augmenting);
                    let augmented_tool = selected_tool(&reply, classification.as_ref());
                    if self.workflows.is_some() && detect_booking_offer(&reply) {
                        session.record_offer(WorkflowId::AppointmentBooking);
                    }
                    (
                        compose_assistant_reply(&reply, classification.as_ref()),
                        augmented_tool,
                        None,
                    )
                }
                Err(err) => {
                    warn!(session_id = %session.session_id(), "reply call failed: {err}");
                    (apology(&err), None, Some(err.to_string()))
                }
            };

        session.append_assistant(assistant_message.clone());
        transition(&mut phase, TurnPhase::Appended);

        Ok(TurnOutcome {
            kind: TurnKind::Chat,
            assistant_message,
            classifier_invoked,
            classification,
            augmented_tool,
            reply_error,
            workflow_result: None,
        })
    }

    async fn run_workflow_if_triggered(
        &self,
        gateway: &dyn LlmGateway,
        workflows: &WorkflowRegistry,
        session: &mut SessionState,
        user_input: &str,
    ) -> Option<WorkflowOutcome> {
        if let Some(offered) = session.offered_workflow() {
            if confirm_offer(gateway, &self.classifier_model, user_input).await {
                session.take_offer();
                if let Some(workflow) = workflows.get(offered) {
                    debug!(workflow = offered.as_str(), "offered workflow confirmed");
                    return Some(workflow.execute(&Default::default(), (self.clock)()));
                }
            }
        }

        let messages = session.messages();
        let start = messages.len().saturating_sub(TRIGGER_CONTEXT_MESSAGES);
        let input = TriggerInput {
            gateway,
            model: &self.classifier_model,
            user_input,
            recent_context: &messages[start..],
        };

        for workflow in workflows.iter() {
            let decision = workflow.should_trigger(input).await;
            debug!(
                workflow = workflow.id().as_str(),
                should_trigger = decision.should_trigger,
                confidence = ?decision.confidence,
                reasoning = decision.reasoning.as_str(),
                "workflow trigger evaluated"
            );
            if decision.is_conclusive() {
                return Some(workflow.execute(&decision.context, (self.clock)()));
            }
        }

        None
    }
}

fn transition(phase: &mut TurnPhase, next: TurnPhase) {
    debug!(from = phase.as_str(), to = next.as_str(), "turn phase");
    *phase = next;
}

/// System prompt first, then the stored conversation. A high-confidence,
/// non-general classification adds a hint to the outgoing copy of the last
/// user message only.
pub fn outgoing_messages(
    conversation: &[Message],
    classification: Option<&TrackClassification>,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(conversation.len() + 1);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    messages.extend(conversation.iter().map(ChatMessage::from));

    if let Some(hint) = classification.and_then(track_hint) {
        if let Some(last) = messages.last_mut() {
            last.content = format!("{}\n\n{hint}", last.content);
        }
    }

    messages
}

fn track_hint(classification: &TrackClassification) -> Option<String> {
    if classification.confidence != Confidence::High || classification.track == Track::General {
        return None;
    }
    Some(format!("[Detected need: {}]", classification.track.as_str()))
}

pub fn apology(err: &LlmGatewayError) -> String {
    format!(
        "I apologize, but I encountered an error: {err}\n\nPlease try again, or rephrase your question."
    )
}

async fn stream_reply<F>(
    gateway: &dyn LlmGateway,
    request: ChatCompletionRequest,
    on_progress: &mut F,
) -> Result<String, LlmGatewayError>
where
    F: FnMut(ReplyProgress<'_>),
{
    let model = request.model.clone();
    let started_at = Instant::now();
    let mut reply = String::new();
    let mut fragments = 0usize;

    let result = consume_stream(gateway, request, &mut reply, &mut fragments, on_progress).await;
    let telemetry = stream_telemetry(
        &model,
        started_at.elapsed(),
        fragments,
        result.as_ref().err(),
    );
    log_telemetry(&telemetry);

    result.map(|()| reply)
}

async fn consume_stream<F>(
    gateway: &dyn LlmGateway,
    request: ChatCompletionRequest,
    reply: &mut String,
    fragments: &mut usize,
    on_progress: &mut F,
) -> Result<(), LlmGatewayError>
where
    F: FnMut(ReplyProgress<'_>),
{
    let mut stream = gateway.stream(request).await?;
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        *fragments += 1;
        reply.push_str(&fragment);
        on_progress(ReplyProgress {
            fragment: &fragment,
            partial: reply.as_str(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apology, outgoing_messages, track_hint};
    use crate::classifier::{Confidence, Track, TrackClassification};
    use crate::llm::LlmGatewayError;
    use crate::session::{Message, Role};
    use crate::templates::SYSTEM_PROMPT;

    fn classification(track: Track, confidence: Confidence) -> TrackClassification {
        TrackClassification {
            track,
            confidence,
            reasoning: "test".to_string(),
        }
    }

    #[test]
    fn system_prompt_always_leads() {
        let messages = outgoing_messages(&[], None);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);

        let history = vec![Message::assistant("hi"), Message::user("hello")];
        let messages = outgoing_messages(&history, None);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[2].content, "hello");
    }

    #[test]
    fn hint_only_for_high_confidence_specific_tracks() {
        let history = vec![Message::assistant("hi"), Message::user("my labs")];

        let high = classification(Track::Results, Confidence::High);
        let messages = outgoing_messages(&history, Some(&high));
        assert_eq!(messages[2].content, "my labs\n\n[Detected need: results]");
        assert_eq!(history[1].content, "my labs");

        assert!(track_hint(&classification(Track::Results, Confidence::Medium)).is_none());
        assert!(track_hint(&classification(Track::General, Confidence::High)).is_none());
    }

    #[test]
    fn apology_embeds_error_text() {
        let text = apology(&LlmGatewayError::ProviderFailure("status=500".to_string()));
        assert!(text.starts_with("I apologize, but I encountered an error: "));
        assert!(text.contains("status=500"));
        assert!(text.ends_with("\n\nPlease try again, or rephrase your question."));
    }
}
