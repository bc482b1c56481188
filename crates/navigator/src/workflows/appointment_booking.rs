use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::warn;

use super::{
    TriggerDecision, TriggerInput, Workflow, WorkflowFuture, WorkflowId, WorkflowOutcome,
};
use crate::classifier::Confidence;
use crate::llm::{
    ChatCompletionRequest, ChatMessage, LlmCallKind, complete_with_telemetry, log_telemetry,
};
use crate::session::Message;

const TRIGGER_SYSTEM_PROMPT: &str = "You are an intent classifier. Respond only with valid JSON. Be strict - only return true for explicit booking requests.";
const TRIGGER_TEMPERATURE: f32 = 0.2;
const TRIGGER_MAX_TOKENS: u32 = 200;
const SUMMARY_MESSAGES: usize = 3;
const SUMMARY_SNIPPET_MAX_CHARS: usize = 150;

const BOOKING_LEAD_DAYS: i64 = 7;
const APPOINTMENT_TIME: &str = "10:00 AM";
const PROVIDER: &str = "Dr. Sarah Johnson";
const LOCATION: &str = "Wellness Medical Center, 123 Health Street, Suite 200";
const APPOINTMENT_TYPE: &str = "General Consultation";

/// Books a demonstration appointment once the user explicitly asks for one.
/// Preparing for or asking about an existing appointment does not count.
pub struct AppointmentBookingWorkflow;

#[derive(Debug, Deserialize)]
struct BookingIntent {
    #[serde(default)]
    should_trigger: bool,
    #[serde(default = "low_confidence")]
    confidence: Confidence,
    #[serde(default)]
    reasoning: String,
}

fn low_confidence() -> Confidence {
    Confidence::Low
}

impl Workflow for AppointmentBookingWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::AppointmentBooking
    }

    fn name(&self) -> &'static str {
        "Appointment Booking"
    }

    fn should_trigger<'a>(
        &'a self,
        input: TriggerInput<'a>,
    ) -> WorkflowFuture<'a, TriggerDecision> {
        Box::pin(async move {
            let request = ChatCompletionRequest::new(
                input.model,
                vec![
                    ChatMessage::system(TRIGGER_SYSTEM_PROMPT),
                    ChatMessage::user(detection_prompt(input.user_input, input.recent_context)),
                ],
                TRIGGER_TEMPERATURE,
            )
            .with_max_tokens(TRIGGER_MAX_TOKENS);

            let (result, telemetry) =
                complete_with_telemetry(input.gateway, LlmCallKind::WorkflowTrigger, request)
                    .await;
            log_telemetry(&telemetry);

            let intent = match result
                .map_err(|err| err.to_string())
                .and_then(|completion| {
                    serde_json::from_str::<BookingIntent>(completion.content.trim())
                        .map_err(|err| err.to_string())
                }) {
                Ok(intent) => intent,
                Err(err) => {
                    warn!("booking intent detection failed: {err}");
                    return TriggerDecision::skip(
                        Confidence::Low,
                        format!("Error in LLM detection: {err}"),
                    );
                }
            };

            if intent.should_trigger && intent.confidence == Confidence::High {
                let mut context = Map::new();
                context.insert("intent".to_string(), Value::from("booking"));
                return TriggerDecision {
                    should_trigger: true,
                    confidence: Confidence::High,
                    reasoning: intent.reasoning,
                    context,
                };
            }

            TriggerDecision::skip(intent.confidence, intent.reasoning)
        })
    }

    fn execute(&self, _context: &Map<String, Value>, now: DateTime<Utc>) -> WorkflowOutcome {
        let date = now + Duration::days(BOOKING_LEAD_DAYS);
        let appointment_id = format!("APT-{}-001", date.format("%Y%m%d"));

        WorkflowOutcome {
            workflow: self.id(),
            result: json!({
                "appointment_id": appointment_id,
                "date": date.format("%Y-%m-%d").to_string(),
                "time": APPOINTMENT_TIME,
                "provider": PROVIDER,
                "location": LOCATION,
                "type": APPOINTMENT_TYPE,
            }),
            message: format!(
                "I've booked your appointment with {PROVIDER} on {} at {APPOINTMENT_TIME}. Your appointment ID is {appointment_id}. You'll receive a confirmation email shortly.",
                date.format("%A, %B %d")
            ),
        }
    }
}

fn detection_prompt(user_input: &str, recent_context: &[Message]) -> String {
    let start = recent_context.len().saturating_sub(SUMMARY_MESSAGES);
    let summary = recent_context[start..]
        .iter()
        .map(|message| {
            let snippet: String = message
                .content
                .chars()
                .take(SUMMARY_SNIPPET_MAX_CHARS)
                .collect();
            format!("{}: {snippet}", message.role.as_str())
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an intent classifier for a healthcare chatbot. Determine if the user wants to BOOK/SCHEDULE a new appointment.

User's latest message: "{user_input}"

Recent conversation context:
{summary}

IMPORTANT: Only return TRUE if the user explicitly wants to BOOK or SCHEDULE a new appointment.

Pay special attention to phrases like "help me make/book/schedule" - these ARE booking requests and should return TRUE.

Return FALSE if:
- User is asking how to PREPARE for an appointment (already scheduled)
- User is asking ABOUT an appointment (questions, concerns, what to expect)
- User is asking to UNDERSTAND something about an appointment
- User mentions appointments in general without wanting to book
- User is discussing a past or existing appointment

Examples that should return TRUE:
- "I need to book an appointment"
- "Can you schedule me an appointment?"
- "I want to see a doctor"
- "How do I make an appointment?"
- "Can you help me book an appointment?"
- "Help me schedule an appointment"
- "Can you help with booking?"

Examples that should return FALSE:
- "I'm not sure how to prepare for that appointment"
- "What should I bring to my appointment?"
- "I'm nervous about my appointment"
- "Can you help me understand my appointment?" (understanding vs booking)
- "Help me prepare for my appointment" (preparation vs booking)

Respond ONLY with valid JSON in this exact format:
{{
    "should_trigger": true or false,
    "confidence": "high" or "medium" or "low",
    "reasoning": "brief explanation of why this is/isn't a booking request"
}}"#
    )
}
