use std::time::{Duration, Instant};

use tracing::info;

use super::{ChatCompletion, ChatCompletionRequest, LlmGateway, LlmGatewayError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmCallKind {
    Classification,
    Reply,
    WorkflowTrigger,
    Confirmation,
}

impl LlmCallKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Reply => "reply",
            Self::WorkflowTrigger => "workflow_trigger",
            Self::Confirmation => "confirmation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmTelemetryEvent {
    pub call: &'static str,
    pub outcome: &'static str,
    pub latency_ms: u64,
    pub model: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub estimated_cost_usd: Option<f64>,
    pub fragments: Option<usize>,
    pub error_type: Option<&'static str>,
}

pub async fn complete_with_telemetry(
    gateway: &dyn LlmGateway,
    call: LlmCallKind,
    request: ChatCompletionRequest,
) -> (Result<ChatCompletion, LlmGatewayError>, LlmTelemetryEvent) {
    let model = request.model.clone();
    let started_at = Instant::now();
    let result = gateway.complete(request).await;
    let telemetry = completion_telemetry(call, &model, started_at.elapsed(), &result);
    (result, telemetry)
}

fn completion_telemetry(
    call: LlmCallKind,
    requested_model: &str,
    latency: Duration,
    result: &Result<ChatCompletion, LlmGatewayError>,
) -> LlmTelemetryEvent {
    match result {
        Ok(completion) => {
            let usage = completion.usage.clone();
            LlmTelemetryEvent {
                call: call.as_str(),
                outcome: "success",
                latency_ms: duration_to_millis(latency),
                model: completion.model.clone(),
                prompt_tokens: usage.as_ref().map(|usage| usage.prompt_tokens),
                completion_tokens: usage.as_ref().map(|usage| usage.completion_tokens),
                estimated_cost_usd: usage.as_ref().and_then(|usage| {
                    estimate_cost_usd(
                        &completion.model,
                        usage.prompt_tokens,
                        usage.completion_tokens,
                    )
                }),
                fragments: None,
                error_type: None,
            }
        }
        Err(err) => failure_event(call, requested_model, latency, err),
    }
}

/// Telemetry for a streamed reply, measured from request to stream end.
pub fn stream_telemetry(
    model: &str,
    latency: Duration,
    fragments: usize,
    error: Option<&LlmGatewayError>,
) -> LlmTelemetryEvent {
    match error {
        Some(err) => LlmTelemetryEvent {
            fragments: Some(fragments),
            ..failure_event(LlmCallKind::Reply, model, latency, err)
        },
        None => LlmTelemetryEvent {
            call: LlmCallKind::Reply.as_str(),
            outcome: "success",
            latency_ms: duration_to_millis(latency),
            model: model.to_string(),
            prompt_tokens: None,
            completion_tokens: None,
            estimated_cost_usd: None,
            fragments: Some(fragments),
            error_type: None,
        },
    }
}

pub fn log_telemetry(telemetry: &LlmTelemetryEvent) {
    info!(
        call = telemetry.call,
        outcome = telemetry.outcome,
        model = telemetry.model.as_str(),
        latency_ms = telemetry.latency_ms,
        prompt_tokens = ?telemetry.prompt_tokens,
        completion_tokens = ?telemetry.completion_tokens,
        estimated_cost_usd = ?telemetry.estimated_cost_usd,
        fragments = ?telemetry.fragments,
        error_type = ?telemetry.error_type,
        "llm request metrics"
    );
}

fn failure_event(
    call: LlmCallKind,
    model: &str,
    latency: Duration,
    err: &LlmGatewayError,
) -> LlmTelemetryEvent {
    LlmTelemetryEvent {
        call: call.as_str(),
        outcome: "failure",
        latency_ms: duration_to_millis(latency),
        model: model.to_string(),
        prompt_tokens: None,
        completion_tokens: None,
        estimated_cost_usd: None,
        fragments: None,
        error_type: Some(error_type(err)),
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    let millis = duration.as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}

fn error_type(error: &LlmGatewayError) -> &'static str {
    match error {
        LlmGatewayError::Timeout => "timeout",
        LlmGatewayError::ProviderFailure(_) => "provider_failure",
        LlmGatewayError::InvalidProviderPayload(_) => "invalid_provider_payload",
    }
}

fn estimate_cost_usd(model: &str, prompt_tokens: u32, completion_tokens: u32) -> Option<f64> {
    let pricing = pricing_for_model(model)?;
    let prompt = f64::from(prompt_tokens);
    let completion = f64::from(completion_tokens);
    let total = (prompt * pricing.input_per_million + completion * pricing.output_per_million)
        / 1_000_000.0;
    Some((total * 1_000_000.0).round() / 1_000_000.0)
}

#[derive(Debug, Clone, Copy)]
struct ModelPricing {
    input_per_million: f64,
    output_per_million: f64,
}

fn pricing_for_model(model: &str) -> Option<ModelPricing> {
    let normalized = model.trim().to_ascii_lowercase();
    // Order matters: "gpt-4o-mini" also starts with "gpt-4o".
    if normalized.starts_with("gpt-4o-mini") {
        return Some(ModelPricing {
            input_per_million: 0.15,
            output_per_million: 0.60,
        });
    }
    if normalized.starts_with("gpt-4o") {
        return Some(ModelPricing {
            input_per_million: 2.50,
            output_per_million: 10.00,
        });
    }
    if normalized.starts_with("gpt-3.5-turbo") {
        return Some(ModelPricing {
            input_per_million: 0.50,
            output_per_million: 1.50,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{LlmCallKind, completion_telemetry, estimate_cost_usd, stream_telemetry};
    use crate::llm::{ChatCompletion, LlmGatewayError, LlmTokenUsage};

    #[test]
    fn cost_estimate_distinguishes_mini_from_full_model() {
        assert_eq!(estimate_cost_usd("gpt-4o-mini", 1_000_000, 0), Some(0.15));
        assert_eq!(estimate_cost_usd("gpt-4o-2024-08-06", 0, 1_000_000), Some(10.0));
        assert_eq!(estimate_cost_usd("some-local-model", 10, 10), None);
    }

    #[test]
    fn completion_telemetry_reports_usage_and_failures() {
        let ok = Ok(ChatCompletion {
            model: "gpt-4o-mini".to_string(),
            provider_request_id: None,
            content: "{}".to_string(),
            usage: Some(LlmTokenUsage {
                prompt_tokens: 120,
                completion_tokens: 30,
                total_tokens: 150,
            }),
        });
        let event = completion_telemetry(
            LlmCallKind::Classification,
            "gpt-4o-mini",
            Duration::from_millis(42),
            &ok,
        );
        assert_eq!(event.call, "classification");
        assert_eq!(event.outcome, "success");
        assert_eq!(event.latency_ms, 42);
        assert_eq!(event.prompt_tokens, Some(120));

        let failed = Err(LlmGatewayError::Timeout);
        let event = completion_telemetry(
            LlmCallKind::Confirmation,
            "gpt-4o-mini",
            Duration::from_millis(5),
            &failed,
        );
        assert_eq!(event.outcome, "failure");
        assert_eq!(event.error_type, Some("timeout"));
        assert_eq!(event.model, "gpt-4o-mini");
    }

    #[test]
    fn stream_telemetry_keeps_fragment_count_on_failure() {
        let err = LlmGatewayError::ProviderFailure("stream_read_failed".to_string());
        let event = stream_telemetry("gpt-4o", Duration::from_millis(10), 3, Some(&err));
        assert_eq!(event.call, "reply");
        assert_eq!(event.outcome, "failure");
        assert_eq!(event.fragments, Some(3));
        assert_eq!(event.error_type, Some("provider_failure"));
    }
}
