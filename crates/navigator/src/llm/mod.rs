pub mod gateway;
pub mod observability;
pub mod openai;
pub mod scripted;

pub use gateway::{
    ChatCompletion, ChatCompletionRequest, ChatMessage, CompletionStream, LlmGateway,
    LlmGatewayError, LlmGatewayFuture, LlmTokenUsage,
};
pub use observability::{
    LlmCallKind, LlmTelemetryEvent, complete_with_telemetry, log_telemetry, stream_telemetry,
};
pub use openai::{OpenAiConfigError, OpenAiGateway, OpenAiGatewayConfig};
pub use scripted::{ScriptedGateway, ScriptedReply};
