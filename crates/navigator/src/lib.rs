pub mod augment;
pub mod classifier;
pub mod config;
mod config_env;
pub mod llm;
pub mod orchestrator;
pub mod session;
pub mod templates;
pub mod tools;
pub mod workflows;

pub use augment::{augment, compose_assistant_reply};
pub use classifier::{Confidence, Track, TrackClassification, classify};
pub use config::{ConfigError, NavigatorConfig, load_dotenv};
pub use orchestrator::{Navigator, ReplyProgress, TurnError, TurnKind, TurnOutcome, TurnPhase};
pub use session::{ChatModel, Message, Role, SessionSettings, SessionState, SettingsError};
pub use tools::{ToolKind, ToolPayload, format_tool_payload};
pub use workflows::{WorkflowId, WorkflowRegistry};
