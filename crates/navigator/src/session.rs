use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::templates::WELCOME_MESSAGE;
use crate::workflows::WorkflowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-session mutable state. The conversation only ever grows by appending
/// until `reset` clears it wholesale; the system prompt is never stored here.
#[derive(Debug, Clone)]
pub struct SessionState {
    session_id: Uuid,
    messages: Vec<Message>,
    welcome_shown: bool,
    offered_workflow: Option<WorkflowId>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            messages: Vec::new(),
            welcome_shown: false,
            offered_workflow: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn welcome_shown(&self) -> bool {
        self.welcome_shown
    }

    pub fn offered_workflow(&self) -> Option<WorkflowId> {
        self.offered_workflow
    }

    pub fn append_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Injects the welcome message once per session, only into an empty
    /// conversation. Returns the welcome text when it was injected.
    pub fn ensure_welcome(&mut self) -> Option<&str> {
        if self.welcome_shown || !self.messages.is_empty() {
            return None;
        }

        self.messages.push(Message::assistant(WELCOME_MESSAGE));
        self.welcome_shown = true;
        Some(WELCOME_MESSAGE)
    }

    pub fn record_offer(&mut self, workflow: WorkflowId) {
        self.offered_workflow = Some(workflow);
    }

    pub fn take_offer(&mut self) -> Option<WorkflowId> {
        self.offered_workflow.take()
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.welcome_shown = false;
        self.offered_workflow = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChatModel {
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
}

impl ChatModel {
    pub const ALL: [ChatModel; 3] = [Self::Gpt4oMini, Self::Gpt4o, Self::Gpt35Turbo];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Gpt4o => "gpt-4o",
            Self::Gpt35Turbo => "gpt-3.5-turbo",
        }
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatModel {
    type Err = SettingsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == normalized)
            .ok_or_else(|| SettingsError::UnsupportedModel(value.to_string()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("unsupported model '{0}' (expected one of gpt-4o-mini, gpt-4o, gpt-3.5-turbo)")]
    UnsupportedModel(String),
    #[error("temperature must be within [0, 1], got {0}")]
    TemperatureOutOfRange(f32),
}

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Caller-selected reply settings. Never part of the conversation history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    model: ChatModel,
    temperature: f32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            model: ChatModel::default(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl SessionSettings {
    pub fn new(model: ChatModel, temperature: f32) -> Result<Self, SettingsError> {
        validate_temperature(temperature)?;
        Ok(Self { model, temperature })
    }

    pub fn model(&self) -> ChatModel {
        self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn set_model(&mut self, model: ChatModel) {
        self.model = model;
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), SettingsError> {
        validate_temperature(temperature)?;
        self.temperature = temperature;
        Ok(())
    }
}

fn validate_temperature(temperature: f32) -> Result<(), SettingsError> {
    if !(0.0..=1.0).contains(&temperature) {
        return Err(SettingsError::TemperatureOutOfRange(temperature));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ChatModel, Role, SessionSettings, SessionState, SettingsError};
    use crate::templates::WELCOME_MESSAGE;
    use crate::workflows::WorkflowId;

    #[test]
    fn welcome_is_injected_once_into_empty_conversation() {
        let mut session = SessionState::new();

        assert_eq!(session.ensure_welcome(), Some(WELCOME_MESSAGE));
        assert_eq!(session.ensure_welcome(), None);
        assert_eq!(session.len(), 1);
        assert_eq!(session.messages()[0].role, Role::Assistant);
        assert!(session.welcome_shown());
    }

    #[test]
    fn welcome_is_skipped_when_conversation_already_has_messages() {
        let mut session = SessionState::new();
        session.append_user("hello");

        assert_eq!(session.ensure_welcome(), None);
        assert!(!session.welcome_shown());
    }

    #[test]
    fn reset_clears_history_welcome_flag_and_offer() {
        let mut session = SessionState::new();
        session.ensure_welcome();
        session.append_user("book me in");
        session.record_offer(WorkflowId::AppointmentBooking);

        session.reset();

        assert!(session.is_empty());
        assert!(!session.welcome_shown());
        assert_eq!(session.offered_workflow(), None);
        assert_eq!(session.ensure_welcome(), Some(WELCOME_MESSAGE));
    }

    #[test]
    fn take_offer_clears_pending_offer() {
        let mut session = SessionState::new();
        session.record_offer(WorkflowId::AppointmentBooking);

        assert_eq!(session.take_offer(), Some(WorkflowId::AppointmentBooking));
        assert_eq!(session.take_offer(), None);
    }

    #[test]
    fn model_parsing_accepts_only_the_allowed_set() {
        assert_eq!("gpt-4o".parse::<ChatModel>(), Ok(ChatModel::Gpt4o));
        assert_eq!(" GPT-4O-MINI ".parse::<ChatModel>(), Ok(ChatModel::Gpt4oMini));
        assert_eq!("gpt-3.5-turbo".parse::<ChatModel>(), Ok(ChatModel::Gpt35Turbo));
        assert_eq!(
            "gpt-5".parse::<ChatModel>(),
            Err(SettingsError::UnsupportedModel("gpt-5".to_string()))
        );
    }

    #[test]
    fn settings_reject_temperature_outside_unit_interval() {
        assert!(SessionSettings::new(ChatModel::Gpt4o, 0.0).is_ok());
        assert!(SessionSettings::new(ChatModel::Gpt4o, 1.0).is_ok());
        assert_eq!(
            SessionSettings::new(ChatModel::Gpt4o, 1.2),
            Err(SettingsError::TemperatureOutOfRange(1.2))
        );

        let mut settings = SessionSettings::default();
        assert!(settings.set_temperature(f32::NAN).is_err());
        assert_eq!(settings.temperature(), 0.7);
    }
}
