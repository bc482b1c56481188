use std::io::{self, Write};

use navigator::{ChatModel, WorkflowId};
use serde_json::Value;

use crate::cli::parse_temperature;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Empty,
    Message(String),
    Reset,
    Model(ChatModel),
    Temperature(f32),
    Help,
    Quit,
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };

        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (command, ""),
        };

        match name {
            "reset" | "clear" => Self::Reset,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "model" => match argument.parse::<ChatModel>() {
                Ok(model) => Self::Model(model),
                Err(err) => Self::Invalid(err.to_string()),
            },
            "temperature" => match parse_temperature(argument) {
                Ok(temperature) => Self::Temperature(temperature),
                Err(err) => Self::Invalid(err.to_string()),
            },
            other => Self::Invalid(format!("unknown command: /{other}")),
        }
    }
}

pub fn help_text() -> String {
    let models = ChatModel::ALL
        .iter()
        .map(|model| model.as_str())
        .collect::<Vec<_>>()
        .join("|");
    format!(
        "Commands:\n\
         - /reset                 Clear the conversation\n\
         - /model <{models}>\n\
         - /temperature <0..1>\n\
         - /help                  Show this help text\n\
         - /quit                  Leave WellNavigator"
    )
}

/// What is left to print after the streamed fragments were echoed.
pub fn unprinted_tail<'a>(assistant_message: &'a str, streamed: &str) -> &'a str {
    if streamed.is_empty() {
        return assistant_message;
    }
    assistant_message
        .strip_prefix(streamed)
        .unwrap_or(assistant_message)
}

/// Terminal rendering of a workflow's structured result.
pub fn workflow_details(workflow: WorkflowId, result: &Value) -> Vec<String> {
    let field = |value: &Value, key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    match workflow {
        WorkflowId::AppointmentBooking => vec![
            "Your appointment is confirmed!".to_string(),
            format!("  Date:     {}", field(result, "date")),
            format!("  Time:     {}", field(result, "time")),
            format!("  Provider: {}", field(result, "provider")),
            format!("  Type:     {}", field(result, "type")),
            format!("  Location: {}", field(result, "location")),
            format!("  ID:       {}", field(result, "appointment_id")),
        ],
        WorkflowId::ClinicalTrialSearch => result
            .get("trials")
            .and_then(Value::as_array)
            .map(|trials| {
                trials
                    .iter()
                    .enumerate()
                    .map(|(index, trial)| {
                        format!(
                            "Trial {}: {} [{}] ({})",
                            index + 1,
                            field(trial, "title"),
                            field(trial, "id"),
                            field(trial, "status")
                        )
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Echoes streamed fragments as they arrive. The first write error stops
/// further output and is returned from [`FragmentEcho::finish`].
pub struct FragmentEcho<W> {
    out: W,
    streamed: String,
    error: Option<io::Error>,
}

impl<W: Write> FragmentEcho<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            streamed: String::new(),
            error: None,
        }
    }

    pub fn push(&mut self, fragment: &str) {
        self.streamed.push_str(fragment);
        if self.error.is_some() {
            return;
        }
        if let Err(err) = write!(self.out, "{fragment}").and_then(|()| self.out.flush()) {
            self.error = Some(err);
        }
    }

    /// Returns the text streamed so far.
    pub fn finish(self) -> io::Result<String> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.streamed),
        }
    }
}
