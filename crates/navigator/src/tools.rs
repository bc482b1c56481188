use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const GENERIC_TOOL_FALLBACK: &str = "I've gathered some information for you.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    AppointmentPreparation,
    ResultsExplanation,
    ResourceFinder,
    CaregiverSupport,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        Self::AppointmentPreparation,
        Self::ResultsExplanation,
        Self::ResourceFinder,
        Self::CaregiverSupport,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AppointmentPreparation => "appointment_preparation",
            Self::ResultsExplanation => "results_explanation",
            Self::ResourceFinder => "resource_finder",
            Self::CaregiverSupport => "caregiver_support",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }
}

/// Static informational payload. `tool` stays a raw label so payloads of
/// unknown kinds still format to a fallback instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPayload {
    pub tool: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ToolPayload {
    pub fn new(kind: ToolKind, data: Map<String, Value>, message: impl Into<String>) -> Self {
        Self {
            tool: kind.as_str().to_string(),
            data,
            message: Some(message.into()),
        }
    }

    pub fn kind(&self) -> Option<ToolKind> {
        ToolKind::from_label(&self.tool)
    }

    pub fn title(&self) -> Option<&str> {
        self.data.get("title").and_then(Value::as_str)
    }
}

/// Renders a payload as markdown-ish display text. Never fails: missing
/// fields render empty, unknown kinds fall back to the payload message.
pub fn format_tool_payload(payload: &ToolPayload) -> String {
    let data = &payload.data;
    let Some(kind) = payload.kind() else {
        return payload
            .message
            .clone()
            .unwrap_or_else(|| GENERIC_TOOL_FALLBACK.to_string());
    };

    let mut text = String::new();
    match kind {
        ToolKind::AppointmentPreparation => {
            push_heading(&mut text, data, "Appointment Preparation Guide");
            text.push_str("**Checklist:**\n");
            push_bullets(&mut text, data, "checklist");
            let _ = writeln!(text, "\n💡 **Tip:** {}", text_field(data, "tips"));
        }
        ToolKind::ResultsExplanation => {
            push_heading(&mut text, data, "Understanding Your Results");
            if data.contains_key("common_components") {
                text.push_str("**Common components:**\n");
                push_bullets(&mut text, data, "common_components");
                text.push('\n');
            }
            let _ = writeln!(text, "{}\n", text_field(data, "general_advice"));
            let _ = writeln!(text, "**Questions to ask:** {}", text_field(data, "when_to_ask"));
        }
        ToolKind::ResourceFinder => {
            push_heading(&mut text, data, "Resources");
            push_bullets(&mut text, data, "resources");
            let _ = writeln!(text, "\n💡 **Tip:** {}", text_field(data, "tips"));
        }
        ToolKind::CaregiverSupport => {
            push_heading(&mut text, data, "Caregiver Support");
            push_bullets(&mut text, data, "advice");
            let _ = writeln!(text, "\n**Resources:** {}", text_field(data, "resources"));
        }
    }

    text
}

fn push_heading(text: &mut String, data: &Map<String, Value>, default_title: &str) {
    let title = data
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(default_title);
    let _ = write!(text, "## {title}\n\n");
}

fn push_bullets(text: &mut String, data: &Map<String, Value>, key: &str) {
    for item in list_field(data, key) {
        let _ = writeln!(text, "- {item}");
    }
}

fn text_field<'a>(data: &'a Map<String, Value>, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

fn list_field<'a>(data: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a str> {
    data.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}
