use navigator::{ToolKind, WorkflowId};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFixture {
    pub scenario_id: String,
    pub description: String,
    #[serde(default)]
    pub include_in_live_smoke: bool,
    /// Inject the welcome message before the first turn.
    #[serde(default)]
    pub show_welcome: bool,
    #[serde(default)]
    pub workflows_enabled: bool,
    #[serde(default)]
    pub settings: ScenarioSettings,
    pub turns: Vec<ScenarioTurn>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioSettings {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioTurn {
    pub user: String,
    /// Non-streamed answers consumed before classification, in call order
    /// (workflow confirmation and trigger checks).
    #[serde(default)]
    pub mocked_completions: Vec<String>,
    #[serde(default)]
    pub mocked_classifier_output: Option<String>,
    #[serde(default)]
    pub mocked_reply: Option<MockedReply>,
    #[serde(default)]
    pub expectations: TurnExpectations,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockedReply {
    Fragments(Vec<String>),
    Error(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnExpectations {
    #[serde(default)]
    pub classifier_invoked: Option<bool>,
    #[serde(default)]
    pub augmented_tool: Option<ToolExpectation>,
    #[serde(default)]
    pub workflow: Option<WorkflowId>,
    #[serde(default)]
    pub reply_failed: Option<bool>,
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub not_contains: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolExpectation {
    None,
    AppointmentPreparation,
    ResultsExplanation,
    ResourceFinder,
    CaregiverSupport,
}

impl ToolExpectation {
    pub const fn kind(self) -> Option<ToolKind> {
        match self {
            Self::None => None,
            Self::AppointmentPreparation => Some(ToolKind::AppointmentPreparation),
            Self::ResultsExplanation => Some(ToolKind::ResultsExplanation),
            Self::ResourceFinder => Some(ToolKind::ResourceFinder),
            Self::CaregiverSupport => Some(ToolKind::CaregiverSupport),
        }
    }
}
