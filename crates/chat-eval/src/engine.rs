use std::sync::Arc;

use navigator::llm::{
    LlmGateway, OpenAiConfigError, OpenAiGateway, ScriptedGateway, ScriptedReply,
};
use navigator::templates::DISCLAIMER;
use navigator::{
    ChatModel, ConfigError, Navigator, NavigatorConfig, SessionSettings, SessionState, TurnKind,
    TurnOutcome, WorkflowRegistry,
};
use thiserror::Error;
use tracing::debug;

use crate::cli::{CliOptions, EvalMode};
use crate::fixture_io::{FixtureIoError, load_scenarios};
use crate::scenario::{MockedReply, ScenarioFixture, ScenarioTurn, TurnExpectations};

#[derive(Debug)]
pub struct EvalSummary {
    mode: EvalMode,
    results: Vec<ScenarioResult>,
}

impl EvalSummary {
    pub fn has_failures(&self) -> bool {
        self.results
            .iter()
            .any(|result| !result.failures.is_empty())
    }

    pub fn print(&self) {
        println!("Chat Eval Harness ({})", self.mode.as_str());

        let mut passed = 0usize;
        for result in &self.results {
            if result.failures.is_empty() {
                passed += 1;
                println!("[PASS] {}: {}", result.scenario_id, result.description);
            } else {
                println!("[FAIL] {}: {}", result.scenario_id, result.description);
                for failure in &result.failures {
                    println!("  - {failure}");
                }
            }
        }

        let total = self.results.len();
        let failed = total.saturating_sub(passed);
        println!("Summary: {total} total, {passed} passed, {failed} failed");
    }
}

#[derive(Debug)]
struct ScenarioResult {
    scenario_id: String,
    description: String,
    failures: Vec<String>,
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Fixtures(#[from] FixtureIoError),
    #[error("failed to load navigator config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to initialize OpenAI gateway in live mode: {0}")]
    OpenAiConfig(#[from] OpenAiConfigError),
    #[error("live mode requires OPENAI_API_KEY")]
    MissingCredential,
    #[error("no scenarios selected")]
    NoScenarios,
}

pub async fn run_eval(options: &CliOptions) -> Result<EvalSummary, EvalError> {
    let mut scenarios = load_scenarios()?;
    scenarios.sort_by(|left, right| left.scenario_id.cmp(&right.scenario_id));

    if let Some(selected) = &options.scenario {
        scenarios.retain(|scenario| &scenario.scenario_id == selected);
    }
    if options.mode == EvalMode::Live {
        scenarios.retain(|scenario| scenario.include_in_live_smoke);
    }
    if scenarios.is_empty() {
        return Err(EvalError::NoScenarios);
    }

    let live_config = if options.mode == EvalMode::Live {
        let config = NavigatorConfig::from_env()?;
        if !config.has_credential() {
            return Err(EvalError::MissingCredential);
        }
        Some(config)
    } else {
        None
    };

    let mut results = Vec::with_capacity(scenarios.len());
    for scenario in &scenarios {
        let result = match &live_config {
            Some(config) => run_live_scenario(scenario, config).await?,
            None => run_mocked_scenario(scenario).await,
        };
        results.push(result);
    }

    Ok(EvalSummary {
        mode: options.mode,
        results,
    })
}

async fn run_mocked_scenario(scenario: &ScenarioFixture) -> ScenarioResult {
    let mut failures = Vec::new();
    let gateway = Arc::new(ScriptedGateway::new());
    let navigator = scenario_navigator(
        Arc::clone(&gateway) as Arc<dyn LlmGateway>,
        navigator::config::DEFAULT_CLASSIFIER_MODEL,
        scenario,
    );

    let settings = match scenario_settings(scenario) {
        Ok(settings) => settings,
        Err(err) => {
            failures.push(format!("settings: {err}"));
            return scenario_result(scenario, failures);
        }
    };

    let mut session = SessionState::new();
    if scenario.show_welcome {
        session.ensure_welcome();
    }

    for (index, turn) in scenario.turns.iter().enumerate() {
        let turn_number = index + 1;
        queue_mocks(&gateway, turn);
        let before = session.len();

        match navigator
            .submit_turn(&mut session, &settings, &turn.user, |_| {})
            .await
        {
            Ok(outcome) => {
                check_appended(&session, before, turn_number, &mut failures);
                check_expectations(&outcome, &turn.expectations, turn_number, &mut failures);
            }
            Err(err) => failures.push(format!("turn {turn_number}: turn_error: {err}")),
        }

        let pending = gateway.pending_replies();
        if pending > 0 {
            failures.push(format!(
                "turn {turn_number}: mocks: {pending} mocked replies were not consumed"
            ));
            return scenario_result(scenario, failures);
        }
    }

    scenario_result(scenario, failures)
}

async fn run_live_scenario(
    scenario: &ScenarioFixture,
    config: &NavigatorConfig,
) -> Result<ScenarioResult, EvalError> {
    let mut failures = Vec::new();
    let gateway_config = config
        .gateway_config()
        .ok_or(EvalError::MissingCredential)?;
    let navigator = scenario_navigator(
        Arc::new(OpenAiGateway::new(gateway_config)?),
        &config.classifier_model,
        scenario,
    );
    let settings = match scenario_settings(scenario) {
        Ok(settings) => settings,
        Err(err) => {
            failures.push(format!("settings: {err}"));
            return Ok(scenario_result(scenario, failures));
        }
    };

    let mut session = SessionState::new();
    if scenario.show_welcome {
        session.ensure_welcome();
    }

    for (index, turn) in scenario.turns.iter().enumerate() {
        let turn_number = index + 1;
        let before = session.len();
        let outcome = match navigator
            .submit_turn(&mut session, &settings, &turn.user, |_| {})
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                failures.push(format!("turn {turn_number}: turn_error: {err}"));
                continue;
            }
        };

        check_appended(&session, before, turn_number, &mut failures);
        if let Some(error) = &outcome.reply_error {
            failures.push(format!("turn {turn_number}: provider_request: {error}"));
        } else if outcome.kind == TurnKind::Chat && !outcome.assistant_message.contains(DISCLAIMER)
        {
            failures.push(format!("turn {turn_number}: disclaimer: missing"));
        }
        debug!(
            scenario = scenario.scenario_id.as_str(),
            turn = turn_number,
            classification = ?outcome.classification,
            augmented_tool = ?outcome.augmented_tool,
            "live turn completed"
        );
    }

    Ok(scenario_result(scenario, failures))
}

/// Workflows follow the fixture only, never `NAVIGATOR_WORKFLOWS_ENABLED`, so
/// both modes run the same pipeline.
fn scenario_navigator(
    gateway: Arc<dyn LlmGateway>,
    classifier_model: &str,
    scenario: &ScenarioFixture,
) -> Navigator {
    let navigator = Navigator::new(Some(gateway), classifier_model);
    if scenario.workflows_enabled {
        navigator.with_workflows(WorkflowRegistry::default())
    } else {
        navigator
    }
}

fn scenario_settings(scenario: &ScenarioFixture) -> Result<SessionSettings, String> {
    let mut settings = SessionSettings::default();
    if let Some(model) = &scenario.settings.model {
        settings.set_model(model.parse::<ChatModel>().map_err(|err| err.to_string())?);
    }
    if let Some(temperature) = scenario.settings.temperature {
        settings
            .set_temperature(temperature)
            .map_err(|err| err.to_string())?;
    }
    Ok(settings)
}

fn queue_mocks(gateway: &ScriptedGateway, turn: &ScenarioTurn) {
    for completion in &turn.mocked_completions {
        gateway.push_completion(ScriptedReply::text(completion.clone()));
    }
    if let Some(raw) = &turn.mocked_classifier_output {
        gateway.push_completion(ScriptedReply::text(raw.clone()));
    }
    match &turn.mocked_reply {
        Some(MockedReply::Fragments(fragments)) => {
            gateway.push_stream(ScriptedReply::fragments(fragments.clone()));
        }
        Some(MockedReply::Error(error)) => {
            gateway.push_stream(ScriptedReply::Fail(error.clone()));
        }
        None => {}
    }
}

fn check_appended(session: &SessionState, before: usize, turn: usize, failures: &mut Vec<String>) {
    let appended = session.len().saturating_sub(before);
    if appended != 2 {
        failures.push(format!(
            "turn {turn}: conversation: expected 2 appended messages, actual={appended}"
        ));
    }
}

fn check_expectations(
    outcome: &TurnOutcome,
    expectations: &TurnExpectations,
    turn: usize,
    failures: &mut Vec<String>,
) {
    if let Some(expected) = expectations.classifier_invoked {
        if expected != outcome.classifier_invoked {
            failures.push(format!(
                "turn {turn}: classifier_invoked: expected={expected}, actual={}",
                outcome.classifier_invoked
            ));
        }
    }

    if let Some(expected) = expectations.augmented_tool {
        let expected = expected.kind();
        if expected != outcome.augmented_tool {
            failures.push(format!(
                "turn {turn}: augmented_tool: expected={}, actual={}",
                tool_label(expected),
                tool_label(outcome.augmented_tool)
            ));
        }
    }

    if let Some(expected) = expectations.workflow {
        if outcome.kind != TurnKind::Workflow(expected) {
            failures.push(format!(
                "turn {turn}: workflow: expected={}, actual={:?}",
                expected.as_str(),
                outcome.kind
            ));
        }
    }

    if let Some(expected) = expectations.reply_failed {
        if expected != outcome.reply_failed() {
            failures.push(format!(
                "turn {turn}: reply_failed: expected={expected}, actual={}",
                outcome.reply_failed()
            ));
        }
    }

    for needle in &expectations.contains {
        if !outcome.assistant_message.contains(needle.as_str()) {
            failures.push(format!("turn {turn}: contains: missing {needle:?}"));
        }
    }
    for needle in &expectations.not_contains {
        if outcome.assistant_message.contains(needle.as_str()) {
            failures.push(format!("turn {turn}: not_contains: found {needle:?}"));
        }
    }
}

fn tool_label(kind: Option<navigator::ToolKind>) -> &'static str {
    kind.map_or("none", |kind| kind.as_str())
}

fn scenario_result(scenario: &ScenarioFixture, failures: Vec<String>) -> ScenarioResult {
    ScenarioResult {
        scenario_id: scenario.scenario_id.clone(),
        description: scenario.description.clone(),
        failures,
    }
}
