use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use navigator::llm::{LlmGateway, ScriptedGateway, ScriptedReply};
use navigator::templates::{DISCLAIMER, RE_ENGAGEMENT, SYSTEM_PROMPT, tool_payload};
use navigator::{
    Confidence, Navigator, Role, SessionSettings, SessionState, ToolKind, Track, TurnError,
    TurnKind, WorkflowId, WorkflowRegistry, format_tool_payload,
};

const CLASSIFIER_MODEL: &str = "gpt-4o-mini";

fn navigator_with(gateway: &Arc<ScriptedGateway>) -> Navigator {
    Navigator::new(
        Some(Arc::clone(gateway) as Arc<dyn LlmGateway>),
        CLASSIFIER_MODEL,
    )
}

fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

fn closing() -> String {
    format!("\n\n{DISCLAIMER}\n\n{RE_ENGAGEMENT}")
}

#[tokio::test]
async fn first_turn_skips_classifier_and_sends_system_prompt_plus_message() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_stream(ScriptedReply::fragments(["It's normal ", "to feel nervous."]));
    let navigator = navigator_with(&gateway);
    let mut session = SessionState::new();
    let mut partials = Vec::new();

    let outcome = navigator
        .submit_turn(
            &mut session,
            &SessionSettings::default(),
            "I have an appointment next week and I'm nervous",
            |progress| partials.push(progress.partial.to_string()),
        )
        .await
        .expect("turn should succeed");

    assert!(!outcome.classifier_invoked);
    assert!(outcome.classification.is_none());
    assert!(gateway.completion_requests().is_empty());
    assert_eq!(partials, vec!["It's normal ", "It's normal to feel nervous."]);

    let requests = gateway.stream_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[0].messages[0].role, Role::System);
    assert_eq!(requests[0].messages[0].content, SYSTEM_PROMPT);
    assert_eq!(
        requests[0].messages[1].content,
        "I have an appointment next week and I'm nervous"
    );
    assert_eq!(requests[0].model, "gpt-4o-mini");

    assert_eq!(session.len(), 2);
    assert_eq!(
        session.messages()[1].content,
        format!("It's normal to feel nervous.{}", closing())
    );
}

#[tokio::test]
async fn second_turn_classifies_and_augments_with_high_confidence_track() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .push_stream(ScriptedReply::text("Tell me more."))
        .push_completion(ScriptedReply::text(
            r#"{"track":"appointment","confidence":"high","reasoning":"wants to prepare"}"#,
        ))
        .push_stream(ScriptedReply::fragments([
            "Here's a checklist ",
            "to get you ready.",
        ]));
    let navigator = navigator_with(&gateway);
    let mut session = SessionState::new();
    let settings = SessionSettings::default();

    navigator
        .submit_turn(&mut session, &settings, "I see a cardiologist soon", |_| {})
        .await
        .expect("first turn should succeed");
    let outcome = navigator
        .submit_turn(&mut session, &settings, "How should I prepare?", |_| {})
        .await
        .expect("second turn should succeed");

    assert!(outcome.classifier_invoked);
    let classification = outcome.classification.expect("classification expected");
    assert_eq!(classification.track, Track::Appointment);
    assert_eq!(classification.confidence, Confidence::High);
    assert_eq!(outcome.augmented_tool, Some(ToolKind::AppointmentPreparation));

    let classifier_request = &gateway.completion_requests()[0];
    assert_eq!(classifier_request.model, CLASSIFIER_MODEL);
    assert_eq!(classifier_request.max_tokens, Some(200));
    assert!((classifier_request.temperature - 0.3).abs() < f32::EPSILON);

    let reply_request = &gateway.stream_requests()[1];
    assert_eq!(reply_request.messages[0].content, SYSTEM_PROMPT);
    assert_eq!(reply_request.messages.len(), 4);
    assert_eq!(
        reply_request.messages[3].content,
        "How should I prepare?\n\n[Detected need: appointment]"
    );

    let stored = session.messages();
    assert_eq!(stored.len(), 4);
    assert_eq!(stored[2].content, "How should I prepare?");
    let guide = format_tool_payload(&tool_payload(ToolKind::AppointmentPreparation));
    assert_eq!(
        stored[3].content,
        format!("Here's a checklist to get you ready.\n\n{guide}{}", closing())
    );
}

#[tokio::test]
async fn malformed_classifier_output_degrades_to_plain_reply() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .push_completion(ScriptedReply::text("results, probably"))
        .push_stream(ScriptedReply::text("Let me explain your test results."));
    let navigator = navigator_with(&gateway);
    let mut session = SessionState::new();
    session.ensure_welcome();

    let outcome = navigator
        .submit_turn(
            &mut session,
            &SessionSettings::default(),
            "Can you explain my A1C?",
            |_| {},
        )
        .await
        .expect("turn should succeed");

    assert!(outcome.classifier_invoked);
    assert!(outcome.classification.is_none());
    assert!(outcome.augmented_tool.is_none());
    assert_eq!(
        outcome.assistant_message,
        format!("Let me explain your test results.{}", closing())
    );
    assert_eq!(
        gateway.stream_requests()[0].messages[2].content,
        "Can you explain my A1C?"
    );
}

#[tokio::test]
async fn reply_failure_appends_exactly_one_apology() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_stream(ScriptedReply::Fail("status=503 code=overloaded".to_string()));
    let navigator = navigator_with(&gateway);
    let mut session = SessionState::new();

    let outcome = navigator
        .submit_turn(&mut session, &SessionSettings::default(), "hello", |_| {})
        .await
        .expect("reply failure is absorbed");

    assert!(outcome.reply_failed());
    assert_eq!(session.len(), 2);
    assert_eq!(session.messages()[0].role, Role::User);
    assert_eq!(session.messages()[1].role, Role::Assistant);
    assert!(
        session.messages()[1]
            .content
            .starts_with("I apologize, but I encountered an error: ")
    );
    assert!(session.messages()[1].content.contains("status=503 code=overloaded"));
    assert!(!session.messages()[1].content.contains(DISCLAIMER));
}

#[tokio::test]
async fn broken_stream_mid_reply_still_leaves_conversation_consistent() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .push_stream(ScriptedReply::FailAfter {
            fragments: vec!["Half an ans".to_string()],
            error: "stream_read_failed".to_string(),
        })
        .push_stream(ScriptedReply::text("Recovered."));
    let navigator = navigator_with(&gateway);
    let mut session = SessionState::new();
    let settings = SessionSettings::default();
    let mut seen = 0;

    let outcome = navigator
        .submit_turn(&mut session, &settings, "hi", |_| seen += 1)
        .await
        .expect("turn should return");
    assert_eq!(seen, 1);
    assert!(outcome.reply_failed());
    assert!(!outcome.assistant_message.contains("Half an ans"));
    assert_eq!(session.len(), 2);

    gateway.push_completion(ScriptedReply::text(
        r#"{"track":"general","confidence":"low","reasoning":"greeting"}"#,
    ));
    let next = navigator
        .submit_turn(&mut session, &settings, "are you there?", |_| {})
        .await
        .expect("session stays usable");
    assert!(!next.reply_failed());
    assert_eq!(session.len(), 4);
}

#[tokio::test]
async fn missing_credential_refuses_without_appending() {
    let navigator = Navigator::new(None, CLASSIFIER_MODEL);
    let mut session = SessionState::new();
    session.ensure_welcome();

    let result = navigator
        .submit_turn(&mut session, &SessionSettings::default(), "hello", |_| {})
        .await;

    assert_eq!(result, Err(TurnError::MissingCredential));
    assert_eq!(session.len(), 1);
    assert!(!navigator.has_credential());
}

#[tokio::test]
async fn caller_settings_select_model_and_temperature() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_stream(ScriptedReply::text("ok"));
    let navigator = navigator_with(&gateway);
    let mut session = SessionState::new();
    let settings =
        SessionSettings::new("gpt-4o".parse().expect("known model"), 0.25).expect("valid settings");

    navigator
        .submit_turn(&mut session, &settings, "hello", |_| {})
        .await
        .expect("turn should succeed");

    let request = &gateway.stream_requests()[0];
    assert_eq!(request.model, "gpt-4o");
    assert!((request.temperature - 0.25).abs() < f32::EPSILON);
    assert!(request.max_tokens.is_none());
}

#[tokio::test]
async fn workflows_are_off_unless_enabled() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_stream(ScriptedReply::text("Would you like me to book an appointment?"));
    let navigator = navigator_with(&gateway);
    let mut session = SessionState::new();

    let outcome = navigator
        .submit_turn(
            &mut session,
            &SessionSettings::default(),
            "Find clinical trials for me",
            |_| {},
        )
        .await
        .expect("turn should succeed");

    assert_eq!(outcome.kind, TurnKind::Chat);
    assert!(session.offered_workflow().is_none());
}

#[tokio::test]
async fn clinical_trial_request_runs_workflow_instead_of_reply() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_completion(ScriptedReply::text(
        r#"{"should_trigger": false, "confidence": "low", "reasoning": "not booking"}"#,
    ));
    let navigator = navigator_with(&gateway).with_workflows(WorkflowRegistry::default());
    let mut session = SessionState::new();

    let outcome = navigator
        .submit_turn(
            &mut session,
            &SessionSettings::default(),
            "Can you find clinical trials for my diabetes?",
            |_| {},
        )
        .await
        .expect("turn should succeed");

    assert_eq!(outcome.kind, TurnKind::Workflow(WorkflowId::ClinicalTrialSearch));
    assert!(gateway.stream_requests().is_empty());
    assert_eq!(session.len(), 2);
    assert!(
        session.messages()[1]
            .content
            .starts_with("I found 3 potentially relevant clinical trials for diabetes.")
    );
    assert!(!session.messages()[1].content.contains(DISCLAIMER));
}

#[tokio::test]
async fn confirmed_booking_offer_runs_appointment_workflow() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        // turn 1: booking trigger check, then the reply offering help
        .push_completion(ScriptedReply::text(
            r#"{"should_trigger": false, "confidence": "medium", "reasoning": "vague"}"#,
        ))
        .push_stream(ScriptedReply::text(
            "I can help you book an appointment with a primary care doctor. Would you like that?",
        ))
        // turn 2: confirmation check
        .push_completion(ScriptedReply::text("yes"));
    let navigator = navigator_with(&gateway)
        .with_workflows(WorkflowRegistry::default())
        .with_clock(fixed_clock);
    let mut session = SessionState::new();
    let settings = SessionSettings::default();

    let first = navigator
        .submit_turn(&mut session, &settings, "I think I should see someone", |_| {})
        .await
        .expect("first turn should succeed");
    assert_eq!(first.kind, TurnKind::Chat);
    assert_eq!(session.offered_workflow(), Some(WorkflowId::AppointmentBooking));

    let second = navigator
        .submit_turn(&mut session, &settings, "Yes please", |_| {})
        .await
        .expect("second turn should succeed");

    assert_eq!(second.kind, TurnKind::Workflow(WorkflowId::AppointmentBooking));
    assert!(session.offered_workflow().is_none());
    assert_eq!(
        second.assistant_message,
        "I've booked your appointment with Dr. Sarah Johnson on Monday, March 10 at 10:00 AM. Your appointment ID is APT-20250310-001. You'll receive a confirmation email shortly."
    );
    assert_eq!(session.len(), 4);
    assert_eq!(gateway.pending_replies(), 0);
}
