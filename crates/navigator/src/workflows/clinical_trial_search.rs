use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::{
    TriggerDecision, TriggerInput, Workflow, WorkflowFuture, WorkflowId, WorkflowOutcome,
};
use crate::classifier::Confidence;

const HIGH_CONFIDENCE_PHRASES: &[&str] = &[
    "clinical trial",
    "clinical trials",
    "find trials",
    "search for trials",
    "research study",
    "research studies",
    "experimental treatment",
    "participate in research",
    "clinical study",
];
const MEDIUM_CONFIDENCE_WORDS: &[&str] = &["trials", "research", "studies", "experimental"];
const AFFIRMATIONS: &[&str] = &["yes", "okay", "sure"];

const CONDITION_KEYWORDS: &[(&str, &[&str])] = &[
    ("diabetes", &["diabetes", "diabetic"]),
    ("cancer", &["cancer", "oncology", "tumor"]),
    ("cardiovascular", &["heart", "cardiac", "cardiovascular"]),
    ("arthritis", &["arthritis", "joint"]),
];
const GENERAL_CONDITION: &str = "general";

/// Keyword-triggered search returning demonstration trial listings.
pub struct ClinicalTrialSearchWorkflow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialListing {
    pub id: &'static str,
    pub title: &'static str,
    pub focus: &'static str,
    pub location: &'static str,
    pub status: &'static str,
    pub eligibility: &'static str,
    pub link: &'static str,
}

impl Workflow for ClinicalTrialSearchWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::ClinicalTrialSearch
    }

    fn name(&self) -> &'static str {
        "Clinical Trial Search"
    }

    fn should_trigger<'a>(
        &'a self,
        input: TriggerInput<'a>,
    ) -> WorkflowFuture<'a, TriggerDecision> {
        Box::pin(async move { decide(input.user_input) })
    }

    fn execute(&self, context: &Map<String, Value>, _now: DateTime<Utc>) -> WorkflowOutcome {
        let conditions = context
            .get("conditions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|items| !items.is_empty())
            .unwrap_or_else(|| vec![GENERAL_CONDITION.to_string()]);
        let query = conditions.join(", ");
        let trials = mock_trials(&conditions);

        WorkflowOutcome {
            workflow: self.id(),
            result: json!({
                "query": query,
                "trials_found": trials.len(),
                "trials": trials,
            }),
            message: format!(
                "I found {} potentially relevant clinical trials for {query}. I've displayed them above. Remember to discuss any trials you're interested in with your healthcare provider.",
                trials.len()
            ),
        }
    }
}

fn decide(user_input: &str) -> TriggerDecision {
    let lowered = user_input.to_lowercase();
    let contains_any = |needles: &[&str]| needles.iter().any(|needle| lowered.contains(needle));

    if contains_any(HIGH_CONFIDENCE_PHRASES) {
        return conclusive(
            "User explicitly wants to search for clinical trials",
            &lowered,
        );
    }

    if contains_any(MEDIUM_CONFIDENCE_WORDS) {
        if contains_any(AFFIRMATIONS) {
            return conclusive("User confirmed clinical trial search", &lowered);
        }
        let mut decision = TriggerDecision::skip(
            Confidence::Medium,
            "Mentioned trials/research but not conclusive",
        );
        decision.context = condition_context(&lowered);
        return decision;
    }

    TriggerDecision::skip(Confidence::Low, "No clinical trial search intent detected")
}

fn conclusive(reasoning: &str, lowered: &str) -> TriggerDecision {
    TriggerDecision {
        should_trigger: true,
        confidence: Confidence::High,
        reasoning: reasoning.to_string(),
        context: condition_context(lowered),
    }
}

fn condition_context(lowered: &str) -> Map<String, Value> {
    let mut conditions = extract_conditions(lowered);
    if conditions.is_empty() {
        conditions.push(GENERAL_CONDITION);
    }

    let mut context = Map::new();
    context.insert("conditions".to_string(), json!(conditions));
    context
}

fn extract_conditions(lowered: &str) -> Vec<&'static str> {
    CONDITION_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(condition, _)| *condition)
        .collect()
}

fn mock_trials(conditions: &[String]) -> Vec<TrialListing> {
    let has = |condition: &str| conditions.iter().any(|item| item == condition);

    let mut trials = vec![
        TrialListing {
            id: "CT-2024-001",
            title: "Novel Treatment Approaches for Chronic Conditions",
            focus: "Investigating new therapeutic interventions",
            location: "Multiple locations nationwide",
            status: "Recruiting",
            eligibility: "Adults 18-75 with relevant conditions",
            link: "https://clinicaltrials.gov/example-1",
        },
        TrialListing {
            id: "CT-2024-002",
            title: "Long-term Safety and Efficacy Study",
            focus: "Safety monitoring and outcome assessment",
            location: "Regional Medical Centers",
            status: "Active, not recruiting",
            eligibility: "Participants from previous studies",
            link: "https://clinicaltrials.gov/example-2",
        },
        TrialListing {
            id: "CT-2024-003",
            title: "Patient-Reported Outcomes Research",
            focus: "Quality of life and patient experience",
            location: "Online and local clinics",
            status: "Recruiting",
            eligibility: "All ages, various conditions welcome",
            link: "https://clinicaltrials.gov/example-3",
        },
    ];

    if has("diabetes") {
        trials[0].title = "Diabetes Management and Treatment Study";
        trials[0].focus = "New approaches to diabetes care";
    }
    if has("cancer") {
        trials[1].title = "Oncology Treatment Protocols";
        trials[1].focus = "Cancer treatment effectiveness";
    }

    trials
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::{ClinicalTrialSearchWorkflow, decide, extract_conditions};
    use crate::classifier::Confidence;
    use crate::workflows::Workflow;

    #[test]
    fn explicit_phrases_trigger_with_conditions() {
        let decision = decide("Are there clinical trials for my diabetic heart condition?");

        assert!(decision.is_conclusive());
        assert_eq!(
            decision.context.get("conditions"),
            Some(&json!(["diabetes", "cardiovascular"]))
        );
    }

    #[test]
    fn loose_words_need_an_affirmation() {
        let undecided = decide("I read about some research");
        assert!(!undecided.should_trigger);
        assert_eq!(undecided.confidence, Confidence::Medium);

        let confirmed = decide("Okay, look for trials");
        assert!(confirmed.is_conclusive());
        assert_eq!(confirmed.context.get("conditions"), Some(&json!(["general"])));

        let unrelated = decide("My knee hurts");
        assert_eq!(unrelated.confidence, Confidence::Low);
        assert!(unrelated.context.is_empty());
    }

    #[test]
    fn condition_tags_follow_keyword_order() {
        assert_eq!(
            extract_conditions("joint pain and a tumor"),
            vec!["cancer", "arthritis"]
        );
        assert!(extract_conditions("headache").is_empty());
    }

    #[test]
    fn execution_adjusts_titles_for_conditions() {
        let decision = decide("find trials for diabetes and cancer");
        let outcome = ClinicalTrialSearchWorkflow.execute(&decision.context, Utc::now());

        assert_eq!(outcome.result["trials_found"], 3);
        assert_eq!(outcome.result["query"], "diabetes, cancer");
        assert_eq!(
            outcome.result["trials"][0]["title"],
            "Diabetes Management and Treatment Study"
        );
        assert_eq!(outcome.result["trials"][1]["title"], "Oncology Treatment Protocols");
        assert!(outcome.message.starts_with(
            "I found 3 potentially relevant clinical trials for diabetes, cancer."
        ));
    }
}
