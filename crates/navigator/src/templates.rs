//! Static conversation content: prompts, fixed closing lines and the
//! pre-written tool payloads keyed by tool kind.

use serde_json::{Map, Value, json};

use crate::tools::{ToolKind, ToolPayload};

pub const SYSTEM_PROMPT: &str = "You are WellNavigator, an empathetic patient advocacy chatbot that helps patients and caregivers navigate their healthcare journey.

CORE IDENTITY:
- You are warm, conversational, and supportive. Speak like a caring human friend who understands healthcare, not a clinical system.
- You have clinical knowledge of medical concepts, conditions, treatments, and healthcare systems. Use it to provide informed, helpful guidance.
- You use plain English, short sentences, and translate medical jargon into understandable terms.
- You show empathy but never dramatize situations.
- Your primary goal is to LISTEN, UNDERSTAND, and provide emotional support. Actions and next steps come later, only when appropriate.
- You are transparent: you can explain and guide, but you are not a doctor and cannot diagnose or replace medical professionals.

YOUR ROLE:
Guide users through healthcare situations using natural conversation and clinical understanding. Help with:
- Preparing for appointments
- Understanding test results and medical information (what tests measure, what results might mean in context, what questions to ask doctors)
- Explaining medical conditions, treatments, and procedures in understandable terms
- Understanding symptoms in context (what they might indicate, when to seek care, what information is important)
- Finding resources and support
- Caregiving support and advice
- General health journey navigation

CONVERSATIONAL FLOW:
1. Listen actively and let users share freely (no rigid forms).
2. First understand the user's situation: their feelings, concerns, what they understand so far, and where they are in their journey.
3. Provide emotional support and help them understand their situation before suggesting actions.
4. Gently explore whether they might benefit from specific help (appointment prep, resources, etc.).
5. Invite further conversation when it feels natural. Do not force it into every response.

KEY PRINCIPLES:
- No predefined paths. Adapt to each user's unique situation.
- Understand first, suggest later.
- Don't assume users need appointment help just because they mention a doctor. They might need emotional support, an explanation, or someone to listen first.
- Ask exploratory questions: \"How are you feeling about this?\" \"What concerns you most?\" \"What do you understand so far?\"
- NEVER diagnose. Help users understand possibilities and guide them to appropriate professional care.
- Only suggest actions (like appointment prep) when the user seems ready or explicitly asks.

Remember: your goal is to make healthcare less overwhelming through empathetic, conversational support informed by clinical understanding.";

pub const WELCOME_MESSAGE: &str = "Hi there. I'm WellNavigator, and I'm here to support you through your health journey.

I have clinical knowledge that helps me understand medical concepts and explain things in ways that make sense. I can help you understand test results, medical conditions, symptoms, and treatments, always in plain language and with empathy.

**Important note:** While I have clinical understanding to help guide and explain, I'm not a doctor and cannot diagnose or replace healthcare professionals. Always consult with your healthcare providers for medical advice and treatment decisions.

Tell me what's going on. How can I support you today?";

pub const DISCLAIMER: &str = "*I have clinical understanding to help explain and guide, but I'm not a doctor and cannot diagnose or replace healthcare professionals. Please consult with your healthcare providers for medical advice and treatment decisions.*";

pub const RE_ENGAGEMENT: &str =
    "Is there anything else on your mind, or another part of your health journey I can help you with?";

pub const GENERAL_VARIANT: &str = "general";

const APPOINTMENT_VARIANTS: &[&str] = &["general", "specialist", "follow-up"];
const RESULTS_VARIANTS: &[&str] = &["blood_test", "imaging", "general"];
const RESOURCE_VARIANTS: &[&str] = &["support_groups", "financial", "educational", "general"];
const CAREGIVER_VARIANTS: &[&str] = &["burnout", "communication", "general"];

pub fn tool_variants(kind: ToolKind) -> &'static [&'static str] {
    match kind {
        ToolKind::AppointmentPreparation => APPOINTMENT_VARIANTS,
        ToolKind::ResultsExplanation => RESULTS_VARIANTS,
        ToolKind::ResourceFinder => RESOURCE_VARIANTS,
        ToolKind::CaregiverSupport => CAREGIVER_VARIANTS,
    }
}

/// The payload used for reply augmentation.
pub fn tool_payload(kind: ToolKind) -> ToolPayload {
    tool_payload_variant(kind, GENERAL_VARIANT)
}

/// Looks up a named variant; unknown variants resolve to `general`.
pub fn tool_payload_variant(kind: ToolKind, variant: &str) -> ToolPayload {
    let variant = if tool_variants(kind).contains(&variant) {
        variant
    } else {
        GENERAL_VARIANT
    };

    match kind {
        ToolKind::AppointmentPreparation => appointment_guide(variant),
        ToolKind::ResultsExplanation => results_explanation(variant),
        ToolKind::ResourceFinder => resource_list(variant),
        ToolKind::CaregiverSupport => caregiver_guidance(variant),
    }
}

fn appointment_guide(variant: &str) -> ToolPayload {
    let data = match variant {
        "specialist" => json!({
            "title": "Specialist Appointment Preparation",
            "checklist": [
                "Bring referrals and previous medical records",
                "Prepare a timeline of your condition or symptoms",
                "List all current medications and dosages",
                "Write down specific questions about your condition",
                "Bring any relevant test results or imaging",
                "Prepare to discuss your treatment goals"
            ],
            "tips": "Specialist appointments can be brief, so prioritize your most important questions first."
        }),
        "follow-up" => json!({
            "title": "Follow-up Appointment Preparation",
            "checklist": [
                "Review what was discussed in your last appointment",
                "Note any changes in your condition since then",
                "Track how well treatments or medications are working",
                "Prepare questions about next steps",
                "Bring any new test results or concerns"
            ],
            "tips": "Follow-up appointments are great for tracking progress and adjusting your care plan."
        }),
        _ => json!({
            "title": "General Appointment Preparation",
            "checklist": [
                "Write down your symptoms and when they started",
                "List any medications you're currently taking",
                "Prepare questions you want to ask your doctor",
                "Bring your insurance card and ID",
                "Bring a list of any previous test results",
                "Consider bringing a trusted friend or family member for support"
            ],
            "tips": "It can be helpful to write down your questions beforehand so you don't forget anything during the appointment."
        }),
    };

    ToolPayload::new(
        ToolKind::AppointmentPreparation,
        object(data),
        "Here's a personalized guide to help you prepare for your appointment.",
    )
}

fn results_explanation(variant: &str) -> ToolPayload {
    let data = match variant {
        "blood_test" => json!({
            "title": "Understanding Your Blood Test Results",
            "common_components": [
                "Complete Blood Count (CBC) - measures red and white blood cells",
                "Basic Metabolic Panel - checks kidney function, electrolytes, and blood sugar",
                "Lipid Panel - measures cholesterol levels",
                "Liver Function Tests - assesses liver health"
            ],
            "general_advice": "Blood test results are interpreted in context with your symptoms and medical history. Your doctor will review these with you.",
            "when_to_ask": "Ask your doctor about any values marked as high or low, and what they mean for your specific situation."
        }),
        "imaging" => json!({
            "title": "Understanding Your Imaging Results",
            "general_advice": "Imaging results (X-rays, MRIs, CT scans) require interpretation by a radiologist and your doctor. They'll explain what the images show in the context of your symptoms.",
            "when_to_ask": "Important questions: What does this finding mean? Does it explain my symptoms? What are the next steps?"
        }),
        _ => json!({
            "title": "Understanding Your Test Results",
            "general_advice": "Test results are just one piece of the puzzle. Your doctor considers them along with your symptoms, medical history, and physical examination.",
            "when_to_ask": "Always ask your doctor to explain results in plain language and what they mean for your care plan."
        }),
    };

    ToolPayload::new(
        ToolKind::ResultsExplanation,
        object(data),
        format!("Here's some helpful context about {variant} results."),
    )
}

fn resource_list(variant: &str) -> ToolPayload {
    let data = match variant {
        "support_groups" => json!({
            "title": "Support Groups and Community Resources",
            "resources": [
                "Local patient support groups (check with your healthcare provider or hospital)",
                "Online communities for your specific condition",
                "Caregiver support networks",
                "Mental health and wellness resources"
            ],
            "tips": "Support groups can provide emotional support and practical advice from others who understand what you're going through."
        }),
        "financial" => json!({
            "title": "Financial and Insurance Resources",
            "resources": [
                "Patient assistance programs for medications",
                "Hospital financial aid programs",
                "Insurance navigation services",
                "Government healthcare programs (if eligible)"
            ],
            "tips": "Many hospitals and clinics have financial counselors who can help you understand costs and find assistance programs."
        }),
        "educational" => json!({
            "title": "Educational Resources",
            "resources": [
                "Reliable health information websites (Mayo Clinic, WebMD, CDC)",
                "Condition-specific educational materials from medical organizations",
                "Your healthcare provider's patient education library",
                "Trusted medical journals (for more detailed information)"
            ],
            "tips": "Always verify information from reliable, evidence-based sources and discuss what you learn with your healthcare team."
        }),
        _ => json!({
            "title": "General Health Resources",
            "resources": [
                "Your primary care provider's office for referrals",
                "Local health department services",
                "Mental health support services",
                "Transportation assistance for medical appointments"
            ],
            "tips": "Don't hesitate to ask your healthcare team about available resources. They often know about local services that can help."
        }),
    };

    ToolPayload::new(
        ToolKind::ResourceFinder,
        object(data),
        format!("I've found some helpful {variant} resources for you."),
    )
}

fn caregiver_guidance(variant: &str) -> ToolPayload {
    let data = match variant {
        "burnout" => json!({
            "title": "Caregiver Self-Care and Burnout Prevention",
            "advice": [
                "It's okay to ask for help. You don't have to do everything alone",
                "Take breaks when you can, even if they're short",
                "Connect with other caregivers who understand your experience",
                "Prioritize your own health. You can't help others if you're not well",
                "Consider respite care options to give yourself regular breaks"
            ],
            "resources": "Look into local caregiver support groups and respite care services in your area."
        }),
        "communication" => json!({
            "title": "Communicating with Healthcare Providers",
            "advice": [
                "Come prepared to appointments with questions and concerns written down",
                "Take notes during appointments or bring someone to help remember details",
                "Ask for clarification if you don't understand medical terms",
                "Keep a care journal to track symptoms, medications, and appointments",
                "Don't be afraid to advocate for your loved one's needs"
            ],
            "resources": "Many hospitals offer caregiver education programs to help you navigate the healthcare system."
        }),
        _ => json!({
            "title": "General Caregiver Support",
            "advice": [
                "Remember that caregiving is a journey. Be patient with yourself and your loved one",
                "Seek support from family, friends, and community resources",
                "Stay organized with calendars, medication schedules, and important documents",
                "Take care of your own physical and mental health",
                "Celebrate small victories and progress"
            ],
            "resources": "There are many resources available to support caregivers. Don't hesitate to reach out for help."
        }),
    };

    ToolPayload::new(
        ToolKind::CaregiverSupport,
        object(data),
        "Here's some guidance to support you in your caregiving role.",
    )
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{tool_payload, tool_payload_variant, tool_variants};
    use crate::tools::{ToolKind, format_tool_payload};

    #[test]
    fn every_kind_has_a_general_payload_with_title() {
        for kind in ToolKind::ALL {
            let payload = tool_payload(kind);
            assert_eq!(payload.kind(), Some(kind));
            assert!(payload.title().is_some_and(|title| !title.is_empty()));
            assert!(tool_variants(kind).contains(&"general"));
        }
    }

    #[test]
    fn unknown_variant_falls_back_to_general() {
        assert_eq!(
            tool_payload_variant(ToolKind::ResourceFinder, "astrology"),
            tool_payload(ToolKind::ResourceFinder)
        );
    }

    #[test]
    fn named_variants_carry_their_own_titles() {
        let specialist = tool_payload_variant(ToolKind::AppointmentPreparation, "specialist");
        assert_eq!(specialist.title(), Some("Specialist Appointment Preparation"));

        let blood = tool_payload_variant(ToolKind::ResultsExplanation, "blood_test");
        let text = format_tool_payload(&blood);
        assert!(text.contains("**Common components:**"));
        assert!(text.contains("- Lipid Panel - measures cholesterol levels"));
        assert_eq!(
            blood.message.as_deref(),
            Some("Here's some helpful context about blood_test results.")
        );
    }
}
