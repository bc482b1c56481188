//! Keyword gate deciding whether a canned tool payload is spliced into a
//! model reply.
//!
//! The gate is approximate on purpose. It looks for fixed keyword stems in
//! the reply text, so relevant replies without a stem are not augmented and
//! coincidental matches are. The keyword sets are kept exactly as listed in
//! [`track_keywords`].

use crate::classifier::{Confidence, Track, TrackClassification};
use crate::templates::{DISCLAIMER, RE_ENGAGEMENT, tool_payload};
use crate::tools::{ToolKind, format_tool_payload};

/// Lowercase stems that must appear in the reply before a track's tool is
/// appended. `General` has none and never augments.
pub const fn track_keywords(track: Track) -> &'static [&'static str] {
    match track {
        Track::Appointment => &["prepar", "checklist", "guide", "appointment"],
        Track::Results => &["result", "test", "explain", "understand"],
        Track::Resources => &["resource", "support", "help", "find"],
        Track::Caregiver => &["caregiv", "support", "help"],
        Track::General => &[],
    }
}

/// The tool that should be appended to `reply`, if any.
pub fn selected_tool(
    reply: &str,
    classification: Option<&TrackClassification>,
) -> Option<ToolKind> {
    let classification = classification?;
    if classification.confidence == Confidence::Low {
        return None;
    }

    let kind = classification.track.tool_kind()?;
    let lowered = reply.to_lowercase();
    track_keywords(classification.track)
        .iter()
        .any(|keyword| lowered.contains(keyword))
        .then_some(kind)
}

/// Appends the formatted tool payload for the classified track, separated by
/// a blank line, when the keyword gate passes. Otherwise returns the reply
/// unchanged.
pub fn augment(reply: &str, classification: Option<&TrackClassification>) -> String {
    match selected_tool(reply, classification) {
        Some(kind) => format!("{reply}\n\n{}", format_tool_payload(&tool_payload(kind))),
        None => reply.to_string(),
    }
}

/// Final assistant text for a chat turn: the augmented reply followed by the
/// disclaimer and re-engagement sentence.
pub fn compose_assistant_reply(
    reply: &str,
    classification: Option<&TrackClassification>,
) -> String {
    append_closing(&augment(reply, classification))
}

pub(crate) fn append_closing(body: &str) -> String {
    format!("{body}\n\n{DISCLAIMER}\n\n{RE_ENGAGEMENT}")
}
