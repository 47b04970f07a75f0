//! Research intent detection.
//!
//! Decides whether an incoming chat message should trigger the research
//! pipeline at all. Matching is a case-insensitive keyword check.

const TRIGGERS: &[&str] = &["research", "find", "what is", "how to", "best"];

/// Whether `text` asks for research.
pub fn is_research_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRIGGERS.iter().any(|trigger| lower.contains(trigger))
}
