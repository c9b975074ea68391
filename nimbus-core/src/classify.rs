//! Offline keyword heuristics — the fallback path when remote text analysis
//! is unavailable or too slow.
//!
//! All functions are pure, order-sensitive, and operate on lowercased
//! `title + " " + description` text. First match wins; metadata built from
//! these is always fully populated.

use crate::task::UrgencyLevel;

/// Categorize free text into the fixed category vocabulary.
///
/// Checked in a fixed order; "personal" is the terminal default.
pub fn category(text: &str) -> &'static str {
    let text = text.to_lowercase();
    if text.contains("work") || text.contains("project") || text.contains("meeting") {
        return "work";
    }
    if text.contains("buy") || text.contains("shop") || text.contains("store") {
        return "shopping";
    }
    if text.contains("call") || text.contains("family") || text.contains("friend") {
        return "personal";
    }
    if text.contains("doctor") || text.contains("health") || text.contains("exercise") {
        return "health";
    }
    "personal"
}

/// Estimate urgency from free text.
///
/// A keyword directly preceded by "not" or "no" does not count, so
/// "important but not urgent" reads as medium rather than high.
pub fn urgency(text: &str) -> UrgencyLevel {
    let text = text.to_lowercase();
    let hit = |kw: &str| has_affirmative(&text, kw);
    if hit("urgent") || hit("asap") || hit("immediately") {
        return UrgencyLevel::High;
    }
    if hit("soon") || hit("important") {
        return UrgencyLevel::Medium;
    }
    UrgencyLevel::Low
}

fn has_affirmative(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(i, _)| {
        let prev = text[..i].trim_end();
        !(ends_with_word(prev, "not") || ends_with_word(prev, "no"))
    })
}

fn ends_with_word(text: &str, word: &str) -> bool {
    text == word || text.ends_with(&format!(" {word}"))
}

/// Display name for a 2-letter language code; unknown codes read as English.
pub fn language_name(code: &str) -> &'static str {
    match code {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        _ => "English",
    }
}
