// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed-input parsing: amounts and confirmation keywords.

const AFFIRMATIVE: &[&str] = &[
    "yes", "y", "yeah", "yep", "yup", "confirm", "confirmed", "ok", "okay", "sure", "correct",
];

/// Explicit refusals only. Words like "stop" or "not" show up in ordinary
/// expense descriptions.
const NEGATIVE: &[&str] = &["no", "n", "nope", "nah", "cancel", "abort", "nevermind"];

/// Parse a positive amount typed by the user.
///
/// Currency symbols, thousands separators and surrounding whitespace are
/// ignored. Zero, negatives and non-finite values are rejected.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '₹' | ',' | ' ' | '_'))
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// True for the universal cancel signals.
pub fn is_cancel_command(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower == "cancel" || lower == "/cancel"
}

/// Classify a reply to a confirmation prompt by its words.
///
/// `Some(false)` if any word is negative (a cancel always wins),
/// `Some(true)` if any word is affirmative, `None` otherwise.
pub fn confirmation_reply(text: &str) -> Option<bool> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| NEGATIVE.contains(w)) {
        Some(false)
    } else if words.iter().any(|w| AFFIRMATIVE.contains(w)) {
        Some(true)
    } else {
        None
    }
}

/// True for the literal "skip" at the description step.
pub fn is_skip(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("skip")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_tolerate_symbols_and_separators() {
        assert_eq!(parse_amount("45"), Some(45.0));
        assert_eq!(parse_amount(" $1,250.75 "), Some(1250.75));
        assert_eq!(parse_amount("€12"), Some(12.0));
        assert_eq!(parse_amount("0.5"), Some(0.5));
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        for raw in ["abc", "", "0", "-5", "12abc", "NaN", "inf", "1e400"] {
            assert_eq!(parse_amount(raw), None, "{raw}");
        }
    }

    #[test]
    fn cancel_commands() {
        assert!(is_cancel_command("cancel"));
        assert!(is_cancel_command(" /CANCEL "));
        assert!(!is_cancel_command("cancel my subscription"));
    }

    #[test]
    fn confirmation_keywords() {
        assert_eq!(confirmation_reply("Yes"), Some(true));
        assert_eq!(confirmation_reply("ok, confirm it!"), Some(true));
        assert_eq!(confirmation_reply("no thanks"), Some(false));
        assert_eq!(confirmation_reply("yes... actually no"), Some(false));
        assert_eq!(confirmation_reply("please cancel that"), Some(false));
        assert_eq!(confirmation_reply("what's my balance"), None);
        // Substrings don't count.
        assert_eq!(confirmation_reply("yesterday I bought notebooks"), None);
    }

    #[test]
    fn everyday_words_are_not_refusals() {
        assert_eq!(confirmation_reply("taxi to the bus stop"), None);
        assert_eq!(confirmation_reply("did not tip"), None);
        assert_eq!(confirmation_reply("don't forget the receipt"), None);
    }

    #[test]
    fn skip_is_case_insensitive() {
        assert!(is_skip("Skip"));
        assert!(!is_skip("skip it"));
    }
}
