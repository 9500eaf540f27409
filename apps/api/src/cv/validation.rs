//! Interpreting the model's YES/NO verdict on whether a document is a CV.
//!
//! Both functions are pure; the model answer is the only input.

const REQUIRED_WORDS: &[&str] = &["name", "email", "phone", "contact"];

/// Professional categories; a category counts when any of its words appears.
const PROFESSIONAL_GROUPS: &[&[&str]] = &[
    &["experience", "work history", "position", "employment"],
    &["skills", "technology", "programming"],
    &["project", "developed", "implemented"],
    &["education", "university", "degree", "school"],
    &["certificate", "certification", "award", "achievement"],
];

const MISSING_WORDS: &[&str] = &["missing", "lack"];
const CERTAIN_WORDS: &[&str] = &["clearly", "definitely"];
const HEDGING_WORDS: &[&str] = &["appears", "seems"];

/// Returns the verdict and the reason shown to the caller.
pub fn parse_yes_no(answer: &str) -> (bool, String) {
    let lower = answer.trim().to_lowercase();

    if lower.starts_with("yes") {
        return (true, answer.to_string());
    }
    if lower.starts_with("no") {
        return (false, answer.to_string());
    }

    match (lower.contains("yes"), lower.contains("no")) {
        (true, false) => (true, answer.to_string()),
        (false, true) => (false, answer.to_string()),
        _ => (false, format!("Unclear response: {answer}")),
    }
}

/// Confidence in `[0.60, 0.95]` derived from which CV elements the answer mentions.
pub fn calculate_confidence(answer: &str, is_cv: bool) -> f64 {
    let lower = answer.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    let has_required = mentions(REQUIRED_WORDS);
    let elements = PROFESSIONAL_GROUPS.iter().filter(|g| mentions(**g)).count();

    let mut confidence = if is_cv {
        let mut c: f64 = match (has_required, elements) {
            (true, 3..) => 0.85,
            (true, 2) => 0.75,
            (true, 1) => 0.65,
            _ => 0.60,
        };
        if elements >= 4 {
            c = (c + 0.05).min(0.95);
        }
        if elements == 5 {
            c = (c + 0.05).min(0.95);
        }
        c
    } else if mentions(MISSING_WORDS) {
        0.85
    } else {
        0.70
    };

    if mentions(CERTAIN_WORDS) {
        confidence = (confidence + 0.05).min(0.95);
    } else if mentions(HEDGING_WORDS) {
        confidence = (confidence + 0.02).min(0.90);
    }

    let trimmed = lower.trim_start();
    if trimmed.starts_with("yes -") || trimmed.starts_with("no -") {
        confidence = (confidence + 0.03).min(0.95);
    }

    confidence
}
