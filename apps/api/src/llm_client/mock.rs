//! Canned answers served when mock mode is on and every model is exhausted.
//!
//! The intent is sniffed from the prompt text in a fixed order: validation,
//! then extraction (structured when the prompt asks for `personal_info`), then
//! matching.

const VALIDATION_MARKERS: &[&str] = &["curriculum vitae", "validate"];
const CV_CONTENT_MARKERS: &[&str] = &[
    "john smith",
    "software engineer",
    "experience",
    "education",
    "skills",
];
const MATCH_MARKERS: &[&str] = &["match score"];
const STRUCTURED_MARKER: &str = "personal_info";
const DOCUMENT_START: &str = "===== DOCUMENT CONTENT =====";

pub const VALIDATION_YES: &str = "YES - This document contains personal information, work experience, education details, and skills section which are typical components of a CV/Resume.";
pub const VALIDATION_NO: &str = "NO - This document does not appear to contain the standard components of a CV such as personal information, work experience, or education history.";

pub const EXTRACTION: &str = r#"
{
    "name": "John Smith",
    "email": "john.smith@example.com",
    "phone": "+1234567890",
    "experience_years": "3",
    "education": "Bachelor of Computer Science",
    "skills": ["Python", "JavaScript", "React", "Docker"],
    "positions": ["Software Engineer", "Backend Developer"],
    "summary": "Experienced software engineer with 3 years in web development"
}
"#;

pub const STRUCTURED_EXTRACTION: &str = r#"
{
    "personal_info": {
        "full_name": "John Smith",
        "email": "john.smith@example.com",
        "phone": "+1234567890"
    },
    "education": [
        {
            "institution": "State University",
            "degree": "Bachelor",
            "field_of_study": "Computer Science",
            "start_date": "2016",
            "end_date": "2020"
        }
    ],
    "experiences": [
        {
            "company": "Example Corp",
            "position": "Software Engineer",
            "start_date": "2020",
            "end_date": "2023",
            "description": "Built web services",
            "achievements": ["Cut API latency by 30%"]
        }
    ],
    "projects": [],
    "skills": ["Python", "JavaScript", "React", "Docker"],
    "certifications": [],
    "languages": ["English"]
}
"#;

pub const MATCHING: &str = r#"
{
    "match_score": 85,
    "matching_skills": ["Python", "JavaScript", "React"],
    "missing_skills": ["AWS", "Kubernetes"],
    "experience_match": true,
    "education_match": true,
    "overall_assessment": "Good match with most required skills",
    "recommendations": ["Learn cloud technologies", "Gain DevOps experience"]
}
"#;

pub const DEFAULT: &str = "Mock AI response: Service is in testing mode. All models are currently unavailable due to quota limits.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptIntent {
    Validation,
    Extraction,
    StructuredExtraction,
    Matching,
    Unknown,
}

pub fn sniff_intent(prompt: &str) -> PromptIntent {
    let lower = prompt.to_lowercase();
    if VALIDATION_MARKERS.iter().any(|m| lower.contains(m)) {
        PromptIntent::Validation
    } else if lower.contains("extract") && lower.contains("json") {
        if lower.contains(STRUCTURED_MARKER) {
            PromptIntent::StructuredExtraction
        } else {
            PromptIntent::Extraction
        }
    } else if MATCH_MARKERS.iter().any(|m| lower.contains(m)) {
        PromptIntent::Matching
    } else {
        PromptIntent::Unknown
    }
}

/// The document embedded in a validation prompt, or the whole prompt when it has
/// no document block.
fn document_section(prompt: &str) -> &str {
    match prompt.split_once(DOCUMENT_START) {
        Some((_, rest)) => rest.split_once("\n=====").map_or(rest, |(doc, _)| doc),
        None => prompt,
    }
}

/// Deterministic answer for `prompt`.
pub fn mock_response(prompt: &str) -> &'static str {
    match sniff_intent(prompt) {
        PromptIntent::Validation => {
            let document = document_section(prompt).to_lowercase();
            if CV_CONTENT_MARKERS.iter().any(|m| document.contains(m)) {
                VALIDATION_YES
            } else {
                VALIDATION_NO
            }
        }
        PromptIntent::Extraction => EXTRACTION,
        PromptIntent::StructuredExtraction => STRUCTURED_EXTRACTION,
        PromptIntent::Matching => MATCHING,
        PromptIntent::Unknown => DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::prompts::{profile_extraction_prompt, structured_extraction_prompt, validation_prompt};
    use crate::matching::models::ExtractedCv;

    #[test]
    fn test_validation_prompt_with_cv_content_says_yes() {
        let prompt = "Validate whether this is a curriculum vitae:\nJane Doe\nExperience: 5 years";
        assert_eq!(mock_response(prompt), VALIDATION_YES);
    }

    #[test]
    fn test_validation_prompt_without_cv_content_says_no() {
        let prompt = "Validate this document:\nINVOICE #42 total due 300 EUR";
        assert_eq!(mock_response(prompt), VALIDATION_NO);
    }

    #[test]
    fn test_real_validation_prompt_judges_the_document_only() {
        let invoice = validation_prompt("INVOICE #42\nTotal due: 300 EUR", 3000);
        assert_eq!(mock_response(&invoice), VALIDATION_NO);

        let cv = validation_prompt("Jane Doe\nWork experience: Acme, 2019-2024", 3000);
        assert_eq!(mock_response(&cv), VALIDATION_YES);
    }

    #[test]
    fn test_document_section_stops_at_closing_rule() {
        let prompt = validation_prompt("just a receipt", 3000);
        assert_eq!(document_section(&prompt).trim(), "just a receipt");
    }

    #[test]
    fn test_validation_wins_over_extraction_keywords() {
        let prompt = "Validate then extract JSON with a match score";
        assert_eq!(sniff_intent(prompt), PromptIntent::Validation);
    }

    #[test]
    fn test_extraction_needs_both_keywords() {
        assert_eq!(sniff_intent("Extract the fields as JSON"), PromptIntent::Extraction);
        assert_eq!(sniff_intent("Extract the fields"), PromptIntent::Unknown);
    }

    #[test]
    fn test_structured_extraction_prompt_gets_structured_answer() {
        assert_eq!(
            mock_response(&structured_extraction_prompt("Jane Doe")),
            STRUCTURED_EXTRACTION
        );
        assert_eq!(mock_response(&profile_extraction_prompt("Jane Doe", 100)), EXTRACTION);
    }

    #[test]
    fn test_matching_prompt() {
        assert_eq!(mock_response("Give a MATCH SCORE for this pair"), MATCHING);
    }

    #[test]
    fn test_unknown_prompt_gets_default() {
        assert_eq!(mock_response("Reply with just 'OK'"), DEFAULT);
    }

    #[test]
    fn test_canned_json_answers_parse() {
        let extraction: serde_json::Value = serde_json::from_str(EXTRACTION.trim()).unwrap();
        assert_eq!(extraction["name"], "John Smith");
        let matching: serde_json::Value = serde_json::from_str(MATCHING.trim()).unwrap();
        assert_eq!(matching["match_score"], 85);
        let structured: ExtractedCv = serde_json::from_str(STRUCTURED_EXTRACTION.trim()).unwrap();
        assert_eq!(structured.personal("full_name"), Some("John Smith"));
        assert_eq!(structured.education.len(), 1);
        assert_eq!(structured.experiences[0].position.as_deref(), Some("Software Engineer"));
    }
}
