// Prompt templates for CV screening and matching.
// Placeholders are `{name}` and are filled by the `*_prompt` builders below.

/// CV validation prompt. Replace `{cv_text}`.
pub const VALIDATION_TEMPLATE: &str = r#"You are an experienced HR specialist. Validate whether the following document is a valid curriculum vitae (CV / resume).

===== DOCUMENT CONTENT =====
{cv_text}
============================

MANDATORY ELEMENTS (all three are required):

1. PERSONAL INFORMATION: a name AND at least one of phone number or email.
2. EDUCATION: school or university, field of study, degree, study period.
3. WORK EXPERIENCE: position, company or organisation, period, responsibilities.

SUPPORTING ELEMENTS (at least two of these four are required):

1. SKILLS: professional, technical or soft skills, languages and tools.
2. ACHIEVEMENTS: awards, notable results, titles received.
3. PROJECTS: project names, descriptions, technologies, role in the project.
4. CERTIFICATES: professional certificates, completed courses, licences.

NOT A CV: invoices, receipts, contracts, legal documents, advertisements, announcements,
reports, technical manuals, books, articles, product catalogues, user guides.

ANSWER FORMAT:
- If the criteria are met: "YES - Valid CV. Contains [3 mandatory elements + X/4 supporting elements: list them]"
- Otherwise: "NO - Missing [list the missing elements]. A CV needs all 3 mandatory elements and 2 of the 4 supporting elements"

Analyse carefully against these criteria:"#;

/// Flat profile extraction for the screening service. Replace `{cv_text}`.
pub const PROFILE_EXTRACTION_TEMPLATE: &str = r#"Extract the key information from the resume below and return it as a JSON object.

RESUME:
{cv_text}

Return ONLY a JSON object with exactly these fields (use null or [] when a field is absent):
{
    "name": "string or null",
    "email": "string or null",
    "phone": "string or null",
    "experience_years": "string or null",
    "education": "string or null",
    "skills": ["list of skills"],
    "positions": ["list of job titles held"],
    "summary": "one or two sentence professional summary"
}"#;

/// Single CV against a single job. Replace `{cv_text}` and `{job_description}`.
pub const JOB_MATCH_TEMPLATE: &str = r#"Compare the candidate resume with the job description and give a match score.

RESUME:
{cv_text}

JOB DESCRIPTION:
{job_description}

Respond with ONLY a JSON object in this format:
{
    "match_score": 0-100,
    "matching_skills": ["skills the candidate has that the job asks for"],
    "missing_skills": ["skills the job asks for that the candidate lacks"],
    "experience_match": true or false,
    "education_match": true or false,
    "overall_assessment": "short assessment",
    "recommendations": ["suggestions for the candidate"]
}"#;

/// Sent with the image attached.
pub const IMAGE_OCR: &str = "Extract all text from this CV/Resume image. \
    Return the text as accurately as possible, maintaining the structure and formatting.";

/// Structured extraction for the matching service. Replace `{cv_text}`.
pub const STRUCTURED_EXTRACTION_TEMPLATE: &str = r#"Analyze this resume text and extract structured information in JSON format.

Resume text:
{cv_text}

Please extract the following information and return ONLY a valid JSON object:
{
    "personal_info": {
        "full_name": "string or null",
        "email": "string or null",
        "phone": "string or null",
        "address": "string or null",
        "linkedin": "string or null",
        "github": "string or null"
    },
    "education": [
        {
            "institution": "string or null",
            "degree": "string or null",
            "field_of_study": "string or null",
            "start_date": "string or null",
            "end_date": "string or null",
            "gpa": "string or null"
        }
    ],
    "experiences": [
        {
            "company": "string or null",
            "position": "string or null",
            "start_date": "string or null",
            "end_date": "string or null",
            "description": "string or null",
            "achievements": ["list of achievements"]
        }
    ],
    "projects": [
        {
            "name": "string or null",
            "description": "string or null",
            "role": "string or null",
            "technologies": ["list of technologies"],
            "start_date": "string or null",
            "end_date": "string or null"
        }
    ],
    "skills": ["list of technical skills"],
    "certifications": ["list of certifications"],
    "languages": ["list of languages"]
}

Important: Return ONLY the JSON object, no additional text or formatting."#;

/// Candidate analysis for the matching service; answered in `KEY: value` lines.
/// Replace `{title}`, `{description}`, `{requirements}`, `{location}`, `{full_name}`,
/// `{skills}`, `{experience_count}`, `{education_count}`, `{certifications}`.
pub const CANDIDATE_ANALYSIS_TEMPLATE: &str = r#"Analyze the compatibility between this job and candidate:

JOB DESCRIPTION:
Title: {title}
Description: {description}
Requirements: {requirements}
Location: {location}

CANDIDATE:
Name: {full_name}
Skills: {skills}
Experience Count: {experience_count}
Education Count: {education_count}
Certifications: {certifications}

Please provide a detailed analysis in the following format:
SCORE: [0-100]
MATCHING_SKILLS: [comma-separated list of matching skills]
MISSING_SKILLS: [comma-separated list of required but missing skills]
EXPERIENCE_MATCH: [brief assessment of experience relevance]
EDUCATION_MATCH: [brief assessment of education relevance]
SUMMARY: [2-3 sentence summary of why this candidate is/isn't a good fit]"#;

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn validation_prompt(cv_text: &str, max_chars: usize) -> String {
    VALIDATION_TEMPLATE.replace("{cv_text}", truncate_chars(cv_text, max_chars))
}

pub fn profile_extraction_prompt(cv_text: &str, max_chars: usize) -> String {
    PROFILE_EXTRACTION_TEMPLATE.replace("{cv_text}", truncate_chars(cv_text, max_chars))
}

/// Fills `{name}` placeholders in one pass, so braces inside the values are never
/// expanded. Unknown `{...}` spans are copied as-is.
pub fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let slot = slots.iter().find(|(name, _)| {
            tail.strip_prefix(name).is_some_and(|after| after.starts_with('}'))
        });
        match slot {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn job_match_prompt(cv_text: &str, job_description: &str) -> String {
    fill_template(
        JOB_MATCH_TEMPLATE,
        &[("cv_text", cv_text), ("job_description", job_description)],
    )
}

pub fn structured_extraction_prompt(cv_text: &str) -> String {
    STRUCTURED_EXTRACTION_TEMPLATE.replace("{cv_text}", cv_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::{sniff_intent, PromptIntent};

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_validation_prompt_truncates_text() {
        let text = "x".repeat(5000);
        let prompt = validation_prompt(&text, 3000);
        assert!(prompt.contains(&"x".repeat(3000)));
        assert!(!prompt.contains(&"x".repeat(3001)));
    }

    #[test]
    fn test_prompts_are_recognised_by_mock_mode() {
        assert_eq!(
            sniff_intent(&validation_prompt("Jane Doe", 100)),
            PromptIntent::Validation
        );
        assert_eq!(
            sniff_intent(&profile_extraction_prompt("Jane Doe", 100)),
            PromptIntent::Extraction
        );
        assert_eq!(
            sniff_intent(&job_match_prompt("Jane Doe", "Rust developer")),
            PromptIntent::Matching
        );
        assert_eq!(
            sniff_intent(&structured_extraction_prompt("Jane Doe")),
            PromptIntent::StructuredExtraction
        );
    }

    #[test]
    fn test_job_match_prompt_fills_both_slots() {
        let prompt = job_match_prompt("CV BODY", "JOB BODY");
        assert!(prompt.contains("CV BODY"));
        assert!(prompt.contains("JOB BODY"));
        assert!(!prompt.contains("{cv_text}"));
    }

    #[test]
    fn test_job_match_prompt_keeps_placeholder_text_in_values() {
        let prompt = job_match_prompt("CV BODY", "Paste {cv_text} here");
        assert_eq!(prompt.matches("CV BODY").count(), 1);
        assert!(prompt.contains("Paste {cv_text} here"));
        assert!(prompt.contains("\"match_score\": 0-100"));
    }

    #[test]
    fn test_fill_template_leaves_unknown_braces() {
        assert_eq!(
            fill_template("{a} {b} {", &[("a", "{b}")]),
            "{b} {b} {"
        );
    }
}
