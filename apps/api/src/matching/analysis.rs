//! Parsing the `KEY: value` candidate analysis the model writes for one CV/job pair.

use std::sync::OnceLock;

use regex::Regex;

use crate::cv::prompts::{fill_template, CANDIDATE_ANALYSIS_TEMPLATE};
use crate::matching::models::{CvMatch, CvMetadata, JobDescription};

const DEFAULT_SCORE: f64 = 50.0;

/// Fields found in the analysis text. Absent lines stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateAnalysis {
    pub score: Option<f64>,
    pub matching_skills: Option<Vec<String>>,
    pub missing_skills: Option<Vec<String>>,
    pub experience_match: Option<String>,
    pub education_match: Option<String>,
    pub summary: Option<String>,
}

fn digits() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

fn parse_score(raw: &str) -> f64 {
    match digits().find(raw) {
        // A digit run too long for u64 is far above the cap anyway.
        Some(m) => m.as_str().parse::<u64>().map_or(100, |n| n.min(100)) as f64,
        None => DEFAULT_SCORE,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_analysis(text: &str) -> CandidateAnalysis {
    let mut analysis = CandidateAnalysis::default();

    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("SCORE:") {
            analysis.score = Some(parse_score(rest));
        } else if let Some(rest) = line.strip_prefix("MATCHING_SKILLS:") {
            analysis.matching_skills = Some(parse_list(rest));
        } else if let Some(rest) = line.strip_prefix("MISSING_SKILLS:") {
            analysis.missing_skills = Some(parse_list(rest));
        } else if let Some(rest) = line.strip_prefix("EXPERIENCE_MATCH:") {
            analysis.experience_match = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("EDUCATION_MATCH:") {
            analysis.education_match = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("SUMMARY:") {
            analysis.summary = Some(rest.trim().to_string());
        }
    }

    analysis
}

impl CandidateAnalysis {
    /// Fills gaps from the vector similarity (score × 100) and fixed placeholders.
    pub fn into_match(self, cv_id: String, vector_score: f32) -> CvMatch {
        CvMatch {
            cv_id,
            score: self.score.unwrap_or(f64::from(vector_score) * 100.0),
            summary: self
                .summary
                .unwrap_or_else(|| "Analysis not available".to_string()),
            matching_skills: self.matching_skills.unwrap_or_default(),
            missing_skills: self.missing_skills.unwrap_or_default(),
            experience_match: self
                .experience_match
                .unwrap_or_else(|| "Not analyzed".to_string()),
            education_match: self
                .education_match
                .unwrap_or_else(|| "Not analyzed".to_string()),
        }
    }
}

pub fn candidate_analysis_prompt(job: &JobDescription, candidate: &CvMetadata) -> String {
    let full_name = if candidate.full_name.is_empty() {
        "Unknown"
    } else {
        candidate.full_name.as_str()
    };

    let skills = candidate.skills.join(", ");
    let experience_count = candidate.experience_count.to_string();
    let education_count = candidate.education_count.to_string();
    let certifications = candidate.certifications.join(", ");

    fill_template(
        CANDIDATE_ANALYSIS_TEMPLATE,
        &[
            ("title", job.title.as_str()),
            ("description", job.description.as_str()),
            ("requirements", job.requirements.as_str()),
            ("location", job.location.as_deref().unwrap_or("Not specified")),
            ("full_name", full_name),
            ("skills", skills.as_str()),
            ("experience_count", experience_count.as_str()),
            ("education_count", education_count.as_str()),
            ("certifications", certifications.as_str()),
        ],
    )
}
