use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cv::document::FileReport;
use crate::matching::models::null_as_default;

/// Profile extracted by the screening service. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub experience_years: Option<String>,
    pub education: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub positions: Vec<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobMatchResult {
    #[serde(deserialize_with = "null_as_default")]
    pub match_score: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub matching_skills: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub missing_skills: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub experience_match: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub education_match: bool,
    pub overall_assessment: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CvValidationResponse {
    pub is_cv: bool,
    pub confidence: f64,
    pub reason: String,
    pub file_info: FileReport,
}

#[derive(Debug, Serialize)]
pub struct CvExtractionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_info: Option<CvProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    pub file_info: FileReport,
}

#[derive(Debug, Deserialize)]
pub struct JobMatchRequest {
    pub cv_text: String,
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct JobMatchResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_result: Option<JobMatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Models answer `"experience_years": 3` as often as `"3"`; both become a string.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}
