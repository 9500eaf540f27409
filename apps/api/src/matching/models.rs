use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ────────────────────────────────────────────────────────────────────────────
// Extracted CV
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvEducation {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub gpa: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvExperience {
    pub company: Option<String>,
    pub position: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub role: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub technologies: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Structured CV as returned by the model, plus the text it was extracted from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedCv {
    /// Free-form: full_name, email, phone, address, linkedin, github.
    #[serde(deserialize_with = "null_as_default")]
    pub personal_info: Map<String, Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub education: Vec<CvEducation>,
    #[serde(deserialize_with = "null_as_default")]
    pub experiences: Vec<CvExperience>,
    #[serde(deserialize_with = "null_as_default")]
    pub projects: Vec<CvProject>,
    #[serde(deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub certifications: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub languages: Vec<String>,
    pub raw_text: String,
}

impl ExtractedCv {
    /// A string field of `personal_info`; null and non-strings read as absent.
    pub fn personal(&self, key: &str) -> Option<&str> {
        self.personal_info
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vector payload
// ────────────────────────────────────────────────────────────────────────────

const METADATA_SKILLS: usize = 10;
const METADATA_CERTIFICATIONS: usize = 5;
const METADATA_TEXT_CHARS: usize = 1000;

/// What is stored next to each CV vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvMetadata {
    pub cv_id: String,
    pub full_name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub experience_count: u64,
    pub education_count: u64,
    pub certifications: Vec<String>,
    pub raw_text: String,
}

impl CvMetadata {
    pub fn from_cv(cv_id: &str, cv: &ExtractedCv) -> Self {
        Self {
            cv_id: cv_id.to_string(),
            full_name: cv.personal("full_name").unwrap_or_default().to_string(),
            email: cv.personal("email").unwrap_or_default().to_string(),
            skills: cv.skills.iter().take(METADATA_SKILLS).cloned().collect(),
            experience_count: cv.experiences.len() as u64,
            education_count: cv.education.len() as u64,
            certifications: cv
                .certifications
                .iter()
                .take(METADATA_CERTIFICATIONS)
                .cloned()
                .collect(),
            raw_text: cv.raw_text.chars().take(METADATA_TEXT_CHARS).collect(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Jobs and matches
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    pub title: String,
    pub description: String,
    pub requirements: String,
    #[serde(default)]
    pub benefits: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default)]
    pub salary_max: Option<i64>,
    #[serde(default)]
    pub job_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvMatch {
    pub cv_id: String,
    pub score: f64,
    pub summary: String,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub experience_match: String,
    pub education_match: String,
}

#[derive(Debug, Serialize)]
pub struct MatchingResponse {
    pub job_id: String,
    pub total_matches: usize,
    pub matches: Vec<CvMatch>,
    pub processing_time: f64,
}

#[derive(Debug, Serialize)]
pub struct CvUploadResponse {
    pub cv_id: String,
    pub extracted_data: ExtractedCv,
    pub processing_time: f64,
    pub message: String,
}

/// Models write `null` for empty lists; treat it like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
