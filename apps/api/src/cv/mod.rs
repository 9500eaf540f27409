// Screening service: validate a single upload as a CV, extract a flat profile,
// score CV text against a job description.
// All model calls go through llm_client::ModelDispatcher.

pub mod document;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod service;
pub mod validation;
