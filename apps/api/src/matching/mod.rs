// Matching service: store structured CVs as embeddings and rank them against job postings.
// Vector search narrows the pool, the model analyses each remaining candidate.

pub mod analysis;
pub mod embedding;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod vector_store;
