// Career chat: cached answers delivered as JSON or as a paced event stream.
// All model calls go through llm_client via the AnswerGenerator seam.

pub mod cache;
pub mod generator;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod seeds;
pub mod stream;
