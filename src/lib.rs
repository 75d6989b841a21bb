//! promanis - refine rough prompts into clear, structured ones
//!
//! Builds a detailed refinement instruction from the user's selections
//! (language, scope, output type, detail level), sends it to an LLM provider
//! (Gemini, OpenAI, or any OpenAI-compatible endpoint), and extracts the
//! refined prompt from the reply. Requests rotate through a pool of API keys,
//! with the rotation cursor persisted between runs.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod llm;
pub mod refine;
pub mod state;
pub mod util;
