//! Client for the Gemini `generateContent` REST endpoint, used as the metric
//! extractor: one request per submission carrying the fixed instruction plus
//! every screenshot as inline data.

pub mod client;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::{GeminiClient, InlineImage};
pub use error::GeminiError;
