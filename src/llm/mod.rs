// LLM abstraction layer

pub mod provider;
pub mod ollama;
pub mod openai;
pub mod prompts;
pub mod research;

pub use provider::*;
pub use research::{ContentAnalysis, ResearchLlm, SynthesisItem};
