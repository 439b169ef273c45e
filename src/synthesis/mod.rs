//! Synthesis
//!
//! The research pipeline proper:
//! - **CitationManager**: numbering, IEEE formatting and in-text markers
//! - **ResearchEngine**: the staged pipeline from topic to cited report
//! - **ProgressSink** / **spawn_research**: background execution with an
//!   ordered, cancellable event stream

pub mod citations;
pub mod engine;
pub mod progress;
pub mod runner;

pub use citations::CitationManager;
pub use engine::{EngineSettings, ResearchEngine};
pub use progress::ProgressSink;
pub use runner::{spawn_research, ResearchHandle, ResearchJob};
