pub mod extract;
pub mod generation;
pub mod orchestrator;
pub mod random;
pub mod topics;

pub use extract::{ExtractedPost, default_title, extract_components};
pub use generation::{ContentGenerator, GenerationRequest, writing_brief};
pub use orchestrator::{PipelineBuilder, PipelineError, PipelineOrchestrator, RunRequest};
pub use random::ThemeRng;
pub use topics::{dynamic_topic, topic_pool};
