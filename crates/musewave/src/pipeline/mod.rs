pub mod context;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod request;
pub mod runner;

pub use context::PipelineContext;
pub use error::PipelineError;
pub use orchestrator::{Orchestrator, Submission};
pub use progress::{ProgressEvent, ProgressReporter, StoreProgress};
pub use request::{FieldError, GenerationRequest, ValidationErrors};
pub use runner::Pipeline;
