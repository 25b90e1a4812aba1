pub mod errors;
pub mod orchestrator;
pub mod poller;

pub use errors::PipelineError;
pub use orchestrator::{Orchestrator, SubmissionReceipt, UploadedFile};
