pub mod discovery;
pub mod runner;

pub use discovery::{Discovery, Job, JobDiscovery, JobEnv};
pub use runner::{JobResult, JobRunner, JobStatus, SourceKind, PREVIEW_FILE_NAME};
