//! Job lifecycle tracking.

pub mod model;
pub mod store;
pub mod sweeper;

pub use model::{Job, JobOutcome, JobStatus, JobUpdate, JobView, Stage};
pub use store::{InMemoryJobStore, JobStore};
pub use sweeper::JobSweeper;
