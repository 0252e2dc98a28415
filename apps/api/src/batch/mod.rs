// Batch processing: one controller per process drives a job's resumes
// through extraction and scoring, strictly one resume at a time.

pub mod controller;

pub use controller::{BatchController, BatchError, ConfigSource, ControllerState};
