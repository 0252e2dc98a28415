// Job API: resume text extraction and batch job lifecycle over HTTP.
// Handlers stay thin; batch semantics live in batch::controller.

pub mod handlers;
