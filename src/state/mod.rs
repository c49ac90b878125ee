//! State module for tracking job progress
//!
//! # Components
//!
//! - `JobStatus`: lifecycle of a single creator analysis
//! - `BatchStatus`: lifecycle of a bulk oEmbed lookup run

mod batch_status;
mod job_status;

pub use batch_status::BatchStatus;
pub use job_status::JobStatus;
