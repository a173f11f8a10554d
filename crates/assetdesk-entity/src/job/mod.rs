//! Background job domain entities.

pub mod model;
pub mod payload;
pub mod status;

pub use model::{CreateJob, Job};
pub use payload::{JobPayload, REPORT_CLEANUP, REPORT_GENERATION, SCHEDULED_REPORT_CHECK};
pub use status::{JobPriority, JobStatus};
