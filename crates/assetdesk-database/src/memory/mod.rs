//! In-memory store implementations.
//!
//! Behaviourally equivalent to the PostgreSQL repositories for the
//! operations the pipeline relies on (visibility, atomic claims, keyset
//! batches). Used by unit and integration tests.

pub mod job;
pub mod report;
pub mod report_file;
pub mod rows;

pub use job::MemoryJobStore;
pub use report::MemoryReportStore;
pub use report_file::MemoryReportFileStore;
pub use rows::MemoryRowSource;
