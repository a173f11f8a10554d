//! PostgreSQL implementations of the store traits.

pub mod job;
pub mod report;
pub mod report_file;
pub mod rows;

pub use job::JobRepository;
pub use report::ReportRepository;
pub use report_file::ReportFileRepository;
pub use rows::PgRowSource;
