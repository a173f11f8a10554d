//! Request handlers.

pub mod health;
pub mod report;
