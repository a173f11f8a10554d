//! User domain values.
//!
//! Users live in the host application; reporting only sees the role claim.

pub mod role;

pub use role::UserRole;
