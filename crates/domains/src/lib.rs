//! # domains
//!
//! The central domain model and port definitions for LunchBox.
//! Nothing in this crate performs I/O; adapters implement the ports.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
pub use models::*;
