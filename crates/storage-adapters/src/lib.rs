//! # storage-adapters
//!
//! Implementations of the persistence, media and blacklist ports.
//!
//! The in-memory variants are always compiled: tests use them and the binary
//! falls back to them when no database is configured.

pub mod blacklist;
pub mod media;
pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use blacklist::InMemoryTokenBlacklist;
#[cfg(feature = "redis")]
pub use blacklist::RedisTokenBlacklist;
pub use media::{ImageMediaProcessor, InMemoryMediaStorage};
#[cfg(feature = "media-local")]
pub use media::LocalMediaStorage;
pub use memory::InMemoryRepository;
#[cfg(feature = "db-postgres")]
pub use postgres::PgRepository;
