//! # Domain Models
//!
//! These structs represent the core entities of LunchBox.
//! We use UUID v7 for time-ordered, globally unique identification.
//! JSON field names are camelCase to match the web client.

mod auth;
mod discover;
mod notification;
mod page;
mod recipe;
mod report;
mod review;
mod user;

pub use auth::*;
pub use discover::*;
pub use notification::*;
pub use page::*;
pub use recipe::*;
pub use report::*;
pub use review::*;
pub use user::*;
