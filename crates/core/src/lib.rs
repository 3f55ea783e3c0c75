//! `market-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! unit identifiers, timestamp handling and the shared error model.

pub mod error;
pub mod id;
pub mod time;

pub use error::{DomainError, DomainResult, ValidationReason};
pub use id::UnitId;
pub use time::{Timestamp, format_timestamp, parse_timestamp};
