//! Fundamental types for the DAC custodian contracts.
//!
//! This crate defines the core types shared across the workspace:
//! member and community identifiers, token amounts, and timestamps.

pub mod amount;
pub mod community;
pub mod error;
pub mod member;
pub mod time;

pub use amount::TokenAmount;
pub use community::CommunityId;
pub use error::TypeError;
pub use member::MemberName;
pub use time::Timestamp;
