//! Prospect Types - Shared domain types
//!
//! This crate contains domain types used across Prospect crates:
//! - Account identity and the public account view
//! - Roles, permissions and permission codes
//! - Token pairs and login modes

pub mod account;
pub mod auth;
pub mod permission;
pub mod session;

pub use account::*;
pub use auth::*;
pub use permission::*;
pub use session::*;
