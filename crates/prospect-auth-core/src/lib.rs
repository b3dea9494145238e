//! Prospect Auth Core - Authentication and authorization business logic
//!
//! Token issuance and rotation, refresh token revocation, role/permission
//! resolution, the per-endpoint authorization gate and the account
//! lifecycle (local and federated).

pub mod account;
pub mod bootstrap;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod federated;
pub mod gate;
pub mod password;
pub mod permission;
pub mod principal;
pub mod refresh;
pub mod service;
pub mod token;

pub use account::*;
pub use bootstrap::*;
pub use config::*;
pub use crypto::*;
pub use directory::*;
pub use error::*;
pub use federated::*;
pub use gate::*;
pub use password::*;
pub use permission::*;
pub use principal::*;
pub use refresh::*;
pub use service::*;
pub use token::*;
