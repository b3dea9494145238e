//! Prospect Axum Integration
//!
//! Axum extractors and error responses for the Prospect auth core.
//!
//! # Overview
//!
//! - **Extractors**: [`RequireAuth`], [`MaybeAuth`], [`RequirePermission`]
//! - **Errors**: [`AuthRejection`] renders every auth failure as the JSON
//!   envelope `{"error": {"code", "message"}}`
//!
//! The extractors resolve a [`SharedAuthenticator`] from router state, so any
//! state type implementing `FromRef` for it can be used.
//!
//! # Quick Start
//!
//! ```ignore
//! use prospect_axum::{PermissionSpec, RequirePermission};
//! use axum::{Router, routing::get};
//!
//! struct LeadView;
//!
//! impl PermissionSpec for LeadView {
//!     const MODULE: &'static str = "lead";
//!     const ACTION: &'static str = "view";
//! }
//!
//! async fn list_leads(auth: RequirePermission<LeadView>) -> String {
//!     format!("Leads for {}", auth.username)
//! }
//!
//! let app = Router::new()
//!     .route("/leads", get(list_leads))
//!     .with_state(authenticator);
//! ```

pub mod error;
pub mod extractors;

pub use error::{ApiResult, AuthRejection};
pub use extractors::{
    MaybeAuth, PermissionSpec, RequireAuth, RequirePermission, SharedAuthenticator,
};
