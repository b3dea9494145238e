//! Prospect DB - Database abstractions
//!
//! SQLx-based database layer for Prospect services.
//!
//! # Example
//!
//! ```rust,ignore
//! use prospect_db::{create_pool, run_migrations, Repositories};
//!
//! let pool = create_pool("postgres://localhost/prospect").await?;
//! run_migrations(&pool).await?;
//! let repos = Repositories::new(pool);
//!
//! let account = repos.accounts.find_by_email("alice@example.com").await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, run_migrations, DbPool};
pub use repo::*;
