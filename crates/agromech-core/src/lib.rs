//! Agromech console core.
//!
//! Role-scoped location resolution and list querying for the agriculture
//! admin console, plus the composite transaction builder and its submission.
//!
//! - [`directory`]: the State → LGA → Sub-Hub index built from active hubs
//! - [`scope`]: what a role may choose and what it is pinned to
//! - [`cascade`]: dependent selection controls driven by the directory
//! - [`query`]: paginated lists served by the server or from a cached full list
//! - [`draft`] and [`submission`]: building and sending transactions

pub mod api;
pub mod cache;
pub mod cascade;
pub mod config;
pub mod directory;
pub mod draft;
pub mod models;
pub mod query;
pub mod scope;
pub mod submission;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use cascade::{Cascade, CascadeStep, Level};
pub use config::Config;
pub use directory::{DirectoryLoad, LocationDirectory};
pub use draft::{
    DraftError, DraftStatus, ServiceLine, TransactionDraft, ValidationErrors, ValidationIssue,
};
pub use query::{Applied, ListRequest, QueryExecutor, QueryMode};
pub use scope::{RoleScope, ScopeError};
pub use submission::{confirm_transaction, set_transaction_project, submit_draft, SubmissionError};
