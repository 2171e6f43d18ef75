//! Data models for console entities.
//!
//! - `Hub`, `RawHub`, `Candidate`, `Selection`: location hierarchy
//! - `Role`, `Identity`: who is looking and what they are pinned to
//! - `Service`, `Equipment`, `Commodity`: catalog entries used by transactions
//! - `Transaction` and its request bodies
//! - `ListFilters`, `ListResponse`, `PageResult`: paginated list plumbing

pub mod catalog;
pub mod listing;
pub mod location;
pub mod role;
pub mod transaction;
mod wire;

pub use catalog::{Commodity, Equipment, Service};
pub use listing::{ListFilters, ListResponse, PageResult, DEFAULT_PER_PAGE, HUB_FILTER_KEY};
pub use location::{Candidate, Hub, MalformedHub, NamedRef, RawHub, Selection};
pub use role::{Identity, Role};
pub use transaction::{
    ConfirmRequest, ProjectTypeRequest, StatusAction, Transaction, TransactionRequest,
    TransactionStatus, TransitionError,
};
