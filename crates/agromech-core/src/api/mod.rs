//! REST client for the console backend.
//!
//! This module provides the `ApiClient` used as the submission gateway: hub
//! directory fetch, paginated resource lists, generic create/update/delete,
//! and the transaction endpoints.
//!
//! Authentication is handled elsewhere; the client only carries the bearer
//! token it is given.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{display_message, ApiError, GENERIC_FAILURE_MESSAGE};
