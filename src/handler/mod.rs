//! Request handler module
//!
//! Validates each request, reads bodies, and dispatches to the key
//! generator and content store.

pub mod body;
pub mod home;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
