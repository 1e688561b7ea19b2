//! HTTP request handlers.
//!
//! - [`upload`]: multipart upload forwarded to the file share
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which converts to the appropriate HTTP status code and
//! a user-safe body. Server-side failures are logged in full and answered with an empty body.

pub mod upload;
