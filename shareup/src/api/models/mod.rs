//! Request data structures.

pub mod upload;
