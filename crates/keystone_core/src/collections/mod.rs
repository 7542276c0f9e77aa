//! # Collections
//!
//! In-place helpers over fixed-capacity buffers.
//!
//! Nothing in here allocates. [`array`] edits a prefix of a slice tracked by
//! an external length, [`sllist`] links nodes through a [`sllist::Linked`]
//! accessor so list membership never owns memory.

pub mod array;
pub mod sllist;
