//! Route definitions for the share backend.

pub mod api;
pub mod static_files;
