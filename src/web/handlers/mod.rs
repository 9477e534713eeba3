//! HTTP request handlers for the share API.

pub mod share;
