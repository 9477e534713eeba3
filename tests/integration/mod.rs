//! Integration tests for GGBPuppy
//!
//! These tests verify that multiple components work together correctly.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod config_wiring;
pub mod share_flow;
pub mod viewer_flow;
