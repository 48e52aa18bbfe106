// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Unit tests for the CRD upgrade safety checks
//!
//! This module contains unit tests for:
//! - Schema flattening and diffing
//! - Individual change rules
//! - The upgrade and cross-version validators
//! - The preflight orchestration over release manifests

#[path = "../common/mod.rs"]
mod common;

mod flatten;
mod preflight;
