//! Shared test utilities for the raster-delivery workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A scripted [`FakeEngine`] standing in for the external raster engine
//! - Deterministic raster byte fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod engine;
pub mod fixtures;

pub use engine::{FakeEngine, TranslateBehavior, TranslateCall};
pub use fixtures::*;
