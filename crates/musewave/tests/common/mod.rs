//! Shared test utilities for musewave integration tests.
//!
//! This module provides:
//! - `FakeToolchain`, a `CommandRunner` standing in for python, ffmpeg and friends
//! - `TestHarness`, an orchestrator wired to temp directories and a SQLite record store

pub mod harness;
pub mod toolchain;

pub use harness::TestHarness;
pub use toolchain::FakeToolchain;
