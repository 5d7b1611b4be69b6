//! End-to-end test support for jimaku-core
//!
//! Shared harness and fixtures for the journey tests. The tests themselves
//! live under `tests/journeys/` and exercise the public API only.

pub mod harness;
