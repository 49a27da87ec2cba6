//! # StreamFleet Testing Utils
//!
//! Shared testing utilities for the fleet scheduling workspace. Provides
//! in-memory mock implementations of the repository and collaborator traits,
//! plus builders for creating test entities with sensible defaults.
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! streamfleet-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
