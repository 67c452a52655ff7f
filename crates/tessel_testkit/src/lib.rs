//! # Tessel Testkit
//!
//! Test utilities for Tessel.
//!
//! This crate provides:
//! - Seeded engines and databases for the usual shop and blog scenarios
//! - Property-based test generators using proptest
//! - Dump files on disk for command-line tests
//!
//! Cross-crate property and scenario tests live in this crate's `tests/`
//! directory.
//!
//! ## Usage
//!
//! ```rust
//! use tessel_testkit::prelude::*;
//!
//! let fixture = TestDatabase::products();
//! assert_eq!(fixture.engine.record_count("products"), Some(PRODUCT_PRICES.len()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
