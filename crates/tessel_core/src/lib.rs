//! # Tessel Core
//!
//! Query translation and atomic transaction batching in front of an
//! asynchronous, callback-driven key-value engine.
//!
//! This crate provides:
//! - [`Comparisons`] and [`Condition`], translated into engine key ranges
//! - [`Query`], a fluent builder over immutable [`QueryPlan`]s, executed
//!   through bulk reads or cursor walks
//! - [`ReadChain`] and [`WriteChain`], which batch operations across
//!   collections into exactly one transaction
//! - the completion bridge ([`bridge`]), which turns engine callbacks into
//!   awaitable results
//!
//! ## Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tessel_core::{Database, Order};
//! use tessel_engine::{CollectionSchema, IndexSchema, MemoryEngine};
//!
//! # async fn demo() -> tessel_core::CoreResult<()> {
//! let engine = MemoryEngine::builder("shop", 1)
//!     .collection(
//!         CollectionSchema::new("products")
//!             .key_path("id")
//!             .index(IndexSchema::new("price", "price")),
//!     )
//!     .build()?;
//! let db = Database::new(engine);
//!
//! let mut write = db.write(["products"]);
//! for (id, price) in [(1, 100), (2, 50), (3, 30)] {
//!     write.put("products", json!({"id": id, "price": price}));
//! }
//! write.commit().await?;
//!
//! let page = db
//!     .query("products")
//!     .index("price")
//!     .order_by(Order::Descending)
//!     .limit(2)
//!     .find_all()
//!     .await?;
//! assert_eq!(page.len(), 2);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bridge;
mod chain;
mod condition;
mod config;
mod database;
mod error;
mod query;

pub use chain::{DeleteTarget, ReadChain, ReadOp, ReadOutput, WriteChain, WriteOp};
pub use condition::{translate, Comparisons, Condition, PREFIX_SENTINEL};
pub use config::Config;
pub use database::Database;
pub use error::{CoreError, CoreResult};
pub use query::{
    apply_defaults, Filter, Final, Indexed, Order, Query, QueryPlan, ResolvedPlan, Selectable,
    Stage, Strategy, Unscoped,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
