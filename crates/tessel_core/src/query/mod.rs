//! Query subsystem.
//!
//! - [`QueryPlan`]: immutable plan values
//! - [`Query`]: the typed fluent builder over plans
//! - the executor, which picks the bulk or cursor strategy for a
//!   [`ResolvedPlan`] and applies default values

mod builder;
mod executor;
mod plan;

pub use builder::{Final, Indexed, Query, Selectable, Stage, Unscoped};
pub use executor::apply_defaults;
pub use plan::{Filter, Order, QueryPlan, ResolvedPlan, Strategy};
