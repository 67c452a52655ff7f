//! Transaction chains.
//!
//! A chain accumulates operations against a fixed set of collections and
//! runs them in exactly one transaction. Execution follows the same steps
//! for reads and writes:
//!
//! 1. An empty queue resolves at once; no transaction is opened.
//! 2. Every referenced collection must be in the declared scope, or the
//!    chain fails with [`crate::CoreError::ScopeViolation`].
//! 3. One transaction is opened over the whole declared scope.
//! 4. All operations are issued in enqueue order inside a single
//!    synchronous issue phase.
//! 5. The chain waits for the transaction to finish.

mod operation;
mod read;
mod scope;
mod write;

pub use operation::{DeleteTarget, ReadOp, WriteOp};
pub use read::{ReadChain, ReadOutput};
pub use write::WriteChain;
