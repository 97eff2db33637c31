//! `prov-engine`: resolving a pending computation graph against storage.
//!
//! [`erased`] holds the open, type-erased graph a caller builds up before
//! anything is resolved, and the recursive resolve algorithm. [`resolve`]
//! wraps that into convenience entry points. [`inflate`] is the reverse
//! direction — reading previously-recorded calls and results back out of a
//! `ResultTracker`, possibly in a different process than the one that
//! wrote them.

pub mod erased;
pub mod error;
pub mod inflate;
pub mod resolve;

pub use erased::{Call, CallProvenance, ErasedNode, Leaf, Resolved};
pub use error::{EngineError, Result};
pub use inflate::{inflate_call, inflate_memoized, inflate_node, inflate_output, inflate_result};
pub use resolve::{resolve, resolve_typed};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
