//! Region-based memory pool with phase-scoped bulk release
//!
//! A [`Pool`] amortizes many small, short-lived allocations over a few
//! pre-acquired blocks, and lets go of everything at once when the phase
//! they belong to ends — the classic pattern for per-request processing in
//! a server.
//!
//! - Requests at or below the pool's small/large threshold are bump-
//!   allocated from a chain of uniformly sized blocks
//! - Bigger requests are acquired individually and tracked so they can be
//!   released early with [`Pool::free_large`]
//! - [`Pool::reset`] rewinds the blocks for a new phase without returning
//!   them; dropping the pool releases everything and runs the finalizers
//!   registered with [`Pool::add_cleanup`], in registration order
//!
//! The pool is single-threaded by design: all operations take `&mut self`
//! and no internal synchronization exists. Use one pool per thread or
//! serialize access externally.
//!
//! # Example
//!
//! ```
//! use region_pool::Pool;
//!
//! let mut pool = Pool::with_capacity(4096)?;
//!
//! let header = pool.alloc(128)?;
//! let body = pool.alloc_zeroed(256)?;
//! assert_ne!(header.as_ptr(), body.as_ptr());
//!
//! pool.add_cleanup(|| println!("request finished"));
//!
//! pool.reset(); // header and body are gone, blocks are reused
//! let _next = pool.alloc(512)?;
//! // dropping the pool runs the cleanup and releases all memory
//! # Ok::<(), region_pool::PoolError>(())
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backing;
pub mod error;
pub mod pool;
pub mod utils;

pub use backing::{BackingAlloc, SystemBacking};
pub use error::{PoolError, Result};
pub use pool::{
    Pool, PoolConfig, PoolStats, ALIGNMENT, DEFAULT_POOL_SIZE, MIN_POOL_SIZE, PAGE_SIZE,
    POOL_ALIGNMENT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
