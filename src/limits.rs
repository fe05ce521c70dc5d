//! Capacity tuning for pooled per-request objects.
//!
//! Pools grow on demand and never fail, so these limits are not hard caps:
//! they size the preallocated capacity of each freshly allocated object, so
//! that the steady state stays allocation-free. A list that outgrows its
//! capacity simply reallocates once and keeps the larger capacity for the
//! rest of the process lifetime.
//!
//! # Examples
//!
//! ```
//! use reqcycle::{limits::CtxLimits, CtxPool};
//!
//! let pool = CtxPool::with_limits(CtxLimits {
//!     deferred_capacity: 8,       // Handlers register many cleanups
//!     ..CtxLimits::default()
//! });
//! # let _ = pool;
//! ```

/// Preallocation sizes for objects handed out by a [`CtxPool`](crate::CtxPool).
#[derive(Debug, Clone)]
pub struct CtxLimits {
    /// Initial capacity of a context's deferred-action list (default: `4`).
    ///
    /// Each [`Ctx::defer`](crate::Ctx::defer) call appends one entry; the
    /// list is emptied, but its allocation kept, on every release.
    pub deferred_capacity: usize,

    /// Initial capacity of a response writer's cached header map
    /// (default: `8`).
    ///
    /// Sized for the header count a typical response carries when the
    /// adapter is created plus the headers handlers add through it.
    pub writer_header_capacity: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for CtxLimits {
    fn default() -> Self {
        Self {
            deferred_capacity: 4,
            writer_header_capacity: 8,

            _priv: (),
        }
    }
}
