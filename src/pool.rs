//! Acquire/release entry points for the per-request context.

use crate::{
    ctx::{Ctx, DeferFn},
    http::{buffer::HttpBuffer, url::UrlPool, writer::WriterPool},
    limits::CtxLimits,
};
use crossbeam::queue::SegQueue;
use log::debug;
use std::{
    mem, ptr,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

/// The recyclable allocations of a retired context.
///
/// Flags and lazy sub-objects are plain stack state rebuilt on every
/// acquisition; only the deferred-action list carries an allocation worth
/// keeping. The release path clears it, so a slot always re-enters
/// circulation at its zero value.
struct CtxSlot {
    deferred: Vec<DeferFn>,
}

/// Process-long pool of per-request contexts.
///
/// One instance is owned by the server (injected where needed, not a hidden
/// global), composing the [`UrlPool`] and [`WriterPool`] release paths. All
/// three free-lists are lock-free and safe for concurrent acquire/release
/// from any number of workers; they grow on demand and never shrink —
/// unbounded burst memory is the accepted price for an allocation-free
/// steady state.
///
/// # Lifecycle
///
/// ```text
/// Idle (pooled) -> Acquired (bound to buffer)
///               -> { url? writer? defer* next? } in any order
///               -> Releasing (deferred actions run in append order)
///               -> Idle (pooled, all fields zeroed)
/// ```
///
/// [`release`](Self::release) consumes the context, so there is no path back
/// from `Releasing` for the same request: a recycled slot re-entering
/// `Acquired` always belongs to an unrelated future request.
#[derive(Debug)]
pub struct CtxPool {
    slots: SegQueue<CtxSlot>,
    urls: UrlPool,
    writers: WriterPool,

    live: AtomicUsize,
    recycled: AtomicU64,
    limits: CtxLimits,
}

impl Default for CtxPool {
    fn default() -> Self {
        Self::new()
    }
}

impl CtxPool {
    #[inline(always)]
    pub fn new() -> Self {
        Self::with_limits(CtxLimits::default())
    }

    #[inline]
    pub fn with_limits(limits: CtxLimits) -> Self {
        Self {
            slots: SegQueue::new(),
            urls: UrlPool::new(),
            writers: WriterPool::new(limits.clone()),

            live: AtomicUsize::new(0),
            recycled: AtomicU64::new(0),
            limits,
        }
    }

    /// Returns a context bound to `buffer`, reusing a retired slot when one
    /// is available. Never fails.
    ///
    /// Only the buffer binding is fresh per request; every other field is
    /// already at its zero value, an invariant maintained by
    /// [`release`](Self::release), not here.
    #[inline]
    pub fn acquire<'a>(&'a self, buffer: &'a mut HttpBuffer) -> Ctx<'a> {
        let slot = match self.slots.pop() {
            Some(slot) => slot,
            None => {
                debug!("context pool empty, allocating a new slot");
                CtxSlot {
                    deferred: Vec::with_capacity(self.limits.deferred_capacity),
                }
            }
        };
        debug_assert!(slot.deferred.is_empty(), "slot re-entered circulation dirty");

        self.live.fetch_add(1, Ordering::Relaxed);

        Ctx {
            generation: buffer.generation(),
            buffer,
            pool: self,

            next: false,
            failed: false,
            path_name: "",

            url: None,
            writer: None,
            deferred: slot.deferred,

            released: false,
        }
    }

    /// Retires `ctx`: runs its deferred actions in append order, returns the
    /// owned URL and writer to their pools, and recycles the slot.
    ///
    /// Consuming the context by value makes this the last operation on it by
    /// construction; use after release does not compile.
    pub fn release(&self, mut ctx: Ctx<'_>) {
        debug_assert!(ptr::eq(self, ctx.pool), "context released to a foreign pool");

        // Runs after the handler chain, before the sub-objects go back, so
        // actions may still read the URL or drive the writer. Actions that
        // defer further actions extend the run, still in append order.
        let mut actions = mem::take(&mut ctx.deferred);
        loop {
            for action in actions.drain(..) {
                action(&mut ctx);
            }
            if ctx.deferred.is_empty() {
                break;
            }
            mem::swap(&mut actions, &mut ctx.deferred);
        }

        self.urls.release(ctx.url.take());
        self.writers.release(ctx.writer.take());

        ctx.next = false;
        ctx.failed = false;
        ctx.path_name = "";
        ctx.released = true;

        self.slots.push(CtxSlot { deferred: actions });
        self.live.fetch_sub(1, Ordering::Relaxed);
        self.recycled.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of contexts currently acquired and not yet released.
    #[inline(always)]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Cumulative number of release cycles completed.
    #[inline(always)]
    pub fn recycled(&self) -> u64 {
        self.recycled.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub(crate) const fn urls(&self) -> &UrlPool {
        &self.urls
    }

    #[inline(always)]
    pub(crate) const fn writers(&self) -> &WriterPool {
        &self.writers
    }

    // A context dropped without release: its parts are freed, not recycled,
    // but the live count must still fall.
    #[inline(always)]
    pub(crate) fn on_ctx_dropped(&self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}
