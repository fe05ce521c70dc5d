//! The per-request context threaded through a handler chain.

use crate::{
    http::{
        buffer::HttpBuffer,
        url::Url,
        writer::{RespWriter, ResponseWriter},
    },
    pool::CtxPool,
};
use log::warn;
use std::fmt;

/// Request header carrying the propagated request id.
pub const X_REQUEST_ID: &[u8] = b"x-request-id";

/// A deferred action registered via [`Ctx::defer`].
///
/// Actions receive the context they were registered on, so they may still
/// read [`Ctx::url`] or drive the response writer: they run strictly after
/// the handler chain and strictly before the context's pooled sub-objects
/// are released.
pub type DeferFn = Box<dyn FnOnce(&mut Ctx<'_>) + Send>;

/// Mutable per-request state, exclusively owned by one in-flight request.
///
/// Acquired from a [`CtxPool`] at the start of a request and consumed by
/// [`CtxPool::release`] when the request finishes. The context *borrows* the
/// transport's [`HttpBuffer`] for the request's duration, so the buffer
/// cannot be reset or rebound underneath it; release-by-value makes
/// use-after-release and double-release compile errors rather than runtime
/// hazards.
///
/// Handler code must not retain the context, its URL, or its response writer
/// beyond the handler's own synchronous execution. The borrow checker
/// enforces this for references; owned captures are rejected because
/// deferred actions receive the context by argument instead of capture.
///
/// # Examples
///
/// ```
/// use reqcycle::{Ctx, CtxPool, HttpBuffer};
///
/// let pool = CtxPool::new();
/// let mut buffer = HttpBuffer::from_request(b"GET", b"http", b"localhost", b"/a", b"x=1");
///
/// let mut ctx = pool.acquire(&mut buffer);
/// assert_eq!(ctx.url().path(), "/a");
///
/// ctx.next(); // Ask the router to run the next handler
/// ctx.defer(|c: &mut Ctx| {
///     assert_eq!(c.url().raw_query(), "x=1"); // Runs before the URL is released
/// });
///
/// pool.release(ctx);
/// ```
pub struct Ctx<'a> {
    pub(crate) buffer: &'a mut HttpBuffer,
    pub(crate) pool: &'a CtxPool,

    pub(crate) next: bool,
    pub(crate) failed: bool,
    pub(crate) path_name: &'static str,

    pub(crate) url: Option<Box<Url>>,
    pub(crate) writer: Option<Box<RespWriter>>,
    pub(crate) deferred: Vec<DeferFn>,

    pub(crate) generation: u64,
    pub(crate) released: bool,
}

// The deferred closures have no Debug form; report their count instead.
impl fmt::Debug for Ctx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("next", &self.next)
            .field("failed", &self.failed)
            .field("path_name", &self.path_name)
            .field("url", &self.url)
            .field("deferred", &self.deferred.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

// Control flow
impl Ctx<'_> {
    /// Requests that the next handler in the chain run after the current
    /// one returns.
    ///
    /// Pure flag set: the routing collaborator inspects
    /// [`wants_next`](Self::wants_next) after each handler and makes the
    /// actual chaining decision.
    #[inline(always)]
    pub fn next(&mut self) {
        self.next = true;
    }

    #[inline(always)]
    pub const fn wants_next(&self) -> bool {
        self.next
    }

    /// Signals an error state to the routing collaborator.
    ///
    /// This is a signal channel, not a thrown error: nothing in this crate
    /// reads the flag.
    #[inline(always)]
    pub fn set_failed(&mut self) {
        self.failed = true;
    }

    #[inline(always)]
    pub const fn is_failed(&self) -> bool {
        self.failed
    }
}

// Routing metadata
impl Ctx<'_> {
    /// The route pattern that matched this request. Empty until the routing
    /// collaborator records it.
    #[inline(always)]
    pub const fn path_name(&self) -> &'static str {
        self.path_name
    }

    /// Records the matched route pattern. Called by the routing collaborator
    /// before the handler chain runs.
    #[inline(always)]
    pub fn set_path_name(&mut self, path_name: &'static str) {
        self.path_name = path_name;
    }
}

// Request access
impl Ctx<'_> {
    #[inline(always)]
    pub fn method(&self) -> &[u8] {
        self.buffer.method()
    }

    /// Returns the first request header value with case-insensitive name
    /// matching.
    #[inline(always)]
    pub fn request_header(&self, name: &[u8]) -> Option<&[u8]> {
        self.buffer.request_header(name)
    }

    /// Raw bytes of the [`X_REQUEST_ID`] request header.
    ///
    /// No copy, no validation; an absent header yields an empty slice, not
    /// an error.
    #[inline(always)]
    pub fn request_id(&self) -> &[u8] {
        self.buffer.request_header(X_REQUEST_ID).unwrap_or(b"")
    }

    /// Returns the URL view of this request, creating it from the request
    /// buffer on first call and memoizing it for the request's lifetime.
    ///
    /// Each request performs at most one acquisition from the URL pool.
    #[inline]
    pub fn url(&mut self) -> &Url {
        let pool = self.pool;
        let buffer: &HttpBuffer = self.buffer;

        let url = self.url.get_or_insert_with(|| pool.urls().acquire(buffer));

        debug_assert_eq!(
            url.generation(),
            buffer.generation(),
            "url view read after its buffer was rebound"
        );
        url
    }
}

// Response access
impl<'a> Ctx<'a> {
    /// Returns the response-writer adapter over the response buffer,
    /// creating its pooled state on first call and memoizing it for the
    /// request's lifetime.
    ///
    /// The adapter's header map is flattened once, at creation, from the
    /// headers then present in the response buffer; see
    /// [`ResponseWriter`] for the exact semantics.
    #[inline]
    pub fn response_writer(&mut self) -> ResponseWriter<'_> {
        let pool = self.pool;
        let buffer = &mut *self.buffer;

        let state = self
            .writer
            .get_or_insert_with(|| pool.writers().acquire(buffer));

        debug_assert_eq!(
            state.generation(),
            buffer.generation(),
            "writer state read after its buffer was rebound"
        );
        ResponseWriter::new(state, buffer)
    }
}

// Deferred actions
impl Ctx<'_> {
    /// Appends `action` to the deferred-action list.
    ///
    /// Deferred actions run in strict append order during
    /// [`CtxPool::release`]: after the handler chain has completed and
    /// before the context's URL and writer return to their pools.
    #[inline(always)]
    pub fn defer<F>(&mut self, action: F)
    where
        F: FnOnce(&mut Ctx<'_>) + Send + 'static,
    {
        self.deferred.push(Box::new(action));
    }
}

impl Drop for Ctx<'_> {
    fn drop(&mut self) {
        if !self.released {
            // Safe but wasteful: the pooled parts are freed instead of
            // recycled, and their pools will allocate replacements.
            warn!("context dropped without release, pooled parts not recycled");
            self.pool.on_ctx_dropped();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::CtxPool;
    use std::ptr;

    fn buffer() -> HttpBuffer {
        let mut buffer =
            HttpBuffer::from_request(b"GET", b"http", b"localhost", b"/api/users", b"sort=name");
        buffer.push_request_header(b"x-request-id", b"req-42");
        buffer
    }

    #[test]
    fn next_sets_continuation_flag() {
        let pool = CtxPool::new();
        let mut buf = buffer();

        let mut ctx = pool.acquire(&mut buf);
        assert!(!ctx.wants_next());

        ctx.next();
        assert!(ctx.wants_next());
        pool.release(ctx);
    }

    #[test]
    fn failed_flag_round_trip() {
        let pool = CtxPool::new();
        let mut buf = buffer();

        let mut ctx = pool.acquire(&mut buf);
        assert!(!ctx.is_failed());

        ctx.set_failed();
        assert!(ctx.is_failed());
        pool.release(ctx);
    }

    #[test]
    fn path_name_records_matched_pattern() {
        let pool = CtxPool::new();
        let mut buf = buffer();

        let mut ctx = pool.acquire(&mut buf);
        assert_eq!(ctx.path_name(), "");

        ctx.set_path_name("/api/users/:id");
        assert_eq!(ctx.path_name(), "/api/users/:id");
        pool.release(ctx);
    }

    #[test]
    fn url_is_memoized_per_request() {
        let pool = CtxPool::new();
        let mut buf = buffer();

        let mut ctx = pool.acquire(&mut buf);
        let first = ctx.url() as *const Url;
        let second = ctx.url() as *const Url;

        assert!(ptr::eq(first, second));
        assert_eq!(ctx.url().path(), "/api/users");
        pool.release(ctx);
    }

    #[test]
    fn request_id_reads_well_known_header() {
        let pool = CtxPool::new();
        let mut buf = buffer();

        let ctx = pool.acquire(&mut buf);
        assert_eq!(ctx.request_id(), b"req-42");
        pool.release(ctx);
    }

    #[test]
    fn request_id_absent_is_empty() {
        let pool = CtxPool::new();
        let mut buf = HttpBuffer::from_request(b"GET", b"http", b"localhost", b"/", b"");

        let ctx = pool.acquire(&mut buf);
        assert_eq!(ctx.request_id(), b"");
        pool.release(ctx);
    }

    #[test]
    fn method_passthrough() {
        let pool = CtxPool::new();
        let mut buf = buffer();

        let ctx = pool.acquire(&mut buf);
        assert_eq!(ctx.method(), b"GET");
        pool.release(ctx);
    }

    #[test]
    fn response_writer_state_is_memoized_per_request() {
        let pool = CtxPool::new();
        let mut buf = buffer();

        let mut ctx = pool.acquire(&mut buf);
        {
            let mut writer = ctx.response_writer();
            writer.set_header(b"x-step", b"one");
        }

        // The second adapter borrows the same pooled state: the header set
        // through the first one is still in the cached map.
        let writer = ctx.response_writer();
        assert_eq!(writer.header(b"x-step"), Some(b"one" as &[u8]));
        assert_eq!(writer.header_count(), 1);
        pool.release(ctx);
    }

    #[test]
    fn response_writer_flattens_once() {
        let pool = CtxPool::new();
        let mut buf = buffer();
        buf.set_response_header(b"server", b"reqcycle");

        let mut ctx = pool.acquire(&mut buf);
        assert_eq!(
            ctx.response_writer().header(b"server"),
            Some(b"reqcycle" as &[u8])
        );

        // A later direct buffer write bypasses the adapter and stays
        // invisible to the frozen map.
        ctx.buffer.set_response_header(b"x-direct", b"1");
        assert_eq!(ctx.response_writer().header(b"x-direct"), None);
        pool.release(ctx);
    }
}
