//! reqcycle - Request-context lifecycle and object reuse for HTTP servers
//!
//! Per-request state for a handler-chain HTTP server, recycled through
//! lock-free pools so that the steady state allocates nothing: the context
//! itself, its URL view, and its response-writer state all come from
//! free-lists and go back when the request ends.
//!
//! # Lifecycle
//!
//! - **Acquire** - [`CtxPool::acquire`] binds a recycled [`Ctx`] to the
//!   transport's [`HttpBuffer`] for exactly one request
//! - **Handle** - handlers read the lazily built [`Url`], write through the
//!   [`ResponseWriter`], register cleanups with [`Ctx::defer`], and signal
//!   the router via the continuation and failure flags
//! - **Release** - [`CtxPool::release`] consumes the context, runs deferred
//!   actions in append order, and returns every pooled part at its zero value
//!
//! Release takes the context by value, so use after release and double
//! release are compile errors, not runtime hazards.
//!
//! # Examples
//!
//! ```
//! use reqcycle::{CtxPool, HttpBuffer};
//! use std::io::Write;
//!
//! let pool = CtxPool::new();
//!
//! // Filled by the transport when a request arrives.
//! let mut buffer = HttpBuffer::from_request(b"GET", b"http", b"localhost", b"/hello", b"name=world");
//!
//! let mut ctx = pool.acquire(&mut buffer);
//! let name = ctx.url().query_param("name").unwrap_or("stranger").to_owned();
//!
//! let mut resp = ctx.response_writer();
//! resp.set_status(200);
//! resp.set_header(b"content-type", b"text/plain");
//! resp.write_all(name.as_bytes()).unwrap();
//!
//! pool.release(ctx);
//! assert_eq!(buffer.body(), b"world");
//! ```

pub(crate) mod http {
    pub(crate) mod buffer;
    pub(crate) mod types;
    pub(crate) mod url;
    pub(crate) mod writer;
}
pub(crate) mod ctx;
pub(crate) mod pool;
pub mod limits;

pub use crate::{
    ctx::{Ctx, DeferFn, X_REQUEST_ID},
    http::{
        buffer::HttpBuffer,
        types::OwnedHeader,
        url::{Url, UrlPool},
        writer::{RespWriter, ResponseWriter, WriterPool},
    },
    limits::CtxLimits,
    pool::CtxPool,
};
