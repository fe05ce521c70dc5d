//! Pooled URL value with zero-copy views into the request buffer.

use crate::http::{buffer::HttpBuffer, types::text_view};
use crossbeam::queue::SegQueue;
use log::debug;
use memchr::memchr;

/// A parsed URL view over the current request's buffer.
///
/// The four components are zero-copy views into the [`HttpBuffer`] bytes of
/// the request that acquired this value. The value is owned by the pool, is
/// bound to exactly one [`Ctx`](crate::Ctx) at a time, and is released in
/// lock-step with that context.
///
/// # The sharpest hazard in this crate
///
/// A `Url` must not be referenced after its context is released: on the next
/// acquisition its fields are rebound to a *different, later* request's byte
/// data, so a retained reference silently observes another request's URL.
/// Rust's borrow on the owning context prevents this for references obtained
/// through [`Ctx::url`](crate::Ctx::url); debug builds additionally carry a
/// buffer-generation canary that panics on stale reads.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Url {
    pub(crate) scheme: &'static str,
    pub(crate) path: &'static str,
    pub(crate) host: &'static str,
    pub(crate) raw_query: &'static str,
    pub(crate) generation: u64,
}

impl Url {
    /// Hard zero-value sentinel assigned wholesale on release.
    pub(crate) const EMPTY: Url = Url {
        scheme: "",
        path: "",
        host: "",
        raw_query: "",
        generation: 0,
    };

    #[inline(always)]
    pub(crate) fn reset(&mut self) {
        *self = Url::EMPTY;
    }

    #[inline]
    pub(crate) fn rebind(&mut self, buffer: &HttpBuffer) {
        self.scheme = text_view(buffer.scheme());
        self.path = text_view(buffer.path());
        self.host = text_view(buffer.host());
        self.raw_query = text_view(buffer.query_string());
        self.generation = buffer.generation();
    }

    #[inline(always)]
    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }
}

// Public API
impl Url {
    #[inline(always)]
    pub const fn scheme(&self) -> &str {
        self.scheme
    }

    #[inline(always)]
    pub const fn path(&self) -> &str {
        self.path
    }

    #[inline(always)]
    pub const fn host(&self) -> &str {
        self.host
    }

    /// Raw query string without the leading `?`. Empty when absent.
    #[inline(always)]
    pub const fn raw_query(&self) -> &str {
        self.raw_query
    }

    /// Returns the value of the first query parameter named `key`.
    ///
    /// Performs case-sensitive lookup over the raw query string without
    /// allocating; **there is no percent-decoding**. A key present without a
    /// value (`?debug`) yields `Some("")`.
    ///
    /// # Examples
    /// For query `sort=name&debug`:
    /// - key `"sort"`: `Some("name")`
    /// - key `"debug"`: `Some("")`
    /// - key `"missing"`: `None`
    #[inline]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        let data = self.raw_query.as_bytes();
        let data = match data.first() {
            Some(b'?') => &data[1..],
            _ => data,
        };
        let offset = self.raw_query.len() - data.len();

        let mut start = 0;
        while start < data.len() {
            // Find next '&' or end of string
            let end = memchr(b'&', &data[start..])
                .map(|pos| start + pos)
                .unwrap_or(data.len());

            // Find '=' within current parameter segment
            let index = memchr(b'=', &data[start..end]).unwrap_or(end - start);
            let split = start + index;

            if &data[start..split] == key.as_bytes() {
                // Split points sit on ASCII delimiters, so the str slice
                // below stays on character boundaries.
                let value_start = if split < end { split + 1 } else { end };
                return Some(&self.raw_query[offset + value_start..offset + end]);
            }

            start = end + 1;
        }

        None
    }
}

/// Free-list of reusable [`Url`] values.
///
/// Owned by a [`CtxPool`](crate::CtxPool); grows on demand and never
/// shrinks. Safe for concurrent acquire/release from any number of workers.
#[derive(Debug, Default)]
pub struct UrlPool {
    free: SegQueue<Box<Url>>,
}

impl UrlPool {
    #[inline(always)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns a URL populated from `buffer`'s current request, reusing a
    /// retired instance when one is available. Never fails.
    #[inline]
    pub fn acquire(&self, buffer: &HttpBuffer) -> Box<Url> {
        let mut url = match self.free.pop() {
            Some(url) => url,
            None => {
                debug!("url pool empty, allocating a new instance");
                Box::new(Url::EMPTY)
            }
        };

        url.rebind(buffer);
        url
    }

    /// Returns `url` to the pool. A `None` is a silent no-op, so callers may
    /// release unconditionally even when a context never created a URL.
    ///
    /// The instance must not be referenced after this call: its fields are
    /// rebound to a later request's data on the next acquisition.
    #[inline]
    pub fn release(&self, url: Option<Box<Url>>) {
        let Some(mut url) = url else { return };

        url.reset();
        self.free.push(url);
    }
}
