//! Pooled response-writer adapter over the response half of the buffer.

use crate::{
    http::{
        buffer::HttpBuffer,
        types::{find_value, OwnedHeader},
    },
    limits::CtxLimits,
};
use crossbeam::queue::SegQueue;
use log::debug;
use std::io;

/// Pooled state behind a [`ResponseWriter`]: the header map cached from the
/// response buffer plus the generation it was flattened under.
///
/// Created lazily on the first [`Ctx::response_writer`](crate::Ctx::response_writer)
/// call of a request, memoized for the request's lifetime, and released in
/// lock-step with the owning context.
#[derive(Debug, Default)]
pub struct RespWriter {
    headers: Vec<OwnedHeader>,
    generation: u64,
}

impl RespWriter {
    #[inline(always)]
    fn with_limits(limits: &CtxLimits) -> Self {
        Self {
            headers: Vec::with_capacity(limits.writer_header_capacity),
            generation: 0,
        }
    }

    #[inline(always)]
    pub(crate) fn reset(&mut self) {
        self.headers.clear();
        self.generation = 0;
    }

    /// Copies every header currently present in the response buffer into the
    /// cached map. Runs once per request, at adapter creation.
    #[inline]
    fn flatten(&mut self, buffer: &HttpBuffer) {
        for header in buffer.response_headers() {
            self.headers.push(header.clone());
        }
        self.generation = buffer.generation();
    }

    #[inline(always)]
    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Standard header-map-plus-byte-sink interface over the response buffer.
///
/// Borrowed from a [`Ctx`](crate::Ctx) for the duration of a write sequence;
/// repeated [`Ctx::response_writer`](crate::Ctx::response_writer) calls
/// within one request hand out the same pooled state.
///
/// # Header map semantics
///
/// The map is flattened **once**, at the adapter's creation, from the headers
/// then present in the response buffer. It is not a live view: response
/// headers written to the buffer through any other path afterwards are *not*
/// reflected here. Writes through the adapter itself are synchronized back to
/// the buffer, so the map and the buffer never diverge for adapter-driven
/// code.
#[derive(Debug)]
pub struct ResponseWriter<'a> {
    state: &'a mut RespWriter,
    buffer: &'a mut HttpBuffer,
}

impl<'a> ResponseWriter<'a> {
    #[inline(always)]
    pub(crate) fn new(state: &'a mut RespWriter, buffer: &'a mut HttpBuffer) -> Self {
        Self { state, buffer }
    }

    /// Returns the cached value of the first header with a case-insensitive
    /// matching name.
    #[inline(always)]
    pub fn header(&self, name: &[u8]) -> Option<&[u8]> {
        find_value(&self.state.headers, name)
    }

    #[inline(always)]
    pub fn header_count(&self) -> usize {
        self.state.headers.len()
    }

    /// Sets a header in the cached map and synchronizes it to the underlying
    /// buffer, replacing an existing entry with a matching name.
    #[inline]
    pub fn set_header(&mut self, name: &[u8], value: &[u8]) {
        match self
            .state
            .headers
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(name))
        {
            Some(header) => header.set_value(value),
            None => self.state.headers.push(OwnedHeader::from(name, value)),
        }

        self.buffer.set_response_header(name, value);
    }

    /// Writes the response status code to the underlying buffer.
    #[inline(always)]
    pub fn set_status(&mut self, status: u16) {
        self.buffer.set_status(status);
    }

    #[inline(always)]
    pub fn status(&self) -> u16 {
        self.buffer.status()
    }
}

impl io::Write for ResponseWriter<'_> {
    /// Appends `data` to the response body. Never fails.
    #[inline(always)]
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buffer.write_body(data);
        Ok(data.len())
    }

    #[inline(always)]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Free-list of reusable [`RespWriter`] states.
///
/// Owned by a [`CtxPool`](crate::CtxPool); grows on demand and never
/// shrinks. Safe for concurrent acquire/release from any number of workers.
#[derive(Debug)]
pub struct WriterPool {
    free: SegQueue<Box<RespWriter>>,
    limits: CtxLimits,
}

impl WriterPool {
    #[inline(always)]
    pub(crate) fn new(limits: CtxLimits) -> Self {
        Self {
            free: SegQueue::new(),
            limits,
        }
    }

    /// Returns a writer state with its header map flattened from `buffer`'s
    /// current response headers, reusing a retired instance when one is
    /// available. Never fails.
    #[inline]
    pub fn acquire(&self, buffer: &HttpBuffer) -> Box<RespWriter> {
        let mut state = match self.free.pop() {
            Some(state) => state,
            None => {
                debug!("writer pool empty, allocating a new instance");
                Box::new(RespWriter::with_limits(&self.limits))
            }
        };

        state.flatten(buffer);
        state
    }

    /// Returns `state` to the pool. A `None` is a silent no-op, so callers
    /// may release unconditionally even when a context never created an
    /// adapter.
    #[inline]
    pub fn release(&self, state: Option<Box<RespWriter>>) {
        let Some(mut state) = state else { return };

        state.reset();
        self.free.push(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pool() -> WriterPool {
        WriterPool::new(CtxLimits::default())
    }

    #[test]
    fn flattens_existing_headers_once() {
        let pool = pool();
        let mut buffer = HttpBuffer::new();
        buffer.set_response_header(b"content-type", b"text/plain");

        let mut state = pool.acquire(&buffer);

        // Mutating the buffer through another path is not reflected.
        buffer.set_response_header(b"x-later", b"1");
        let writer = ResponseWriter::new(&mut state, &mut buffer);
        assert_eq!(writer.header(b"content-type"), Some(b"text/plain" as &[u8]));
        assert_eq!(writer.header(b"x-later"), None);
    }

    #[test]
    fn empty_buffer_yields_empty_map() {
        let pool = pool();
        let mut buffer = HttpBuffer::new();

        let mut state = pool.acquire(&buffer);
        let writer = ResponseWriter::new(&mut state, &mut buffer);

        assert_eq!(writer.header_count(), 0);
    }

    #[test]
    fn set_header_syncs_to_buffer() {
        let pool = pool();
        let mut buffer = HttpBuffer::new();
        let mut state = pool.acquire(&buffer);

        let mut writer = ResponseWriter::new(&mut state, &mut buffer);
        writer.set_header(b"x-id", b"1");
        writer.set_header(b"X-Id", b"2");

        assert_eq!(writer.header(b"x-id"), Some(b"2" as &[u8]));
        assert_eq!(writer.header_count(), 1);
        assert_eq!(buffer.response_header(b"x-id"), Some(b"2" as &[u8]));
        assert_eq!(buffer.response_headers().len(), 1);
    }

    #[test]
    fn write_appends_to_body_and_status_passes_through() {
        let pool = pool();
        let mut buffer = HttpBuffer::new();
        let mut state = pool.acquire(&buffer);

        let mut writer = ResponseWriter::new(&mut state, &mut buffer);
        writer.set_status(201);
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();

        assert_eq!(writer.status(), 201);
        assert_eq!(buffer.body(), b"hello world");
    }

    #[test]
    fn release_none_is_noop() {
        pool().release(None);
    }

    #[test]
    fn reused_state_starts_empty() {
        let pool = pool();
        let mut buffer = HttpBuffer::new();
        buffer.set_response_header(b"x-old", b"1");

        let state = pool.acquire(&buffer);
        pool.release(Some(state));

        buffer.reset();
        let mut state = pool.acquire(&buffer);
        let writer = ResponseWriter::new(&mut state, &mut buffer);

        assert_eq!(writer.header(b"x-old"), None);
        assert_eq!(writer.header_count(), 0);
    }
}
