//! The transport-provided request/response buffer the context layer wraps.

use crate::http::types::{find_value, OwnedHeader};

/// Raw per-connection request/response buffer.
///
/// The transport collaborator owns one `HttpBuffer` per connection, fills the
/// request half from the wire before every handler chain, and drains the
/// response half afterwards. This crate never parses wire bytes itself; it
/// only exposes what the transport wrote here.
///
/// # Reuse contract
///
/// The buffer lives as long as its connection and is [`reset`](Self::reset)
/// between requests. Every reset advances a generation counter; detached
/// views handed out by the context layer (see [`Url`](crate::Url)) record the
/// generation they were created under, and debug builds assert that a view is
/// never read after the counter has advanced. In release builds the contract
/// is upheld by ownership: a [`Ctx`](crate::Ctx) borrows the buffer mutably,
/// so the transport cannot reset it while a request is in flight.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HttpBuffer {
    method: Vec<u8>,
    scheme: Vec<u8>,
    host: Vec<u8>,
    path: Vec<u8>,
    query: Vec<u8>,
    req_headers: Vec<OwnedHeader>,

    status: u16,
    resp_headers: Vec<OwnedHeader>,
    body: Vec<u8>,

    generation: u64,
}

impl HttpBuffer {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears both halves for the next request on this connection.
    ///
    /// Keeps every allocation and advances the generation counter, so stale
    /// detached views become detectable in debug builds.
    #[inline]
    pub fn reset(&mut self) {
        self.method.clear();
        self.scheme.clear();
        self.host.clear();
        self.path.clear();
        self.query.clear();
        self.req_headers.clear();

        self.status = 0;
        self.resp_headers.clear();
        self.body.clear();

        self.generation = self.generation.wrapping_add(1);
    }

    #[inline(always)]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

// Request half: filled by the transport, read by the context layer
impl HttpBuffer {
    #[inline]
    pub fn set_method(&mut self, method: &[u8]) {
        self.method.clear();
        self.method.extend_from_slice(method);
    }

    /// Binds the request target in its four components.
    ///
    /// `query` is the raw query string without the leading `?`.
    #[inline]
    pub fn set_uri(&mut self, scheme: &[u8], host: &[u8], path: &[u8], query: &[u8]) {
        self.scheme.clear();
        self.scheme.extend_from_slice(scheme);
        self.host.clear();
        self.host.extend_from_slice(host);
        self.path.clear();
        self.path.extend_from_slice(path);
        self.query.clear();
        self.query.extend_from_slice(query);
    }

    #[inline]
    pub fn push_request_header(&mut self, name: &[u8], value: &[u8]) {
        self.req_headers.push(OwnedHeader::from(name, value));
    }

    #[inline(always)]
    pub fn method(&self) -> &[u8] {
        &self.method
    }

    #[inline(always)]
    pub fn scheme(&self) -> &[u8] {
        &self.scheme
    }

    #[inline(always)]
    pub fn host(&self) -> &[u8] {
        &self.host
    }

    #[inline(always)]
    pub fn path(&self) -> &[u8] {
        &self.path
    }

    /// Raw query string without the leading `?`.
    #[inline(always)]
    pub fn query_string(&self) -> &[u8] {
        &self.query
    }

    /// Returns the first request header value with case-insensitive
    /// name matching. Uses linear search.
    #[inline(always)]
    pub fn request_header(&self, name: &[u8]) -> Option<&[u8]> {
        find_value(&self.req_headers, name)
    }
}

// Response half: written by the context layer, drained by the transport
impl HttpBuffer {
    #[inline(always)]
    pub const fn status(&self) -> u16 {
        self.status
    }

    #[inline(always)]
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Sets a response header, replacing the first existing entry with a
    /// case-insensitive matching name, or appending a new one.
    #[inline]
    pub fn set_response_header(&mut self, name: &[u8], value: &[u8]) {
        match self
            .resp_headers
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(name))
        {
            Some(header) => header.set_value(value),
            None => self.resp_headers.push(OwnedHeader::from(name, value)),
        }
    }

    #[inline(always)]
    pub fn response_header(&self, name: &[u8]) -> Option<&[u8]> {
        find_value(&self.resp_headers, name)
    }

    #[inline(always)]
    pub fn response_headers(&self) -> &[OwnedHeader] {
        &self.resp_headers
    }

    #[inline(always)]
    pub fn write_body(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

// For tests
impl HttpBuffer {
    /// Builds a buffer with a bound request line, the way a transport would.
    #[inline]
    pub fn from_request(method: &[u8], scheme: &[u8], host: &[u8], path: &[u8], query: &[u8]) -> Self {
        let mut buffer = Self::new();
        buffer.set_method(method);
        buffer.set_uri(scheme, host, path, query);
        buffer
    }
}
// For tests

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> HttpBuffer {
        let mut buffer =
            HttpBuffer::from_request(b"GET", b"http", b"example.com", b"/api/users", b"sort=name");
        buffer.push_request_header(b"x-request-id", b"req-1");
        buffer.set_status(200);
        buffer.set_response_header(b"content-type", b"text/plain");
        buffer.write_body(b"hello");
        buffer
    }

    #[test]
    fn request_accessors() {
        let buffer = filled();

        assert_eq!(buffer.method(), b"GET");
        assert_eq!(buffer.scheme(), b"http");
        assert_eq!(buffer.host(), b"example.com");
        assert_eq!(buffer.path(), b"/api/users");
        assert_eq!(buffer.query_string(), b"sort=name");
        assert_eq!(buffer.request_header(b"X-Request-ID"), Some(b"req-1" as &[u8]));
        assert_eq!(buffer.request_header(b"missing"), None);
    }

    #[test]
    fn response_header_replaces_existing() {
        let mut buffer = filled();

        buffer.set_response_header(b"Content-Type", b"application/json");

        assert_eq!(buffer.response_headers().len(), 1);
        assert_eq!(
            buffer.response_header(b"content-type"),
            Some(b"application/json" as &[u8])
        );
    }

    #[test]
    fn body_appends() {
        let mut buffer = filled();
        buffer.write_body(b" world");

        assert_eq!(buffer.body(), b"hello world");
    }

    #[test]
    fn reset_restores_zero_state_and_advances_generation() {
        let mut buffer = filled();
        let generation = buffer.generation();

        buffer.reset();

        let mut fresh = HttpBuffer::new();
        // Only the generation survives a reset.
        fresh.generation = buffer.generation();
        assert_eq!(buffer, fresh);
        assert_eq!(buffer.generation(), generation + 1);
    }
}
