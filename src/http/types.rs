//! Byte-level primitives shared by the pooled request objects.

use std::{mem, str};

// ZERO-COPY TEXT VIEW

/// Reinterprets a byte slice as a detached text view without copying.
///
/// Invalid UTF-8 yields an empty view rather than an error: the accessors
/// built on top of this function promise "empty, never failing" semantics.
///
/// The returned reference is only valid until the buffer that owns `src` is
/// reset or reused. Holders must release it (or drop it) in lock-step with
/// the request that produced it; see [`HttpBuffer`](crate::HttpBuffer).
#[inline(always)]
pub(crate) fn text_view(src: &[u8]) -> &'static str {
    match simdutf8::basic::from_utf8(src) {
        // SAFETY: simdutf8 just validated the slice, so the unchecked
        // conversion cannot produce an invalid &str.
        Ok(_) => unsafe { detach(str::from_utf8_unchecked(src)) },
        Err(_) => "",
    }
}

// SAFETY: detach creates "temporary" references so that views into a
// reusable buffer can live inside pooled ('static-typed) objects. The
// reference is valid only while the backing buffer's generation is
// unchanged; every pooled holder resets its views to the empty sentinel
// before returning to its pool, so no detached view survives a release.
#[inline(always)]
pub(crate) const unsafe fn detach<T: ?Sized>(src: &T) -> &'static T {
    unsafe { mem::transmute(src) }
}

// HEADER

/// A single owned header entry of an [`HttpBuffer`](crate::HttpBuffer)
/// or a cached writer map.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct OwnedHeader {
    pub(crate) name: Vec<u8>,
    pub(crate) value: Vec<u8>,
}

impl OwnedHeader {
    #[inline(always)]
    pub(crate) fn from(name: &[u8], value: &[u8]) -> Self {
        Self {
            name: name.to_vec(),
            value: value.to_vec(),
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &[u8] {
        self.name.as_slice()
    }

    #[inline(always)]
    pub fn value(&self) -> &[u8] {
        self.value.as_slice()
    }

    #[inline(always)]
    pub(crate) fn set_value(&mut self, value: &[u8]) {
        self.value.clear();
        self.value.extend_from_slice(value);
    }
}

/// Returns the first value with case-insensitive name matching
/// (per [RFC 7230](https://tools.ietf.org/html/rfc7230#section-3.2)).
/// Uses linear search.
#[inline(always)]
pub(crate) fn find_value<'a>(headers: &'a [OwnedHeader], name: &[u8]) -> Option<&'a [u8]> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_view_valid() {
        assert_eq!(text_view(b"/api/users"), "/api/users");
        assert_eq!(text_view(b""), "");
    }

    #[test]
    fn text_view_invalid_utf8_is_empty() {
        assert_eq!(text_view(&[0xFF, 0xFE, b'a']), "");
    }

    #[test]
    fn header_lookup_case_insensitive() {
        let headers = vec![
            OwnedHeader::from(b"Content-Type", b"text/plain"),
            OwnedHeader::from(b"X-Request-Id", b"abc-123"),
        ];

        assert_eq!(
            find_value(&headers, b"content-type"),
            Some(b"text/plain" as &[u8])
        );
        assert_eq!(
            find_value(&headers, b"X-REQUEST-ID"),
            Some(b"abc-123" as &[u8])
        );
        assert_eq!(find_value(&headers, b"missing"), None);
    }

    #[test]
    fn header_set_value_keeps_name() {
        let mut header = OwnedHeader::from(b"x-test", b"one");
        header.set_value(b"two");

        assert_eq!(header.name(), b"x-test");
        assert_eq!(header.value(), b"two");
    }
}
