//! Shared `endstream` recovery scan: used both by the
//! xref-driven reader (`reader::object_loader`) and the FDF fallback scanner, which
//! has no xref/`Reader` context of its own to hang this logic off.

use crate::error::XrefError;
use crate::{Error, Result};

/// True if `tail` (the bytes immediately following a stream's declared end) is an
/// optional CR, optional LF, then the literal `endstream`.
pub(crate) fn endstream_follows(tail: &[u8]) -> bool {
    let mut t = tail;
    if t.first() == Some(&b'\r') {
        t = &t[1..];
    }
    if t.first() == Some(&b'\n') {
        t = &t[1..];
    }
    t.starts_with(b"endstream")
}

/// Read `buffer` in 1024-byte windows starting at `start`, each overlapping the
/// previous by `marker.len() - 1` bytes so a match straddling a window boundary is
/// never missed. Returns the bytes up to (not including) the first `endstream`,
/// right-trimmed of a trailing CRLF/LF/CR.
pub(crate) fn scan_for_endstream(buffer: &[u8], start: usize) -> Result<Vec<u8>> {
    const WINDOW: usize = 1024;
    const MARKER: &[u8] = b"endstream";
    if start > buffer.len() {
        return Err(Error::InvalidOffset(start));
    }
    let haystack = &buffer[start..];
    let overlap = MARKER.len() - 1;
    let mut searched = 0usize;
    while searched < haystack.len() {
        let window_end = (searched + WINDOW + overlap).min(haystack.len());
        let window = &haystack[searched..window_end];
        if let Some(rel) = window.windows(MARKER.len()).position(|w| w == MARKER) {
            let marker_pos = searched + rel;
            return Ok(trim_trailing_eol(&haystack[..marker_pos]).to_vec());
        }
        searched += WINDOW;
    }
    Err(XrefError::InvalidStreamLength.into())
}

pub(crate) fn trim_trailing_eol(data: &[u8]) -> &[u8] {
    if data.ends_with(b"\r\n") {
        &data[..data.len() - 2]
    } else if data.ends_with(b"\n") || data.ends_with(b"\r") {
        &data[..data.len() - 1]
    } else {
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_marker_across_window_boundary() {
        let mut buffer = vec![b'x'; 1020];
        buffer.extend_from_slice(b"\nendstream\nendobj");
        let result = scan_for_endstream(&buffer, 0).unwrap();
        assert_eq!(result, vec![b'x'; 1020]);
    }

    #[test]
    fn errors_when_marker_absent() {
        let buffer = vec![b'x'; 10];
        assert!(scan_for_endstream(&buffer, 0).is_err());
    }
}
