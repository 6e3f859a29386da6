//! String marshaling between Rust strings and the library's UTF-16LE text.
//!
//! The library reports variable-length results through a two-call
//! protocol: a size query with an empty buffer, then a fill into a buffer of
//! exactly that size. The helpers here run that protocol against a closure
//! wrapping one library call, so every getter in the crate shares the same
//! checks.

use crate::error::{PdfiumError, Result};
use std::ffi::CString;

/// Bytes per UTF-16 code unit.
pub const WIDE_UNIT: usize = 2;

/// Convert to a NUL-terminated UTF-16LE buffer, one code unit at a time.
pub fn to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16()
        .map(u16::to_le)
        .chain(std::iter::once(0))
        .collect()
}

/// Decode UTF-16LE code units, stopping at the first terminator.
pub fn from_wide(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    let native: Vec<u16> = units[..end].iter().map(|&u| u16::from_le(u)).collect();
    String::from_utf16_lossy(&native)
}

/// NUL-terminated byte string for ASCII keys and passwords.
pub fn to_c_string(text: &str) -> Result<CString> {
    CString::new(text).map_err(|_| {
        PdfiumError::InvalidArgument(format!("{:?} contains an interior NUL byte", text))
    })
}

fn wide_buffer(units: usize) -> Result<Vec<u16>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(units)
        .map_err(|_| PdfiumError::AllocationFailed {
            bytes: units * WIDE_UNIT,
        })?;
    buffer.resize(units, 0);
    Ok(buffer)
}

fn byte_buffer(len: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| PdfiumError::AllocationFailed { bytes: len })?;
    buffer.resize(len, 0);
    Ok(buffer)
}

/// Run the size-query/fill protocol for a UTF-16LE string measured in bytes.
///
/// `call` receives an empty slice for the size query and a buffer of the
/// reported size for the fill, and returns the byte count the library
/// reported. A reported size of zero is an absent value: the result is empty
/// and no second call is made. A fill that writes fewer bytes than the size
/// query promised yields an empty string. The terminator is dropped, so the
/// visible length is `written / 2 - 1` units.
pub fn read_wide_string<F>(mut call: F) -> Result<String>
where
    F: FnMut(&mut [u16]) -> usize,
{
    let needed = call(&mut []);
    if needed == 0 {
        return Ok(String::new());
    }

    let mut buffer = wide_buffer(needed.div_ceil(WIDE_UNIT))?;
    let written = call(&mut buffer);
    if written < needed {
        tracing::trace!(needed, written, "short fill, discarding result");
        return Ok(String::new());
    }

    let units = (needed.min(written) / WIDE_UNIT).min(buffer.len());
    let visible = units.saturating_sub(1);
    Ok(from_wide(&buffer[..visible]))
}

/// Size-query/fill for a NUL-terminated byte string (URIs, file paths, dates).
pub fn read_byte_string<F>(call: F) -> Result<String>
where
    F: FnMut(&mut [u8]) -> usize,
{
    let mut bytes = read_bytes(call)?;
    if let Some(end) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(end);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Size-query/fill for an opaque byte payload.
///
/// Same rules as [`read_wide_string`] without a terminator to strip: an absent
/// payload is empty, and a short fill is discarded.
pub fn read_bytes<F>(mut call: F) -> Result<Vec<u8>>
where
    F: FnMut(&mut [u8]) -> usize,
{
    let needed = call(&mut []);
    if needed == 0 {
        return Ok(Vec::new());
    }

    let mut buffer = byte_buffer(needed)?;
    let written = call(&mut buffer);
    if written < needed {
        tracing::trace!(needed, written, "short fill, discarding payload");
        return Ok(Vec::new());
    }
    buffer.truncate(needed);
    Ok(buffer)
}

/// Text extraction measured in code units rather than bytes.
///
/// `FPDFText_GetText` wants room for `count + 1` units and returns the units
/// written including the terminator.
pub fn read_text_units<F>(count: usize, call: F) -> Result<String>
where
    F: FnOnce(&mut [u16]) -> usize,
{
    if count == 0 {
        return Ok(String::new());
    }
    let mut buffer = wide_buffer(count + 1)?;
    let written = call(&mut buffer).min(buffer.len());
    if written == 0 {
        return Ok(String::new());
    }
    Ok(from_wide(&buffer[..written - 1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Library-side fill for a UTF-16LE value, in the shape the C API uses.
    fn fill(value: &str, buffer: &mut [u16]) -> usize {
        let wide = to_wide(value);
        let bytes = wide.len() * WIDE_UNIT;
        if buffer.len() * WIDE_UNIT >= bytes {
            buffer[..wide.len()].copy_from_slice(&wide);
        }
        bytes
    }

    #[test]
    fn test_to_wide_terminates() {
        let wide = to_wide("Hi");
        assert_eq!(wide.len(), 3);
        assert_eq!(wide[2], 0);
        assert_eq!(from_wide(&wide), "Hi");
    }

    #[test]
    fn test_to_wide_surrogate_pairs() {
        let text = "a\u{1F600}b";
        let wide = to_wide(text);
        // 'a', two surrogates, 'b', terminator
        assert_eq!(wide.len(), 5);
        assert_eq!(from_wide(&wide), text);
    }

    #[test]
    fn test_read_wide_string_length() {
        let mut calls = 0;
        let text = read_wide_string(|buf| {
            calls += 1;
            fill("Title", buf)
        })
        .unwrap();
        assert_eq!(text, "Title");
        assert_eq!(calls, 2);
        // writtenBytes / 2 - 1
        assert_eq!(text.encode_utf16().count(), 12 / WIDE_UNIT - 1);
    }

    #[test]
    fn test_absent_value_skips_fill() {
        let mut calls = 0;
        let text = read_wide_string(|_| {
            calls += 1;
            0
        })
        .unwrap();
        assert!(text.is_empty());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_terminator_only_is_empty() {
        let text = read_wide_string(|buf| fill("", buf)).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_short_fill_is_empty() {
        let mut first = true;
        let text = read_wide_string(|buf| {
            if std::mem::take(&mut first) {
                20
            } else {
                buf[0] = u16::from(b'x').to_le();
                4
            }
        })
        .unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_overlong_fill_reads_only_buffer() {
        let text = read_wide_string(|buf| {
            if buf.is_empty() {
                return 6;
            }
            buf.copy_from_slice(&to_wide("ab"));
            600
        })
        .unwrap();
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_read_bytes() {
        let payload = b"%PDF-1.7 attachment";
        let bytes = read_bytes(|buf| {
            if buf.len() >= payload.len() {
                buf[..payload.len()].copy_from_slice(payload);
            }
            payload.len()
        })
        .unwrap();
        assert_eq!(bytes, payload);
    }

    #[test]
    fn test_read_byte_string_strips_nul() {
        let uri = b"https://example.com\0";
        let text = read_byte_string(|buf| {
            if buf.len() >= uri.len() {
                buf.copy_from_slice(uri);
            }
            uri.len()
        })
        .unwrap();
        assert_eq!(text, "https://example.com");
    }

    #[test]
    fn test_read_text_units() {
        let text = read_text_units(5, |buf| {
            assert_eq!(buf.len(), 6);
            fill("hello", buf) / WIDE_UNIT
        })
        .unwrap();
        assert_eq!(text, "hello");
        assert_eq!(read_text_units(0, |_| unreachable!()).unwrap(), "");
    }

    #[test]
    fn test_to_c_string_rejects_interior_nul() {
        assert!(to_c_string("Subj").is_ok());
        assert!(matches!(
            to_c_string("a\0b"),
            Err(PdfiumError::InvalidArgument(_))
        ));
    }
}
