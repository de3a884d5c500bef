//! String marshaling between native request bytes and script text.
//!
//! Two conversion modes exist and they are never interchangeable:
//!
//! - [`to_text`] validates bytes as UTF-8. Used for methods, URLs, query
//!   strings, and path parameters, which are text by protocol.
//! - [`to_raw_text`] widens each byte to the char with the same code point
//!   (Latin-1 style). Used only for header values: clients may send header
//!   bytes that are not valid UTF-8, and those bytes must survive the trip
//!   into script space unchanged. [`raw_text_bytes`] is the exact inverse.
//!
//! Every conversion allocates a fresh owned `String`; no script-visible
//! value ever aliases native request storage.

use crate::error::{Error, MarshalError};

/// Converts native bytes into validated UTF-8 text.
///
/// # Errors
///
/// Returns [`Error::Marshal`] if the bytes are not valid UTF-8. Header
/// values never take this path; use [`to_raw_text`] for them.
///
/// # Examples
///
/// ```
/// use request_bridge::marshal::to_text;
///
/// assert_eq!(to_text(b"GET").unwrap(), "GET");
/// assert!(to_text(&[0xff, 0xfe]).is_err());
/// ```
pub fn to_text(bytes: &[u8]) -> Result<String, Error> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_owned()),
        Err(_) => Err(Error::Marshal(MarshalError::new(
            "value is not valid UTF-8 text",
        ))),
    }
}

/// Converts native bytes into byte-preserving text.
///
/// Each byte becomes the char with the same code point, so the conversion
/// never fails and [`raw_text_bytes`] recovers the original bytes exactly.
///
/// # Examples
///
/// ```
/// use request_bridge::marshal::{raw_text_bytes, to_raw_text};
///
/// let raw = to_raw_text(&[0x68, 0x69, 0xff]);
/// assert_eq!(raw_text_bytes(&raw).unwrap(), vec![0x68, 0x69, 0xff]);
/// ```
pub fn to_raw_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Recovers the original bytes from byte-preserving text.
///
/// # Errors
///
/// Returns [`Error::Marshal`] if the text contains a char above U+00FF,
/// which cannot have come from [`to_raw_text`].
pub fn raw_text_bytes(text: &str) -> Result<Vec<u8>, Error> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                Error::Marshal(MarshalError::new(
                    "raw text contains a char outside the single-byte range",
                ))
            })
        })
        .collect()
}
