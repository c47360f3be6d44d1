//! Modified UTF-8, the encoding of `CONSTANT_Utf8` payloads.
//!
//! It differs from UTF-8 in two places: NUL is written as `C0 80`, and
//! supplementary characters are written as a surrogate pair of three-byte
//! sequences. Plain UTF-8 bytes written into a class file will be rejected or
//! misread by a real class loader, so every write goes through [`encode`].

use std::borrow::Cow;
use tracing::trace;

/// Decode a Utf8 payload for display.
///
/// Payloads that are not valid modified UTF-8 (lone surrogates are legal in
/// Java strings but have no Rust `str` form) are rendered lossily.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match cesu8::from_java_cesu8(bytes) {
        Ok(text) => text,
        Err(_) => {
            trace!("Utf8 payload of {} bytes is not valid modified UTF-8", bytes.len());
            String::from_utf8_lossy(bytes)
        }
    }
}

/// Encode a string as a Utf8 payload
pub fn encode(text: &str) -> Cow<'_, [u8]> {
    cesu8::to_java_cesu8(text)
}
