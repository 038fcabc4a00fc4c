// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The client's internal single-byte text encoding.
//!
//! All text inside the client (paths, chat, server-provided names) is a byte
//! sequence in code page 437, with an explicit length and no terminator.
//! [`CpString`] and [`CpStr`] are the owned/borrowed pair for such text,
//! mirroring `String`/`str`.
//!
//! The one rule that keeps this manageable: transcoding between CP437 and
//! native text (UTF-8, wide strings) happens only inside a platform
//! implementation, right at the native call. No other code is allowed to
//! know what the bytes mean.

use core::borrow::Borrow;
use core::fmt::{self, Write as _};
use core::hash::{Hash, Hasher};
use core::ops::Deref;

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;

/// Code page 437, in full: the 0x01..=0x1F range maps to the classic glyph
/// set rather than control characters, since the client renders those glyphs.
const CP437_TO_UNICODE: [char; 256] = [
    '\0', '☺', '☻', '♥', '♦', '♣', '♠', '•', '◘', '○', '◙', '♂', '♀', '♪', '♫', '☼', //
    '►', '◄', '↕', '‼', '¶', '§', '▬', '↨', '↑', '↓', '→', '←', '∟', '↔', '▲', '▼', //
    ' ', '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '@', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '[', '\\', ']', '^', '_', //
    '`', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '{', '|', '}', '~', '⌂', //
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', //
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', //
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', //
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', //
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}', //
];

/// Decodes one CP437 byte into the Unicode scalar it renders as.
pub fn decode_byte(byte: u8) -> char {
    CP437_TO_UNICODE[byte as usize]
}

/// Encodes a Unicode scalar into CP437, if it is representable.
pub fn encode_char(c: char) -> Option<u8> {
    // The printable ASCII range is identical in CP437.
    if (' '..='~').contains(&c) {
        return Some(c as u8);
    }
    CP437_TO_UNICODE
        .iter()
        .position(|&mapped| mapped == c)
        .map(|i| i as u8)
}

/// A borrowed slice of CP437 text. The borrowed counterpart of
/// [`CpString`], like `str` is to `String`.
#[repr(transparent)]
pub struct CpStr {
    bytes: [u8],
}

impl CpStr {
    /// Wraps a byte slice as CP437 text. Every byte sequence is valid, so
    /// this never fails.
    pub fn from_bytes(bytes: &[u8]) -> &CpStr {
        // Safety: CpStr is a repr(transparent) wrapper around [u8], so the
        // layouts match exactly.
        unsafe { &*(bytes as *const [u8] as *const CpStr) }
    }

    /// The raw CP437 bytes.
    pub const fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The length of the text in bytes (which is also its length in
    /// characters; that's the point of a single-byte encoding).
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the text is empty.
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Iterates over the text as Unicode scalars.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.bytes.iter().map(|&b| decode_byte(b))
    }

    /// Returns true if the text begins with `prefix`, compared
    /// ASCII-case-insensitively (bytes outside the ASCII letters compare
    /// exactly).
    pub fn starts_with_caseless(&self, prefix: &CpStr) -> bool {
        self.bytes.len() >= prefix.bytes.len()
            && self
                .bytes
                .iter()
                .zip(prefix.bytes.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Decodes the text into a native UTF-8 string. For use at the platform
    /// boundary only.
    pub fn decode(&self) -> String {
        self.chars().collect()
    }
}

impl fmt::Display for CpStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.chars() {
            f.write_char(c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CpStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cp437\"{self}\"")
    }
}

impl PartialEq for CpStr {
    fn eq(&self, other: &CpStr) -> bool {
        self.bytes == other.bytes
    }
}
impl Eq for CpStr {}

impl Hash for CpStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl ToOwned for CpStr {
    type Owned = CpString;
    fn to_owned(&self) -> CpString {
        CpString {
            bytes: self.bytes.to_vec(),
        }
    }
}

/// An owned CP437 string. See the [module docs](self) for the encoding
/// rules.
#[derive(Clone, Default)]
pub struct CpString {
    bytes: Vec<u8>,
}

impl CpString {
    /// Creates an empty string.
    pub const fn new() -> CpString {
        CpString { bytes: Vec::new() }
    }

    /// Borrows the string as a [`CpStr`].
    pub fn as_cp_str(&self) -> &CpStr {
        CpStr::from_bytes(&self.bytes)
    }

    /// Encodes native UTF-8 text into CP437. Scalars with no CP437
    /// counterpart are replaced with `'?'`, so this is lossy but total.
    pub fn encode(text: &str) -> CpString {
        let mut out = CpString::new();
        for c in text.chars() {
            out.push_char(c);
        }
        out
    }

    /// Appends a raw CP437 byte.
    pub fn push_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Appends CP437 text.
    pub fn push_str(&mut self, text: &CpStr) {
        self.bytes.extend_from_slice(text.as_bytes());
    }

    /// Appends a Unicode scalar, replacing it with `'?'` if CP437 cannot
    /// represent it.
    pub fn push_char(&mut self, c: char) {
        self.bytes.push(encode_char(c).unwrap_or(b'?'));
    }

    /// Shortens the string to zero bytes without releasing the allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

impl Deref for CpString {
    type Target = CpStr;
    fn deref(&self) -> &CpStr {
        self.as_cp_str()
    }
}

impl Borrow<CpStr> for CpString {
    fn borrow(&self) -> &CpStr {
        self.as_cp_str()
    }
}

impl From<&str> for CpString {
    fn from(text: &str) -> CpString {
        CpString::encode(text)
    }
}

impl From<&CpStr> for CpString {
    fn from(text: &CpStr) -> CpString {
        text.to_owned()
    }
}

impl fmt::Display for CpString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_cp_str(), f)
    }
}

impl fmt::Debug for CpString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_cp_str(), f)
    }
}

impl PartialEq for CpString {
    fn eq(&self, other: &CpString) -> bool {
        self.as_cp_str() == other.as_cp_str()
    }
}
impl Eq for CpString {}

impl PartialEq<&CpStr> for CpString {
    fn eq(&self, other: &&CpStr) -> bool {
        self.as_cp_str() == *other
    }
}

impl Hash for CpString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_cp_str().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_byte, encode_char, CpString};

    use alloc::string::ToString;

    #[test]
    fn ascii_maps_to_itself() {
        for byte in 0x20..0x7f_u8 {
            assert_eq!(byte as char, decode_byte(byte));
            assert_eq!(Some(byte), encode_char(byte as char));
        }
    }

    #[test]
    fn high_half_round_trips() {
        for byte in 0x80..=0xff_u8 {
            assert_eq!(Some(byte), encode_char(decode_byte(byte)));
        }
    }

    #[test]
    fn encoding_is_lossy_but_total() {
        let text = CpString::encode("héllo ♥ 世界");
        assert_eq!("héllo ♥ ??", text.to_string());
        assert_eq!(10, text.len());
    }

    #[test]
    fn caseless_prefix_matching() {
        let path = CpString::encode("Plugins/render.so");
        let prefix = CpString::encode("plugins/");
        assert!(path.starts_with_caseless(&prefix));
        assert!(!prefix.starts_with_caseless(&path));
    }
}
