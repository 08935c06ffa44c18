//! Normalization of free-form text received from the library service.
//!
//! Titles arrive with no-break spaces, compatibility characters (`№`),
//! decomposed accents, zero-width marks and stray control characters. Every
//! title is passed through [`normalize`] when it is decoded so that the same
//! book always produces the same text, and therefore the same directory name.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Returns the canonical representation of `s`.
///
/// Applies NFKC normalization, drops non-printable characters, collapses
/// double spaces and trims surrounding whitespace, repeating until the text
/// stops changing.
#[must_use]
pub fn normalize(s: &str) -> String {
    let mut current = s.to_string();
    loop {
        let next = normalize_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Like [`normalize`], but accepts raw bytes and drops invalid UTF-8 sequences.
#[must_use]
pub fn normalize_bytes(bytes: &[u8]) -> String {
    let mut valid = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        valid.push_str(chunk.valid());
    }
    normalize(&valid)
}

fn normalize_once(s: &str) -> String {
    let composed: String = s.nfkc().filter(|c| is_printable(*c)).collect();
    composed.replace("  ", " ").trim().to_string()
}

/// Printable means graphic or the ASCII space.
///
/// Other whitespace, control, format (Cf, Unicode 15.1) and private-use
/// characters are not printable. Unassigned code points are kept: no general
/// category table is carried, so a code point assigned in a later Unicode
/// version is treated as graphic.
pub(crate) fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control() || c.is_whitespace() || is_format_char(c) || is_private_use(c))
}

fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{110BD}'
            | '\u{110CD}'
            | '\u{13430}'..='\u{1343F}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0001}'
            | '\u{E0020}'..='\u{E007F}'
    )
}

fn is_private_use(c: char) -> bool {
    matches!(
        c,
        '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}'
    )
}

/// A string that is normalized on decode.
///
/// Serializes as a plain JSON string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    /// Normalizes `raw` and wraps it.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NormalizedText {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl<'de> Deserialize<'de> for NormalizedText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}
