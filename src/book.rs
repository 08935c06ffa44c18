//! Catalog records as returned by the library service.
//!
//! A [`Book`] describes one catalog entry and every downloadable resource
//! attached to it. The core reads these records but never mutates them; the
//! full record is persisted as `book.json` once its files are on disk.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::text::NormalizedText;

/// One catalog entry with its downloadable resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: NormalizedText,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub book_part_link: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub similar_books: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cover: Cover,
    #[serde(default, deserialize_with = "null_as_default")]
    pub new_cover: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Files,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_smile: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mif_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub stickers: Vec<Annotation>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub quotes: Vec<Annotation>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub experts: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<Address>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<Address>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub spreads: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discount_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downloads: u64,
}

/// Cover image addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cover {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub small: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub large: String,
}

/// Downloadable files by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Files {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ebook: Formats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub audiobook: Formats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub demo: Formats,
}

/// Format tag (`pdf`, `mp3`, `zip`, ...) to its addresses, ordered by tag.
pub type Formats = BTreeMap<String, Addresses>;

/// A single downloadable file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<NormalizedText>,
}

impl Address {
    /// Creates an address with only a URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the declared size.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the per-item title.
    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(NormalizedText::new(title));
        self
    }

    /// The size the service declared for this file.
    ///
    /// A declared size of zero means the service did not know it.
    #[must_use]
    pub fn expected_size(&self) -> Option<u64> {
        self.size.filter(|size| *size > 0)
    }

    /// The per-item title, falling back to `default` when absent or empty.
    #[must_use]
    pub fn title_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.title
            .as_ref()
            .map(NormalizedText::as_str)
            .filter(|title| !title.is_empty())
            .unwrap_or(default)
    }
}

/// A list of addresses.
///
/// The service sends either a single object or an array in the same
/// position; both decode into a list. `null`, and `null` entries of an
/// array, decode to nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Addresses(pub Vec<Address>);

impl Addresses {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Address> {
        self.0.iter()
    }
}

impl From<Vec<Address>> for Addresses {
    fn from(addresses: Vec<Address>) -> Self {
        Self(addresses)
    }
}

impl<'de> Deserialize<'de> for Addresses {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ManyOrOne {
            Many(Vec<Option<Address>>),
            One(Address),
        }

        Ok(match Option::<ManyOrOne>::deserialize(deserializer)? {
            None => Self::default(),
            Some(ManyOrOne::Many(addresses)) => Self(addresses.into_iter().flatten().collect()),
            Some(ManyOrOne::One(address)) => Self(vec![address]),
        })
    }
}

/// Information about an author of the book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub photo: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub info: String,
}

/// Styled text blocks (stickers, quotes).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub style: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "NormalizedText::is_empty")]
    pub title: NormalizedText,
}

/// Response of the catalog listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub books: Vec<Book>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
}

/// Decodes an absent value or `null` as `T::default()`.
///
/// The service sends `null` for fields it has no value for.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Encodes a book as tab-indented JSON followed by a newline.
///
/// # Errors
///
/// Returns the serializer error if the record cannot be encoded.
pub fn to_pretty_json(book: &Book) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::with_capacity(1024);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    book.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}
