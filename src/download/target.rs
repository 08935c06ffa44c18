//! Local paths for a book's downloadable files.
//!
//! Every path here is a pure function of the record: the same book always
//! lands in the same place, which is what makes repeated runs resumable.
//!
//! Layout under the book directory:
//!
//! ```text
//! 00042 Title/
//!   e-book/<format>/<title>.<format>
//!   audiobook/<format>/<item title>.<format>
//!   demo/<format>/<title>.<format>
//!   photos/<url base name>
//!   <cover url base name>
//!   book.json
//!   .downloaded
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::filename::{safe_segment, url_base_name, with_ordinal};
use crate::book::{Address, Book, Formats};

/// Directory of e-book formats.
pub const EBOOK_DIR: &str = "e-book";
/// Directory of audiobook formats.
pub const AUDIOBOOK_DIR: &str = "audiobook";
/// Directory of demo excerpts.
pub const DEMO_DIR: &str = "demo";
/// Directory of photos.
pub const PHOTOS_DIR: &str = "photos";

/// Audiobook formats made redundant by a `zip` archive.
const ARCHIVED_AUDIO_FORMATS: &[&str] = &["mp3", "ogg"];

/// One file to materialize: where it goes, where it comes from and how big
/// the service says it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub path: PathBuf,
    pub url: String,
    pub expected_size: Option<u64>,
}

/// Directory name of a book: `"%05d %s"` of id and title, sanitized.
///
/// # Example
///
/// ```
/// use miflib_core::book::Book;
/// use miflib_core::download::book_dir_name;
///
/// let book = Book { id: 42, title: "Book: Name?".into(), ..Book::default() };
/// assert_eq!(book_dir_name(&book), "00042 Book Name");
/// ```
#[must_use]
pub fn book_dir_name(book: &Book) -> String {
    safe_segment(&format!("{:05} {}", book.id, book.title))
}

/// E-book files, one directory per format.
#[must_use]
pub fn ebook_targets(book: &Book, book_dir: &Path) -> Vec<DownloadTarget> {
    format_targets(&book_dir.join(EBOOK_DIR), &book.files.ebook, book, &[])
}

/// Audiobook files, one directory per format.
///
/// When a non-empty `zip` archive is offered, the per-chapter `mp3` and `ogg`
/// formats are left out.
#[must_use]
pub fn audiobook_targets(book: &Book, book_dir: &Path) -> Vec<DownloadTarget> {
    let formats = &book.files.audiobook;
    let has_archive = formats
        .get("zip")
        .is_some_and(|addresses| addresses.iter().any(|address| !address.url.is_empty()));
    let excluded = if has_archive {
        debug!(book_id = book.id, "zip archive present, skipping mp3 and ogg");
        ARCHIVED_AUDIO_FORMATS
    } else {
        &[]
    };
    format_targets(&book_dir.join(AUDIOBOOK_DIR), formats, book, excluded)
}

/// Demo excerpts, one directory per format.
#[must_use]
pub fn demo_targets(book: &Book, book_dir: &Path) -> Vec<DownloadTarget> {
    format_targets(&book_dir.join(DEMO_DIR), &book.files.demo, book, &[])
}

/// Small and large cover, stored at the book root under their URL names.
#[must_use]
pub fn cover_targets(book: &Book, book_dir: &Path) -> Vec<DownloadTarget> {
    let mut names = UniqueNames::default();
    [&book.cover.small, &book.cover.large]
        .into_iter()
        .filter(|url| !url.is_empty())
        .map(|url| DownloadTarget {
            path: book_dir.join(names.claim(safe_segment(url_base_name(url)))),
            url: url.clone(),
            expected_size: None,
        })
        .collect()
}

/// Photos, stored under `photos/` with their URL names.
#[must_use]
pub fn photo_targets(book: &Book, book_dir: &Path) -> Vec<DownloadTarget> {
    let dir = book_dir.join(PHOTOS_DIR);
    let mut names = UniqueNames::default();
    book.photos
        .iter()
        .filter(|address| !address.url.is_empty())
        .map(|address| DownloadTarget {
            path: dir.join(names.claim(safe_segment(url_base_name(&address.url)))),
            url: address.url.clone(),
            expected_size: address.expected_size(),
        })
        .collect()
}

fn format_targets(
    category_dir: &Path,
    formats: &Formats,
    book: &Book,
    excluded: &[&str],
) -> Vec<DownloadTarget> {
    let mut targets = Vec::new();
    for (format, addresses) in formats {
        if excluded.contains(&format.as_str()) {
            continue;
        }
        let format_dir = category_dir.join(safe_segment(format));
        let mut names = UniqueNames::default();
        for address in addresses.iter() {
            if address.url.is_empty() {
                debug!(book_id = book.id, format = %format, "address without url, skipping");
                continue;
            }
            let name = names.claim(file_name(address, book, format));
            targets.push(DownloadTarget {
                path: format_dir.join(name),
                url: address.url.clone(),
                expected_size: address.expected_size(),
            });
        }
    }
    targets
}

fn file_name(address: &Address, book: &Book, format: &str) -> String {
    let title = address.title_or(book.title.as_str());
    safe_segment(&format!("{title}.{format}"))
}

/// Names already handed out within one directory.
#[derive(Default)]
struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    /// Returns `name`, or `name (n)` with the smallest free `n >= 2`.
    fn claim(&mut self, name: String) -> String {
        if self.taken.insert(name.clone()) {
            return name;
        }
        let mut ordinal = 2;
        loop {
            let candidate = with_ordinal(&name, ordinal);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            ordinal += 1;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::book::{Addresses, Cover};

    fn book() -> Book {
        let mut book = Book {
            id: 7,
            title: "Deep Work".into(),
            ..Book::default()
        };
        book.files
            .ebook
            .insert("pdf".into(), vec![Address::new("https://h/b.pdf").with_size(10)].into());
        book.files.ebook.insert(
            "epub".into(),
            vec![Address::new("https://h/b.epub")].into(),
        );
        book
    }

    #[test]
    fn test_book_dir_name_pads_id_and_sanitizes_title() {
        let mut book = book();
        book.title = "Focus: Why?".into();
        assert_eq!(book_dir_name(&book), "00007 Focus Why");
        book.id = 123_456;
        assert_eq!(book_dir_name(&book), "123456 Focus Why");
    }

    #[test]
    fn test_book_dir_name_without_title() {
        let book = Book {
            id: 1,
            ..Book::default()
        };
        assert_eq!(book_dir_name(&book), "00001");
    }

    #[test]
    fn test_ebook_targets_ordered_by_format() {
        let root = Path::new("/lib/00007 Deep Work");
        let targets = ebook_targets(&book(), root);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].path, root.join("e-book/epub/Deep Work.epub"));
        assert_eq!(targets[1].path, root.join("e-book/pdf/Deep Work.pdf"));
        assert_eq!(targets[1].expected_size, Some(10));
        assert_eq!(targets[0].expected_size, None);
    }

    #[test]
    fn test_audiobook_items_use_their_own_titles() {
        let mut book = book();
        book.files.audiobook.insert(
            "mp3".into(),
            vec![
                Address::new("https://h/1.mp3").with_title("01 Intro"),
                Address::new("https://h/2.mp3").with_title("02 Rules?"),
                Address::new("https://h/3.mp3"),
            ]
            .into(),
        );
        let root = Path::new("/lib/b");
        let targets = audiobook_targets(&book, root);
        let names: Vec<_> = targets
            .iter()
            .map(|t| t.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["01 Intro.mp3", "02 Rules.mp3", "Deep Work.mp3"]);
        assert!(targets[0].path.starts_with(root.join("audiobook/mp3")));
    }

    #[test]
    fn test_audiobook_zip_excludes_mp3_and_ogg() {
        let mut book = book();
        let audio = &mut book.files.audiobook;
        audio.insert("zip".into(), vec![Address::new("https://h/a.zip")].into());
        audio.insert("mp3".into(), vec![Address::new("https://h/1.mp3")].into());
        audio.insert("ogg".into(), vec![Address::new("https://h/1.ogg")].into());
        audio.insert("m4b".into(), vec![Address::new("https://h/a.m4b")].into());
        let urls: Vec<_> = audiobook_targets(&book, Path::new("/b"))
            .into_iter()
            .map(|t| t.url)
            .collect();
        assert_eq!(urls, ["https://h/a.m4b", "https://h/a.zip"]);
    }

    #[test]
    fn test_audiobook_empty_zip_keeps_mp3() {
        let mut book = book();
        let audio = &mut book.files.audiobook;
        audio.insert("zip".into(), Addresses::default());
        audio.insert("mp3".into(), vec![Address::new("https://h/1.mp3")].into());
        let targets = audiobook_targets(&book, Path::new("/b"));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].url, "https://h/1.mp3");
    }

    #[test]
    fn test_colliding_titles_get_ordinals() {
        let mut book = book();
        book.files.audiobook.insert(
            "mp3".into(),
            vec![
                Address::new("https://h/1.mp3").with_title("Part"),
                Address::new("https://h/2.mp3").with_title("Part?"),
                Address::new("https://h/3.mp3").with_title("Part"),
            ]
            .into(),
        );
        let targets = audiobook_targets(&book, Path::new("/b"));
        let paths: HashSet<_> = targets.iter().map(|t| t.path.clone()).collect();
        assert_eq!(paths.len(), 3);
        assert_eq!(targets[1].path, Path::new("/b/audiobook/mp3/Part (2).mp3"));
        assert_eq!(targets[2].path, Path::new("/b/audiobook/mp3/Part (3).mp3"));
    }

    #[test]
    fn test_cover_targets_skip_empty_urls() {
        let mut book = book();
        book.cover = Cover {
            small: String::new(),
            large: "https://h/covers/large.jpg".into(),
        };
        let targets = cover_targets(&book, Path::new("/b"));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].path, Path::new("/b/large.jpg"));
    }

    #[test]
    fn test_cover_targets_same_base_name_do_not_collide() {
        let mut book = book();
        book.cover = Cover {
            small: "https://h/s/cover.jpg".into(),
            large: "https://h/l/cover.jpg".into(),
        };
        let targets = cover_targets(&book, Path::new("/b"));
        assert_eq!(targets[0].path, Path::new("/b/cover.jpg"));
        assert_eq!(targets[1].path, Path::new("/b/cover (2).jpg"));
    }

    #[test]
    fn test_photo_targets_strip_query_characters() {
        let mut book = book();
        book.photos = vec![Address::new("https://h/p/one.jpg?w=100").with_size(5)];
        let targets = photo_targets(&book, Path::new("/b"));
        assert_eq!(targets[0].path, Path::new("/b/photos/one.jpgw=100"));
        assert_eq!(targets[0].expected_size, Some(5));
    }

    #[test]
    fn test_demo_targets_empty_when_no_demo() {
        assert!(demo_targets(&book(), Path::new("/b")).is_empty());
    }
}
