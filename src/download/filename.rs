//! Filesystem-safe names for book directories and downloaded files.
//!
//! Titles come straight from the library service and are used as directory
//! and file names. [`sanitize_name`] removes every character that any of the
//! common target filesystems rejects, and [`cut_segment`] keeps a segment
//! within the 255-byte limit without losing its extension. Every derived path
//! component goes through [`safe_segment`], which applies both.

use super::constants::MAX_SEGMENT_BYTES;
use crate::text::normalize;

/// Characters deleted from names.
///
/// The union of the restrictions of FAT12/16/32, exFAT/NTFS/VFAT, Windows,
/// HFS/HFS+, OneDrive and SharePoint Server.
const FORBIDDEN_CHARS: &[char] = &[
    '!', '"', '%', '*', '/', ':', '<', '>', '?', '@', '\\', '|', '~', '{', '}',
];

/// Placeholder for a segment that sanitizes to nothing.
const EMPTY_SEGMENT: &str = "_";

/// Sanitizes a remote-supplied name into a filesystem-legal segment.
///
/// Forbidden characters are deleted rather than substituted, `" ."` is
/// collapsed to `"."` and one trailing `.` is stripped. The text is
/// re-normalized after every deletion and the whole pass repeats until the
/// name stops changing, so the result is a fixed point:
/// `sanitize_name(&sanitize_name(x)) == sanitize_name(x)`.
///
/// # Example
///
/// ```
/// use miflib_core::download::sanitize_name;
///
/// assert_eq!(sanitize_name("Book: Name?"), "Book Name");
/// ```
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mut current = name.to_string();
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_once(name: &str) -> String {
    let mut cleaned = normalize(name);
    cleaned.retain(|c| !FORBIDDEN_CHARS.contains(&c));
    let mut cleaned = cleaned.replace(" .", ".");
    if cleaned.ends_with('.') {
        cleaned.pop();
    }
    normalize(&cleaned)
}

/// Shortens a segment to at most [`MAX_SEGMENT_BYTES`] bytes.
///
/// Characters are removed one at a time from just before the extension, so
/// `"<long name>.mp3"` keeps its `.mp3`. A segment with nothing left in front
/// of its extension is shortened from the end. Segments already within the
/// limit are returned unchanged.
#[must_use]
pub fn cut_segment(segment: &str) -> String {
    let mut out = segment.to_string();
    while out.len() > MAX_SEGMENT_BYTES {
        match out.rfind('.') {
            Some(ext_start) if ext_start > 0 => {
                if let Some((index, _)) = out[..ext_start].char_indices().next_back() {
                    out.remove(index);
                }
            }
            _ => {
                out.pop();
            }
        }
    }
    out
}

/// Sanitizes and length-guards one path component.
///
/// Shortening can expose a `" ."` in front of the extension, so both steps
/// repeat until the segment is stable.
#[must_use]
pub fn safe_segment(name: &str) -> String {
    let mut segment = cut_segment(&sanitize_name(name));
    loop {
        let next = cut_segment(&sanitize_name(&segment));
        if next == segment {
            break;
        }
        segment = next;
    }
    if segment.is_empty() {
        EMPTY_SEGMENT.to_string()
    } else {
        segment
    }
}

/// Inserts ` (n)` in front of the extension of an already safe segment.
///
/// The stem is shortened when needed so the suffix survives the length limit.
#[must_use]
pub fn with_ordinal(segment: &str, ordinal: usize) -> String {
    let (stem, ext) = match segment.rfind('.') {
        Some(ext_start) if ext_start > 0 => segment.split_at(ext_start),
        _ => (segment, ""),
    };
    let suffix = format!(" ({ordinal})");
    let mut stem = stem.to_string();
    while !stem.is_empty() && stem.len() + suffix.len() + ext.len() > MAX_SEGMENT_BYTES {
        stem.pop();
    }
    stem.truncate(stem.trim_end().len());
    format!("{stem}{suffix}{ext}")
}

/// The last element of a URL string, like a path base name.
///
/// Query strings are kept; [`safe_segment`] strips the characters that
/// cannot appear in a file name.
#[must_use]
pub fn url_base_name(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn static_name(size: usize) -> String {
        format!("{}.txt", "w".repeat(size - 4))
    }

    #[test]
    fn test_sanitize_name_deletes_each_forbidden_char() {
        for c in FORBIDDEN_CHARS {
            assert_eq!(sanitize_name(&c.to_string()), "", "char {c:?}");
        }
    }

    #[test]
    fn test_sanitize_name_strips_control_chars() {
        assert_eq!(sanitize_name("\n"), "");
        assert_eq!(sanitize_name("\r"), "");
        assert_eq!(sanitize_name("\t"), "");
    }

    #[test]
    fn test_sanitize_name_folds_number_sign() {
        assert_eq!(sanitize_name("№"), "No");
    }

    #[test]
    fn test_sanitize_name_colon_and_question_mark() {
        assert_eq!(sanitize_name("Book: Name?"), "Book Name");
    }

    #[test]
    fn test_sanitize_name_collapses_space_before_dot() {
        assert_eq!(sanitize_name("Chapter 1 .mp3"), "Chapter 1.mp3");
        assert_eq!(sanitize_name("What? .pdf"), "What.pdf");
    }

    #[test]
    fn test_sanitize_name_strips_trailing_dots_to_fixed_point() {
        assert_eq!(sanitize_name("Ends with dots..."), "Ends with dots");
        assert_eq!(sanitize_name("Dot ? ."), "Dot");
    }

    #[test]
    fn test_sanitize_name_removal_exposes_double_space() {
        assert_eq!(sanitize_name("Left | Right"), "Left Right");
        assert_eq!(sanitize_name("a * * b"), "a b");
    }

    #[test]
    fn test_sanitize_name_keeps_ordinary_titles() {
        let title = "00042 Думай медленно, решай быстро (2-е издание)";
        assert_eq!(sanitize_name(title), title);
    }

    #[test]
    fn test_sanitize_name_is_idempotent() {
        let inputs = [
            "",
            "Book: Name?",
            "  @~{x}~@  ",
            "a\u{00a0}.\u{00a0}.",
            "Cafe\u{0301} : .",
            "№ 1 ! ?.",
            "\u{200B}<>\u{FEFF}",
            "..",
            "x . . .",
        ];
        for input in inputs {
            let once = sanitize_name(input);
            assert_eq!(sanitize_name(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_cut_segment_shortens_to_limit_keeping_extension() {
        for size in MAX_SEGMENT_BYTES..1024 {
            let got = cut_segment(&static_name(size));
            assert_eq!(got, static_name(MAX_SEGMENT_BYTES), "size {size}");
        }
    }

    #[test]
    fn test_cut_segment_leaves_short_names_unchanged() {
        for size in 5..=MAX_SEGMENT_BYTES {
            let name = static_name(size);
            assert_eq!(cut_segment(&name), name);
        }
    }

    #[test]
    fn test_cut_segment_respects_multibyte_chars() {
        let name = format!("{}.mp3", "ж".repeat(200));
        let got = cut_segment(&name);
        assert!(got.len() <= MAX_SEGMENT_BYTES);
        assert!(got.ends_with(".mp3"));
        assert_eq!(got, format!("{}.mp3", "ж".repeat(125)));
    }

    #[test]
    fn test_cut_segment_without_stem_truncates_from_end() {
        let name = format!(".{}", "e".repeat(300));
        let got = cut_segment(&name);
        assert_eq!(got.len(), MAX_SEGMENT_BYTES);
        assert!(got.starts_with('.'));
    }

    #[test]
    fn test_safe_segment_is_bounded_and_stable() {
        let long = format!("Книга: {}?.pdf", "очень длинное название ".repeat(40));
        let once = safe_segment(&long);
        assert!(once.len() <= MAX_SEGMENT_BYTES);
        assert!(once.ends_with(".pdf"));
        assert_eq!(safe_segment(&once), once);
    }

    #[test]
    fn test_safe_segment_empty_result_uses_placeholder() {
        assert_eq!(safe_segment("???"), "_");
    }

    #[test]
    fn test_with_ordinal_inserts_before_extension() {
        assert_eq!(with_ordinal("Book.mp3", 2), "Book (2).mp3");
        assert_eq!(with_ordinal("Book", 3), "Book (3)");
    }

    #[test]
    fn test_with_ordinal_keeps_suffix_within_limit() {
        let segment = cut_segment(&static_name(400));
        let got = with_ordinal(&segment, 12);
        assert!(got.len() <= MAX_SEGMENT_BYTES);
        assert!(got.ends_with(" (12).txt"), "got: {got}");
    }

    #[test]
    fn test_with_ordinal_does_not_leave_double_space() {
        let segment = format!("{} bbb.txt", "a".repeat(246));
        assert!(segment.len() <= MAX_SEGMENT_BYTES);
        let got = with_ordinal(&segment, 2);
        assert_eq!(got, format!("{} (2).txt", "a".repeat(246)));
        assert_eq!(sanitize_name(&got), got);
    }

    #[test]
    fn test_url_base_name() {
        assert_eq!(url_base_name("https://h/covers/large.jpg"), "large.jpg");
        assert_eq!(url_base_name("https://h/covers/large.jpg?v=2"), "large.jpg?v=2");
        assert_eq!(url_base_name("https://h/dir/"), "dir");
        assert_eq!(url_base_name("plain"), "plain");
    }
}
