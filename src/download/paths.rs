use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::types::VersionSize;

/// Separator between a filename's stem and a size tag.
const SIZE_SEPARATOR: &str = "__";

/// Clean a name by removing characters that are invalid on common
/// filesystems: `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`.
///
/// A result that is empty or made only of dots (`.`, `..`) becomes
/// underscores, so it never names the directory itself or its parent.
pub fn clean_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        if cleaned.is_empty() {
            return "_".to_string();
        }
        return cleaned.replace('.', "_");
    }
    cleaned
}

/// Append `-<n>` before the file extension.
///
/// For example, `"IMG_1.JPG"` with `2048` becomes `"IMG_1-2048.JPG"`.
/// If the filename has no extension, the suffix is simply appended.
pub fn add_dedup_suffix(filename: &str, n: u64) -> String {
    let mut result = String::with_capacity(filename.len() + 21);
    match filename.rfind('.') {
        Some(dot_pos) => {
            let (stem, ext) = filename.split_at(dot_pos);
            let _ = write!(result, "{stem}-{n}{ext}");
        }
        None => {
            let _ = write!(result, "{filename}-{n}");
        }
    }
    result
}

/// Insert `__<tag>` before the file extension.
///
/// For example, `"IMG_1.JPG"` with tag `"medium"` becomes `"IMG_1__medium.JPG"`.
/// If the filename has no extension, the tag is simply appended.
fn insert_size_tag(filename: &str, tag: &str) -> String {
    let mut result =
        String::with_capacity(filename.len() + SIZE_SEPARATOR.len() + tag.len());
    match filename.rfind('.') {
        Some(dot_pos) => {
            let (stem, ext) = filename.split_at(dot_pos);
            let _ = write!(result, "{stem}{SIZE_SEPARATOR}{tag}{ext}");
        }
        None => {
            let _ = write!(result, "{filename}{SIZE_SEPARATOR}{tag}");
        }
    }
    result
}

/// Local filename for one size of a photo: the remote filename itself for
/// `original`, `<base>__<size>.<ext>` for the others.
pub fn size_filename(filename: &str, size: VersionSize) -> String {
    let clean = clean_filename(filename);
    match size {
        VersionSize::Original => clean,
        other => insert_size_tag(&clean, other.as_str()),
    }
}

/// Name the previous local original is kept under once superseded:
/// `<base>__original.<ext>`.
pub fn marker_filename(filename: &str) -> String {
    insert_size_tag(&clean_filename(filename), VersionSize::Original.as_str())
}

/// `path` itself when nothing is there yet, otherwise the first free
/// `<stem>-<n>.<ext>` sibling. Keeps earlier superseded copies intact.
pub fn vacant_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut n = 1;
    loop {
        let candidate = path.with_file_name(add_dedup_suffix(&name, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Temporary path a download is streamed into before being renamed over
/// `target`. Lives in the same directory so the rename stays atomic.
pub fn part_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}
