// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image ordering and next/previous resolution within a directory.
//!
//! Listings are natural-sorted: runs of digits compare by numeric value and
//! everything else compares case-insensitively, so `img2.png` sorts before
//! `img10.png`. Every lookup rescans the directory, so files added or removed
//! externally are picked up without any refresh step.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::error::{AnnotatorError, Result};
use crate::settings::IMAGE_EXTENSIONS;

#[derive(Debug)]
enum Chunk<'a> {
    Number(&'a str),
    Text(String),
}

impl Ord for Chunk<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => {
                let (a, b) = (a.trim_start_matches('0'), b.trim_start_matches('0'));
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialEq for Chunk<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Chunk<'_> {}

impl PartialOrd for Chunk<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn chunks(text: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (i, c) in text.char_indices() {
        let digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                out.push(make_chunk(&text[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }
    if let Some(digit) = in_digits {
        out.push(make_chunk(&text[start..], digit));
    }
    out
}

fn make_chunk(s: &str, digit: bool) -> Chunk<'_> {
    if digit {
        Chunk::Number(s)
    } else {
        Chunk::Text(s.to_lowercase())
    }
}

/// Compare two filenames in natural order.
///
/// Ties under the natural key (e.g. `A.png` vs `a.png`, `01` vs `1`) fall back
/// to a plain byte comparison so the ordering is total.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    chunks(a).cmp(&chunks(b)).then_with(|| a.cmp(b))
}

/// Sort filenames in natural order.
pub fn natural_sort<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

/// Check if a path has one of the given extensions (case-insensitive).
#[must_use]
pub fn has_image_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        extensions.iter().any(|e| e.as_ref() == ext)
    })
}

/// Check if a path is an image file based on the default extensions.
#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    has_image_extension(path, &IMAGE_EXTENSIONS)
}

/// Natural-sorted filenames of the images directly inside `dir`.
///
/// # Errors
///
/// Returns an error if `dir` is not a readable directory.
pub fn list_images<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(AnnotatorError::file(dir, "not a directory"));
    }

    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map_err(|e| AnnotatorError::file(dir, e))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_image_extension(path, extensions))
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();

    natural_sort(&mut names);
    Ok(names)
}

/// Direction of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the end of the listing.
    Next,
    /// Towards the start of the listing.
    Previous,
}

/// Resolves neighbours of an image inside one directory.
#[derive(Debug, Clone)]
pub struct Navigator {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl Navigator {
    /// Create a navigator over `dir` recognizing `extensions`.
    pub fn new<S: AsRef<str>>(dir: impl Into<PathBuf>, extensions: &[S]) -> Self {
        Self {
            dir: dir.into(),
            extensions: extensions
                .iter()
                .map(|e| e.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Directory being navigated.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fresh natural-sorted listing of the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn images(&self) -> Result<Vec<String>> {
        list_images(&self.dir, &self.extensions)
    }

    /// First image in the directory, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn first(&self) -> Result<Option<PathBuf>> {
        Ok(self.images()?.first().map(|name| self.dir.join(name)))
    }

    /// Image after `current`, or `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn next(&self, current: &str) -> Result<Option<PathBuf>> {
        self.step(current, Direction::Next)
    }

    /// Image before `current`, or `None` at the start.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn previous(&self, current: &str) -> Result<Option<PathBuf>> {
        self.step(current, Direction::Previous)
    }

    /// Resolve one step from `current`.
    ///
    /// When `current` is no longer in the listing the first (next) or last
    /// (previous) image is returned instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn step(&self, current: &str, direction: Direction) -> Result<Option<PathBuf>> {
        let images = self.images()?;
        Ok(resolve_step(&images, current, direction).map(|name| self.dir.join(name)))
    }

    /// 1-based position of `current` and the listing length.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn position(&self, current: &str) -> Result<Option<(usize, usize)>> {
        let images = self.images()?;
        Ok(images
            .iter()
            .position(|name| name == current)
            .map(|i| (i + 1, images.len())))
    }
}

/// Pick the neighbour of `current` in an already sorted listing.
#[must_use]
pub fn resolve_step<'a>(
    images: &'a [String],
    current: &str,
    direction: Direction,
) -> Option<&'a str> {
    let Some(idx) = images.iter().position(|name| name == current) else {
        return match direction {
            Direction::Next => images.first(),
            Direction::Previous => images.last(),
        }
        .map(String::as_str);
    };

    let target = match direction {
        Direction::Next => idx.checked_add(1)?,
        Direction::Previous => idx.checked_sub(1)?,
    };
    images.get(target).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_natural_sort_numeric_runs() {
        let mut files = names(&["img2.png", "img10.png", "img1.png"]);
        natural_sort(&mut files);
        assert_eq!(files, names(&["img1.png", "img2.png", "img10.png"]));
    }

    #[test]
    fn test_natural_sort_case_and_leading_zeros() {
        let mut files = names(&["B2.png", "a10.png", "a002.png", "a3.png"]);
        natural_sort(&mut files);
        assert_eq!(files, names(&["a002.png", "a3.png", "a10.png", "B2.png"]));
        assert_eq!(natural_cmp("frame_99999999999999999999.png", "frame_3.png"), Ordering::Greater);
    }

    #[test]
    fn test_chunk_equality_follows_ordering() {
        assert_eq!(Chunk::Number("007"), Chunk::Number("7"));
        assert_eq!(Chunk::Text("img".to_string()), make_chunk("IMG", false));
        assert_ne!(Chunk::Number("1"), Chunk::Text("1".to_string()));
        assert_eq!(chunks("img007"), chunks("IMG7"));
        assert_eq!(natural_cmp("img007.png", "img7.png"), "img007.png".cmp("img7.png"));
    }

    #[test]
    fn test_boundaries_do_not_wrap() {
        let list = names(&["1.png", "2.png", "3.png"]);
        assert_eq!(resolve_step(&list, "1.png", Direction::Previous), None);
        assert_eq!(resolve_step(&list, "3.png", Direction::Next), None);
        assert_eq!(resolve_step(&list, "2.png", Direction::Next), Some("3.png"));
        assert_eq!(resolve_step(&list, "2.png", Direction::Previous), Some("1.png"));
    }

    #[test]
    fn test_missing_current_falls_back() {
        let list = names(&["1.png", "2.png", "3.png"]);
        assert_eq!(resolve_step(&list, "gone.png", Direction::Next), Some("1.png"));
        assert_eq!(resolve_step(&list, "gone.png", Direction::Previous), Some("3.png"));
        assert_eq!(resolve_step(&[], "gone.png", Direction::Next), None);
    }

    #[test]
    fn test_extension_filter() {
        assert!(is_image_file(Path::new("a/b/c.JPG")));
        assert!(is_image_file(Path::new("x.gif")));
        assert!(!is_image_file(Path::new("x.webp")));
        assert!(!is_image_file(Path::new("Keypoints.csv")));
        assert!(!is_image_file(Path::new("noext")));
    }

    #[test]
    fn test_navigator_rescans_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["img10.png", "img2.png", "notes.txt", "img1.PNG"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let nav = Navigator::new(dir.path(), &IMAGE_EXTENSIONS);
        assert_eq!(nav.images().unwrap(), names(&["img1.PNG", "img2.png", "img10.png"]));
        assert_eq!(nav.position("img2.png").unwrap(), Some((2, 3)));

        std::fs::remove_file(dir.path().join("img2.png")).unwrap();
        assert_eq!(
            nav.next("img2.png").unwrap(),
            Some(dir.path().join("img1.PNG"))
        );
        assert_eq!(nav.next("img1.PNG").unwrap(), Some(dir.path().join("img10.png")));
    }
}
