// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Bounded cache of decoded images keyed by path.
//!
//! Entries are evicted oldest-inserted first: lookups use [`LruCache::peek`],
//! so a hit never refreshes an entry's position. A miss always falls back to
//! decoding from disk.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use lru::LruCache;

use crate::error::{AnnotatorError, Result};
use crate::settings::IMAGE_CACHE_CAPACITY;
use crate::verbose;

/// Insertion-ordered image cache.
pub struct ImageCache {
    entries: LruCache<PathBuf, Arc<DynamicImage>>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.entries.cap())
            .finish()
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(IMAGE_CACHE_CAPACITY)
    }
}

impl ImageCache {
    /// Create a cache holding at most `capacity` images (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Cached image for `path`, if present.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Arc<DynamicImage>> {
        self.entries.peek(path).cloned()
    }

    /// Insert an image, evicting the oldest entry when full.
    pub fn insert(&mut self, path: impl Into<PathBuf>, image: DynamicImage) -> Arc<DynamicImage> {
        let path = path.into();
        let image = Arc::new(image);
        if let Some((evicted, _)) = self.entries.push(path.clone(), Arc::clone(&image))
            && evicted != path
        {
            verbose!("Evicted {} from image cache", evicted.display());
        }
        image
    }

    /// Cached image for `path`, decoding and inserting it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotatorError::FileError`] if the image cannot be decoded.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<DynamicImage>> {
        if let Some(image) = self.get(path) {
            return Ok(image);
        }
        let image = image::open(path).map_err(|e| AnnotatorError::file(path, e))?;
        Ok(self.insert(path, image))
    }

    /// Drop the entry for `path`.
    pub fn invalidate(&mut self, path: &Path) {
        self.entries.pop(path);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read `(width, height)` from the image header without decoding pixels.
#[must_use]
pub fn probe_dimensions(path: &Path) -> Option<(u32, u32)> {
    image::image_dimensions(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn blank(w: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(w, 1))
    }

    #[test]
    fn test_evicts_oldest_inserted() {
        let mut cache = ImageCache::new(2);
        cache.insert("a.png", blank(1));
        cache.insert("b.png", blank(2));
        // a hit must not refresh "a"
        assert!(cache.get(Path::new("a.png")).is_some());
        cache.insert("c.png", blank(3));

        assert!(cache.get(Path::new("a.png")).is_none());
        assert_eq!(cache.get(Path::new("b.png")).unwrap().width(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_miss_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::new(7, 5).save(&path).unwrap();

        let mut cache = ImageCache::default();
        let image = cache.get_or_load(&path).unwrap();
        assert_eq!((image.width(), image.height()), (7, 5));
        assert_eq!(cache.len(), 1);
        assert_eq!(probe_dimensions(&path), Some((7, 5)));

        let missing = dir.path().join("missing.png");
        assert!(cache.get_or_load(&missing).is_err());
        assert_eq!(probe_dimensions(&missing), None);
    }
}
