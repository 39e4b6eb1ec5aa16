// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Session configuration and common constants.
//!
//! This module defines the [`AnnotatorConfig`] struct, which controls display
//! and persistence parameters of an annotation session: point radius, image
//! cache size, the placeholder size used when an image cannot be measured, the
//! recognized image extensions, and the COCO category written to
//! `annotations.json`.

/// Filename of the per-directory annotation table.
pub const KEYPOINTS_CSV: &str = "Keypoints.csv";

/// Filename of the derived COCO keypoint dataset.
pub const ANNOTATIONS_JSON: &str = "annotations.json";

/// Shared library of named keypoint schemas.
pub const KEYPOINTS_CONFIG: &str = "keypoints_cfg.yaml";

/// Project configuration holding the active schema.
pub const TRAIN_CONFIG: &str = "train_cfg.yaml";

/// Extensions recognized as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];

/// Size substituted for images whose dimensions cannot be read.
pub const DEFAULT_IMAGE_SIZE: (u32, u32) = (1024, 768);

/// Number of decoded images kept in memory.
pub const IMAGE_CACHE_CAPACITY: usize = 20;

/// Rectangle selections smaller than this (in either dimension) are ignored.
pub const MIN_SELECTION_SIZE: f64 = 5.0;

/// Configuration for an annotation session.
///
/// Uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use poseek_annotate::AnnotatorConfig;
///
/// let config = AnnotatorConfig::new()
///     .with_point_radius(3.0)
///     .with_cache_capacity(10)
///     .with_category("person", "human");
/// ```
#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    /// Radius of drawn keypoints in image pixels. Hit-testing uses 1.5× this.
    pub point_radius: f64,
    /// Maximum number of decoded images held in the cache.
    pub cache_capacity: usize,
    /// `(width, height)` written for images that cannot be measured.
    pub placeholder_size: (u32, u32),
    /// Recognized image extensions, lowercase, without the dot.
    pub image_extensions: Vec<String>,
    /// COCO category name.
    pub category_name: String,
    /// COCO supercategory.
    pub supercategory: String,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            point_radius: 0.2,
            cache_capacity: IMAGE_CACHE_CAPACITY,
            placeholder_size: DEFAULT_IMAGE_SIZE,
            image_extensions: IMAGE_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            category_name: "mouse".to_string(),
            supercategory: "animal".to_string(),
        }
    }
}

impl AnnotatorConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the keypoint radius. Values are kept within `0.1..=30.0`.
    #[must_use]
    pub fn with_point_radius(mut self, radius: f64) -> Self {
        self.point_radius = radius.clamp(0.1, 30.0);
        self
    }

    /// Set the image cache capacity (at least one entry).
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(1);
        self
    }

    /// Set the placeholder `(width, height)` for unreadable images.
    #[must_use]
    pub const fn with_placeholder_size(mut self, width: u32, height: u32) -> Self {
        self.placeholder_size = (width, height);
        self
    }

    /// Replace the recognized image extensions.
    #[must_use]
    pub fn with_image_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.image_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Set the COCO category name and supercategory.
    #[must_use]
    pub fn with_category(mut self, name: &str, supercategory: &str) -> Self {
        self.category_name = name.to_string();
        self.supercategory = supercategory.to_string();
        self
    }

    /// Radius used to hit-test clicks against placed points.
    #[must_use]
    pub fn hit_radius(&self) -> f64 {
        self.point_radius * 1.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnnotatorConfig::default();
        assert_eq!(config.cache_capacity, 20);
        assert_eq!(config.placeholder_size, (1024, 768));
        assert_eq!(config.image_extensions.len(), 5);
        assert_eq!(config.category_name, "mouse");
    }

    #[test]
    fn test_builder_normalizes_values() {
        let config = AnnotatorConfig::new()
            .with_point_radius(100.0)
            .with_cache_capacity(0)
            .with_image_extensions([".PNG", "tif"]);
        assert!((config.point_radius - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.cache_capacity, 1);
        assert_eq!(config.image_extensions, vec!["png", "tif"]);
    }
}
