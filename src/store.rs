// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! In-memory annotation state for one open directory.
//!
//! The [`AnnotationStore`] maps an image's filename (not its full path) to the
//! [`ImageAnnotation`] recorded for it. It is the unit of truth for what has
//! been labeled; the CSV and COCO files are derived from it on save. Every
//! accessor hands out copies or shared borrows, never a handle that could
//! mutate the store behind its back.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Margin kept between a freshly placed point and the far image edge.
pub const EDGE_EPSILON: f64 = 0.001;

/// A keypoint location in image (scene) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPoint {
    /// Horizontal position in pixels.
    pub x: f64,
    /// Vertical position in pixels.
    pub y: f64,
}

impl AnnotationPoint {
    /// Create a point without any clamping. Used for values read from disk.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Create a point clamped into `[0, width - ε] × [0, height - ε]`.
    #[must_use]
    pub fn clamped(x: f64, y: f64, width: u32, height: u32) -> Self {
        let max_x = (f64::from(width) - EDGE_EPSILON).max(0.0);
        let max_y = (f64::from(height) - EDGE_EPSILON).max(0.0);
        Self::new(x.clamp(0.0, max_x), y.clamp(0.0, max_y))
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance_to(self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

/// Axis-aligned rectangle in scene coordinates, normalized on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneRect {
    /// Left edge.
    pub x0: f64,
    /// Top edge.
    pub y0: f64,
    /// Right edge.
    pub x1: f64,
    /// Bottom edge.
    pub y1: f64,
}

impl SceneRect {
    /// Build a rectangle from any two opposite corners.
    #[must_use]
    pub fn from_corners(ax: f64, ay: f64, bx: f64, by: f64) -> Self {
        Self {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    /// Width of the rectangle.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the rectangle.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Whether `point` lies inside or on the border.
    #[must_use]
    pub fn contains(&self, point: AnnotationPoint) -> bool {
        (self.x0..=self.x1).contains(&point.x) && (self.y0..=self.y1).contains(&point.y)
    }
}

/// Labeled keypoints for a single image, keyed by body-part index.
///
/// A missing key means "not labeled yet"; it is never the same as `(0, 0)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAnnotation {
    points: BTreeMap<usize, AnnotationPoint>,
}

impl ImageAnnotation {
    /// Create an empty annotation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point for `idx`, if labeled.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<AnnotationPoint> {
        self.points.get(&idx).copied()
    }

    /// Whether `idx` is labeled.
    #[must_use]
    pub fn contains(&self, idx: usize) -> bool {
        self.points.contains_key(&idx)
    }

    /// Insert or overwrite the point for `idx`.
    pub fn insert(&mut self, idx: usize, point: AnnotationPoint) {
        self.points.insert(idx, point);
    }

    /// Remove the point for `idx`, returning it if it existed.
    pub fn remove(&mut self, idx: usize) -> Option<AnnotationPoint> {
        self.points.remove(&idx)
    }

    /// Number of labeled keypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether nothing is labeled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Labeled indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.points.keys().copied()
    }

    /// Labeled `(index, point)` pairs in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, AnnotationPoint)> + '_ {
        self.points.iter().map(|(&idx, &p)| (idx, p))
    }

    /// Whether every index in `0..n_keypoints` is labeled.
    #[must_use]
    pub fn is_complete(&self, n_keypoints: usize) -> bool {
        (0..n_keypoints).all(|idx| self.contains(idx))
    }

    /// Number of labeled indices inside `0..n_keypoints`.
    #[must_use]
    pub fn count_in_schema(&self, n_keypoints: usize) -> usize {
        self.points.range(..n_keypoints).count()
    }
}

impl FromIterator<(usize, AnnotationPoint)> for ImageAnnotation {
    fn from_iter<T: IntoIterator<Item = (usize, AnnotationPoint)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// All annotations for one open directory, keyed by image filename.
///
/// Images keep the order in which they first received an entry, which is the
/// row order of the saved table.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    order: Vec<String>,
    entries: HashMap<String, ImageAnnotation>,
    dirty: bool,
}

impl AnnotationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the annotation for `image`; empty if the image has no entry.
    #[must_use]
    pub fn get(&self, image: &str) -> ImageAnnotation {
        self.entries.get(image).cloned().unwrap_or_default()
    }

    /// Whether `image` has an entry (possibly with zero points).
    #[must_use]
    pub fn contains(&self, image: &str) -> bool {
        self.entries.contains_key(image)
    }

    /// Insert or overwrite one point and mark the store dirty.
    pub fn set_point(&mut self, image: &str, idx: usize, point: AnnotationPoint) {
        self.entry_mut(image).insert(idx, point);
        self.dirty = true;
    }

    /// Remove one point. No-op when the image or point is absent.
    pub fn remove_point(&mut self, image: &str, idx: usize) {
        if let Some(annotation) = self.entries.get_mut(image)
            && annotation.remove(idx).is_some()
        {
            self.dirty = true;
        }
    }

    /// Give `image` an entry if it has none, marking the store dirty.
    ///
    /// A touched image keeps its row even after all its points are deleted.
    pub fn touch(&mut self, image: &str) {
        if !self.contains(image) {
            self.entry_mut(image);
            self.dirty = true;
        }
    }

    /// Replace the whole annotation for `image`.
    ///
    /// An image that never had an entry only gains one once it has points; an
    /// image that already has one keeps it even when all points are gone.
    pub fn commit_current(&mut self, image: &str, points: &ImageAnnotation) {
        match self.entries.get_mut(image) {
            Some(existing) => {
                if existing != points {
                    *existing = points.clone();
                    self.dirty = true;
                }
            }
            None if !points.is_empty() => {
                *self.entry_mut(image) = points.clone();
                self.dirty = true;
            }
            None => {}
        }
    }

    /// Insert an entry read from disk without marking the store dirty.
    pub(crate) fn insert_loaded(&mut self, image: &str, points: ImageAnnotation) {
        *self.entry_mut(image) = points;
    }

    /// Drop every entry and reset the unsaved-changes flag.
    pub fn clear_all(&mut self) {
        self.order.clear();
        self.entries.clear();
        self.dirty = false;
    }

    /// Whether there are edits not yet written to disk.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record that the store has been written to disk.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Number of images with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Image filenames in row order.
    pub fn images(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    /// `(filename, annotation)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImageAnnotation)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|a| (name.as_str(), a)))
    }

    fn entry_mut(&mut self, image: &str) -> &mut ImageAnnotation {
        if !self.entries.contains_key(image) {
            self.order.push(image.to_string());
        }
        self.entries.entry(image.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> AnnotationPoint {
        AnnotationPoint::new(x, y)
    }

    #[test]
    fn test_get_absent_is_empty() {
        let store = AnnotationStore::new();
        assert!(store.get("missing.png").is_empty());
        assert!(!store.contains("missing.png"));
    }

    #[test]
    fn test_set_and_remove_point() {
        let mut store = AnnotationStore::new();
        store.set_point("a.png", 2, p(1.5, 2.5));
        assert!(store.is_dirty());
        assert_eq!(store.get("a.png").get(2), Some(p(1.5, 2.5)));

        store.mark_clean();
        store.remove_point("a.png", 7);
        assert!(!store.is_dirty(), "removing an absent point is a no-op");

        store.remove_point("a.png", 2);
        assert!(store.is_dirty());
        assert!(store.get("a.png").is_empty());
        assert!(store.contains("a.png"), "touched image keeps its row");
    }

    #[test]
    fn test_returned_annotation_is_a_copy() {
        let mut store = AnnotationStore::new();
        store.set_point("a.png", 0, p(1.0, 1.0));

        let mut copy = store.get("a.png");
        copy.insert(1, p(9.0, 9.0));
        copy.remove(0);

        let stored = store.get("a.png");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.get(0), Some(p(1.0, 1.0)));
    }

    #[test]
    fn test_commit_current_replaces_whole_annotation() {
        let mut store = AnnotationStore::new();
        store.set_point("a.png", 0, p(1.0, 1.0));
        store.set_point("a.png", 1, p(2.0, 2.0));

        let replacement: ImageAnnotation = [(3, p(4.0, 4.0))].into_iter().collect();
        store.commit_current("a.png", &replacement);
        assert_eq!(store.get("a.png"), replacement);
    }

    #[test]
    fn test_commit_empty_for_untouched_image_adds_no_row() {
        let mut store = AnnotationStore::new();
        store.commit_current("b.png", &ImageAnnotation::new());
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_touched_image_keeps_empty_entry() {
        let mut store = AnnotationStore::new();
        store.touch("a.png");
        assert!(store.contains("a.png"));
        assert!(store.is_dirty());

        store.commit_current("a.png", &ImageAnnotation::new());
        assert_eq!(store.images().collect::<Vec<_>>(), vec!["a.png"]);

        store.mark_clean();
        store.touch("a.png");
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_order_is_first_touch_order() {
        let mut store = AnnotationStore::new();
        store.set_point("z.png", 0, p(0.0, 1.0));
        store.set_point("a.png", 0, p(0.0, 1.0));
        store.set_point("z.png", 1, p(0.0, 1.0));
        let images: Vec<&str> = store.images().collect();
        assert_eq!(images, vec!["z.png", "a.png"]);
    }

    #[test]
    fn test_clear_all_resets_dirty() {
        let mut store = AnnotationStore::new();
        store.set_point("a.png", 0, p(1.0, 1.0));
        store.clear_all();
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_clamped_point_stays_inside_image() {
        let point = AnnotationPoint::clamped(120.0, -4.0, 100, 50);
        assert!((point.x - (100.0 - EDGE_EPSILON)).abs() < 1e-9);
        assert!(point.y.abs() < f64::EPSILON);
    }

    #[test]
    fn test_completeness_ignores_stale_indices() {
        let annotation: ImageAnnotation = [(0, p(1.0, 1.0)), (1, p(1.0, 1.0)), (9, p(1.0, 1.0))]
            .into_iter()
            .collect();
        assert!(annotation.is_complete(2));
        assert!(!annotation.is_complete(3));
        assert_eq!(annotation.count_in_schema(2), 2);
    }

    #[test]
    fn test_scene_rect_normalizes_corners() {
        let rect = SceneRect::from_corners(10.0, 20.0, 0.0, 5.0);
        assert!(rect.contains(p(5.0, 10.0)));
        assert!(!rect.contains(p(11.0, 10.0)));
        assert!((rect.width() - 10.0).abs() < f64::EPSILON);
        assert!((rect.height() - 15.0).abs() < f64::EPSILON);
    }
}
