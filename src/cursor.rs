// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-image labeling state machine.
//!
//! The [`AnnotationCursor`] owns the points of the image currently on screen,
//! the set of selected keypoints, and the "complete, awaiting advance" flag.
//! Every mutation that actually changes state queues a [`ChangeEvent`]; the
//! caller drains the queue and routes each event to whatever views depend on
//! it. Views never talk to each other directly.

use std::collections::BTreeSet;

use crate::store::{AnnotationPoint, ImageAnnotation, SceneRect};

/// A state change published by the cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// The current image's points changed; carries the new mapping.
    PointsChanged(ImageAnnotation),
    /// The selection changed; carries the new set.
    SelectionChanged(BTreeSet<usize>),
}

/// Result of a place-point action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// A point was recorded for `index`; `next` is the new target, or `None`
    /// when the image just became fully labeled.
    Placed {
        /// Keypoint that received the point.
        index: usize,
        /// Next placement target.
        next: Option<usize>,
    },
    /// The image was already complete: the caller should move to the next
    /// image. No point was placed.
    Advance,
    /// Nothing left to place (or the schema is empty).
    Rejected,
}

/// Labeling state for the image currently displayed.
#[derive(Debug, Clone, Default)]
pub struct AnnotationCursor {
    n_keypoints: usize,
    points: ImageAnnotation,
    selection: BTreeSet<usize>,
    complete: bool,
    bounds: Option<(u32, u32)>,
    events: Vec<ChangeEvent>,
}

impl AnnotationCursor {
    /// Create a cursor for a schema with `n_keypoints` body parts.
    #[must_use]
    pub fn new(n_keypoints: usize) -> Self {
        Self {
            n_keypoints,
            ..Self::default()
        }
    }

    /// Number of body parts in the active schema.
    #[must_use]
    pub fn n_keypoints(&self) -> usize {
        self.n_keypoints
    }

    /// Update the schema size; the selection is pruned and the complete flag reset.
    pub fn set_n_keypoints(&mut self, n_keypoints: usize) {
        self.n_keypoints = n_keypoints;
        self.complete = false;
        let pruned: BTreeSet<usize> = self
            .selection
            .iter()
            .copied()
            .filter(|&idx| idx < n_keypoints)
            .collect();
        self.set_selection(pruned);
    }

    /// Start labeling a new image with previously stored `points`.
    ///
    /// `bounds` is the image's `(width, height)`; when known, placed points are
    /// clamped into it. Selection and the complete flag are reset.
    pub fn load(&mut self, points: ImageAnnotation, bounds: Option<(u32, u32)>) {
        self.bounds = bounds;
        self.complete = false;
        self.set_points(points);
        self.set_selection(BTreeSet::new());
    }

    /// Forget the current image entirely.
    pub fn reset(&mut self) {
        self.load(ImageAnnotation::new(), None);
    }

    /// Copy of the current image's points.
    #[must_use]
    pub fn points(&self) -> ImageAnnotation {
        self.points.clone()
    }

    /// Copy of the current selection.
    #[must_use]
    pub fn selection(&self) -> BTreeSet<usize> {
        self.selection.clone()
    }

    /// Whether the image is fully labeled and the next placement advances.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Take all queued change events, oldest first.
    pub fn drain_events(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Keypoint the next place-point action will label.
    ///
    /// Scans forward from the lowest selected index (or from `0` without a
    /// selection) for the first unlabeled keypoint, wrapping to `0` once.
    /// Returns `None` when every keypoint is labeled.
    #[must_use]
    pub fn get_next_target(&self) -> Option<usize> {
        let start = self.selection.first().copied().unwrap_or(0);
        (start..self.n_keypoints)
            .chain(0..self.n_keypoints)
            .find(|&idx| !self.points.contains(idx))
    }

    /// Place a point at scene position `(x, y)`.
    ///
    /// When the complete flag is set this only clears it and reports
    /// [`PlaceOutcome::Advance`].
    pub fn place_point(&mut self, x: f64, y: f64) -> PlaceOutcome {
        if self.complete {
            self.complete = false;
            return PlaceOutcome::Advance;
        }

        let Some(index) = self.get_next_target() else {
            return PlaceOutcome::Rejected;
        };

        let point = match self.bounds {
            Some((width, height)) => AnnotationPoint::clamped(x, y, width, height),
            None => AnnotationPoint::new(x, y),
        };
        self.points.insert(index, point);
        self.events
            .push(ChangeEvent::PointsChanged(self.points.clone()));

        let next = self.get_next_target();
        match next {
            None => {
                self.complete = true;
                self.set_selection(BTreeSet::new());
            }
            Some(next_idx) => self.set_selection(BTreeSet::from([next_idx])),
        }

        PlaceOutcome::Placed { index, next }
    }

    /// Replace the selection with a single keypoint. Ignored for invalid indices.
    pub fn select(&mut self, idx: usize) -> bool {
        if idx >= self.n_keypoints {
            return false;
        }
        self.set_selection(BTreeSet::from([idx]));
        true
    }

    /// Add `idx` to the selection, or remove it if already selected.
    pub fn toggle(&mut self, idx: usize) -> bool {
        if idx >= self.n_keypoints {
            return false;
        }
        let mut selection = self.selection.clone();
        if !selection.remove(&idx) {
            selection.insert(idx);
        }
        self.set_selection(selection);
        true
    }

    /// Replace the selection with every labeled keypoint inside `rect`.
    ///
    /// Unlabeled keypoints have no coordinates and can never be rectangle-selected.
    pub fn select_rect(&mut self, rect: SceneRect) {
        let selection = self
            .points
            .iter()
            .filter(|&(idx, point)| idx < self.n_keypoints && rect.contains(point))
            .map(|(idx, _)| idx)
            .collect();
        self.set_selection(selection);
    }

    /// Empty the selection.
    pub fn clear_selection(&mut self) {
        self.set_selection(BTreeSet::new());
    }

    /// Labeled keypoint within `radius` of `(x, y)`, nearest first.
    #[must_use]
    pub fn find_point_at(&self, x: f64, y: f64, radius: f64) -> Option<usize> {
        self.points
            .iter()
            .filter(|&(idx, _)| idx < self.n_keypoints)
            .map(|(idx, point)| (idx, point.distance_to(x, y)))
            .filter(|&(_, dist)| dist <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(idx, _)| idx)
    }

    /// Delete every selected point. Returns how many points were removed.
    ///
    /// Always clears the complete flag and the selection.
    pub fn delete_selected(&mut self) -> usize {
        let removed = self
            .selection
            .iter()
            .filter(|&&idx| self.points.contains(idx))
            .copied()
            .collect::<Vec<_>>();
        for &idx in &removed {
            self.points.remove(idx);
        }
        if !removed.is_empty() {
            self.events
                .push(ChangeEvent::PointsChanged(self.points.clone()));
        }
        self.complete = false;
        self.set_selection(BTreeSet::new());
        removed.len()
    }

    fn set_points(&mut self, points: ImageAnnotation) {
        if points != self.points {
            self.points = points;
            self.events
                .push(ChangeEvent::PointsChanged(self.points.clone()));
        }
    }

    fn set_selection(&mut self, selection: BTreeSet<usize>) {
        if selection != self.selection {
            self.selection = selection;
            self.events
                .push(ChangeEvent::SelectionChanged(self.selection.clone()));
        }
    }
}
