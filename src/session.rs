// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Annotation session orchestration.
//!
//! [`AnnotationSession`] is the single owner of the mutable state for one open
//! directory: the [`AnnotationStore`], the [`AnnotationCursor`] of the image on
//! screen, the [`Navigator`] and the image cache. User input arrives as
//! semantic [`Action`]s; state changes leave as [`ChangeEvent`]s drained by the
//! caller and routed to whatever views depend on them.
//!
//! Edits stay in memory until [`AnnotationSession::save`]. Moving to another
//! image commits the outgoing image's points to the store but never writes to
//! disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::cache::{ImageCache, probe_dimensions};
use crate::codec::{
    CocoCategoryInfo, CocoDataset, LoadStats, SaveReport, find_table, read_table, save_annotations,
    write_dataset,
};
use crate::cursor::{AnnotationCursor, ChangeEvent, PlaceOutcome};
use crate::error::{AnnotatorError, Result};
use crate::navigation::{Direction, Navigator};
use crate::schema::KeypointSchema;
use crate::settings::{ANNOTATIONS_JSON, AnnotatorConfig, MIN_SELECTION_SIZE};
use crate::store::{AnnotationStore, ImageAnnotation, SceneRect};
use crate::{verbose, warn};

/// A semantic user action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Place the next keypoint at a scene position (or advance when complete).
    PlacePoint {
        /// Scene x coordinate.
        x: f64,
        /// Scene y coordinate.
        y: f64,
    },
    /// Select whichever labeled point lies under the pointer.
    ClickAt {
        /// Scene x coordinate.
        x: f64,
        /// Scene y coordinate.
        y: f64,
    },
    /// Replace the selection with one keypoint.
    SelectPoint(usize),
    /// Add or remove one keypoint from the selection.
    TogglePoint(usize),
    /// Select every labeled point inside a dragged rectangle.
    SelectRect(SceneRect),
    /// Delete the selected points.
    DeleteSelected,
    /// Empty the selection.
    ClearSelection,
    /// Move to the next image.
    NextImage,
    /// Move to the previous image.
    PreviousImage,
    /// Write annotations to disk.
    Save,
}

/// A key press, stripped of any toolkit specifics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable key.
    Char(char),
    /// The Delete key.
    Delete,
    /// The Backspace key.
    Backspace,
    /// The Escape key.
    Escape,
}

impl Action {
    /// Action bound to a key.
    ///
    /// `F` places at `pointer`, `D`/`A` move forward/back, `Ctrl+S` saves,
    /// Delete/Backspace delete the selection and Escape clears it.
    #[must_use]
    pub fn from_key(key: Key, ctrl: bool, pointer: Option<(f64, f64)>) -> Option<Self> {
        match key {
            Key::Char(c) => match (c.to_ascii_lowercase(), ctrl) {
                ('s', true) => Some(Self::Save),
                ('f', false) => pointer.map(|(x, y)| Self::PlacePoint { x, y }),
                ('d', false) => Some(Self::NextImage),
                ('a', false) => Some(Self::PreviousImage),
                _ => None,
            },
            Key::Delete | Key::Backspace => Some(Self::DeleteSelected),
            Key::Escape => Some(Self::ClearSelection),
        }
    }
}

/// What an action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// A point was placed.
    Placed {
        /// Keypoint that was labeled.
        index: usize,
        /// Next placement target; `None` once the image is complete.
        next: Option<usize>,
    },
    /// The current image changed; carries the new filename, or `None` at a
    /// boundary (the current image stays open).
    Navigated(Option<String>),
    /// The selection may have changed.
    Selection,
    /// Points were deleted.
    Deleted(usize),
    /// Annotations were written.
    Saved(SaveReport),
    /// Nothing happened.
    Ignored,
}

/// Summary of opening a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenReport {
    /// Number of images in the directory.
    pub images: usize,
    /// Table the annotations were loaded from, if any.
    pub table: Option<PathBuf>,
    /// Load counters.
    pub stats: LoadStats,
    /// Whether `annotations.json` was generated because it was missing.
    pub generated_json: bool,
    /// First image opened.
    pub first_image: Option<String>,
}

/// State of one annotation session.
#[derive(Debug)]
pub struct AnnotationSession {
    config: AnnotatorConfig,
    schema: KeypointSchema,
    store: AnnotationStore,
    cursor: AnnotationCursor,
    cache: ImageCache,
    navigator: Option<Navigator>,
    current: Option<String>,
}

impl AnnotationSession {
    /// Create a session for `schema`. No directory is open yet.
    #[must_use]
    pub fn new(schema: KeypointSchema, config: AnnotatorConfig) -> Self {
        Self {
            cursor: AnnotationCursor::new(schema.len()),
            cache: ImageCache::new(config.cache_capacity),
            store: AnnotationStore::new(),
            navigator: None,
            current: None,
            schema,
            config,
        }
    }

    /// Active keypoint schema.
    #[must_use]
    pub fn schema(&self) -> &KeypointSchema {
        &self.schema
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Replace the schema. Stored annotations are kept as they are.
    pub fn set_schema(&mut self, schema: KeypointSchema) {
        self.cursor.set_n_keypoints(schema.len());
        self.schema = schema;
    }

    /// The annotation store. Points of the image on screen are only included
    /// once committed by navigation or save.
    #[must_use]
    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// The cursor for the image on screen.
    #[must_use]
    pub fn cursor(&self) -> &AnnotationCursor {
        &self.cursor
    }

    /// Open directory, if any.
    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.navigator.as_ref().map(Navigator::dir)
    }

    /// Filename of the image on screen.
    #[must_use]
    pub fn current_image(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Take queued change events, oldest first.
    pub fn drain_events(&mut self) -> Vec<ChangeEvent> {
        self.cursor.drain_events()
    }

    /// Whether anything differs from what was last loaded or saved.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.store.is_dirty()
            || self
                .current
                .as_deref()
                .is_some_and(|name| self.differs_from_store(name))
    }

    fn differs_from_store(&self, name: &str) -> bool {
        let points = self.cursor.points();
        if self.store.contains(name) {
            self.store.get(name) != points
        } else {
            !points.is_empty()
        }
    }

    /// 1-based position of the current image and the number of images.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn position(&self) -> Result<Option<(usize, usize)>> {
        match (&self.navigator, &self.current) {
            (Some(nav), Some(name)) => nav.position(name),
            _ => Ok(None),
        }
    }

    /// Open `dir`, replacing all in-memory annotations.
    ///
    /// Loads `Keypoints.csv` if present, derives `annotations.json` when it is
    /// missing (a failure there is only a warning), and opens the first image.
    /// If the table cannot be read the session is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` cannot be listed or the table cannot be read.
    pub fn open_directory(&mut self, dir: impl Into<PathBuf>) -> Result<OpenReport> {
        let dir = dir.into();
        let navigator = Navigator::new(&dir, &self.config.image_extensions);
        let images = navigator.images()?;

        let table_path = find_table(&dir);
        let table = table_path.as_deref().map(read_table).transpose()?;

        self.store.clear_all();
        self.cache.clear();
        self.cursor.reset();
        self.current = None;
        self.navigator = Some(navigator);

        let mut report = OpenReport {
            images: images.len(),
            table: table_path,
            ..OpenReport::default()
        };

        if let Some(table) = &table {
            report.stats = self.store.load_from_table(table, self.schema.len());
            verbose!(
                "Loaded {} points for {} images",
                report.stats.points,
                report.stats.images
            );

            let json_path = dir.join(ANNOTATIONS_JSON);
            if !json_path.exists() {
                let dataset = CocoDataset::from_table(
                    table,
                    &self.schema.connections,
                    &self.category(),
                    |name| probe_dimensions(&dir.join(name)),
                    self.config.placeholder_size,
                );
                match write_dataset(&json_path, &dataset) {
                    Ok(()) => report.generated_json = true,
                    Err(e) => warn!("Error processing CSV file: {e}"),
                }
            }
        }

        if let Some(first) = images.first() {
            self.open_image(first)?;
            report.first_image = Some(first.clone());
        }
        Ok(report)
    }

    /// Show image `name` from the open directory.
    ///
    /// The outgoing image's points are committed to the store first. An image
    /// that cannot be decoded still opens, without coordinate clamping.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotatorError::NoImageLoaded`] if no directory is open.
    pub fn open_image(&mut self, name: &str) -> Result<()> {
        let dir = self.directory().ok_or(AnnotatorError::NoImageLoaded)?.to_path_buf();
        self.commit_current();

        let bounds = match self.cache.get_or_load(&dir.join(name)) {
            Ok(image) => Some((image.width(), image.height())),
            Err(e) => {
                warn!("{e}");
                None
            }
        };
        self.cursor.load(self.store.get(name), bounds);
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Decoded pixels of the image on screen, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns an error if no image is open or it cannot be decoded.
    pub fn current_pixels(&mut self) -> Result<Arc<DynamicImage>> {
        let dir = self.directory().ok_or(AnnotatorError::NoImageLoaded)?;
        let name = self.current.as_deref().ok_or(AnnotatorError::NoImageLoaded)?;
        let path = dir.join(name);
        self.cache.get_or_load(&path)
    }

    /// Move to the next image. Returns the new filename, or `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if no image is open or the directory cannot be read.
    pub fn next_image(&mut self) -> Result<Option<String>> {
        self.step(Direction::Next)
    }

    /// Move to the previous image. Returns the new filename, or `None` at the start.
    ///
    /// # Errors
    ///
    /// Returns an error if no image is open or the directory cannot be read.
    pub fn previous_image(&mut self) -> Result<Option<String>> {
        self.step(Direction::Previous)
    }

    fn step(&mut self, direction: Direction) -> Result<Option<String>> {
        let (Some(nav), Some(current)) = (&self.navigator, &self.current) else {
            return Err(AnnotatorError::NoImageLoaded);
        };
        let Some(target) = nav.step(current, direction)? else {
            return Ok(None);
        };
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AnnotatorError::file(&target, "not a file"))?;
        self.open_image(&name)?;
        Ok(Some(name))
    }

    /// Write the store to `Keypoints.csv` and `annotations.json`.
    ///
    /// The current image is committed first. A table write failure keeps the
    /// unsaved-changes flag set.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is open or the table cannot be written.
    pub fn save(&mut self) -> Result<SaveReport> {
        let dir = self.directory().ok_or(AnnotatorError::NoImageLoaded)?.to_path_buf();
        self.commit_current();

        let report = save_annotations(
            &dir,
            &self.store,
            &self.schema,
            &self.category(),
            |name| probe_dimensions(&dir.join(name)),
            self.config.placeholder_size,
        )?;
        self.store.mark_clean();
        Ok(report)
    }

    /// Drop every annotation in memory, including the image on screen.
    ///
    /// Files on disk are untouched until the next save.
    pub fn clear_all(&mut self) {
        self.store.clear_all();
        let bounds = self.cursor_bounds();
        self.cursor.load(ImageAnnotation::new(), bounds);
    }

    fn cursor_bounds(&self) -> Option<(u32, u32)> {
        let dir = self.directory()?;
        let name = self.current.as_deref()?;
        self.cache
            .get(&dir.join(name))
            .map(|image| (image.width(), image.height()))
    }

    /// Apply one user action.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotatorError::NoImageLoaded`] for image actions with no
    /// image open, and propagates navigation and save errors.
    pub fn apply(&mut self, action: Action) -> Result<ActionOutcome> {
        let needs_image = !matches!(action, Action::Save);
        if needs_image && self.current.is_none() {
            return Err(AnnotatorError::NoImageLoaded);
        }

        let outcome = match action {
            Action::PlacePoint { x, y } => match self.cursor.place_point(x, y) {
                PlaceOutcome::Placed { index, next } => {
                    if let Some(name) = &self.current {
                        self.store.touch(name);
                    }
                    ActionOutcome::Placed { index, next }
                }
                PlaceOutcome::Advance => ActionOutcome::Navigated(self.next_image()?),
                PlaceOutcome::Rejected => ActionOutcome::Ignored,
            },
            Action::ClickAt { x, y } => {
                match self.cursor.find_point_at(x, y, self.config.hit_radius()) {
                    Some(idx) => {
                        self.cursor.select(idx);
                        ActionOutcome::Selection
                    }
                    None => ActionOutcome::Ignored,
                }
            }
            Action::SelectPoint(idx) => selection_outcome(self.cursor.select(idx)),
            Action::TogglePoint(idx) => selection_outcome(self.cursor.toggle(idx)),
            Action::SelectRect(rect) => {
                if rect.width() > MIN_SELECTION_SIZE && rect.height() > MIN_SELECTION_SIZE {
                    self.cursor.select_rect(rect);
                    ActionOutcome::Selection
                } else {
                    ActionOutcome::Ignored
                }
            }
            Action::DeleteSelected => ActionOutcome::Deleted(self.cursor.delete_selected()),
            Action::ClearSelection => {
                self.cursor.clear_selection();
                ActionOutcome::Selection
            }
            Action::NextImage => ActionOutcome::Navigated(self.next_image()?),
            Action::PreviousImage => ActionOutcome::Navigated(self.previous_image()?),
            Action::Save => ActionOutcome::Saved(self.save()?),
        };
        Ok(outcome)
    }

    fn commit_current(&mut self) {
        if let Some(name) = &self.current {
            self.store.commit_current(name, &self.cursor.points());
        }
    }

    fn category(&self) -> CocoCategoryInfo {
        CocoCategoryInfo::new(&self.config.category_name, &self.config.supercategory)
    }
}

fn selection_outcome(changed: bool) -> ActionOutcome {
    if changed {
        ActionOutcome::Selection
    } else {
        ActionOutcome::Ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Connection;
    use crate::store::AnnotationPoint;
    use image::RgbImage;

    fn schema() -> KeypointSchema {
        KeypointSchema::new("t", ["a", "b", "c"], [Connection::new(0, 1)])
    }

    fn setup(names: &[&str]) -> (tempfile::TempDir, AnnotationSession) {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            RgbImage::new(100, 80).save(dir.path().join(name)).unwrap();
        }
        let session = AnnotationSession::new(schema(), AnnotatorConfig::default());
        (dir, session)
    }

    #[test]
    fn test_actions_require_an_image() {
        let mut session = AnnotationSession::new(schema(), AnnotatorConfig::default());
        assert!(matches!(
            session.apply(Action::PlacePoint { x: 1.0, y: 1.0 }),
            Err(AnnotatorError::NoImageLoaded)
        ));
        assert!(matches!(session.save(), Err(AnnotatorError::NoImageLoaded)));
    }

    #[test]
    fn test_key_bindings() {
        let pointer = Some((3.0, 4.0));
        assert_eq!(
            Action::from_key(Key::Char('F'), false, pointer),
            Some(Action::PlacePoint { x: 3.0, y: 4.0 })
        );
        assert_eq!(Action::from_key(Key::Char('f'), false, None), None);
        assert_eq!(Action::from_key(Key::Char('s'), true, None), Some(Action::Save));
        assert_eq!(Action::from_key(Key::Char('s'), false, None), None);
        assert_eq!(Action::from_key(Key::Char('d'), false, None), Some(Action::NextImage));
        assert_eq!(Action::from_key(Key::Backspace, false, None), Some(Action::DeleteSelected));
        assert_eq!(Action::from_key(Key::Escape, false, None), Some(Action::ClearSelection));
    }

    #[test]
    fn test_complete_image_advances_on_next_place() {
        let (dir, mut session) = setup(&["1.png", "2.png"]);
        session.open_directory(dir.path()).unwrap();

        for i in 0..3 {
            let outcome = session.apply(Action::PlacePoint { x: 10.0 * f64::from(i), y: 5.0 }).unwrap();
            assert!(matches!(outcome, ActionOutcome::Placed { index, .. } if index == i as usize));
        }
        assert!(session.cursor().is_complete());

        let outcome = session.apply(Action::PlacePoint { x: 50.0, y: 50.0 }).unwrap();
        assert_eq!(outcome, ActionOutcome::Navigated(Some("2.png".to_string())));
        assert_eq!(session.store().get("1.png").len(), 3);
        assert!(session.cursor().points().is_empty());
    }

    #[test]
    fn test_placement_is_clamped_to_image_bounds() {
        let (dir, mut session) = setup(&["1.png"]);
        session.open_directory(dir.path()).unwrap();
        session.apply(Action::PlacePoint { x: 500.0, y: -3.0 }).unwrap();
        let point = session.cursor().points().get(0).unwrap();
        assert!(point.x < 100.0 && point.x > 99.9);
        assert!(point.y.abs() < f64::EPSILON);
    }

    #[test]
    fn test_small_rectangles_are_ignored() {
        let (dir, mut session) = setup(&["1.png"]);
        session.open_directory(dir.path()).unwrap();
        session.apply(Action::PlacePoint { x: 10.0, y: 10.0 }).unwrap();
        session.apply(Action::ClearSelection).unwrap();

        let tiny = SceneRect::from_corners(8.0, 8.0, 12.0, 12.0);
        assert_eq!(session.apply(Action::SelectRect(tiny)).unwrap(), ActionOutcome::Ignored);
        assert!(session.cursor().selection().is_empty());

        let big = SceneRect::from_corners(0.0, 0.0, 20.0, 20.0);
        session.apply(Action::SelectRect(big)).unwrap();
        assert_eq!(session.cursor().selection().into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_click_selects_nearby_point() {
        let (dir, mut session) = setup(&["1.png"]);
        session.open_directory(dir.path()).unwrap();
        session.apply(Action::PlacePoint { x: 10.0, y: 10.0 }).unwrap();
        session.apply(Action::ClearSelection).unwrap();

        // hit radius is 1.5 * 0.2
        assert_eq!(
            session.apply(Action::ClickAt { x: 11.0, y: 10.0 }).unwrap(),
            ActionOutcome::Ignored
        );
        assert_eq!(
            session.apply(Action::ClickAt { x: 10.2, y: 10.0 }).unwrap(),
            ActionOutcome::Selection
        );
        assert!(session.cursor().selection().contains(&0));
    }

    #[test]
    fn test_unsaved_changes_tracking() {
        let (dir, mut session) = setup(&["1.png", "2.png"]);
        session.open_directory(dir.path()).unwrap();
        assert!(!session.has_unsaved_changes());

        session.apply(Action::PlacePoint { x: 1.0, y: 1.0 }).unwrap();
        assert!(session.has_unsaved_changes());

        let report = session.save().unwrap();
        assert!(report.json_path.is_some());
        assert!(!session.has_unsaved_changes());

        session.clear_all();
        assert!(!session.has_unsaved_changes());
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_image_with_deleted_points_keeps_its_row() {
        let (dir, mut session) = setup(&["1.png", "2.png"]);
        session.open_directory(dir.path()).unwrap();

        session.apply(Action::PlacePoint { x: 5.0, y: 5.0 }).unwrap();
        session.apply(Action::SelectPoint(0)).unwrap();
        assert_eq!(session.apply(Action::DeleteSelected).unwrap(), ActionOutcome::Deleted(1));
        assert!(session.has_unsaved_changes());

        session.apply(Action::NextImage).unwrap();
        session.apply(Action::PlacePoint { x: 7.0, y: 8.0 }).unwrap();
        session.save().unwrap();

        let table = crate::codec::read_table(&dir.path().join("Keypoints.csv")).unwrap();
        let names: Vec<&str> = table.rows.iter().map(|row| row[0].as_str()).collect();
        assert_eq!(names, vec!["1.png", "2.png"]);
        assert!(table.rows[0][1..].iter().all(String::is_empty));
    }

    #[test]
    fn test_events_are_routed_through_session() {
        let (dir, mut session) = setup(&["1.png"]);
        session.open_directory(dir.path()).unwrap();
        session.drain_events();

        session.apply(Action::PlacePoint { x: 4.0, y: 4.0 }).unwrap();
        let events = session.drain_events();
        let expected_points: ImageAnnotation =
            std::iter::once((0, AnnotationPoint::new(4.0, 4.0))).collect();
        assert_eq!(events[0], ChangeEvent::PointsChanged(expected_points));
        assert!(matches!(&events[1], ChangeEvent::SelectionChanged(s) if s.contains(&1)));
        assert!(session.drain_events().is_empty());
    }
}
