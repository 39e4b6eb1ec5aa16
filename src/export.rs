// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Render annotated copies of every image in a directory.
//!
//! For each image, natural-sorted:
//!
//! - with annotations: draw each connection whose endpoints are both labeled,
//!   then each labeled point as a filled circle with a white outline, and save
//!   under the export directory with the same filename;
//! - without annotations: copy the file unchanged.
//!
//! Exporting into the source directory itself is redirected into an `Export`
//! subfolder so originals are never overwritten. Each output is written to a
//! temporary sibling and renamed into place, so cancelling between items never
//! leaves a truncated file behind.

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::error::{AnnotatorError, Result};
use crate::navigation::list_images;
use crate::schema::KeypointSchema;
use crate::settings::AnnotatorConfig;
use crate::store::{AnnotationStore, ImageAnnotation};
use crate::visualizer::{Color, blend, keypoint_color};
use crate::{verbose, warn};

/// Subfolder used when the export target is the source directory.
pub const EXPORT_SUBDIR: &str = "Export";

/// Rendering options for export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Point radius in image pixels.
    pub point_radius: f64,
    /// Recognized image extensions.
    pub image_extensions: Vec<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_config(&AnnotatorConfig::default())
    }
}

impl ExportOptions {
    /// Options matching a session configuration.
    #[must_use]
    pub fn from_config(config: &AnnotatorConfig) -> Self {
        Self {
            point_radius: config.point_radius,
            image_extensions: config.image_extensions.clone(),
        }
    }

    /// Set the point radius.
    #[must_use]
    pub fn with_point_radius(mut self, radius: f64) -> Self {
        self.point_radius = radius.clamp(0.1, 30.0);
        self
    }

    /// Connection line width: 40% of the point radius, at least 0.5.
    #[must_use]
    pub fn line_width(&self) -> f64 {
        (self.point_radius * 0.4).max(0.5)
    }
}

/// What happened to one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Drawn and saved.
    Exported,
    /// Copied unchanged (no annotations).
    Copied,
    /// Not written because the destination is the source file.
    Skipped,
    /// Failed; carries the reason.
    Failed(String),
}

/// Progress of one processed item.
#[derive(Debug, Clone)]
pub struct ExportProgress<'a> {
    /// 0-based index of the item just processed.
    pub index: usize,
    /// Total number of images.
    pub total: usize,
    /// Filename of the item.
    pub file: &'a str,
    /// Result for the item.
    pub outcome: &'a ItemOutcome,
}

/// Receives progress and decides whether the export continues.
pub trait ExportObserver {
    /// Called once with the number of images before any work is done.
    fn on_start(&mut self, _total: usize) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called after each item; returning `Break` cancels the rest.
    fn on_item(&mut self, progress: &ExportProgress<'_>) -> ControlFlow<()>;
}

impl<F> ExportObserver for F
where
    F: FnMut(&ExportProgress<'_>) -> ControlFlow<()>,
{
    fn on_item(&mut self, progress: &ExportProgress<'_>) -> ControlFlow<()> {
        self(progress)
    }
}

/// Totals for a finished or cancelled export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Images drawn and saved.
    pub exported: usize,
    /// Images copied unchanged.
    pub copied: usize,
    /// Images that failed.
    pub failed: usize,
    /// Whether the observer cancelled the run.
    pub cancelled: bool,
    /// Directory the files were written to.
    pub output_dir: PathBuf,
}

impl ExportSummary {
    /// Number of files written.
    #[must_use]
    pub fn written(&self) -> usize {
        self.exported + self.copied
    }
}

fn resolved(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Destination directory for exporting `source` into `target`.
#[must_use]
pub fn resolve_output_dir(source: &Path, target: &Path) -> PathBuf {
    if resolved(source) == resolved(target) {
        target.join(EXPORT_SUBDIR)
    } else {
        target.to_path_buf()
    }
}

/// Draw connections and points onto `canvas`.
///
/// Indices outside the schema are ignored.
pub fn render_keypoints(
    canvas: &mut RgbImage,
    points: &ImageAnnotation,
    schema: &KeypointSchema,
    options: &ExportOptions,
) {
    let total = schema.len();
    let colors: Vec<Color> = (0..total).map(|i| keypoint_color(i, total)).collect();

    for conn in &schema.connections {
        if !conn.in_range(total) {
            continue;
        }
        if let (Some(p1), Some(p2)) = (points.get(conn.a), points.get(conn.b)) {
            let color = blend(colors[conn.a], colors[conn.b]).to_rgb();
            draw_thick_line(canvas, (p1.x, p1.y), (p2.x, p2.y), options.line_width(), color);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let radius = (options.point_radius.round() as i32).max(1);
    for (idx, point) in points.iter().filter(|(idx, _)| *idx < total) {
        #[allow(clippy::cast_possible_truncation)]
        let center = (point.x.round() as i32, point.y.round() as i32);
        draw_filled_circle_mut(canvas, center, radius + 1, Color::WHITE.to_rgb());
        draw_filled_circle_mut(canvas, center, radius, colors[idx].to_rgb());
    }
}

/// Draw a line `width` pixels wide as parallel one-pixel segments.
#[allow(clippy::cast_possible_truncation)]
fn draw_thick_line(
    canvas: &mut RgbImage,
    from: (f64, f64),
    to: (f64, f64),
    width: f64,
    color: Rgb<u8>,
) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let len = dx.hypot(dy);
    let (nx, ny) = if len > 0.0 { (-dy / len, dx / len) } else { (0.0, 0.0) };

    let strokes = (width.round() as i32).max(1);
    for s in 0..strokes {
        let offset = f64::from(s) - f64::from(strokes - 1) / 2.0;
        let start = ((from.0 + nx * offset) as f32, (from.1 + ny * offset) as f32);
        let end = ((to.0 + nx * offset) as f32, (to.1 + ny * offset) as f32);
        draw_line_segment_mut(canvas, start, end, color);
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

fn export_one(
    source: &Path,
    dest: &Path,
    points: &ImageAnnotation,
    schema: &KeypointSchema,
    options: &ExportOptions,
) -> Result<()> {
    let format = ImageFormat::from_path(dest)?;
    let mut canvas = image::open(source)
        .map_err(|e| AnnotatorError::file(source, e))?
        .to_rgb8();
    render_keypoints(&mut canvas, points, schema, options);

    let tmp = temp_sibling(dest);
    canvas
        .save_with_format(&tmp, format)
        .map_err(|e| AnnotatorError::file(&tmp, e))?;
    fs::rename(&tmp, dest).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AnnotatorError::file(dest, e)
    })
}

fn copy_one(source: &Path, dest: &Path) -> Result<()> {
    let tmp = temp_sibling(dest);
    fs::copy(source, &tmp).map_err(|e| AnnotatorError::file(source, e))?;
    fs::rename(&tmp, dest).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AnnotatorError::file(dest, e)
    })
}

/// Export every image in `source_dir` into `target_dir`.
///
/// Images with an entry in `store` are drawn; others are copied. Per-item
/// failures are counted and reported to the observer but do not stop the run.
///
/// # Errors
///
/// Returns an error if the source directory cannot be listed or the output
/// directory cannot be created.
pub fn export_annotated_images<O: ExportObserver + ?Sized>(
    source_dir: &Path,
    target_dir: &Path,
    store: &AnnotationStore,
    schema: &KeypointSchema,
    options: &ExportOptions,
    observer: &mut O,
) -> Result<ExportSummary> {
    let output_dir = resolve_output_dir(source_dir, target_dir);
    let images = list_images(source_dir, &options.image_extensions)?;
    if images.is_empty() {
        return Err(AnnotatorError::ExportError(format!(
            "No image files found in {}",
            source_dir.display()
        )));
    }
    fs::create_dir_all(&output_dir).map_err(|e| AnnotatorError::file(&output_dir, e))?;

    let mut summary = ExportSummary {
        output_dir: output_dir.clone(),
        ..ExportSummary::default()
    };
    if observer.on_start(images.len()).is_break() {
        summary.cancelled = true;
        return Ok(summary);
    }

    for (index, name) in images.iter().enumerate() {
        let source = source_dir.join(name);
        let dest = output_dir.join(name);

        let outcome = if resolved(&source) == resolved(&dest) {
            ItemOutcome::Skipped
        } else {
            let points = store.get(name);
            let result = if points.is_empty() {
                copy_one(&source, &dest).map(|()| ItemOutcome::Copied)
            } else {
                export_one(&source, &dest, &points, schema, options).map(|()| ItemOutcome::Exported)
            };
            result.unwrap_or_else(|e| ItemOutcome::Failed(e.to_string()))
        };

        match &outcome {
            ItemOutcome::Exported => summary.exported += 1,
            ItemOutcome::Copied => summary.copied += 1,
            ItemOutcome::Skipped => verbose!("Skipping {name}: destination is the source file"),
            ItemOutcome::Failed(reason) => {
                summary.failed += 1;
                warn!("Error exporting image {}: {reason}", source.display());
            }
        }

        let progress = ExportProgress {
            index,
            total: images.len(),
            file: name,
            outcome: &outcome,
        };
        if observer.on_item(&progress).is_break() {
            summary.cancelled = index + 1 < images.len();
            break;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Connection;
    use crate::store::AnnotationPoint;

    fn schema() -> KeypointSchema {
        KeypointSchema::new("t", ["a", "b"], [Connection::new(0, 1)])
    }

    fn write_image(dir: &Path, name: &str) {
        RgbImage::from_pixel(40, 30, Rgb([0, 0, 0]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_line_width_floor() {
        assert!((ExportOptions::default().line_width() - 0.5).abs() < f64::EPSILON);
        let opts = ExportOptions::default().with_point_radius(10.0);
        assert!((opts.line_width() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_same_directory_is_redirected() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_output_dir(dir.path(), dir.path()),
            dir.path().join(EXPORT_SUBDIR)
        );
        let other = dir.path().join("out");
        assert_eq!(resolve_output_dir(dir.path(), &other), other);
    }

    #[test]
    fn test_render_draws_points_and_lines() {
        let mut canvas = RgbImage::new(40, 40);
        let points: ImageAnnotation = [
            (0, AnnotationPoint::new(5.0, 20.0)),
            (1, AnnotationPoint::new(35.0, 20.0)),
            (7, AnnotationPoint::new(20.0, 5.0)),
        ]
        .into_iter()
        .collect();
        let opts = ExportOptions::default().with_point_radius(3.0);
        render_keypoints(&mut canvas, &points, &schema(), &opts);

        assert_eq!(*canvas.get_pixel(5, 20), keypoint_color(0, 2).to_rgb());
        assert_eq!(*canvas.get_pixel(35, 20), keypoint_color(1, 2).to_rgb());
        let line = blend(keypoint_color(0, 2), keypoint_color(1, 2)).to_rgb();
        assert_eq!(*canvas.get_pixel(20, 20), line);
        // out-of-schema index is not drawn
        assert_eq!(*canvas.get_pixel(20, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_export_draws_copies_and_redirects() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "img1.png");
        write_image(dir.path(), "img2.png");

        let mut store = AnnotationStore::new();
        store.set_point("img1.png", 0, AnnotationPoint::new(10.0, 10.0));

        let mut seen = Vec::new();
        let summary = export_annotated_images(
            dir.path(),
            dir.path(),
            &store,
            &schema(),
            &ExportOptions::default().with_point_radius(2.0),
            &mut |p: &ExportProgress<'_>| {
                seen.push((p.file.to_string(), p.outcome.clone()));
                ControlFlow::Continue(())
            },
        )
        .unwrap();

        assert_eq!(summary.output_dir, dir.path().join(EXPORT_SUBDIR));
        assert_eq!((summary.exported, summary.copied, summary.failed), (1, 1, 0));
        assert!(!summary.cancelled);
        assert_eq!(seen[0], ("img1.png".to_string(), ItemOutcome::Exported));
        assert_eq!(seen[1], ("img2.png".to_string(), ItemOutcome::Copied));

        let drawn = image::open(summary.output_dir.join("img1.png")).unwrap().to_rgb8();
        assert_eq!(*drawn.get_pixel(10, 10), keypoint_color(0, 2).to_rgb());
        let original = image::open(dir.path().join("img1.png")).unwrap().to_rgb8();
        assert_eq!(*original.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_export_cancels_between_items() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["1.png", "2.png", "3.png"] {
            write_image(dir.path(), name);
        }
        let out = dir.path().join("out");

        let summary = export_annotated_images(
            dir.path(),
            &out,
            &AnnotationStore::new(),
            &schema(),
            &ExportOptions::default(),
            &mut |p: &ExportProgress<'_>| {
                if p.index == 0 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )
        .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.copied, 1);
        assert!(out.join("1.png").is_file());
        assert!(!out.join("2.png").exists());
        assert!(!out.join("1.png.part").exists());
    }
}
