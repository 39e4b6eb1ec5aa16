// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Persistence of the annotation store.
//!
//! Two on-disk forms exist:
//!
//! - `Keypoints.csv`, the authoritative table. Header
//!   `filename, <part>_x, <part>_y, ...` in schema order, one row per image,
//!   blank cells for unlabeled keypoints. [`AnnotationStore::to_table`] and
//!   [`AnnotationStore::load_from_table`] round-trip it exactly.
//! - `annotations.json`, a COCO keypoint dataset derived from the table on
//!   every save. The derivation is lossy: a point at exactly `(0, 0)` is
//!   written with visibility `0`, the same as an unlabeled point.
//!
//! A failure to derive or write the JSON never fails a save; it is reported as
//! a warning on the [`SaveReport`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AnnotatorError, Result};
use crate::schema::{Connection, KeypointSchema};
use crate::settings::{ANNOTATIONS_JSON, KEYPOINTS_CSV};
use crate::store::{AnnotationPoint, AnnotationStore, ImageAnnotation};
use crate::{verbose, warn};

/// COCO visibility flag for a labeled keypoint.
pub const VISIBLE: u8 = 2;

/// COCO visibility flag for an absent keypoint.
pub const ABSENT: u8 = 0;

/// Tabular form of the annotation store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationTable {
    /// Column names; the first is `filename`.
    pub header: Vec<String>,
    /// Data rows; column 0 is the image filename.
    pub rows: Vec<Vec<String>>,
}

impl AnnotationTable {
    /// Build the header row for `schema`.
    #[must_use]
    pub fn header_for(schema: &KeypointSchema) -> Vec<String> {
        std::iter::once("filename".to_string())
            .chain(
                schema
                    .bodyparts
                    .iter()
                    .flat_map(|part| [format!("{part}_x"), format!("{part}_y")]),
            )
            .collect()
    }

    /// Keypoint names recovered from the header (`<name>_x` / `<name> x` columns).
    #[must_use]
    pub fn keypoint_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for i in (1..self.header.len()).step_by(2) {
            if i + 1 >= self.header.len() {
                break;
            }
            let column = &self.header[i];
            let name = column
                .strip_suffix("_x")
                .or_else(|| column.strip_suffix(" x"));
            if let Some(name) = name
                && !names.iter().any(|n| n == name)
            {
                names.push(name.to_string());
            }
        }
        names
    }
}

/// Counters reported by [`AnnotationStore::load_from_table`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Images that received an entry.
    pub images: usize,
    /// Keypoints parsed successfully.
    pub points: usize,
    /// Coordinate pairs skipped because a cell did not parse as a number.
    pub skipped_fields: usize,
}

/// Format a coordinate so that parsing it back yields the same `f64`.
fn format_coord(value: f64) -> String {
    format!("{value:?}")
}

fn parse_coord(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok()
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map_or("", |c| c.trim())
}

impl AnnotationStore {
    /// Merge table rows into the store.
    ///
    /// Columns are read positionally for the first `n_keypoints` body parts.
    /// A pair with a blank cell is absent; a pair with an unparsable cell is
    /// skipped without affecting the rest of the row. Only rows with at least
    /// one parsed point create an entry. Loaded values are not clamped.
    pub fn load_from_table(&mut self, table: &AnnotationTable, n_keypoints: usize) -> LoadStats {
        let mut stats = LoadStats::default();

        for row in &table.rows {
            let filename = cell(row, 0);
            if filename.is_empty() {
                continue;
            }

            let mut points = ImageAnnotation::new();
            for idx in 0..n_keypoints {
                let (x_cell, y_cell) = (cell(row, idx * 2 + 1), cell(row, idx * 2 + 2));
                if x_cell.is_empty() || y_cell.is_empty() {
                    continue;
                }
                match (parse_coord(x_cell), parse_coord(y_cell)) {
                    (Some(x), Some(y)) => points.insert(idx, AnnotationPoint::new(x, y)),
                    _ => {
                        stats.skipped_fields += 1;
                        verbose!("Skipping malformed coordinates for {filename} keypoint {idx}");
                    }
                }
            }

            if !points.is_empty() {
                stats.images += 1;
                stats.points += points.len();
                self.insert_loaded(filename, points);
            }
        }

        stats
    }

    /// Emit one row per image in store order, with schema-ordered x/y columns.
    ///
    /// Unlabeled keypoints become two blank cells. Indices outside the schema
    /// are not written.
    #[must_use]
    pub fn to_table(&self, schema: &KeypointSchema) -> AnnotationTable {
        let rows = self
            .iter()
            .map(|(image, points)| {
                let mut row = Vec::with_capacity(1 + schema.len() * 2);
                row.push(image.to_string());
                for idx in 0..schema.len() {
                    match points.get(idx) {
                        Some(p) => {
                            row.push(format_coord(p.x));
                            row.push(format_coord(p.y));
                        }
                        None => {
                            row.push(String::new());
                            row.push(String::new());
                        }
                    }
                }
                row
            })
            .collect();

        AnnotationTable {
            header: AnnotationTable::header_for(schema),
            rows,
        }
    }

    /// Derive the COCO keypoint dataset for this store.
    ///
    /// The dataset is produced from [`Self::to_table`], so it always matches
    /// what is written to `Keypoints.csv`. `dimensions` resolves an image
    /// filename to `(width, height)`; `placeholder` is used when it returns `None`.
    pub fn to_detection_dataset<F>(
        &self,
        schema: &KeypointSchema,
        category: &CocoCategoryInfo,
        dimensions: F,
        placeholder: (u32, u32),
    ) -> CocoDataset
    where
        F: FnMut(&str) -> Option<(u32, u32)>,
    {
        CocoDataset::from_table(
            &self.to_table(schema),
            &schema.connections,
            category,
            dimensions,
            placeholder,
        )
    }
}

/// Name and supercategory of the single COCO category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CocoCategoryInfo {
    /// Category name.
    pub name: String,
    /// Supercategory.
    pub supercategory: String,
}

impl CocoCategoryInfo {
    /// Create category info.
    pub fn new(name: impl Into<String>, supercategory: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supercategory: supercategory.into(),
        }
    }
}

/// One entry of the COCO `images` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoImage {
    /// 1-based id in table row order.
    pub id: u64,
    /// Image filename.
    pub file_name: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

/// A value inside the interleaved COCO keypoint list.
///
/// Coordinates are written as floats and visibility flags as integers. When
/// reading, the kind comes from the position inside each `[x, y, v]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KeypointValue {
    /// An x or y coordinate.
    Coord(f64),
    /// Visibility flag (`0`, `1` or `2`).
    Visibility(u8),
}

impl KeypointValue {
    /// Numeric value regardless of kind.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Visibility(v) => f64::from(v),
            Self::Coord(c) => c,
        }
    }
}

/// Nearest COCO visibility flag for a numeric value.
fn visibility_flag(value: f64) -> u8 {
    if value >= 1.5 {
        VISIBLE
    } else if value >= 0.5 {
        1
    } else {
        ABSENT
    }
}

fn keypoints_by_position<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<KeypointValue>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values = Vec::<f64>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            if i % 3 == 2 {
                KeypointValue::Visibility(visibility_flag(v))
            } else {
                KeypointValue::Coord(v)
            }
        })
        .collect())
}

/// One entry of the COCO `annotations` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    /// 1-based annotation id.
    pub id: u64,
    /// Id of the image this annotation belongs to.
    pub image_id: u64,
    /// Always `1`.
    pub category_id: u32,
    /// `[x, y, v] * N`, interleaved in schema order.
    #[serde(deserialize_with = "keypoints_by_position")]
    pub keypoints: Vec<KeypointValue>,
    /// Number of keypoints with visibility `2`.
    pub num_keypoints: usize,
    /// `[x, y, w, h]` over visible keypoints, all zero if none are visible.
    pub bbox: [f64; 4],
    /// `w * h` of the bounding box.
    pub area: f64,
}

/// The single COCO category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoCategory {
    /// Always `1`.
    pub id: u32,
    /// Category name.
    pub name: String,
    /// Supercategory.
    pub supercategory: String,
    /// Ordered keypoint names.
    pub keypoints: Vec<String>,
    /// Skeleton edges as index pairs.
    pub skeleton: Vec<Connection>,
}

/// A COCO keypoint dataset document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoDataset {
    /// Image records.
    pub images: Vec<CocoImage>,
    /// One annotation per image.
    pub annotations: Vec<CocoAnnotation>,
    /// Exactly one category.
    pub categories: Vec<CocoCategory>,
}

/// Bounding box `[x, y, w, h]` and area over keypoints with non-zero visibility.
#[must_use]
pub fn keypoint_bbox(triplets: &[(f64, f64, u8)]) -> ([f64; 4], f64) {
    let visible: Vec<(f64, f64)> = triplets
        .iter()
        .filter(|t| t.2 > ABSENT)
        .map(|&(x, y, _)| (x, y))
        .collect();
    if visible.is_empty() {
        return ([0.0; 4], 0.0);
    }

    let min_x = visible.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_x = visible.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = visible.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = visible.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let (w, h) = (max_x - min_x, max_y - min_y);
    ([min_x, min_y, w, h], w * h)
}

impl CocoDataset {
    /// Derive the dataset from a table.
    ///
    /// Keypoint names come from the table header. A blank or unparsable cell
    /// counts as `0`; a keypoint is visible when it is not exactly `(0, 0)`.
    pub fn from_table<F>(
        table: &AnnotationTable,
        skeleton: &[Connection],
        category: &CocoCategoryInfo,
        mut dimensions: F,
        placeholder: (u32, u32),
    ) -> Self
    where
        F: FnMut(&str) -> Option<(u32, u32)>,
    {
        let keypoints = table.keypoint_names();
        let mut images = Vec::with_capacity(table.rows.len());
        let mut annotations = Vec::with_capacity(table.rows.len());

        for (id, row) in (1u64..).zip(&table.rows) {
            let file_name = cell(row, 0).to_string();
            let (width, height) = dimensions(&file_name).unwrap_or_else(|| {
                verbose!(
                    "Cannot read image dimensions for {file_name}, using {}x{}",
                    placeholder.0,
                    placeholder.1
                );
                placeholder
            });

            let triplets: Vec<(f64, f64, u8)> = (0..keypoints.len())
                .map(|k| {
                    let x = parse_coord(cell(row, k * 2 + 1)).unwrap_or(0.0);
                    let y = parse_coord(cell(row, k * 2 + 2)).unwrap_or(0.0);
                    #[allow(clippy::float_cmp)]
                    let v = if x != 0.0 || y != 0.0 { VISIBLE } else { ABSENT };
                    (x, y, v)
                })
                .collect();

            let (bbox, area) = keypoint_bbox(&triplets);
            let num_keypoints = triplets.iter().filter(|t| t.2 > ABSENT).count();

            images.push(CocoImage {
                id,
                file_name,
                width,
                height,
            });
            annotations.push(CocoAnnotation {
                id,
                image_id: id,
                category_id: 1,
                keypoints: triplets
                    .iter()
                    .flat_map(|&(x, y, v)| {
                        [
                            KeypointValue::Coord(x),
                            KeypointValue::Coord(y),
                            KeypointValue::Visibility(v),
                        ]
                    })
                    .collect(),
                num_keypoints,
                bbox,
                area,
            });
        }

        Self {
            images,
            annotations,
            categories: vec![CocoCategory {
                id: 1,
                name: category.name.clone(),
                supercategory: category.supercategory.clone(),
                keypoints,
                skeleton: skeleton.to_vec(),
            }],
        }
    }
}

/// Read a CSV annotation table.
///
/// Records that cannot be decoded are skipped with a warning; an empty file
/// yields an empty table.
///
/// # Errors
///
/// Returns [`AnnotatorError::FileError`] if the file cannot be opened.
pub fn read_table(path: &Path) -> Result<AnnotationTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AnnotatorError::file(path, e))?;

    let mut table = AnnotationTable::default();
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable row {} in {}: {e}", line + 1, path.display());
                continue;
            }
        };
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        if table.header.is_empty() && line == 0 {
            table.header = fields;
        } else if fields.iter().any(|f| !f.trim().is_empty()) {
            table.rows.push(fields);
        }
    }
    Ok(table)
}

/// Write `bytes` to `path` through a sibling temporary file and a rename.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(|e| AnnotatorError::file(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AnnotatorError::file(path, e)
    })
}

/// Write a CSV annotation table.
///
/// # Errors
///
/// Returns [`AnnotatorError::FileError`] naming `path` if writing fails.
pub fn write_table(path: &Path, table: &AnnotationTable) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record(&table.header)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AnnotatorError::file(path, e.error()))?;
    write_atomically(path, &bytes)
}

/// Write a COCO dataset as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`AnnotatorError::FileError`] naming `path` if writing fails.
pub fn write_dataset(path: &Path, dataset: &CocoDataset) -> Result<()> {
    let json = serde_json::to_vec_pretty(dataset)?;
    write_atomically(path, &json)
}

/// Read a COCO dataset.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid dataset.
pub fn read_dataset(path: &Path) -> Result<CocoDataset> {
    let data = fs::read(path).map_err(|e| AnnotatorError::file(path, e))?;
    Ok(serde_json::from_slice(&data)?)
}

/// Locate the annotation table in `dir`.
///
/// Prefers `Keypoints.csv`; falls back to a legacy `CollectedData_x.csv`.
#[must_use]
pub fn find_table(dir: &Path) -> Option<PathBuf> {
    [KEYPOINTS_CSV, "CollectedData_x.csv"]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// The table that was written.
    pub csv_path: PathBuf,
    /// The COCO file, if it was written too.
    pub json_path: Option<PathBuf>,
    /// Why the COCO file was not written.
    pub warning: Option<String>,
}

impl SaveReport {
    /// User-facing summary naming every file written.
    #[must_use]
    pub fn message(&self) -> String {
        match (&self.json_path, &self.warning) {
            (Some(json), _) => format!(
                "Annotations saved to:\n{}\nand\n{}",
                self.csv_path.display(),
                json.display()
            ),
            (None, Some(warning)) => format!(
                "Annotations saved to:\n{}\n\nWarning: Failed to create COCO format: {warning}",
                self.csv_path.display()
            ),
            (None, None) => format!("Annotations saved to:\n{}", self.csv_path.display()),
        }
    }
}

/// Write `Keypoints.csv` and then `annotations.json` into `dir`.
///
/// The table write is authoritative: its failure is returned as an error.
/// A COCO failure only produces a warning on the returned report.
///
/// # Errors
///
/// Returns [`AnnotatorError::FileError`] if the table cannot be written.
pub fn save_annotations<F>(
    dir: &Path,
    store: &AnnotationStore,
    schema: &KeypointSchema,
    category: &CocoCategoryInfo,
    dimensions: F,
    placeholder: (u32, u32),
) -> Result<SaveReport>
where
    F: FnMut(&str) -> Option<(u32, u32)>,
{
    let csv_path = dir.join(KEYPOINTS_CSV);
    let table = store.to_table(schema);
    write_table(&csv_path, &table)?;

    let json_path = dir.join(ANNOTATIONS_JSON);
    let dataset = CocoDataset::from_table(
        &table,
        &schema.connections,
        category,
        dimensions,
        placeholder,
    );
    match write_dataset(&json_path, &dataset) {
        Ok(()) => Ok(SaveReport {
            csv_path,
            json_path: Some(json_path),
            warning: None,
        }),
        Err(e) => {
            warn!("Failed to create COCO format: {e}");
            Ok(SaveReport {
                csv_path,
                json_path: None,
                warning: Some(e.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> KeypointSchema {
        KeypointSchema::new(
            "test",
            ["nose", "neck", "tail"],
            [Connection::new(0, 1), Connection::new(1, 2)],
        )
    }

    fn category() -> CocoCategoryInfo {
        CocoCategoryInfo::new("mouse", "animal")
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn test_table_round_trip_is_exact() {
        let mut store = AnnotationStore::new();
        store.set_point("img1.png", 0, AnnotationPoint::new(12.345_678_901_234, 0.1));
        store.set_point("img1.png", 2, AnnotationPoint::new(1e-7, 99_999.5));
        store.set_point("img2.png", 1, AnnotationPoint::new(3.0, 4.0));

        let table = store.to_table(&schema());
        let mut loaded = AnnotationStore::new();
        loaded.load_from_table(&table, 3);

        for image in ["img1.png", "img2.png"] {
            assert_eq!(loaded.get(image), store.get(image));
        }
        assert!(!loaded.get("img1.png").contains(1), "blank stays absent");
    }

    #[test]
    fn test_header_and_blank_cells() {
        let mut store = AnnotationStore::new();
        store.set_point("a.png", 1, AnnotationPoint::new(5.5, 6.0));
        let table = store.to_table(&schema());
        assert_eq!(
            table.header,
            row(&["filename", "nose_x", "nose_y", "neck_x", "neck_y", "tail_x", "tail_y"])
        );
        assert_eq!(table.rows, vec![row(&["a.png", "", "", "5.5", "6.0", "", ""])]);
    }

    #[test]
    fn test_touched_image_without_points_keeps_row() {
        let mut store = AnnotationStore::new();
        store.set_point("a.png", 0, AnnotationPoint::new(1.0, 1.0));
        store.remove_point("a.png", 0);
        let table = store.to_table(&schema());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], "a.png");
    }

    #[test]
    fn test_load_skips_bad_fields_not_rows() {
        let table = AnnotationTable {
            header: AnnotationTable::header_for(&schema()),
            rows: vec![
                row(&["a.png", "1.0", "abc", "2.0", "3.0", "", ""]),
                row(&["b.png", "", "", "", "", "", ""]),
                row(&["", "1.0", "1.0"]),
                row(&["c.png", "4.0", "5.0"]),
            ],
        };
        let mut store = AnnotationStore::new();
        let stats = store.load_from_table(&table, 3);

        assert_eq!(stats.skipped_fields, 1);
        assert_eq!(stats.images, 2);
        let a = store.get("a.png");
        assert!(!a.contains(0));
        assert_eq!(a.get(1), Some(AnnotationPoint::new(2.0, 3.0)));
        assert!(!store.contains("b.png"), "rows without points create no entry");
        assert_eq!(store.get("c.png").get(0), Some(AnnotationPoint::new(4.0, 5.0)));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_load_does_not_clamp_out_of_bounds_values() {
        let table = AnnotationTable {
            header: Vec::new(),
            rows: vec![row(&["a.png", "-3.5", "100000"])],
        };
        let mut store = AnnotationStore::new();
        store.load_from_table(&table, 1);
        assert_eq!(
            store.get("a.png").get(0),
            Some(AnnotationPoint::new(-3.5, 100_000.0))
        );
    }

    #[test]
    fn test_bbox_over_visible_points_only() {
        let (bbox, area) = keypoint_bbox(&[(10.0, 10.0, 2), (500.0, 500.0, 0), (30.0, 40.0, 2)]);
        assert_eq!(bbox, [10.0, 10.0, 20.0, 30.0]);
        assert!((area - 600.0).abs() < f64::EPSILON);

        let (bbox, area) = keypoint_bbox(&[(0.0, 0.0, 0), (0.0, 0.0, 0)]);
        assert_eq!(bbox, [0.0; 4]);
        assert!(area.abs() < f64::EPSILON);
    }

    #[test]
    fn test_detection_dataset_structure() {
        let mut store = AnnotationStore::new();
        store.set_point("a.png", 0, AnnotationPoint::new(10.0, 10.0));
        store.set_point("a.png", 2, AnnotationPoint::new(30.0, 40.0));
        store.set_point("b.png", 1, AnnotationPoint::new(0.0, 0.0));

        let dataset = store.to_detection_dataset(
            &schema(),
            &category(),
            |name| (name == "a.png").then_some((640, 480)),
            (1024, 768),
        );

        assert_eq!(dataset.images[0].id, 1);
        assert_eq!((dataset.images[0].width, dataset.images[0].height), (640, 480));
        assert_eq!((dataset.images[1].width, dataset.images[1].height), (1024, 768));

        let a = &dataset.annotations[0];
        let values: Vec<f64> = a.keypoints.iter().map(|v| v.as_f64()).collect();
        assert_eq!(values, vec![10.0, 10.0, 2.0, 0.0, 0.0, 0.0, 30.0, 40.0, 2.0]);
        assert_eq!(a.num_keypoints, 2);
        assert_eq!(a.bbox, [10.0, 10.0, 20.0, 30.0]);

        // labeled at the origin is indistinguishable from unlabeled
        let b = &dataset.annotations[1];
        assert_eq!(b.num_keypoints, 0);
        assert_eq!(b.bbox, [0.0; 4]);
        assert_eq!(b.image_id, 2);

        let cat = &dataset.categories[0];
        assert_eq!(cat.keypoints, vec!["nose", "neck", "tail"]);
        assert_eq!(cat.skeleton.len(), 2);
    }

    #[test]
    fn test_dataset_json_layout() {
        let mut store = AnnotationStore::new();
        store.set_point("a.png", 0, AnnotationPoint::new(1.5, 2.5));
        let dataset = store.to_detection_dataset(&schema(), &category(), |_| None, (1024, 768));
        let json = serde_json::to_value(&dataset).unwrap();

        assert_eq!(json["annotations"][0]["keypoints"][2], serde_json::json!(2));
        assert_eq!(json["annotations"][0]["category_id"], serde_json::json!(1));
        assert_eq!(json["categories"][0]["skeleton"], serde_json::json!([[0, 1], [1, 2]]));
        assert_eq!(json["images"][0]["file_name"], serde_json::json!("a.png"));
    }

    #[test]
    fn test_integral_coordinates_read_by_position() {
        let json = serde_json::json!({
            "id": 1,
            "image_id": 1,
            "category_id": 1,
            "keypoints": [12, 7.5, 2, 0, 0, 0, 3, 4, 1],
            "num_keypoints": 2,
            "bbox": [3.0, 4.0, 9.0, 3.5],
            "area": 31.5
        });
        let annotation: CocoAnnotation = serde_json::from_value(json).unwrap();
        assert_eq!(
            annotation.keypoints,
            vec![
                KeypointValue::Coord(12.0),
                KeypointValue::Coord(7.5),
                KeypointValue::Visibility(2),
                KeypointValue::Coord(0.0),
                KeypointValue::Coord(0.0),
                KeypointValue::Visibility(0),
                KeypointValue::Coord(3.0),
                KeypointValue::Coord(4.0),
                KeypointValue::Visibility(1),
            ]
        );
    }

    #[test]
    fn test_keypoint_names_accept_space_suffix() {
        let table = AnnotationTable {
            header: row(&["filename", "nose x", "nose y", "tail_x", "tail_y", "dangling"]),
            rows: Vec::new(),
        };
        assert_eq!(table.keypoint_names(), vec!["nose", "tail"]);
    }

    #[test]
    fn test_save_report_message_names_files() {
        let report = SaveReport {
            csv_path: PathBuf::from("/data/Keypoints.csv"),
            json_path: None,
            warning: Some("disk full".to_string()),
        };
        let message = report.message();
        assert!(message.contains("/data/Keypoints.csv"));
        assert!(message.contains("Warning: Failed to create COCO format: disk full"));
    }
}
