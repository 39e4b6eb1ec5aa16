// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Poseek Annotation Library
//!
//! Core of a keypoint annotation tool for building pose-estimation datasets: a
//! per-image labeling state machine, an in-memory annotation store that
//! round-trips to `Keypoints.csv`, a derived COCO keypoint dataset
//! (`annotations.json`), natural-order image navigation, and an exporter that
//! burns keypoints and skeletons onto image copies for visual QA.
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use poseek_annotate::{Action, AnnotationSession, AnnotatorConfig, KeypointSchema};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = KeypointSchema::coco_person();
//!     let mut session = AnnotationSession::new(schema, AnnotatorConfig::default());
//!
//!     // Loads Keypoints.csv if present and opens the first image
//!     session.open_directory("images/")?;
//!
//!     // Place the next keypoint at the pointer position
//!     session.apply(Action::PlacePoint { x: 120.0, y: 84.5 })?;
//!     session.apply(Action::NextImage)?;
//!
//!     // Writes Keypoints.csv, then annotations.json
//!     let report = session.save()?;
//!     println!("{}", report.message());
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Label interactively (commands on stdin: place x y, next, prev, save, ...)
//! poseek-annotate label --dir images/
//!
//! # Export annotated copies into images/Export
//! poseek-annotate export --dir images/ --point-size 4
//!
//! # Rebuild annotations.json from Keypoints.csv
//! poseek-annotate coco --dir images/
//!
//! # Check train_cfg.yaml and keypoints_cfg.yaml under a config root
//! poseek-annotate --config-root configs/ validate
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`schema`] | [`KeypointSchema`], [`Connection`] and schema editing |
//! | [`store`] | [`AnnotationStore`], [`ImageAnnotation`], [`AnnotationPoint`] |
//! | [`cursor`] | [`AnnotationCursor`] labeling state machine and [`ChangeEvent`]s |
//! | [`codec`] | CSV table and COCO dataset persistence |
//! | [`navigation`] | Natural sort and next/previous resolution |
//! | [`session`] | [`AnnotationSession`] orchestration and [`Action`]s |
//! | [`config`] | `train_cfg.yaml` and `keypoints_cfg.yaml` handling |
//! | [`cache`] | Bounded decoded-image cache |
//! | [`error`] | Error types ([`AnnotatorError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `annotate` | Export of images with keypoints drawn (default) |

// Modules
pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
#[cfg(feature = "annotate")]
pub mod export;
pub mod navigation;
pub mod schema;
pub mod session;
pub mod settings;
pub mod store;
pub mod visualizer;

// Re-export main types for convenience
pub use codec::{AnnotationTable, CocoDataset, SaveReport};
pub use config::{ConfigPaths, ProjectConfig, SchemaLibrary};
pub use cursor::{AnnotationCursor, ChangeEvent, PlaceOutcome};
pub use error::{AnnotatorError, Result};
pub use navigation::{Navigator, natural_cmp};
pub use schema::{Connection, KeypointSchema, SchemaViolation};
pub use session::{Action, ActionOutcome, AnnotationSession};
pub use settings::AnnotatorConfig;
pub use store::{AnnotationPoint, AnnotationStore, ImageAnnotation, SceneRect};

#[cfg(feature = "annotate")]
pub use export::{ExportObserver, ExportOptions, ExportSummary, export_annotated_images};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "poseek-annotate");
    }
}
