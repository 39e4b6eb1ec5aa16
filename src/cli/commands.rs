// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::io;
use std::path::Path;

use crate::cache::probe_dimensions;
#[cfg(feature = "annotate")]
use crate::cli::args::ExportArgs;
use crate::cli::args::{Cli, Commands, DirArgs};
use crate::cli::label::run_label_loop;
use crate::codec::{CocoCategoryInfo, CocoDataset, find_table, read_table, write_dataset};
use crate::config::{ConfigPaths, ProjectConfig, SchemaLibrary};
use crate::error::{AnnotatorError, Result};
use crate::navigation::list_images;
use crate::schema::KeypointSchema;
use crate::session::AnnotationSession;
use crate::settings::{ANNOTATIONS_JSON, AnnotatorConfig};
use crate::store::AnnotationStore;
use crate::{VERSION, info, section, success, verbose, warn};

/// Run the parsed command line. Returns `false` when the command found
/// problems without failing outright (e.g. validation errors).
///
/// # Errors
///
/// Returns any error that stops the command.
pub fn run(cli: &Cli) -> Result<bool> {
    section!("poseek-annotate {VERSION}");
    let paths = ConfigPaths::new(&cli.config_root);

    match &cli.command {
        Commands::Label(args) => run_label(&paths, args),
        #[cfg(feature = "annotate")]
        Commands::Export(args) => run_export(&paths, args),
        #[cfg(not(feature = "annotate"))]
        Commands::Export(_) => Err(AnnotatorError::ExportError(
            "built without the 'annotate' feature".to_string(),
        )),
        Commands::Coco(args) => run_coco(&paths, args),
        Commands::Validate => Ok(run_validate(&paths)),
        Commands::List(args) => run_list(&paths, args),
    }
}

/// Active schema from `train_cfg.yaml`, or the COCO person preset if there is none.
#[must_use]
pub fn load_schema(paths: &ConfigPaths) -> KeypointSchema {
    match ProjectConfig::load(paths.project_config()) {
        Ok(config) => {
            let schema = config.keypoints();
            if schema.is_empty() {
                warn!(
                    "No bodyparts in {}, using the COCO person schema",
                    paths.project_config().display()
                );
                KeypointSchema::coco_person()
            } else {
                verbose!("Loaded schema '{}' ({} keypoints)", schema.name, schema.len());
                schema
            }
        }
        Err(e) => {
            warn!("Error loading main config: {e}. Using the COCO person schema");
            KeypointSchema::coco_person()
        }
    }
}

/// Store populated from the table in `dir`, if there is one.
fn load_store(dir: &Path, schema: &KeypointSchema) -> Result<AnnotationStore> {
    let mut store = AnnotationStore::new();
    if let Some(path) = find_table(dir) {
        let table = read_table(&path)?;
        let stats = store.load_from_table(&table, schema.len());
        verbose!(
            "Loaded {} images from {} ({} malformed fields skipped)",
            stats.images,
            path.display(),
            stats.skipped_fields
        );
    }
    Ok(store)
}

fn run_label(paths: &ConfigPaths, args: &DirArgs) -> Result<bool> {
    let schema = load_schema(paths);
    let mut session = AnnotationSession::new(schema, AnnotatorConfig::default());
    let report = session.open_directory(&args.dir)?;
    info!(
        "Opened {} ({} images, {} annotated)",
        args.dir.display(),
        report.images,
        report.stats.images
    );
    if report.generated_json {
        success!("Generated {}", args.dir.join(ANNOTATIONS_JSON).display());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_label_loop(&mut session, stdin.lock(), &mut stdout)
}

#[cfg(feature = "annotate")]
fn run_export(paths: &ConfigPaths, args: &ExportArgs) -> Result<bool> {
    use std::ops::ControlFlow;

    use crate::export::{ExportOptions, ExportProgress, ItemOutcome, export_annotated_images};

    let schema = load_schema(paths);
    let store = load_store(&args.dir, &schema)?;
    if store.is_empty() {
        warn!("No Keypoints.csv file found. Exporting images without annotations.");
    }

    let target = args.out.as_deref().unwrap_or(args.dir.as_path());
    let options = ExportOptions::default().with_point_radius(args.point_size);
    let summary = export_annotated_images(
        &args.dir,
        target,
        &store,
        &schema,
        &options,
        &mut |p: &ExportProgress<'_>| {
            if !matches!(p.outcome, ItemOutcome::Failed(_)) {
                verbose!("[{}/{}] {}", p.index + 1, p.total, p.file);
            }
            ControlFlow::Continue(())
        },
    )?;

    success!(
        "Successfully exported {} images to: {}",
        summary.written(),
        summary.output_dir.display()
    );
    Ok(summary.failed == 0)
}

fn run_coco(paths: &ConfigPaths, args: &DirArgs) -> Result<bool> {
    let schema = load_schema(paths);
    let table_path = find_table(&args.dir)
        .ok_or_else(|| AnnotatorError::file(&args.dir, "no Keypoints.csv found"))?;
    let table = read_table(&table_path)?;

    let config = AnnotatorConfig::default();
    let dataset = CocoDataset::from_table(
        &table,
        &schema.connections,
        &CocoCategoryInfo::new(&config.category_name, &config.supercategory),
        |name| probe_dimensions(&args.dir.join(name)),
        config.placeholder_size,
    );
    let json_path = args.dir.join(ANNOTATIONS_JSON);
    write_dataset(&json_path, &dataset)?;
    success!(
        "Wrote {} annotations to {}",
        dataset.annotations.len(),
        json_path.display()
    );
    Ok(true)
}

fn run_validate(paths: &ConfigPaths) -> bool {
    let mut ok = true;

    match ProjectConfig::load(paths.project_config()) {
        Ok(config) => {
            let mut problems = config.validate();
            problems.extend(
                config
                    .keypoints()
                    .validate(None)
                    .into_iter()
                    .map(|v| v.to_string()),
            );
            problems.dedup();
            if problems.is_empty() {
                success!("{} is valid ({})", config.path().display(), config.summary());
            } else {
                ok = false;
                for problem in &problems {
                    warn!("{}: {problem}", config.path().display());
                }
            }
        }
        Err(e) => {
            ok = false;
            warn!("{e}");
        }
    }

    let library = SchemaLibrary::load(paths.schema_library());
    for name in library.names() {
        let Some(schema) = library.get(name) else {
            continue;
        };
        let violations = schema.validate(None);
        if violations.is_empty() {
            verbose!("'{name}': {} keypoints, {} connections", schema.len(), schema.connections.len());
        } else {
            ok = false;
            for violation in violations {
                warn!("{}: '{name}': {violation}", library.path().display());
            }
        }
    }
    info!("{} saved configurations checked", library.len());
    ok
}

fn run_list(paths: &ConfigPaths, args: &DirArgs) -> Result<bool> {
    let schema = load_schema(paths);
    let store = load_store(&args.dir, &schema)?;
    let config = AnnotatorConfig::default();
    let images = list_images(&args.dir, &config.image_extensions)?;

    for (i, name) in images.iter().enumerate() {
        let labeled = store.get(name).count_in_schema(schema.len());
        info!("{:>5}  {name}  {labeled}/{}", i + 1, schema.len());
    }
    info!(
        "{} images, {} annotated",
        images.len(),
        images.iter().filter(|name| store.contains(name)).count()
    );
    Ok(true)
}
