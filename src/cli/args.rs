// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Label commands (read from stdin, one per line):
    place <x> <y>              Place the next keypoint (or advance when complete)
    f <x> <y>                  Same as place
    click <x> <y>              Select the labeled point under the pointer
    select <i> | toggle <i>    Replace / toggle the selection
    rect <x0> <y0> <x1> <y1>   Select labeled points inside a rectangle
    delete | clear             Delete selected points / clear the selection
    next | prev | d | a        Navigate between images
    save                       Write Keypoints.csv and annotations.json
    status | quit

Examples:
    poseek-annotate label --dir data/session1
    poseek-annotate export --dir data/session1 --point-size 4
    poseek-annotate coco --dir data/session1
    poseek-annotate --config-root configs validate
    poseek-annotate list --dir data/session1"#)]
pub struct Cli {
    /// Directory holding train_cfg.yaml and keypoints_cfg.yaml
    #[arg(long, global = true, default_value = ".")]
    pub config_root: PathBuf,

    /// Show verbose output
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Only print warnings and errors (overrides --verbose)
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,

    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Label images interactively with commands read from stdin
    Label(DirArgs),
    /// Export images with keypoints and skeleton drawn on them
    Export(ExportArgs),
    /// Regenerate annotations.json from Keypoints.csv
    Coco(DirArgs),
    /// Validate the project config and the schema library
    Validate,
    /// List images in natural order with label counts
    List(DirArgs),
}

/// Arguments naming an image directory.
#[derive(Args, Debug)]
pub struct DirArgs {
    /// Image directory
    #[arg(short, long)]
    pub dir: PathBuf,
}

/// Arguments for the export command.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Image directory with Keypoints.csv
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Output directory [default: <dir>/Export]
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Point radius in pixels
    #[arg(long, default_value_t = 0.2)]
    pub point_size: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_args_defaults() {
        let args = Cli::parse_from(["app", "export", "--dir", "imgs"]);
        assert_eq!(args.config_root, PathBuf::from("."));
        assert!(!args.verbose);
        assert!(!args.quiet);
        match args.command {
            Commands::Export(export) => {
                assert_eq!(export.dir, PathBuf::from("imgs"));
                assert!(export.out.is_none());
                assert!((export.point_size - 0.2).abs() < f64::EPSILON);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Cli::parse_from(["app", "label", "-d", "imgs", "--config-root", "cfg", "--verbose"]);
        assert_eq!(args.config_root, PathBuf::from("cfg"));
        assert!(args.verbose);
        assert!(matches!(args.command, Commands::Label(DirArgs { ref dir }) if dir == &PathBuf::from("imgs")));
    }

    #[test]
    fn test_quiet_flag() {
        let args = Cli::parse_from(["app", "-q", "label", "-d", "imgs"]);
        assert!(args.quiet);
        let args = Cli::parse_from(["app", "list", "--dir", "imgs", "--quiet"]);
        assert!(args.quiet);
    }
}
