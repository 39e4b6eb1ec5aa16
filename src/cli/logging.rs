// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Console output levels shared by the library and the CLI.
//!
//! Warnings and errors always go to stderr. Informational output goes to
//! stdout and is silenced by [`Level::Quiet`], so a scripted `label` session
//! only sees its own command replies there.

use std::sync::atomic::{AtomicU8, Ordering};

/// How much informational output to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Warnings and errors only.
    Quiet = 0,
    /// Status and success messages.
    Normal = 1,
    /// Everything, including per-file detail.
    Verbose = 2,
}

impl Level {
    /// Level selected by the `--quiet` / `--verbose` flags. Quiet wins.
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Quiet,
            1 => Self::Normal,
            _ => Self::Verbose,
        }
    }
}

static LEVEL: AtomicU8 = AtomicU8::new(Level::Normal as u8);

/// Set the global output level.
pub fn set_level(level: Level) {
    LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Current output level.
pub fn level() -> Level {
    Level::from_u8(LEVEL.load(Ordering::Relaxed))
}

/// Whether messages at `at` are printed.
pub fn enabled(at: Level) -> bool {
    level() >= at
}

/// Status line on stdout.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        if $crate::cli::logging::enabled($crate::cli::logging::Level::Normal) {
            println!("{}", format!($($arg)*));
        }
    }}
}

/// Degraded-but-continuing condition on stderr.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "WARNING ⚠️".yellow().bold(), format!($($arg)*));
    }}
}

/// Failure on stderr.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "Error:".red().bold(), format!($($arg)*));
    }}
}

/// Completed write or check.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        if $crate::cli::logging::enabled($crate::cli::logging::Level::Normal) {
            println!("{} {}", "✅".green(), format!($($arg)*));
        }
    }}
}

/// Per-item detail, `--verbose` only.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {{
        if $crate::cli::logging::enabled($crate::cli::logging::Level::Verbose) {
            println!("{}", format!($($arg)*));
        }
    }}
}

/// Header before a command's output, `--verbose` only.
#[macro_export]
macro_rules! section {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        if $crate::cli::logging::enabled($crate::cli::logging::Level::Verbose) {
            println!();
            println!("{}", format!($($arg)*).cyan().bold());
        }
    }}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_select_level() {
        assert_eq!(Level::from_flags(false, false), Level::Normal);
        assert_eq!(Level::from_flags(false, true), Level::Verbose);
        assert_eq!(Level::from_flags(true, true), Level::Quiet);
    }

    #[test]
    fn test_level_gates_output() {
        set_level(Level::Quiet);
        assert!(!enabled(Level::Normal));

        set_level(Level::Verbose);
        assert!(enabled(Level::Normal));
        assert!(enabled(Level::Verbose));

        set_level(Level::Normal);
        assert_eq!(level(), Level::Normal);
        assert!(!enabled(Level::Verbose));
    }
}
