// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Line-oriented labeling session.

use std::io::{BufRead, Write};

use crate::cursor::ChangeEvent;
use crate::error::{AnnotatorError, Result};
use crate::session::{Action, ActionOutcome, AnnotationSession, Key};
use crate::store::SceneRect;
use crate::{verbose, warn};

/// One parsed input line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelCommand {
    /// A session action.
    Act(Action),
    /// Print the current image, progress and next target.
    Status,
    /// Leave the session.
    Quit,
}

fn parse_f64(token: Option<&str>, what: &str) -> std::result::Result<f64, String> {
    let token = token.ok_or_else(|| format!("missing {what}"))?;
    token
        .parse()
        .map_err(|_| format!("invalid {what}: '{token}'"))
}

fn parse_usize(token: Option<&str>) -> std::result::Result<usize, String> {
    let token = token.ok_or("missing keypoint index")?;
    token
        .parse()
        .map_err(|_| format!("invalid keypoint index: '{token}'"))
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
///
/// # Errors
///
/// Returns a message describing an unknown command or bad argument.
pub fn parse_command(line: &str) -> std::result::Result<Option<LabelCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut tokens = line.split_whitespace();
    let Some(word) = tokens.next() else {
        return Ok(None);
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "place" | "f" => {
            let x = parse_f64(tokens.next(), "x")?;
            let y = parse_f64(tokens.next(), "y")?;
            Action::from_key(Key::Char('f'), false, Some((x, y))).map(LabelCommand::Act)
        }
        "click" => {
            let x = parse_f64(tokens.next(), "x")?;
            let y = parse_f64(tokens.next(), "y")?;
            Some(LabelCommand::Act(Action::ClickAt { x, y }))
        }
        "select" => Some(LabelCommand::Act(Action::SelectPoint(parse_usize(tokens.next())?))),
        "toggle" => Some(LabelCommand::Act(Action::TogglePoint(parse_usize(tokens.next())?))),
        "rect" => {
            let mut coords = [0.0; 4];
            for (slot, name) in coords.iter_mut().zip(["x0", "y0", "x1", "y1"]) {
                *slot = parse_f64(tokens.next(), name)?;
            }
            let [x0, y0, x1, y1] = coords;
            Some(LabelCommand::Act(Action::SelectRect(SceneRect::from_corners(x0, y0, x1, y1))))
        }
        "delete" | "del" => Action::from_key(Key::Delete, false, None).map(LabelCommand::Act),
        "clear" | "esc" => Action::from_key(Key::Escape, false, None).map(LabelCommand::Act),
        "next" | "d" => Action::from_key(Key::Char('d'), false, None).map(LabelCommand::Act),
        "prev" | "a" => Action::from_key(Key::Char('a'), false, None).map(LabelCommand::Act),
        "save" => Action::from_key(Key::Char('s'), true, None).map(LabelCommand::Act),
        "status" => Some(LabelCommand::Status),
        "quit" | "exit" | "q" => Some(LabelCommand::Quit),
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(command)
}

fn write_status<W: Write>(session: &AnnotationSession, out: &mut W) -> Result<()> {
    let Some(image) = session.current_image() else {
        writeln!(out, "no image open")?;
        return Ok(());
    };
    let (position, total) = session.position()?.unwrap_or((0, 0));
    let cursor = session.cursor();
    let n = session.schema().len();
    let labeled = cursor.points().count_in_schema(n);
    let target = if cursor.is_complete() {
        "complete (place again to advance)".to_string()
    } else {
        cursor
            .get_next_target()
            .and_then(|idx| session.schema().bodypart(idx).map(|name| format!("{idx} {name}")))
            .unwrap_or_else(|| "-".to_string())
    };
    writeln!(
        out,
        "[{position}/{total}] {image}: {labeled}/{n} labeled, next: {target}{}",
        if session.has_unsaved_changes() { " *" } else { "" }
    )?;
    Ok(())
}

fn report_events(session: &mut AnnotationSession) {
    for event in session.drain_events() {
        match event {
            ChangeEvent::PointsChanged(points) => verbose!("points: {} labeled", points.len()),
            ChangeEvent::SelectionChanged(selection) => verbose!("selection: {selection:?}"),
        }
    }
}

fn write_outcome<W: Write>(
    session: &AnnotationSession,
    outcome: &ActionOutcome,
    out: &mut W,
) -> Result<()> {
    match outcome {
        ActionOutcome::Placed { index, next } => {
            let name = session.schema().bodypart(*index).unwrap_or("?");
            match next {
                Some(next) => writeln!(out, "placed {index} {name}, next {next}")?,
                None => writeln!(out, "placed {index} {name}, image complete")?,
            }
        }
        ActionOutcome::Navigated(Some(image)) => writeln!(out, "opened {image}")?,
        ActionOutcome::Navigated(None) => writeln!(out, "no more images in that direction")?,
        ActionOutcome::Selection => {
            let selection: Vec<String> = session
                .cursor()
                .selection()
                .iter()
                .map(ToString::to_string)
                .collect();
            writeln!(out, "selected [{}]", selection.join(", "))?;
        }
        ActionOutcome::Deleted(n) => writeln!(out, "deleted {n} point(s)")?,
        ActionOutcome::Saved(report) => {
            writeln!(out, "{}", report.message())?;
        }
        ActionOutcome::Ignored => writeln!(out, "ignored")?,
    }
    Ok(())
}

/// Drive `session` with commands from `input` until `quit` or end of input.
///
/// Quitting with unsaved changes needs a second `quit` to confirm. Returns
/// `false` when input ended while changes were still unsaved; those changes
/// are not written.
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub fn run_label_loop<R: BufRead, W: Write>(
    session: &mut AnnotationSession,
    input: R,
    out: &mut W,
) -> Result<bool> {
    write_status(session, out)?;
    let mut quit_armed = false;
    let mut confirmed = false;

    for line in input.lines() {
        let line = line?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(msg) => {
                writeln!(out, "error: {msg}")?;
                continue;
            }
        };

        match command {
            LabelCommand::Quit => {
                if !session.has_unsaved_changes() || quit_armed {
                    confirmed = true;
                    break;
                }
                quit_armed = true;
                writeln!(out, "unsaved changes: 'save' first, or 'quit' again to discard")?;
                continue;
            }
            LabelCommand::Status => write_status(session, out)?,
            LabelCommand::Act(action) => match session.apply(action) {
                Ok(outcome) => {
                    report_events(session);
                    write_outcome(session, &outcome, out)?;
                }
                Err(e @ AnnotatorError::FileError { .. }) => {
                    warn!("{e}");
                    writeln!(out, "error: {e}")?;
                }
                Err(e) => writeln!(out, "error: {e}")?,
            },
        }
        quit_armed = false;
    }
    let clean = confirmed || !session.has_unsaved_changes();
    if !clean {
        warn!("Input ended with unsaved changes, nothing was written");
        writeln!(out, "unsaved changes discarded: input ended before 'save'")?;
    }
    out.flush()?;
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("place 1.5 2"),
            Ok(Some(LabelCommand::Act(Action::PlacePoint { x: 1.5, y: 2.0 })))
        );
        assert_eq!(
            parse_command("F 3 4"),
            Ok(Some(LabelCommand::Act(Action::PlacePoint { x: 3.0, y: 4.0 })))
        );
        assert_eq!(
            parse_command("toggle 2"),
            Ok(Some(LabelCommand::Act(Action::TogglePoint(2))))
        );
        assert_eq!(parse_command("d"), Ok(Some(LabelCommand::Act(Action::NextImage))));
        assert_eq!(parse_command("save"), Ok(Some(LabelCommand::Act(Action::Save))));
        assert_eq!(parse_command("  # comment"), Ok(None));
        assert_eq!(parse_command("q"), Ok(Some(LabelCommand::Quit)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("place 1").is_err());
        assert!(parse_command("select x").is_err());
        assert!(parse_command("rect 1 2 3").is_err());
        assert!(parse_command("jump").is_err());
    }

    fn labeled_session() -> (tempfile::TempDir, AnnotationSession) {
        use crate::schema::KeypointSchema;
        use crate::settings::AnnotatorConfig;

        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::new(32, 32).save(dir.path().join("1.png")).unwrap();
        let schema =
            KeypointSchema::new("t", ["a", "b"], [crate::schema::Connection::new(0, 1)]);
        let mut session = AnnotationSession::new(schema, AnnotatorConfig::default());
        session.open_directory(dir.path()).unwrap();
        (dir, session)
    }

    fn run(session: &mut AnnotationSession, input: &str) -> (bool, String) {
        let mut out = Vec::new();
        let clean = run_label_loop(session, input.as_bytes(), &mut out).unwrap();
        (clean, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_end_of_input_with_unsaved_changes_is_reported() {
        let (_dir, mut session) = labeled_session();
        let (clean, out) = run(&mut session, "place 3 4\n");
        assert!(!clean);
        assert!(out.contains("unsaved changes discarded"));
    }

    #[test]
    fn test_quit_needs_confirmation_when_unsaved() {
        let (_dir, mut session) = labeled_session();
        let (clean, out) = run(&mut session, "place 3 4\nquit\nquit\n");
        assert!(clean);
        assert!(out.contains("'quit' again to discard"));
    }

    #[test]
    fn test_saved_session_ends_cleanly() {
        let (dir, mut session) = labeled_session();
        let (clean, _) = run(&mut session, "place 3 4\nsave\n");
        assert!(clean);
        assert!(dir.path().join("Keypoints.csv").is_file());
    }

    #[test]
    fn test_rect_is_normalized() {
        let Ok(Some(LabelCommand::Act(Action::SelectRect(rect)))) = parse_command("rect 20 20 0 0")
        else {
            panic!("expected a rectangle");
        };
        assert_eq!(rect, SceneRect::from_corners(0.0, 0.0, 20.0, 20.0));
    }
}
