//! Line-oriented session over one board. Each line is one user action;
//! errors are printed and the session carries on.

use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, instrument};

use crate::board::TaskBoard;
use crate::cli::parse_row_ref;
use crate::filter::KindFlag;
use crate::render::Renderer;
use crate::task::{TaskField, TaskStatus};
use crate::toggle::DropdownKind;

const HELP: &str = "\
commands:
  show                      print the board
  search [TEXT]             filter by TEXT as typed, spaces included (no TEXT clears)
  kind FLAG                 flip a task-type checkbox (all, call, meeting, video-call)
  only FLAG                 check one task-type box exclusively
  filters                   open or close the task-type menu
  status-menu ROW           open or close a row's status menu
  action-menu ROW           open or close a row's action menu
  close-menus               close every row menu
  new                       open an empty form
  edit ROW                  open the form on a row
  set FIELD VALUE           set a form field
  submit | cancel           submit or discard the form
  notes ROW                 open the notes form on a row
  note-text TEXT            replace the text in the notes form, as typed
  save-notes | close-notes  save or discard the notes form
  status ROW [Open|Closed]  set or flip a row's status
  delete ROW                delete a row
  duplicate ROW             copy a row locally
  reload                    fetch all tasks again
  quit
ROW is #N for the Nth row shown, or a task id.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Quiet,
    Render,
    Quit,
}

/// Runs until `quit` or end of input.
#[instrument(skip_all)]
pub async fn run<R, W>(
    board: &mut TaskBoard,
    renderer: &Renderer,
    input: R,
    mut out: W,
) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
{
    renderer.write_board(&mut out, board)?;
    write!(out, "> ")?;
    out.flush()?;

    for line in input.lines() {
        let line = line.context("failed to read command")?;
        match execute(board, &mut out, &line).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Render) => renderer.write_board(&mut out, board)?,
            Ok(Flow::Quiet) => {}
            Err(err) => writeln!(out, "error: {err:#}")?,
        }
        write!(out, "> ")?;
        out.flush()?;
    }

    writeln!(out)?;
    Ok(())
}

/// Splits off the first word. The rest starts after the single separator
/// and is returned untrimmed.
fn split_word(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest),
        None => (line, ""),
    }
}

fn required<'a>(arg: &'a str, what: &str) -> anyhow::Result<&'a str> {
    if arg.is_empty() {
        Err(anyhow!("missing {what}"))
    } else {
        Ok(arg)
    }
}

async fn execute<W: Write>(board: &mut TaskBoard, out: &mut W, line: &str) -> anyhow::Result<Flow> {
    let (word, text) = split_word(line);
    let arg = text.trim();
    debug!(command = word, "shell command");

    match word {
        "" => return Ok(Flow::Quiet),
        "quit" | "exit" => return Ok(Flow::Quit),
        "help" => {
            writeln!(out, "{HELP}")?;
            return Ok(Flow::Quiet);
        }
        "show" => {}
        "search" => board.set_query(text),
        "kind" => board.toggle_kind(required(arg, "task type")?.parse::<KindFlag>()?),
        "only" => board.select_kind(required(arg, "task type")?.parse::<KindFlag>()?),
        "filters" => {
            board.toggle_filter_menu();
        }
        "status-menu" => {
            board.toggle_dropdown(DropdownKind::Status, parse_row_ref(required(arg, "row")?)?)?;
        }
        "action-menu" => {
            board.toggle_dropdown(DropdownKind::Action, parse_row_ref(required(arg, "row")?)?)?;
        }
        "close-menus" => {
            board.close_menus(DropdownKind::Status);
            board.close_menus(DropdownKind::Action);
        }
        "new" => board.open_for_create(),
        "edit" => board.open_for_edit(parse_row_ref(required(arg, "row")?)?)?,
        "set" => {
            let (field, value) = split_word(required(arg, "field")?);
            let field: TaskField = field.parse()?;
            if !board.session().is_open() {
                return Err(anyhow!("no form is open; use new or edit first"));
            }
            board.session_mut().set_field(field, value.trim())?;
        }
        "submit" => board.submit().await?,
        "cancel" => board.cancel(),
        "notes" => board.open_notes(parse_row_ref(required(arg, "row")?)?)?,
        "note-text" => {
            if !board.notes_session().is_open() {
                return Err(anyhow!("no notes form is open; use notes first"));
            }
            board.notes_session_mut().set_notes(text);
        }
        "save-notes" => board.save_notes().await?,
        "close-notes" => board.close_notes(),
        "status" => {
            let (row, status) = split_word(required(arg, "row")?);
            let row = parse_row_ref(row)?;
            let status = status.trim();
            if status.is_empty() {
                board.toggle_status(row).await?;
            } else {
                board.set_status(row, status.parse::<TaskStatus>()?).await?;
            }
        }
        "delete" => board.delete(parse_row_ref(required(arg, "row")?)?).await?,
        "duplicate" => {
            let id = board.duplicate(parse_row_ref(required(arg, "row")?)?)?;
            writeln!(out, "duplicated as {id} (local only)")?;
        }
        "reload" => {
            let count = board.load().await?;
            writeln!(out, "loaded {count} tasks")?;
        }
        other => return Err(anyhow!("unknown command '{other}' (try help)")),
    }

    Ok(Flow::Render)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_split_on_first_whitespace() {
        assert_eq!(split_word("  set entity  Acme Corp "), ("set", "entity  Acme Corp "));
        assert_eq!(split_word("search  foo "), ("search", " foo "));
        assert_eq!(split_word("submit"), ("submit", ""));
        assert_eq!(split_word("   "), ("", ""));
        assert!(required("", "row").is_err());
    }
}
