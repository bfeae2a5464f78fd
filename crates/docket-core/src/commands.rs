pub mod shell;

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::board::TaskBoard;
use crate::cli::{Command, RecordArgs, parse_row_ref};
use crate::filter::TaskSelector;
use crate::render::Renderer;
use crate::task::TaskStatus;

/// Search text and kind filter given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ViewArgs {
    pub query: Option<String>,
    pub selector: Option<TaskSelector>,
}

impl ViewArgs {
    pub fn apply(self, board: &mut TaskBoard) {
        if let Some(query) = self.query {
            board.set_query(query);
        }
        if let Some(selector) = self.selector {
            board.set_selector(selector);
        }
    }
}

pub fn command_name(command: &Command) -> &'static str {
    match command {
        Command::List => "list",
        Command::Add(_) => "add",
        Command::Edit { .. } => "edit",
        Command::Status { .. } => "status",
        Command::Notes { .. } => "notes",
        Command::Delete { .. } => "delete",
        Command::Duplicate { .. } => "duplicate",
        Command::Shell => "shell",
    }
}

/// Loads the board, runs one command and renders the result. A failed
/// command still renders the board before its error is returned.
#[instrument(skip_all, fields(command = command_name(&command)))]
pub async fn dispatch(
    board: &mut TaskBoard,
    renderer: &Renderer,
    view: ViewArgs,
    command: Command,
) -> anyhow::Result<()> {
    if matches!(command, Command::Shell) {
        if let Err(err) = board.load().await {
            eprintln!("error: {err}");
        }
        view.apply(board);
        let stdin = std::io::stdin();
        return shell::run(board, renderer, stdin.lock(), std::io::stdout()).await;
    }

    let count = board.load().await.context("failed to load tasks")?;
    view.apply(board);
    debug!(count, shown = board.view().len(), "board ready");

    let outcome = run_command(board, command).await;
    renderer.print_board(board)?;
    outcome
}

async fn run_command(board: &mut TaskBoard, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List | Command::Shell => {}
        Command::Add(fields) => {
            board.open_for_create();
            fill_form(board, &fields)?;
            board.submit().await?;
            info!("task created");
        }
        Command::Edit { row, fields } => {
            board.open_for_edit(parse_row_ref(&row)?)?;
            fill_form(board, &fields)?;
            board.submit().await?;
            info!(row = %row, "task updated");
        }
        Command::Status { row, status } => {
            let target = parse_row_ref(&row)?;
            match status {
                Some(text) => {
                    let status: TaskStatus = text.parse()?;
                    board.set_status(target, status).await?;
                }
                None => board.toggle_status(target).await?,
            }
        }
        Command::Notes { row, text } => {
            board.open_notes(parse_row_ref(&row)?)?;
            board.notes_session_mut().set_notes(text);
            board.save_notes().await?;
        }
        Command::Delete { row } => {
            board.delete(parse_row_ref(&row)?).await?;
        }
        Command::Duplicate { row } => {
            let id = board.duplicate(parse_row_ref(&row)?)?;
            println!("duplicated {row} as {id} (local only)");
        }
    }
    Ok(())
}

fn fill_form(board: &mut TaskBoard, fields: &RecordArgs) -> anyhow::Result<()> {
    for (field, value) in fields.assignments() {
        board.session_mut().set_field(field, value)?;
    }
    Ok(())
}
