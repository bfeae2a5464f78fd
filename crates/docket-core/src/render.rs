use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::board::TaskBoard;
use crate::config::Config;
use crate::filter::{KindFlag, TaskSelector};
use crate::session::ModalMode;
use crate::task::{TaskRecord, TaskStatus};
use crate::toggle::{self, DropdownKind};

const ACTIONS: &str = "edit | notes | duplicate | delete";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    /// Renderer that never emits escape codes.
    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_board(&self, board: &TaskBoard) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_board(&mut out, board)
    }

    /// Filter line, task table, open menus, then any open form.
    pub fn write_board<W: Write>(&self, mut out: W, board: &TaskBoard) -> anyhow::Result<()> {
        let view = board.view();
        writeln!(
            out,
            "search: {:?}  kinds: {}  ({} of {} tasks)",
            board.query(),
            describe_selector(&board.selector()),
            view.len(),
            board.canonical().len()
        )?;
        if board.filter_menu_open() {
            writeln!(out, "{}", filter_menu(&board.selector()))?;
        }
        writeln!(out)?;

        if view.is_empty() {
            writeln!(out, "No tasks match.")?;
        } else {
            self.write_tasks(&mut out, view)?;
        }

        if let Some(row) = toggle::open_row(view, DropdownKind::Status) {
            writeln!(out, "status menu on #{}: Open | Closed", row + 1)?;
        }
        if let Some(row) = toggle::open_row(view, DropdownKind::Action) {
            writeln!(out, "actions on #{}: {ACTIONS}", row + 1)?;
        }

        let session = board.session();
        if let Some(mode) = session.mode() {
            let title = match mode {
                ModalMode::Create => "new task",
                ModalMode::Edit => "edit task",
            };
            writeln!(out)?;
            writeln!(out, "[{title}]")?;
            write_fields(&mut out, session.draft())?;
            if let Some(err) = session.error() {
                writeln!(out, "{}", self.paint(&format!("error: {err}"), "31"))?;
            }
        }

        let notes = board.notes_session();
        if notes.is_open() {
            let target = notes
                .target()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(out)?;
            writeln!(out, "[notes for {target}]")?;
            writeln!(out, "{}", notes.notes())?;
            if let Some(err) = notes.error() {
                writeln!(out, "{}", self.paint(&format!("error: {err}"), "31"))?;
            }
        }

        Ok(())
    }

    fn write_tasks<W: Write>(&self, out: W, tasks: &[TaskRecord]) -> anyhow::Result<()> {
        let headers = [
            "#", "ID", "Date", "Time", "Entity", "Task", "Person", "Status", "Notes",
        ]
        .map(String::from)
        .to_vec();

        let mut rows = Vec::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            let id = match &task.id {
                Some(id) if id.is_local() => self.paint("local", "33"),
                Some(id) => id.to_string(),
                None => "-".to_string(),
            };
            let status = match task.status {
                TaskStatus::Open => self.paint(task.status.label(), "32"),
                TaskStatus::Closed => self.paint(task.status.label(), "90"),
            };
            let status = if task.status_dropdown_open {
                format!("{status} v")
            } else {
                status
            };
            let marker = if task.action_dropdown_open { "*" } else { "" };

            rows.push(vec![
                format!("{}{marker}", idx + 1),
                id,
                task.date.clone(),
                task.time.clone(),
                task.entity.clone(),
                task.task.label().to_string(),
                task.person.clone(),
                status,
                first_line(&task.notes),
            ]);
        }

        write_table(out, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn describe_selector(selector: &TaskSelector) -> String {
    if selector.all {
        return "all".to_string();
    }
    let picked: Vec<&str> = [
        (KindFlag::Call, "Call"),
        (KindFlag::Meeting, "Meeting"),
        (KindFlag::VideoCall, "Video Call"),
    ]
    .into_iter()
    .filter(|(flag, _)| selector.is_set(*flag))
    .map(|(_, label)| label)
    .collect();

    if picked.is_empty() {
        "none".to_string()
    } else {
        picked.join(", ")
    }
}

fn filter_menu(selector: &TaskSelector) -> String {
    [
        (KindFlag::All, "All"),
        (KindFlag::Call, "Call"),
        (KindFlag::Meeting, "Meeting"),
        (KindFlag::VideoCall, "Video Call"),
    ]
    .into_iter()
    .map(|(flag, label)| {
        let mark = if selector.is_set(flag) { 'x' } else { ' ' };
        format!("[{mark}] {label}")
    })
    .collect::<Vec<_>>()
    .join("  ")
}

fn write_fields<W: Write>(mut out: W, task: &TaskRecord) -> anyhow::Result<()> {
    let labels = ["date", "time", "entity", "task", "person", "notes", "status"];
    for (label, value) in labels.iter().zip(task.text_fields()) {
        writeln!(out, "  {label:<7} {value}")?;
    }
    Ok(())
}

fn first_line(text: &str) -> String {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or_default().to_string();
    if lines.next().is_some() {
        format!("{first} ...")
    } else {
        first
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_align_on_display_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["A".to_string(), "B".to_string()],
            vec![
                vec!["日本".to_string(), "x".to_string()],
                vec!["\x1b[32mok\x1b[0m".to_string(), "y".to_string()],
            ],
        )
        .expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A    B ");
        assert_eq!(lines[1], "---- - ");
        assert_eq!(lines[2], "日本 x ");
        assert_eq!(strip_ansi(lines[3]), "ok   y ");
    }

    #[test]
    fn selector_descriptions() {
        assert_eq!(describe_selector(&TaskSelector::all()), "all");
        assert_eq!(describe_selector(&TaskSelector::none()), "none");
        let mut selector = TaskSelector::only(KindFlag::Call);
        selector.toggle(KindFlag::VideoCall);
        assert_eq!(describe_selector(&selector), "Call, Video Call");
        assert_eq!(
            filter_menu(&selector),
            "[ ] All  [x] Call  [ ] Meeting  [x] Video Call"
        );
    }

    #[test]
    fn notes_column_shows_first_line() {
        assert_eq!(first_line("one\ntwo"), "one ...");
        assert_eq!(first_line(""), "");
    }
}
