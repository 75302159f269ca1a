//! Line-command loop driving an edit session over an in-memory grid.
//!
//! Rows are addressed by their data row number as printed by `show`;
//! columns by dataset column name or index. Engine errors are printed and
//! the loop continues; only I/O failures end it.

use std::cell::Cell;
use std::io::{BufRead, Write};
use std::rc::Rc;

use gridedit_engine::display::DisplayMode;
use gridedit_engine::grid::{DeleteOutcome, Grid, MemoryGrid};
use gridedit_engine::history::{HistoryState, Replay};
use gridedit_engine::layout::{DataCoord, GridCoord};
use gridedit_engine::save::Persistence;
use gridedit_engine::session::{EditSession, SessionState};
use gridedit_engine::years::YearPager;

use crate::exit_codes::EXIT_IO;
use crate::CliError;

const HELP: &str = "\
Commands:
  show                       print the visible rows
  begin                      enter edit mode
  set <row> <col> <value>    edit a cell (col = name or index)
  undo | redo                step through edit history
  search <term>              filter rows (no term clears)
  mode raw|friendly          switch value rendering
  delete <row>...            delete rows
  save                       send the table to the server
  cancel                     leave edit mode, discarding edits
  years [next|prev]          list years in the date column
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Begin,
    Set { row: usize, column: String, value: String },
    Undo,
    Redo,
    Search(String),
    Mode(DisplayMode),
    Delete(Vec<usize>),
    Save,
    Cancel,
    Years(Option<PageStep>),
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    Next,
    Previous,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let (word, rest) = split_word(line.trim());
    let cmd = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "show" | "ls" => Command::Show,
        "begin" | "edit" => Command::Begin,
        "set" => {
            let (row, rest) = split_word(rest);
            let (column, value) = split_word(rest);
            if row.is_empty() || column.is_empty() {
                return Err("usage: set <row> <col> <value>".to_string());
            }
            Command::Set {
                row: parse_row(row)?,
                column: column.to_string(),
                value: value.to_string(),
            }
        }
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "search" => Command::Search(rest.to_string()),
        "mode" => Command::Mode(rest.parse().map_err(|_| "usage: mode raw|friendly".to_string())?),
        "delete" | "rm" => {
            let rows = rest.split_whitespace().map(parse_row).collect::<Result<Vec<_>, _>>()?;
            if rows.is_empty() {
                return Err("usage: delete <row>...".to_string());
            }
            Command::Delete(rows)
        }
        "save" => Command::Save,
        "cancel" => Command::Cancel,
        "years" => match rest {
            "" => Command::Years(None),
            "next" => Command::Years(Some(PageStep::Next)),
            "prev" | "previous" => Command::Years(Some(PageStep::Previous)),
            _ => return Err("usage: years [next|prev]".to_string()),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command {:?} (try `help`)", other)),
    };
    Ok(Some(cmd))
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim_start()),
        None => (s, ""),
    }
}

fn parse_row(s: &str) -> Result<usize, String> {
    s.parse().map_err(|_| format!("not a row number: {:?}", s))
}

enum Flow {
    Continue,
    Quit,
}

/// Terminal side of the loop: output plus yes/no questions.
struct Prompt<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    /// Ask a y/N question. Unreadable input counts as no.
    fn confirm(&mut self, question: &str) -> bool {
        if self.assume_yes {
            let _ = writeln!(self.output, "{} [y/N] y", question);
            return true;
        }
        let _ = write!(self.output, "{} [y/N] ", question);
        let _ = self.output.flush();

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReplOptions {
    /// Answer yes to every confirmation
    pub assume_yes: bool,
    /// Ask before discarding unsaved edits
    pub confirm_discard: bool,
}

pub struct Repl<P, R, W> {
    grid: MemoryGrid,
    session: EditSession,
    server: P,
    pager: YearPager,
    history: Rc<Cell<HistoryState>>,
    confirm_discard: bool,
    io: Prompt<R, W>,
}

impl<P, R, W> Repl<P, R, W>
where
    P: Persistence,
    R: BufRead,
    W: Write,
{
    pub fn new(grid: MemoryGrid, years: Vec<i32>, server: P, input: R, output: W, opts: ReplOptions) -> Self {
        let pager = match grid.search().trim().parse::<i32>() {
            Ok(year) => YearPager::showing(years, year),
            Err(_) => YearPager::new(years),
        };

        let history = Rc::new(Cell::new(HistoryState::default()));
        let sink = Rc::clone(&history);
        let mut session = EditSession::new();
        session.set_history_listener(Box::new(move |state| sink.set(state)));

        Self {
            grid,
            session,
            server,
            pager,
            history,
            confirm_discard: opts.confirm_discard,
            io: Prompt { input, output, assume_yes: opts.assume_yes },
        }
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn grid(&self) -> &MemoryGrid {
        &self.grid
    }

    /// Read commands until `quit` or end of input.
    pub fn run(&mut self) -> Result<(), CliError> {
        self.status()?;
        loop {
            let prompt = self.prompt();
            write!(self.io.output, "{}", prompt)?;
            self.io.output.flush()?;

            let mut line = String::new();
            if self.io.input.read_line(&mut line)? == 0 {
                if self.session.has_unsaved_changes() {
                    writeln!(self.io.output, "\nend of input: unsaved changes discarded")?;
                }
                break;
            }

            let cmd = match parse_command(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => continue,
                Err(msg) => {
                    writeln!(self.io.output, "error: {}", msg)?;
                    continue;
                }
            };

            match self.execute(cmd) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) if e.code == EXIT_IO => return Err(e),
                Err(e) => writeln!(self.io.output, "error: {}", e.message)?,
            }
        }
        Ok(())
    }

    fn prompt(&self) -> &'static str {
        match self.session.state() {
            SessionState::Idle => "> ",
            SessionState::Editing if self.session.has_unsaved_changes() => "edit*> ",
            SessionState::Editing => "edit> ",
            SessionState::Saving => "saving> ",
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<Flow, CliError> {
        match cmd {
            Command::Show => self.show()?,
            Command::Begin => self.begin()?,
            Command::Set { row, column, value } => self.set(row, &column, &value)?,
            Command::Undo => self.replay(true)?,
            Command::Redo => self.replay(false)?,
            Command::Search(term) => {
                self.grid.set_search(&term).map_err(|e| CliError::engine(e.into()))?;
                self.status()?;
            }
            Command::Mode(mode) => {
                self.grid.set_mode(mode);
                self.status()?;
            }
            Command::Delete(rows) => self.delete(&rows)?,
            Command::Save => self.save()?,
            Command::Cancel => self.cancel()?,
            Command::Years(step) => self.years(step)?,
            Command::Help => writeln!(self.io.output, "{}", HELP)?,
            Command::Quit => return Ok(self.quit()),
        }
        Ok(Flow::Continue)
    }

    fn status(&mut self) -> Result<(), CliError> {
        let mode = match self.grid.mode() {
            DisplayMode::Raw => "raw",
            DisplayMode::Friendly => "friendly",
        };
        let search = self.grid.search();
        writeln!(
            self.io.output,
            "{} of {} rows{} [{} values]",
            self.grid.visible_count(),
            self.grid.row_count(),
            if search.is_empty() { String::new() } else { format!(" matching {:?}", search) },
            mode
        )?;
        Ok(())
    }

    fn show(&mut self) -> Result<(), CliError> {
        let width = self.grid.layout().grid_width();
        let header = self.grid.layout().dataset_header().join(" | ");
        writeln!(self.io.output, " row | {}", header)?;

        for &row in self.grid.visible_rows() {
            let cells: Vec<String> = (1..width.saturating_sub(1))
                .map(|col| self.grid.display_text(GridCoord::new(row, col)).unwrap_or_default())
                .collect();
            writeln!(self.io.output, "{:>4} | {}", row, cells.join(" | "))?;
        }
        self.status()
    }

    fn begin(&mut self) -> Result<(), CliError> {
        if self.session.is_editing() && !self.session.has_unsaved_changes() {
            writeln!(self.io.output, "already editing")?;
            return Ok(());
        }
        let ask = self.confirm_discard;
        let started = self
            .session
            .begin(&mut self.grid, || !ask || self.io.confirm("Discard unsaved changes and start over?"))
            .map_err(CliError::engine)?;
        if started {
            writeln!(self.io.output, "edit mode on")?;
        } else {
            writeln!(self.io.output, "kept current edits")?;
        }
        Ok(())
    }

    fn set(&mut self, row: usize, column: &str, value: &str) -> Result<(), CliError> {
        let coord = self.resolve(row, column)?;
        let old = self.grid.cell(coord).unwrap_or_default();
        let changed = self.session.edit(&mut self.grid, coord, value).map_err(CliError::engine)?;
        if changed {
            let note = self.history_note();
            writeln!(self.io.output, "row {} {}: {:?} -> {:?}{}", row, column, old, value, note)?;
        } else {
            writeln!(self.io.output, "unchanged")?;
        }
        Ok(())
    }

    /// Data row + column name/index to a grid coordinate.
    fn resolve(&self, row: usize, column: &str) -> Result<GridCoord, CliError> {
        let layout = self.grid.layout();
        let col = match column.parse::<usize>() {
            Ok(idx) => idx,
            Err(_) => layout
                .dataset_header()
                .iter()
                .position(|h| h.eq_ignore_ascii_case(column))
                .ok_or_else(|| CliError::args(format!("unknown column {:?}", column)))?,
        };
        layout
            .to_grid(DataCoord::new(row, col))
            .ok_or_else(|| CliError::args(format!("column {} is out of range", col)))
    }

    fn replay(&mut self, undo: bool) -> Result<(), CliError> {
        let verb = if undo { "undo" } else { "redo" };
        let replay = if undo {
            self.session.undo(&mut self.grid)
        } else {
            self.session.redo(&mut self.grid)
        }
        .map_err(CliError::engine)?;

        let note = self.history_note();
        match replay {
            None => writeln!(self.io.output, "nothing to {}", verb)?,
            Some(Replay::Applied(cmd)) => {
                let value = if undo { &cmd.old_value } else { &cmd.new_value };
                let column = self.column_name(cmd.coord);
                writeln!(self.io.output, "{}: row {} {} = {:?}{}", verb, cmd.coord.row, column, value, note)?;
            }
            Some(Replay::Stale(cmd, _)) => writeln!(
                self.io.output,
                "{} skipped: row {} no longer exists{}",
                verb, cmd.coord.row, note
            )?,
        }
        Ok(())
    }

    fn column_name(&self, coord: GridCoord) -> String {
        self.grid
            .layout()
            .to_dataset(coord)
            .and_then(|d| self.grid.layout().dataset_header().get(d.col).cloned())
            .unwrap_or_else(|| coord.col.to_string())
    }

    fn history_note(&self) -> String {
        let state = self.history.get();
        format!("  (undo {}, redo {})", state.undo_depth, state.redo_depth)
    }

    fn delete(&mut self, rows: &[usize]) -> Result<(), CliError> {
        let outcome = self
            .session
            .delete_rows(&mut self.grid, rows, |n| self.io.confirm(&format!("Delete {} row(s)?", n)))
            .map_err(CliError::engine)?;

        match outcome {
            DeleteOutcome::Declined => writeln!(self.io.output, "nothing deleted")?,
            DeleteOutcome::Deleted { count, table_empty } => {
                writeln!(self.io.output, "deleted {} row(s)", count)?;
                if table_empty {
                    writeln!(self.io.output, "table is now empty")?;
                }
            }
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), CliError> {
        let receipt = self.session.save(&mut self.grid, &self.server).map_err(CliError::engine)?;
        writeln!(self.io.output, "{} (extracted using {})", receipt.message, receipt.method)?;
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), CliError> {
        if !self.session.is_editing() {
            writeln!(self.io.output, "not in edit mode")?;
            return Ok(());
        }
        let ask = self.confirm_discard;
        let cancelled = self
            .session
            .cancel(&mut self.grid, || !ask || self.io.confirm("Discard unsaved changes?"))
            .map_err(CliError::engine)?;
        if cancelled {
            writeln!(self.io.output, "edit mode off, table restored")?;
        } else {
            writeln!(self.io.output, "still editing")?;
        }
        Ok(())
    }

    fn years(&mut self, step: Option<PageStep>) -> Result<(), CliError> {
        match step {
            Some(PageStep::Next) => {
                self.pager.next_page();
            }
            Some(PageStep::Previous) => {
                self.pager.previous_page();
            }
            None => {}
        }

        let current = self.grid.search();
        let labels: Vec<String> = self
            .pager
            .current()
            .iter()
            .map(|y| {
                let y = y.to_string();
                if y == current.trim() {
                    format!("[{}]", y)
                } else {
                    y
                }
            })
            .collect();

        if labels.is_empty() {
            writeln!(self.io.output, "no years found")?;
            return Ok(());
        }
        writeln!(
            self.io.output,
            "{}  (page {}/{}{}{})",
            labels.join("  "),
            self.pager.page() + 1,
            self.pager.page_count(),
            if self.pager.has_previous() { ", prev" } else { "" },
            if self.pager.has_next() { ", next" } else { "" },
        )?;
        Ok(())
    }

    fn quit(&mut self) -> Flow {
        if self.session.has_unsaved_changes()
            && self.confirm_discard
            && !self.io.confirm("Quit and discard unsaved changes?")
        {
            return Flow::Continue;
        }
        Flow::Quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridedit_engine::save::{SaveRequest, SaveResponse};
    use std::cell::RefCell;
    use std::io::Cursor;

    struct FakeServer {
        requests: RefCell<Vec<SaveRequest>>,
        fail: Option<String>,
    }

    impl FakeServer {
        fn new() -> Self {
            Self { requests: RefCell::new(Vec::new()), fail: None }
        }
    }

    impl Persistence for &FakeServer {
        type Error = String;

        fn save_table(&self, request: &SaveRequest) -> Result<SaveResponse, String> {
            self.requests.borrow_mut().push(request.clone());
            match &self.fail {
                Some(msg) => Err(msg.clone()),
                None => Ok(SaveResponse { success: Some(true), message: "Table saved".into() }),
            }
        }
    }

    fn grid() -> MemoryGrid {
        let header: Vec<String> = vec!["STATION".into(), "OFFENSE".into()];
        MemoryGrid::from_dataset(
            &header,
            vec![
                vec!["A".into(), "Property_and_Person".into()],
                vec!["B".into(), "Other".into()],
            ],
        )
        .with_display(&gridedit_engine::display::DisplayRules::builtin(), DisplayMode::Friendly)
    }

    fn run_script<'a>(
        server: &'a FakeServer,
        script: &str,
        assume_yes: bool,
    ) -> (Repl<&'a FakeServer, Cursor<Vec<u8>>, Vec<u8>>, String) {
        let opts = ReplOptions { assume_yes, confirm_discard: true };
        let mut repl = Repl::new(
            grid(),
            vec![2014, 2015],
            server,
            Cursor::new(script.as_bytes().to_vec()),
            Vec::new(),
            opts,
        );
        repl.run().unwrap();
        let out = String::from_utf8(repl.io.output.clone()).unwrap();
        (repl, out)
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(
            parse_command("set 3 STATION  North  Gate "),
            Ok(Some(Command::Set { row: 3, column: "STATION".into(), value: "North  Gate".into() }))
        );
        assert_eq!(
            parse_command("set 0 1"),
            Ok(Some(Command::Set { row: 0, column: "1".into(), value: String::new() }))
        );
        assert_eq!(parse_command("mode raw"), Ok(Some(Command::Mode(DisplayMode::Raw))));
        assert_eq!(parse_command("delete 1 4"), Ok(Some(Command::Delete(vec![1, 4]))));
        assert_eq!(parse_command("search"), Ok(Some(Command::Search(String::new()))));
        assert_eq!(parse_command("years next"), Ok(Some(Command::Years(Some(PageStep::Next)))));
        assert!(parse_command("set x STATION y").is_err());
        assert!(parse_command("mode fancy").is_err());
        assert!(parse_command("delete").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn test_edit_and_save() {
        let server = FakeServer::new();
        let (repl, out) = run_script(&server, "begin\nset 0 STATION C\nundo\nredo\nsave\nquit\n", false);

        assert!(out.contains("edit mode on"));
        assert!(out.contains("undo: row 0 STATION = \"A\""));
        assert!(out.contains("Table saved"));
        let requests = server.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].data[0], vec!["C", "Property_and_Person"]);
        assert_eq!(repl.session().state(), SessionState::Idle);
    }

    #[test]
    fn test_set_requires_edit_mode() {
        let server = FakeServer::new();
        let (repl, out) = run_script(&server, "set 0 STATION C\nquit\n", false);
        assert!(out.contains("error: not in edit mode"));
        assert_eq!(repl.grid().cell(GridCoord::new(0, 1)).unwrap(), "A");
    }

    #[test]
    fn test_cancel_declined_then_confirmed() {
        let server = FakeServer::new();
        let script = "begin\nset 1 OFFENSE Person_Injury_Only\ncancel\nn\ncancel\ny\nquit\n";
        let (repl, out) = run_script(&server, script, false);

        assert!(out.contains("still editing"));
        assert!(out.contains("edit mode off, table restored"));
        assert_eq!(repl.grid().cell(GridCoord::new(1, 2)).unwrap(), "Other");
    }

    #[test]
    fn test_failed_save_keeps_editing() {
        let mut server = FakeServer::new();
        server.fail = Some("connection refused".into());
        let (repl, out) = run_script(&server, "begin\nset 0 1 X\nsave\n", true);

        assert!(out.contains("error: Error saving table: connection refused"));
        assert!(repl.session().is_editing());
        assert!(repl.session().has_unsaved_changes());
    }

    #[test]
    fn test_show_renders_friendly_values() {
        let server = FakeServer::new();
        let (_, out) = run_script(&server, "show\nmode raw\nshow\n", false);
        assert!(out.contains("   0 | A | Property + Person"));
        assert!(out.contains("   0 | A | Property_and_Person"));
    }

    #[test]
    fn test_delete_with_assume_yes() {
        let server = FakeServer::new();
        let (repl, out) = run_script(&server, "delete 0 1\n", true);
        assert!(out.contains("deleted 2 row(s)"));
        assert!(out.contains("table is now empty"));
        assert_eq!(repl.grid().row_count(), 0);
    }

    #[test]
    fn test_unknown_column() {
        let server = FakeServer::new();
        let (_, out) = run_script(&server, "begin\nset 0 NOPE x\nset 0 5 x\n", false);
        assert!(out.contains("error: unknown column \"NOPE\""));
        assert!(out.contains("error: column 5 is out of range"));
    }
}
