use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{fs::File, io, path::Path};

use crate::report::CsvRow;

pub fn read_report(path: &Path) -> Result<Vec<CsvRow>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open report {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: CsvRow = result.context("Malformed report row")?;
        rows.push(row);
    }
    Ok(rows)
}

/// Index of the row after `selected`, wrapping around.
fn next_row(selected: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match selected {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    })
}

/// Index of the row before `selected`, wrapping around.
fn previous_row(selected: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match selected {
        Some(0) | None => len - 1,
        Some(i) => i - 1,
    })
}

/// Runs `restore` when dropped.
struct RestoreOnDrop<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> RestoreOnDrop<F> {
    fn new(restore: F) -> Self {
        Self { restore }
    }
}

impl<F: FnMut()> Drop for RestoreOnDrop<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

fn restore_terminal() {
    // Best effort: the terminal may already be gone.
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

pub fn run_dashboard(path: &Path) -> Result<()> {
    let records = read_report(path)?;

    // Setup terminal
    enable_raw_mode()?;
    let _restore = RestoreOnDrop::new(restore_terminal);
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();
    table_state.select(next_row(None, records.len()));

    let result = event_loop(&mut terminal, &records, &mut table_state);
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    records: &[CsvRow],
    table_state: &mut TableState,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, records, table_state))?;

        if event::poll(std::time::Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Down => table_state.select(next_row(table_state.selected(), records.len())),
                    KeyCode::Up => table_state.select(previous_row(table_state.selected(), records.len())),
                    _ => {}
                }
            }
        }
    }
}

fn ui(f: &mut Frame, records: &[CsvRow], table_state: &mut TableState) {
    let rects = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(4)].as_ref())
        .margin(1)
        .split(f.size());

    let selected_style = Style::default().add_modifier(Modifier::REVERSED).fg(Color::Yellow);
    let normal_style = Style::default().fg(Color::White);
    let header_cells = ["Matches", "Title", "Company", "Location", "Salary"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells)
        .style(normal_style)
        .height(1)
        .bottom_margin(1);

    let rows = records.iter().map(|item| {
        let cells = vec![
            Cell::from(format!("{}/{}", item.matches, item.total_keywords)),
            Cell::from(item.title.clone()),
            Cell::from(item.company.clone()),
            Cell::from(item.location.clone()),
            Cell::from(item.salary.clone()),
        ];
        Row::new(cells).style(normal_style)
    });

    let col_widths = vec![
        Constraint::Length(8),  // Matches
        Constraint::Min(25),    // Title
        Constraint::Min(20),    // Company
        Constraint::Min(15),    // Location
        Constraint::Min(12),    // Salary
    ];

    let incomplete = records.iter().any(|r| r.status == "incomplete");
    let title = if incomplete {
        "Job matches (incomplete search)"
    } else {
        "Job matches"
    };

    let table = Table::new(rows, col_widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(selected_style)
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, rects[0], table_state);

    let details = table_state
        .selected()
        .and_then(|i| records.get(i))
        .map(|r| format!("{}\nKeywords: {}", r.link, r.keywords))
        .unwrap_or_else(|| "No matches in this report".to_string());
    let footer = Paragraph::new(details)
        .block(Block::default().borders(Borders::ALL).title("Selected"))
        .wrap(Wrap { trim: true });
    f.render_widget(footer, rects[1]);
}
