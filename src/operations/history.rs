use std::cmp::{max, min};
use std::io;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::{Alignment, Color, Constraint, Direction, Layout, Modifier, Rect, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::debug;

use crate::db::{balance_repository, transaction_repository};
use crate::db::transaction_repository::TransactionFilter;
use crate::error::Result;
use crate::models::balance::MonthYear;
use crate::models::category::CategoryKind;
use crate::models::transaction::{DATE_FORMAT, Transaction};
use crate::operations::balance::format_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    List,
    Details,
    CategoryInput,
    ConfirmDelete,
}

struct HistoryState {
    mode: Mode,

    transactions: Vec<Transaction>,
    table_state: TableState,

    filter: TransactionFilter,
    months: Vec<MonthYear>,

    input_buffer: String,
    status: Option<String>,

    // Cached per-draw
    last_page_size: usize,
}

/// None -> newest month -> ... -> oldest month -> None.
fn next_month(current: Option<MonthYear>, months: &[MonthYear]) -> Option<MonthYear> {
    match current {
        None => months.first().copied(),
        Some(month) => months
            .iter()
            .position(|m| *m == month)
            .and_then(|i| months.get(i + 1))
            .copied(),
    }
}

fn next_kind(current: Option<CategoryKind>) -> Option<CategoryKind> {
    match current {
        None => Some(CategoryKind::Expense),
        Some(CategoryKind::Expense) => Some(CategoryKind::Income),
        Some(CategoryKind::Income) => None,
    }
}

impl HistoryState {
    fn load(conn: &Connection) -> Result<Self> {
        let mut state = Self {
            mode: Mode::List,
            transactions: Vec::new(),
            table_state: TableState::default(),
            filter: TransactionFilter::default(),
            months: Vec::new(),
            input_buffer: String::new(),
            status: None,
            last_page_size: 10,
        };
        state.refresh(conn)?;
        Ok(state)
    }

    /// Re-runs the query for the current filters and keeps the cursor in range.
    fn refresh(&mut self, conn: &Connection) -> Result<()> {
        self.months = balance_repository::months_with_transactions(conn)?;
        self.transactions = transaction_repository::query_transactions(conn, &self.filter)?;
        debug!("History shows {} transactions for {:?}", self.transactions.len(), self.filter);

        if self.transactions.is_empty() {
            self.table_state.select(None);
        } else {
            let selected = match self.table_state.selected() {
                Some(sel) => min(sel, self.transactions.len() - 1),
                None => 0,
            };
            self.table_state.select(Some(selected));
        }
        Ok(())
    }

    fn selected_transaction(&self) -> Option<&Transaction> {
        self.transactions.get(self.table_state.selected()?)
    }

    fn total(&self) -> Decimal {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    fn move_selection(&mut self, delta: i32) {
        if self.transactions.is_empty() {
            self.table_state.select(None);
            return;
        }

        let current = self.table_state.selected().unwrap_or(0) as i32;
        let max_index = self.transactions.len().saturating_sub(1) as i32;
        let next = (current + delta).clamp(0, max_index) as usize;
        self.table_state.select(Some(next));
    }

    fn page_up(&mut self) {
        let page = max(1, self.last_page_size) as i32;
        self.move_selection(-page);
    }

    fn page_down(&mut self) {
        let page = max(1, self.last_page_size) as i32;
        self.move_selection(page);
    }

    fn cycle_month(&mut self, conn: &Connection) -> Result<()> {
        self.filter.month = next_month(self.filter.month, &self.months);
        self.refresh(conn)
    }

    fn cycle_kind(&mut self, conn: &Connection) -> Result<()> {
        self.filter.kind = next_kind(self.filter.kind);
        self.refresh(conn)
    }

    fn clear_filters(&mut self, conn: &Connection) -> Result<()> {
        self.filter = TransactionFilter::default();
        self.refresh(conn)
    }

    fn start_category_input(&mut self) {
        self.input_buffer = self.filter.category_name.clone().unwrap_or_default();
        self.mode = Mode::CategoryInput;
    }

    fn commit_category_input(&mut self, conn: &Connection) -> Result<()> {
        let name = self.input_buffer.trim().to_string();
        self.filter = std::mem::take(&mut self.filter).category(name);
        self.mode = Mode::List;
        self.refresh(conn)
    }

    fn request_delete(&mut self) {
        if self.selected_transaction().is_some() {
            self.mode = Mode::ConfirmDelete;
        }
    }

    fn confirm_delete(&mut self, conn: &Connection) -> Result<()> {
        self.mode = Mode::List;
        let Some(id) = self.selected_transaction().map(|t| t.id) else {
            return Ok(());
        };
        self.status = Some(if transaction_repository::delete_transaction(conn, id)? {
            format!("Transaction #{} deleted", id)
        } else {
            format!("Transaction #{} no longer exists", id)
        });
        self.refresh(conn)
    }
}

/// Full-screen history browser. Returns when the user quits.
pub fn run_history(conn: &Connection) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let result = (|| -> Result<()> {
        let backend = ratatui::backend::CrosstermBackend::new(io::stdout());
        let mut terminal = ratatui::Terminal::new(backend)?;
        let mut state = HistoryState::load(conn)?;

        loop {
            terminal.draw(|frame| {
                let size = frame.area();
                let layout = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(3)])
                    .split(size);

                render_header(frame, layout[0], &state);
                render_table(frame, layout[1], &mut state);
                render_footer(frame, layout[2], &state);

                match state.mode {
                    Mode::CategoryInput => render_input_modal(frame, size, &state),
                    Mode::Details => render_details_modal(frame, size, &state),
                    Mode::ConfirmDelete => render_confirm_modal(frame, size, &state),
                    Mode::List => {}
                }
            })?;

            if event::poll(std::time::Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if handle_key(conn, &mut state, key)? {
                        break;
                    }
                }
            }
        }

        Ok(())
    })();

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;

    result
}

fn handle_key(conn: &Connection, state: &mut HistoryState, key: KeyEvent) -> Result<bool> {
    // Some terminals report both press and release.
    if key.kind == KeyEventKind::Release {
        return Ok(false);
    }

    match state.mode {
        Mode::List => {
            state.status = None;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
                KeyCode::Up => state.move_selection(-1),
                KeyCode::Down => state.move_selection(1),
                KeyCode::PageUp => state.page_up(),
                KeyCode::PageDown => state.page_down(),
                KeyCode::Home => state.move_selection(i32::MIN / 2),
                KeyCode::End => state.move_selection(i32::MAX / 2),
                KeyCode::Enter => {
                    if state.selected_transaction().is_some() {
                        state.mode = Mode::Details;
                    }
                }
                KeyCode::Char('c') => state.start_category_input(),
                KeyCode::Char('m') => state.cycle_month(conn)?,
                KeyCode::Char('t') => state.cycle_kind(conn)?,
                KeyCode::Char('x') => state.clear_filters(conn)?,
                KeyCode::Char('r') => state.refresh(conn)?,
                KeyCode::Delete | KeyCode::Char('d') => state.request_delete(),
                _ => {}
            }
        }
        Mode::Details => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('b')) {
                state.mode = Mode::List;
            }
        }
        Mode::ConfirmDelete => match key.code {
            KeyCode::Char('y') | KeyCode::Char('s') => state.confirm_delete(conn)?,
            _ => state.mode = Mode::List,
        },
        Mode::CategoryInput => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
            {
                state.mode = Mode::List;
                return Ok(false);
            }

            match key.code {
                KeyCode::Esc => state.mode = Mode::List,
                KeyCode::Enter => state.commit_category_input(conn)?,
                KeyCode::Backspace => {
                    state.input_buffer.pop();
                }
                KeyCode::Char(ch) => state.input_buffer.push(ch),
                _ => {}
            }
        }
    }

    Ok(false)
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn render_header(frame: &mut ratatui::Frame, area: Rect, state: &HistoryState) {
    let category = state.filter.category_name.as_deref().unwrap_or("(todas)");
    let month = state
        .filter
        .month
        .map(|m| m.display_name())
        .unwrap_or_else(|| "(todos)".to_string());
    let kind = state.filter.kind.map(CategoryKind::label).unwrap_or("(todos)");

    let line = Line::from(vec![
        Span::styled("Historial", bold().fg(Color::Cyan)),
        Span::raw("  |  "),
        Span::raw(format!("Categoría: {}", category)),
        Span::raw("  |  "),
        Span::raw(format!("Mes: {}", month)),
        Span::raw("  |  "),
        Span::raw(format!("Tipo: {}", kind)),
        Span::raw("  |  "),
        Span::raw(format!("Filas: {}", state.transactions.len())),
        Span::raw("  |  "),
        Span::raw(format!("Total: {}", format_money(state.total()))),
    ]);

    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(Paragraph::new(line).block(block).alignment(Alignment::Left), area);
}

fn render_footer(frame: &mut ratatui::Frame, area: Rect, state: &HistoryState) {
    let hint = match (&state.status, state.mode) {
        (Some(status), Mode::List) => status.as_str(),
        (None, Mode::List) => {
            "↑/↓ move  PgUp/PgDn page  Enter details  c category  m month  t kind  x clear  d delete  r refresh  q/Esc exit"
        }
        (_, Mode::Details) => "Esc/q/b back",
        (_, Mode::CategoryInput) => "Type, Enter apply, Esc cancel",
        (_, Mode::ConfirmDelete) => "y confirm, any other key cancels",
    };

    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(
        Paragraph::new(hint)
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_table(frame: &mut ratatui::Frame, area: Rect, state: &mut HistoryState) {
    let block = Block::default().title("Movimientos").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let header = Row::new([
        Cell::from("Fecha").style(bold()),
        Cell::from("Descripción").style(bold()),
        Cell::from("Monto").style(bold()),
        Cell::from("Categoría").style(bold()),
        Cell::from("Id").style(bold()),
    ])
    .style(Style::default().fg(Color::White));

    let rows = state.transactions.iter().map(|tx| {
        let mut desc = tx.description.clone();
        if desc.chars().count() > 42 {
            desc = desc.chars().take(39).collect::<String>() + "...";
        }
        let color = match tx.kind() {
            CategoryKind::Expense => Color::Red,
            CategoryKind::Income => Color::Green,
        };

        Row::new([
            Cell::from(tx.date.format(DATE_FORMAT).to_string()),
            Cell::from(desc),
            Cell::from(format_money(tx.amount)).style(Style::default().fg(color)),
            Cell::from(tx.category.to_string()),
            Cell::from(tx.id.to_string()),
        ])
    });

    // Leave room for the header row.
    state.last_page_size = max(1, inner.height.saturating_sub(2) as usize);

    let widths = [
        Constraint::Length(10),
        Constraint::Percentage(40),
        Constraint::Length(16),
        Constraint::Length(24),
        Constraint::Length(6),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(bold().bg(Color::DarkGray).fg(Color::White))
        .highlight_symbol("➤ ")
        .column_spacing(1);

    frame.render_stateful_widget(table, inner, &mut state.table_state);

    if state.transactions.is_empty() {
        let message = if state.filter.is_empty() {
            "No hay movimientos todavía"
        } else {
            "No hay movimientos para estos filtros"
        };
        let empty = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
    }
}

fn render_input_modal(frame: &mut ratatui::Frame, area: Rect, state: &HistoryState) {
    let popup_area = centered_rect(80, 30, area);
    frame.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from(vec![Span::styled("Filtrar por categoría", bold())]),
        Line::from("Category name, any kind (empty clears)"),
        Line::from(""),
        Line::from(vec![Span::styled(
            format!("> {}", state.input_buffer),
            Style::default().fg(Color::Yellow),
        )]),
    ];

    let block = Block::default().borders(Borders::ALL).title("Input");
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        popup_area,
    );
}

fn render_details_modal(frame: &mut ratatui::Frame, area: Rect, state: &HistoryState) {
    let popup_area = centered_rect(90, 60, area);
    frame.render_widget(Clear, popup_area);

    let Some(tx) = state.selected_transaction() else {
        frame.render_widget(
            Paragraph::new("No selection")
                .block(Block::default().borders(Borders::ALL).title("Details"))
                .alignment(Alignment::Center),
            popup_area,
        );
        return;
    };

    let lines = vec![
        Line::from(vec![Span::styled("Detalle del movimiento", bold().fg(Color::Cyan))]),
        Line::from(""),
        Line::from(format!("Id: {}", tx.id)),
        Line::from(format!("Fecha: {}", tx.date.format(DATE_FORMAT))),
        Line::from(format!("Mes: {}", MonthYear::from_date(tx.date).display_name())),
        Line::from(format!("Categoría: {}", tx.category)),
        Line::from(format!("Monto: {}", format_money(tx.amount))),
        Line::from(""),
        Line::from("Descripción:"),
        Line::from(tx.description.clone()),
        Line::from(""),
        Line::from(Span::styled("Esc/q/b to go back", Style::default().fg(Color::DarkGray))),
    ];

    let block = Block::default().borders(Borders::ALL).title("Details");
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup_area,
    );
}

fn render_confirm_modal(frame: &mut ratatui::Frame, area: Rect, state: &HistoryState) {
    let popup_area = centered_rect(60, 20, area);
    frame.render_widget(Clear, popup_area);

    let target = state
        .selected_transaction()
        .map(|tx| format!("#{} {} {}", tx.id, tx.date.format(DATE_FORMAT), format_money(tx.amount)))
        .unwrap_or_default();

    let lines = vec![
        Line::from(vec![Span::styled("¿Eliminar este movimiento?", bold().fg(Color::Red))]),
        Line::from(""),
        Line::from(target),
        Line::from(""),
        Line::from("y: delete   any other key: cancel"),
    ];

    let block = Block::default().borders(Borders::ALL).title("Confirm");
    frame.render_widget(
        Paragraph::new(lines).block(block).alignment(Alignment::Center),
        popup_area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
