use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::warn;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

use split_ledger::{
    format_inr, BalanceEngine, Expense, ExpenseFilter, LedgerStore, MonthHistory, MonthLedger,
    MonthToken, Session, SqliteStore, Summary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Expenses,
    Summary,
    People,
    History,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Expenses => Page::Summary,
            Page::Summary => Page::People,
            Page::People => Page::History,
            Page::History => Page::Expenses,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Expenses => Page::History,
            Page::Summary => Page::Expenses,
            Page::People => Page::Summary,
            Page::History => Page::People,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Expenses => "Expenses",
            Page::Summary => "Summary",
            Page::People => "People",
            Page::History => "History",
        }
    }
}

pub struct App {
    pub ledgers: LedgerStore<SqliteStore>,
    pub month: MonthToken,
    pub ledger: MonthLedger,
    /// None when the month holds an expense the engine rejects
    pub summary: Option<Summary>,
    pub history: Vec<MonthHistory>,
    pub session: Session,
    pub engine: BalanceEngine,
    pub filter: ExpenseFilter,
    pub current_page: Page,
    pub expense_state: TableState,
    pub people_state: TableState,
    pub history_state: TableState,
    pub status: Option<String>,
}

impl App {
    pub fn new(
        ledgers: LedgerStore<SqliteStore>,
        month: MonthToken,
        session: Session,
        engine: BalanceEngine,
    ) -> Result<Self> {
        let mut app = Self {
            ledgers,
            month,
            ledger: MonthLedger::default(),
            summary: None,
            history: Vec::new(),
            session,
            engine,
            filter: ExpenseFilter::All,
            current_page: Page::Expenses,
            expense_state: TableState::default(),
            people_state: TableState::default(),
            history_state: TableState::default(),
            status: None,
        };
        app.reload()?;
        Ok(app)
    }

    /// Re-read the current month and everything derived from it
    pub fn reload(&mut self) -> Result<()> {
        self.ledger = self.ledgers.load_month(self.month)?;
        self.history = self.ledgers.history()?;
        self.summary = match self.engine.compute_summary(&self.ledger.people, &self.ledger.expenses) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Cannot summarise {}: {}", self.month, e);
                self.status = Some(e.to_string());
                None
            }
        };

        if let ExpenseFilter::PaidBy(p) | ExpenseFilter::SplitWith(p) = &self.filter {
            if !self.ledger.has_person(p) {
                self.filter = ExpenseFilter::All;
            }
        }

        let n = self.visible_expenses().len();
        clamp(&mut self.expense_state, n);
        clamp(&mut self.people_state, self.ledger.people.len());
        clamp(&mut self.history_state, self.history.len());
        Ok(())
    }

    pub fn visible_expenses(&self) -> Vec<&Expense> {
        self.ledger.filter_expenses(&self.filter)
    }

    pub fn selected_expense(&self) -> Option<&Expense> {
        self.expense_state
            .selected()
            .and_then(|i| self.visible_expenses().get(i).copied())
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next_month(&mut self) -> Result<()> {
        self.switch_month(self.month.next())
    }

    pub fn previous_month(&mut self) -> Result<()> {
        self.switch_month(self.month.previous())
    }

    fn switch_month(&mut self, month: MonthToken) -> Result<()> {
        self.month = month;
        self.filter = ExpenseFilter::All;
        self.status = None;
        self.reload()
    }

    /// All -> paid by each person -> split with each person -> All
    pub fn cycle_filter(&mut self) {
        let people = &self.ledger.people;
        let position = |name: &str| people.iter().position(|p| p == name);

        self.filter = match &self.filter {
            ExpenseFilter::All => people
                .first()
                .map(|p| ExpenseFilter::PaidBy(p.clone()))
                .unwrap_or(ExpenseFilter::All),
            ExpenseFilter::PaidBy(p) => match position(p).and_then(|i| people.get(i + 1)) {
                Some(next) => ExpenseFilter::PaidBy(next.clone()),
                None => people
                    .first()
                    .map(|p| ExpenseFilter::SplitWith(p.clone()))
                    .unwrap_or(ExpenseFilter::All),
            },
            ExpenseFilter::SplitWith(p) => match position(p).and_then(|i| people.get(i + 1)) {
                Some(next) => ExpenseFilter::SplitWith(next.clone()),
                None => ExpenseFilter::All,
            },
        };

        let n = self.visible_expenses().len();
        clamp(&mut self.expense_state, n);
    }

    pub fn delete_selected_expense(&mut self) -> Result<()> {
        let Some(id) = self.selected_expense().map(|e| e.id.clone()) else {
            return Ok(());
        };

        if self.ledger.remove_expense(&id) {
            self.ledgers.save_month(self.month, &self.ledger)?;
            self.status = Some("Expense deleted".to_string());
        }
        self.reload()
    }

    fn active_state(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Expenses => {
                let len = self.visible_expenses().len();
                (&mut self.expense_state, len)
            }
            Page::People | Page::Summary => (&mut self.people_state, self.ledger.people.len()),
            Page::History => (&mut self.history_state, self.history.len()),
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_state();
        step(state, len, true);
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_state();
        step(state, len, false);
    }
}

/// Move the selection one row, wrapping at both ends
fn step(state: &mut TableState, len: usize, forward: bool) {
    if len == 0 {
        return;
    }
    let i = match state.selected() {
        Some(i) if forward => {
            if i >= len - 1 {
                0
            } else {
                i + 1
            }
        }
        Some(i) => {
            if i == 0 {
                len - 1
            } else {
                i - 1
            }
        }
        None => 0,
    };
    state.select(Some(i));
}

fn clamp(state: &mut TableState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (Some(i), len) if i >= len => state.select(Some(len - 1)),
        (None, _) => state.select(Some(0)),
        _ => {}
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char(']') => app.next_month()?,
                KeyCode::Char('[') => app.previous_month()?,
                KeyCode::Char('f') if app.current_page == Page::Expenses => app.cycle_filter(),
                KeyCode::Char('d') if app.current_page == Page::Expenses => {
                    app.delete_selected_expense()?
                }
                KeyCode::Char('r') => app.reload()?,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Expenses => render_expenses(f, chunks[1], app),
        Page::Summary => render_summary(f, chunks[1], app),
        Page::People => render_people(f, chunks[1], app),
        Page::History => render_history(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Expenses, Page::Summary, Page::People, Page::History];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        app.month.label(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Total: {}", format_inr(app.ledger.total())),
        Style::default().fg(Color::White),
    ));
    if let Some(me) = app.session.current_user() {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(format!("👤 {}", me), Style::default().fg(Color::Green)));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_expenses(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .visible_expenses()
        .into_iter()
        .map(|e| {
            let payer = if app.session.is_current(&e.paid_by) {
                format!("{} (Me)", e.paid_by)
            } else {
                e.paid_by.clone()
            };
            Row::new(vec![
                Cell::from(e.date.format("%Y-%m-%d").to_string()),
                Cell::from(truncate(&e.description, 30)),
                Cell::from(format_inr(e.amount)).style(Style::default().fg(Color::Green)),
                Cell::from(payer),
                Cell::from(truncate(&e.split_with.join(", "), 40)),
            ])
        })
        .collect();

    let title = match &app.filter {
        ExpenseFilter::All => " Expenses ".to_string(),
        ExpenseFilter::PaidBy(p) => format!(" Expenses paid by {} ", p),
        ExpenseFilter::SplitWith(p) => format!(" Expenses split with {} ", p),
    };

    let empty = rows.is_empty();
    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(32),
            Constraint::Length(16),
            Constraint::Length(18),
            Constraint::Min(20),
        ],
    )
    .header(header_row(&["Date", "Description", "Amount", "Paid by", "Split with"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    if empty {
        let placeholder = Paragraph::new("\n  No expenses added yet.").block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Expenses "),
        );
        f.render_widget(placeholder, area);
        return;
    }

    f.render_stateful_widget(table, area, &mut app.expense_state);
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(format!(" Summary - {} ", app.month.label()));

    let Some(summary) = &app.summary else {
        f.render_widget(Paragraph::new("\n  Summary unavailable for this month").block(block), area);
        return;
    };

    let bold = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Total spent: ", bold),
            Span::raw(format_inr(summary.total)),
        ]),
        Line::from(""),
        Line::from(Span::styled("  Balances", bold)),
    ];

    for stats in summary.ranked_balances() {
        let balance = stats.balance();
        let (text, color) = if balance >= 0.0 {
            (format!("+{} (credit)", format_inr(balance)), Color::Green)
        } else {
            (format!("-{} (debt)", format_inr(balance.abs())), Color::Red)
        };
        content.push(Line::from(vec![
            Span::raw(format!("    {:<16}", stats.name)),
            Span::raw(format!(
                "paid {:>14}  share {:>14}  ",
                format_inr(stats.paid),
                format_inr(stats.share)
            )),
            Span::styled(text, Style::default().fg(color)),
        ]));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled("  How to settle", bold)));
    if summary.is_settled() {
        content.push(Line::from(Span::styled(
            "    All settled up! 🎉",
            Style::default().fg(Color::Green),
        )));
    }
    for s in &summary.settlements {
        content.push(Line::from(vec![
            Span::styled(format!("    {}", s.from), Style::default().fg(Color::Red)),
            Span::raw(" → "),
            Span::styled(s.to.clone(), Style::default().fg(Color::Green)),
            Span::raw(format!(": {}", format_inr(s.amount))),
        ]));
    }

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_people(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .ledger
        .people
        .iter()
        .map(|person| {
            let name = if app.session.is_current(person) {
                format!("{} (Me)", person)
            } else {
                person.clone()
            };
            let stats = app.summary.as_ref().and_then(|s| s.stats_for(person));
            let paid = stats.map(|s| s.paid).unwrap_or(0.0);
            let share = stats.map(|s| s.share).unwrap_or(0.0);
            let balance = paid - share;
            let count = app.ledger.expenses.iter().filter(|e| e.involves(person)).count();

            Row::new(vec![
                Cell::from(name),
                Cell::from(format_inr(paid)),
                Cell::from(format_inr(share)),
                Cell::from(format_inr(balance)).style(Style::default().fg(if balance < 0.0 {
                    Color::Red
                } else {
                    Color::Green
                })),
                Cell::from(count.to_string()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(22),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["Person", "Paid", "Share", "Balance", "Expenses"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" People ({}) ", app.ledger.people.len())),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.people_state);
}

fn render_history(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .history
        .iter()
        .map(|m| {
            let style = if m.token == app.month {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(m.label()),
                Cell::from(m.people.len().to_string()),
                Cell::from(m.expense_count.to_string()),
                Cell::from(format_inr(m.total)),
                Cell::from(m.days.len().to_string()),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["Month", "People", "Expenses", "Total", "Active days"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" History "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.history_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some(status) = &app.status {
        status_spans.push(Span::styled(format!(" {} ", status), Style::default().fg(Color::Green)));
        status_spans.push(Span::raw("| "));
    }

    let keys: &[(&str, &str)] = match app.current_page {
        Page::Expenses => &[("[/]", " Month | "), ("f", " Filter | "), ("d", " Delete | ")],
        _ => &[("[/]", " Month | ")],
    };
    for (key, label) in keys {
        status_spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(*label));
    }
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
