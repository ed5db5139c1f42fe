use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use sales_insights::ForecastReport;
use std::io;

/// Days of history drawn in front of the forecast
const HISTORY_WINDOW: usize = 56;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Charts,
    ForecastTable,
    Failures,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Charts => Page::ForecastTable,
            Page::ForecastTable => Page::Failures,
            Page::Failures => Page::Charts,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Charts => Page::Failures,
            Page::ForecastTable => Page::Charts,
            Page::Failures => Page::ForecastTable,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Charts => "Charts",
            Page::ForecastTable => "Forecast Table",
            Page::Failures => "Failures",
        }
    }
}

pub struct App {
    pub report: ForecastReport,
    /// Every category with history, forecast or not
    pub categories: Vec<String>,
    pub state: TableState,
    pub failures_state: TableState,
    pub current_page: Page,
    pub full_history: bool,
}

impl App {
    pub fn new(report: ForecastReport) -> Self {
        let categories = report.history.categories().to_vec();

        let mut state = TableState::default();
        if !categories.is_empty() {
            state.select(Some(0));
        }

        let mut failures_state = TableState::default();
        if !report.failures.is_empty() {
            failures_state.select(Some(0));
        }

        Self {
            report,
            categories,
            state,
            failures_state,
            current_page: Page::Charts,
            full_history: false,
        }
    }

    pub fn toggle_history(&mut self) {
        self.full_history = !self.full_history;
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.state
            .selected()
            .and_then(|i| self.categories.get(i))
            .map(String::as_str)
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn list_len(&self) -> usize {
        match self.current_page {
            Page::Failures => self.report.failures.len(),
            _ => self.categories.len(),
        }
    }

    fn active_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Failures => &mut self.failures_state,
            _ => &mut self.state,
        }
    }

    pub fn next(&mut self) {
        let len = self.list_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.list_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// (history, forecast) points for a category, x = day offset
    ///
    /// The forecast is empty for categories that failed.
    pub fn chart_data(&self, category: &str) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
        let history = self.report.history.column(category).unwrap_or(&[]);
        let start = if self.full_history {
            0
        } else {
            history.len().saturating_sub(HISTORY_WINDOW)
        };

        let past: Vec<(f64, f64)> = history
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(_, v)| v.is_finite())
            .map(|(i, v)| (i as f64, *v))
            .collect();

        let offset = history.len();
        let future: Vec<(f64, f64)> = self
            .report
            .table
            .columns
            .get(category)
            .map(|values| {
                values
                    .iter()
                    .enumerate()
                    .map(|(h, v)| ((offset + h) as f64, *v))
                    .collect()
            })
            .unwrap_or_default();

        (past, future)
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

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_history(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Home => app.active_state().select(Some(0)),
                KeyCode::End => {
                    let len = app.list_len();
                    if len > 0 {
                        app.active_state().select(Some(len - 1));
                    }
                }
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
        Page::Charts => {
            let content = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(36), Constraint::Min(0)])
                .split(chunks[1]);
            render_category_list(f, content[0], app);
            render_chart(f, content[1], app);
        }
        Page::ForecastTable => render_forecast_table(f, chunks[1], app),
        Page::Failures => render_failures(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Charts, Page::ForecastTable, Page::Failures];

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
        format!("{} · {} days", app.report.model_kind, app.report.horizon_days),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("✓ {}", app.report.succeeded()),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("✗ {}", app.report.failed()),
        Style::default().fg(Color::Red),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_category_list(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.categories.iter().map(|category| {
        let color = if app.report.table.columns.contains_key(category) {
            Color::Green
        } else {
            Color::Red
        };
        Row::new(vec![Cell::from(truncate(category, 30)).style(Style::default().fg(color))])
    });

    let table = Table::new(rows, [Constraint::Min(10)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Categories "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_chart(f: &mut Frame, area: Rect, app: &App) {
    let Some(category) = app.selected_category() else {
        let empty = Paragraph::new("No categories")
            .block(Block::default().borders(Borders::ALL).title(" Chart "));
        f.render_widget(empty, area);
        return;
    };

    let (past, future) = app.chart_data(category);

    let x_min = past.first().or(future.first()).map(|p| p.0).unwrap_or(0.0);
    let x_max = future.last().or(past.last()).map(|p| p.0).unwrap_or(1.0).max(x_min + 1.0);
    let y_max = past
        .iter()
        .chain(future.iter())
        .map(|p| p.1)
        .fold(1.0f64, f64::max);
    let y_min = past
        .iter()
        .chain(future.iter())
        .map(|p| p.1)
        .fold(0.0f64, f64::min);

    let datasets = vec![
        Dataset::default()
            .name("history")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&past),
        Dataset::default()
            .name("forecast")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&future),
    ];

    let days = app.report.history.days();
    let first_label = days
        .get(x_min as usize)
        .map(|d| d.to_string())
        .unwrap_or_default();
    let last_label = app
        .report
        .table
        .days
        .last()
        .or(days.last())
        .map(|d| d.to_string())
        .unwrap_or_default();

    let title = match app.report.series.iter().find(|s| s.category == category) {
        Some(series) => format!(" {} - {} ", category, series.model),
        None => format!(" {} - no forecast ", category),
    };

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([x_min, x_max])
                .labels(vec![Span::raw(first_label), Span::raw(last_label)]),
        )
        .y_axis(
            Axis::default()
                .title("items/day")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([y_min, y_max * 1.1])
                .labels(vec![
                    Span::raw(format!("{:.0}", y_min)),
                    Span::raw(format!("{:.0}", y_max * 1.1)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_forecast_table(f: &mut Frame, area: Rect, app: &mut App) {
    let shown_days: Vec<_> = app.report.table.days.iter().take(7).collect();

    let mut header_cells = vec![Cell::from("Category").style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];
    header_cells.extend(shown_days.iter().map(|d| {
        Cell::from(d.format("%m-%d").to_string()).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.categories.iter().map(|category| {
        let mut cells = vec![Cell::from(truncate(category, 30))];
        match app.report.table.columns.get(category) {
            Some(values) => cells.extend(
                values
                    .iter()
                    .take(shown_days.len())
                    .map(|v| Cell::from(format!("{:.1}", v))),
            ),
            None => cells.push(Cell::from("failed").style(Style::default().fg(Color::Red))),
        }
        Row::new(cells).height(1)
    });

    let mut widths = vec![Constraint::Length(32)];
    widths.extend(shown_days.iter().map(|_| Constraint::Length(8)));

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Forecast - first week "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_failures(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(vec![
        Cell::from("Category").style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Cell::from("Error").style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
    ])
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = app.report.failures.iter().map(|failure| {
        Row::new(vec![
            Cell::from(truncate(&failure.category, 30)),
            Cell::from(failure.message.clone()).style(Style::default().fg(Color::Red)),
        ])
    });

    let table = Table::new(rows, [Constraint::Length(32), Constraint::Min(20)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" Failed categories ({}) ", app.report.failures.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.failures_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = match app.current_page {
        Page::Failures => app.failures_state.selected(),
        _ => app.state.selected(),
    }
    .map(|i| i + 1)
    .unwrap_or(0);

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, app.list_len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(if app.full_history {
            " Recent history | "
        } else {
            " Full history | "
        }),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

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
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
