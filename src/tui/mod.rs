//! Ratatui-based terminal UI.
//!
//! The TUI shows a form for choosing regions, a month and a fuel type, runs
//! estimates against the session built at startup, and charts the focused
//! region's price history next to the national monthly average.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::aggregate::{national_monthly_average, trend_series};
use crate::app::pipeline::Session;
use crate::domain::{PredictMode, PredictionRequest, PredictionResult, month_start};
use crate::error::AppError;
use crate::plot::{month_index, month_label};

mod plotters_chart;

use plotters_chart::TrendChart;

/// Start the TUI over an already built session.
pub fn run(session: &Session, mode: PredictMode) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::io(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(session, mode);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::io(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::io(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Regions,
    Year,
    Month,
    Fuel,
    Mode,
}

const FIELDS: [Field; 5] = [Field::Regions, Field::Year, Field::Month, Field::Fuel, Field::Mode];

/// The last estimate run, kept with the inputs that produced it.
struct Prediction {
    request: PredictionRequest,
    mode: PredictMode,
    results: Vec<PredictionResult>,
}

/// Chart inputs for the focused region.
struct ChartData {
    title: String,
    history: Vec<(f64, f64)>,
    national: Vec<(f64, f64)>,
    estimate: Option<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

struct App<'a> {
    session: &'a Session,
    mode: PredictMode,
    selected_field: usize,
    /// Region the chart follows and `space` toggles.
    region_cursor: usize,
    selected_regions: Vec<bool>,
    year: i32,
    month: u32,
    fuel_idx: usize,
    prediction: Option<Prediction>,
    status: String,
}

impl<'a> App<'a> {
    fn new(session: &'a Session, mode: PredictMode) -> Self {
        let last = session.dataset.stats.last_month;
        let mut selected_regions = vec![false; session.categories.regions.len()];
        if let Some(first) = selected_regions.first_mut() {
            *first = true;
        }

        let status = match session.warnings.first() {
            Some(w) => w.message().to_string(),
            None => format!("Loaded {} rows.", session.dataset.len()),
        };

        Self {
            session,
            mode,
            selected_field: 0,
            region_cursor: 0,
            selected_regions,
            year: chrono::Datelike::year(&last),
            month: chrono::Datelike::month(&last),
            fuel_idx: 0,
            prediction: None,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::io(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::io(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::io(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELDS.len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char(' ') => self.toggle_region(),
            KeyCode::Char('a') => self.toggle_all_regions(),
            KeyCode::Char('m') => {
                self.mode = self.mode.toggle();
                self.status = format!("mode: {}", self.mode.display_name());
            }
            KeyCode::Char('p') | KeyCode::Enter => self.predict(),
            _ => {}
        }
        false
    }

    fn field(&self) -> Field {
        FIELDS[self.selected_field.min(FIELDS.len() - 1)]
    }

    fn adjust_field(&mut self, delta: i32) {
        match self.field() {
            Field::Regions => {
                let n = self.session.categories.regions.len();
                if n > 0 {
                    self.region_cursor = step_index(self.region_cursor, delta, n);
                }
            }
            Field::Year => {
                self.year = self.year.saturating_add(delta);
            }
            Field::Month => {
                // 1..=12, wrapping into the neighbouring year. Past the
                // representable years the date stays put.
                let idx = i64::from(self.year) * 12 + i64::from(self.month) - 1 + i64::from(delta);
                if let Ok(year) = i32::try_from(idx.div_euclid(12)) {
                    self.year = year;
                    self.month = idx.rem_euclid(12) as u32 + 1;
                }
            }
            Field::Fuel => {
                let n = self.session.categories.fuel_types.len();
                if n > 0 {
                    self.fuel_idx = step_index(self.fuel_idx, delta, n);
                }
            }
            Field::Mode => {
                self.mode = self.mode.toggle();
            }
        }
    }

    fn toggle_region(&mut self) {
        if let Some(flag) = self.selected_regions.get_mut(self.region_cursor) {
            *flag = !*flag;
        }
    }

    fn toggle_all_regions(&mut self) {
        let select = !self.selected_regions.iter().all(|&s| s);
        self.selected_regions.iter_mut().for_each(|s| *s = select);
    }

    fn selected_region_names(&self) -> Vec<String> {
        self.session
            .categories
            .regions
            .iter()
            .zip(&self.selected_regions)
            .filter(|(_, selected)| **selected)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn fuel_type(&self) -> &str {
        self.session
            .categories
            .fuel_types
            .get(self.fuel_idx)
            .map(String::as_str)
            .unwrap_or("")
    }

    fn focused_region(&self) -> &str {
        self.session
            .categories
            .regions
            .get(self.region_cursor)
            .map(String::as_str)
            .unwrap_or("")
    }

    fn predict(&mut self) {
        let regions = self.selected_region_names();
        if regions.is_empty() {
            self.status = "Select at least one region (space toggles).".to_string();
            return;
        }

        let request = PredictionRequest {
            regions,
            year: self.year,
            month: self.month,
            fuel_type: self.fuel_type().to_string(),
        };
        let results = self.session.predict(self.mode, &request);

        let ok = results.iter().filter(|r| r.outcome.is_ok()).count();
        self.status = if ok == 0 {
            "No data for the selected combination.".to_string()
        } else {
            format!(
                "{ok}/{} regions estimated ({}).",
                results.len(),
                self.mode.display_name()
            )
        };

        self.prediction = Some(Prediction {
            request,
            mode: self.mode,
            results,
        });
    }

    fn chart_data(&self) -> ChartData {
        let region = self.focused_region();
        let fuel = self.fuel_type();
        let records = &self.session.dataset.records;

        let to_xy = |p: &crate::domain::TrendPoint| (month_index(p.date), p.price);
        let history: Vec<(f64, f64)> = trend_series(records, region, fuel).iter().map(to_xy).collect();
        let national: Vec<(f64, f64)> = national_monthly_average(records, fuel).iter().map(to_xy).collect();

        let estimate = self.prediction.as_ref().and_then(|p| {
            if p.request.fuel_type != fuel {
                return None;
            }
            let value = p.results.iter().find(|r| r.region == region)?.estimate()?;
            let date = month_start(p.request.year, p.request.month)?;
            Some((month_index(date), value))
        });

        let all = history.iter().chain(&national).chain(estimate.iter());
        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in all {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        if !x_min.is_finite() || !x_max.is_finite() {
            (x_min, x_max) = (0.0, 1.0);
        } else if x_max <= x_min {
            (x_min, x_max) = (x_min - 1.0, x_max + 1.0);
        }
        if !y_min.is_finite() || !y_max.is_finite() {
            (y_min, y_max) = (0.0, 1.0);
        } else if y_max <= y_min {
            (y_min, y_max) = (y_min - 1.0, y_max + 1.0);
        }
        let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

        ChartData {
            title: format!("{region} - {fuel} (cyan) | national average (yellow)"),
            history,
            national,
            estimate,
            x_bounds: [x_min, x_max],
            y_bounds: [y_min - pad, y_max + pad],
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let dataset = &self.session.dataset;
        let d = &self.session.model.diagnostics;
        let gray = Style::default().fg(Color::Gray);

        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("fuel", Style::default().fg(Color::Cyan)),
            Span::raw(" | regional fuel price estimator"),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "source: {} | rows: {} (dropped {}) | months: {} .. {}",
                dataset.source.display(),
                dataset.len(),
                dataset.row_errors.len(),
                dataset.stats.first_month.format("%Y-%m"),
                dataset.stats.last_month.format("%Y-%m"),
            ),
            gray,
        )));

        let mut model = format!(
            "model: rank {}/{} | rmse={:.4}",
            d.rank, d.n_columns, d.rmse
        );
        if let Some(m) = &self.session.evaluation {
            model.push_str(&format!(" | holdout rmse={:.4} (n={})", m.rmse, m.n));
        }
        let mut spans = vec![Span::styled(model, gray)];
        if !self.session.warnings.is_empty() {
            spans.push(Span::styled(
                format!(" | {} warning(s)", self.session.warnings.len()),
                Style::default().fg(Color::Yellow),
            ));
        }
        lines.push(Line::from(spans));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(40), Constraint::Min(0)])
            .split(area);

        let n_results = self.prediction.as_ref().map(|p| p.results.len()).unwrap_or(1) as u16;
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(FIELDS.len() as u16 + 2),
                Constraint::Min(3),
                Constraint::Length(n_results.min(12) + 3),
            ])
            .split(columns[0]);

        self.draw_form(frame, left[0]);
        self.draw_regions(frame, left[1]);
        self.draw_results(frame, left[2]);
        self.draw_chart(frame, columns[1]);
    }

    fn draw_form(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let selected = self.selected_regions.iter().filter(|&&s| s).count();
        let items: Vec<ListItem> = FIELDS
            .iter()
            .map(|field| {
                let text = match field {
                    Field::Regions => format!("Regions: {selected} selected (focus {})", self.focused_region()),
                    Field::Year => format!("Year: {}", self.year),
                    Field::Month => format!("Month: {:02}", self.month),
                    Field::Fuel => format!("Fuel: {}", self.fuel_type()),
                    Field::Mode => format!("Mode: {}", self.mode.display_name()),
                };
                ListItem::new(text)
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Query").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_regions(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .session
            .categories
            .regions
            .iter()
            .zip(&self.selected_regions)
            .map(|(name, &on)| ListItem::new(format!("[{}] {name}", if on { 'x' } else { ' ' })))
            .collect();

        let focused = self.field() == Field::Regions;
        let highlight = if focused {
            Style::default().fg(Color::Black).bg(Color::White)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let list = List::new(items)
            .block(Block::default().title("Regions").borders(Borders::ALL))
            .highlight_style(highlight);

        let mut state = ListState::default();
        state.select(Some(self.region_cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_results(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Estimates").borders(Borders::ALL);
        let Some(prediction) = &self.prediction else {
            let msg = Paragraph::new("Press p to estimate.")
                .style(Style::default().fg(Color::Gray))
                .block(block);
            frame.render_widget(msg, area);
            return;
        };

        let mut lines = vec![Line::from(Span::styled(
            format!(
                "{} {:04}-{:02} ({})",
                prediction.request.fuel_type,
                prediction.request.year,
                prediction.request.month,
                prediction.mode.display_name()
            ),
            Style::default().fg(Color::Gray),
        ))];
        for r in &prediction.results {
            let value = match r.estimate() {
                Some(v) => Span::styled(format!("{v:>10.2}"), Style::default().fg(Color::Green)),
                None => Span::styled(format!("{:>10}", "no data"), Style::default().fg(Color::Red)),
            };
            lines.push(Line::from(vec![Span::raw(format!("{:<24}", r.region)), value]));
        }

        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let data = self.chart_data();
        let block = Block::default().title(data.title.as_str()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        if data.history.is_empty() && data.national.is_empty() {
            let msg = Paragraph::new("No history for this region and fuel type.")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        }

        let (chart_rect, insets) = chart_layout(inner);
        let widget = TrendChart {
            history: &data.history,
            national: &data.national,
            estimate: data.estimate,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            x_label: "month",
            y_label: "price",
            fmt_x: month_label,
            fmt_y: fmt_axis_price,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, data.x_bounds, data.y_bounds);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ field  ←/→ adjust  space toggle region  a all  m mode  p/Enter estimate  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Move `idx` by `delta` within `0..n`, wrapping around.
fn step_index(idx: usize, delta: i32, n: usize) -> usize {
    (idx as i64 + i64::from(delta)).rem_euclid(n as i64) as usize
}

fn fmt_axis_price(v: f64) -> String {
    format!("{v:.2}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = month_label(x_val);
        let label_len = label.len() as u16;
        let start = x
            .saturating_sub(label_len / 2)
            .min((chart.x + chart.width).saturating_sub(label_len));
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.1}");
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("month")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("price")
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}
