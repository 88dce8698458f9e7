use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{
    self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use cricket_pulse::config::{ScoreboardConfig, load_dotenv};
use cricket_pulse::cricket_api::{CricApiClient, MatchApi};
use cricket_pulse::fake_feed::SimulatedApi;
use cricket_pulse::feed::spawn_provider;
use cricket_pulse::model::{DisplayStatus, MatchSnapshot, run_rate};
use cricket_pulse::state::{AppState, BoardView, Delta, ProviderCommand, apply_delta};

const SIMULATED_FAST_INTERVAL: Duration = Duration::from_secs(3);

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
}

impl App {
    fn new(cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Tab => self.state.cycle_view(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.send(ProviderCommand::Refresh),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn on_focus(&mut self, visible: bool) {
        self.state.visible = visible;
        self.send(ProviderCommand::SetVisible(visible));
    }

    fn send(&mut self, cmd: ProviderCommand) {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Provider unavailable");
            return;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Provider request failed");
        }
    }
}

fn main() -> io::Result<()> {
    load_dotenv();
    let simulate = std::env::args().any(|arg| arg == "--simulate");

    let mut config = ScoreboardConfig::from_env();
    let api: Arc<dyn MatchApi> = if simulate {
        config.fast_interval = config.fast_interval.min(SIMULATED_FAST_INTERVAL);
        config.cache_path = None;
        Arc::new(SimulatedApi::new(7))
    } else {
        Arc::new(CricApiClient::new(config.api.clone()))
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(api, config, tx, cmd_rx);

    let mut app = App::new(Some(cmd_tx));
    if simulate {
        app.state.push_log("[INFO] Simulated feed");
    }
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableFocusChange)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::FocusGained => app.on_focus(true),
                Event::FocusLost => app.on_focus(false),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let banner_height = if app.state.error.is_some() { 1 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(banner_height),
            Constraint::Min(1),
            Constraint::Length(6),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    if let Some(err) = app.state.error.as_deref() {
        let banner = Paragraph::new(format!("Fetch failed: {err} (r to retry, showing last known data)"))
            .style(Style::default().fg(Color::White).bg(Color::Red));
        frame.render_widget(banner, chunks[1]);
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);
    render_list(frame, body[0], &app.state);
    render_detail(frame, body[1], &app.state);
    render_logs(frame, chunks[3], &app.state);

    let footer = Paragraph::new("Tab View | j/k/↑/↓ Move | r Refresh | ? Help | q Quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[4]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let tabs = [BoardView::Live, BoardView::Completed, BoardView::Upcoming]
        .into_iter()
        .map(|view| {
            let count = match view {
                BoardView::Live => state.live.len(),
                BoardView::Completed => state.completed.len(),
                BoardView::Upcoming => state.upcoming.len(),
            };
            if view == state.view {
                format!("[{} {}]", view.label(), count)
            } else {
                format!(" {} {} ", view.label(), count)
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let updated = match state.last_updated {
        Some(at) => format!("updated {}", at.with_timezone(&Local).format("%H:%M:%S")),
        None if state.loading => "loading...".to_string(),
        None => "no data".to_string(),
    };
    let paused = if state.visible { "" } else { " | paused" };
    format!("CRICKET PULSE | {tabs} | {updated}{paused}")
}

fn render_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(state.view.label());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let matches = state.current();
    if matches.is_empty() {
        let text = if state.loading {
            "Fetching matches..."
        } else {
            "No matches"
        };
        let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    const ROW_HEIGHT: u16 = 2;
    let visible = (inner.height / ROW_HEIGHT).max(1) as usize;
    let (start, end) = visible_range(state.selected, matches.len(), visible);

    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: inner.x,
            y: inner.y + (i as u16) * ROW_HEIGHT,
            width: inner.width,
            height: ROW_HEIGHT.min(inner.height.saturating_sub(i as u16 * ROW_HEIGHT)),
        };
        let selected = idx == state.selected;
        let style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let m = &matches[idx];
        let text = format!(
            "{:<9} {:<12} {:>18} {:>18}\n          {}",
            status_tag(m),
            m.title(),
            score_cell(m.team1_score.map(|s| s.to_string())),
            score_cell(m.team2_score.map(|s| s.to_string())),
            m.status_text
        );
        frame.render_widget(Paragraph::new(text).style(style), row_area);
    }
}

fn status_tag(m: &MatchSnapshot) -> String {
    match m.display_status() {
        DisplayStatus::Live => format!("● {}", m.state.label()),
        DisplayStatus::Completed => "Result".to_string(),
        DisplayStatus::Upcoming => m
            .start
            .map(|s| s.with_timezone(&Local).format("%d %b %H:%M").to_string())
            .unwrap_or_else(|| "TBC".to_string()),
    }
}

fn score_cell(score: Option<String>) -> String {
    score.unwrap_or_else(|| "-".to_string())
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().borders(Borders::ALL).title("Match");
    let Some(m) = state.selected_match() else {
        frame.render_widget(block, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            m.title(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("{} | {}", m.series, m.description)),
        Line::from(""),
    ];
    for (team, score) in [(&m.team1, m.team1_score), (&m.team2, m.team2_score)] {
        let line = match score {
            Some(s) => format!(
                "{:<24} {}  RR {:.2}",
                team.name,
                s,
                run_rate(s.runs, s.overs)
            ),
            None => format!("{:<24} yet to bat", team.name),
        };
        lines.push(Line::from(line));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(m.status_text.clone()));
    if let Some(start) = m.start {
        lines.push(Line::from(format!(
            "Start {}",
            start.with_timezone(&Local).format("%a %d %b %H:%M")
        )));
    }

    let detail = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(detail, area);
}

fn render_logs(frame: &mut Frame, area: Rect, state: &AppState) {
    let height = area.height.saturating_sub(2) as usize;
    let text = state
        .logs
        .iter()
        .rev()
        .take(height)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let logs = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL).title("Console"));
    frame.render_widget(logs, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = area.width.min(48);
    let height = area.height.min(10);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    let text = "Tab      cycle Live / Results / Upcoming\n\
                j/k      move selection\n\
                r        refresh now (retry after errors)\n\
                ?        toggle this help\n\
                q        quit\n\n\
                Polling pauses while the terminal is unfocused.";
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help")),
        popup,
    );
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total <= visible {
        return (0, total);
    }
    let start = selected.saturating_sub(visible - 1).min(total - visible);
    (start, (start + visible).min(total))
}
