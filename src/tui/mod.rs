mod help;
mod state;

use crate::cli::{build_orchestrator, build_request, Cli};
use crate::config::AppConfig;
use crate::model::{FailureKind, OrchestratorEvent, Outcome};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Terminal,
};
use state::{Field, UiState};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, cfg: AppConfig) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the runtime.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<OrchestratorEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let orch = Arc::new(build_orchestrator(&cfg).with_events(event_tx));

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(orch, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<OrchestratorEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // Prefill the form from the command line.
    let prefill = build_request(&args);
    let mut state = UiState {
        input: prefill.input_path().to_string_lossy().into_owned(),
        output: prefill.output_path().to_string_lossy().into_owned(),
        operation: prefill.kind(),
        password: prefill.password().unwrap_or_default().to_string(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    let res = loop {
        // UiState is owned by the UI thread only; drain without blocking.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Esc) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::F(1)) => state.show_help = !state.show_help,
                    (_, KeyCode::Tab) | (_, KeyCode::Down) => state.focus_next(),
                    (_, KeyCode::BackTab) | (_, KeyCode::Up) => state.focus_prev(),
                    (_, KeyCode::Left) if state.focus == Field::Operation => {
                        state.cycle_operation(false)
                    }
                    (_, KeyCode::Right) if state.focus == Field::Operation => {
                        state.cycle_operation(true)
                    }
                    (_, KeyCode::Enter) => {
                        // Busy submits still go through; the orchestrator rejects them
                        // and the rejection shows up as an event.
                        let _ = cmd_tx.send(UiCommand::Submit(state.build_request()));
                    }
                    (_, KeyCode::Backspace) => {
                        if let Some(text) = state.focused_text() {
                            text.pop();
                        }
                    }
                    (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => {
                        if let Some(text) = state.focused_text() {
                            text.push(c);
                        }
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let form_rows = state.visible_fields().len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3 * form_rows), // form fields
                Constraint::Length(3),             // progress gauge
                Constraint::Min(4),                // status
                Constraint::Length(1),             // key hints
            ]
            .as_ref(),
        )
        .split(area);

    draw_form(chunks[0], f, state);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(gauge_color(state)))
        .percent(u16::from(state.progress.min(100)));
    f.render_widget(gauge, chunks[1]);

    let mut status_lines = vec![Line::from(vec![
        Span::styled("Status: ", Style::default().fg(Color::Gray)),
        Span::raw(state.status.clone()),
    ])];
    if !state.info.is_empty() {
        status_lines.push(Line::from(Span::styled(
            state.info.clone(),
            Style::default().fg(info_color(state)),
        )));
    }
    let status = Paragraph::new(status_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("secure-file-tool"));
    f.render_widget(status, chunks[2]);

    let hints = Paragraph::new(Line::from(vec![
        Span::styled("enter", Style::default().fg(Color::Magenta)),
        Span::raw(" run  "),
        Span::styled("tab", Style::default().fg(Color::Magenta)),
        Span::raw(" next  "),
        Span::styled("←/→", Style::default().fg(Color::Magenta)),
        Span::raw(" operation  "),
        Span::styled("F1", Style::default().fg(Color::Magenta)),
        Span::raw(" help  "),
        Span::styled("esc", Style::default().fg(Color::Magenta)),
        Span::raw(" quit"),
    ]));
    f.render_widget(hints, chunks[3]);

    if state.show_help {
        draw_help(centered(area, 80, 16), f);
    }
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let fields = state.visible_fields();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(3); fields.len()])
        .split(area);

    for (field, row) in fields.iter().zip(rows.iter()) {
        let (title, value) = match field {
            Field::Input => ("Input File", state.input.clone()),
            Field::Output => ("Output File", state.output.clone()),
            Field::Operation => ("Operation", operation_line(state)),
            Field::Password => ("Password", "*".repeat(state.password.chars().count())),
        };
        let border = if *field == state.focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let p = Paragraph::new(value).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title),
        );
        f.render_widget(p, *row);
    }
}

fn operation_line(state: &UiState) -> String {
    crate::model::OperationKind::ALL
        .iter()
        .map(|k| {
            let label = capitalize(k.as_verb());
            if *k == state.operation {
                format!("[{label}]")
            } else {
                format!(" {label} ")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn gauge_color(state: &UiState) -> Color {
    if state.phase.is_busy() {
        return Color::Cyan;
    }
    match state.last_outcome.as_ref() {
        Some((_, Outcome::Success { .. })) => Color::Green,
        Some((_, Outcome::Failure { .. })) => Color::Red,
        None => Color::Cyan,
    }
}

fn info_color(state: &UiState) -> Color {
    match state.last_outcome.as_ref().and_then(|(_, o)| o.failure_kind()) {
        Some(FailureKind::Validation) => Color::Yellow,
        Some(_) => Color::Red,
        None if state.last_outcome.is_some() => Color::Green,
        None => Color::Gray,
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
