mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::client::WorkflowClient;
use crate::config;
use crate::model::{UiEvent, UiPhase};
use crate::orchestrator::{self, UiCommand};
use crate::render::{self, ResultsView, Row, SectionBody};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{apply_event, palette, Palette, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Delay before a bootstrap auto-run fires, so the first frame paints first.
const AUTO_RUN_DELAY: Duration = Duration::from_millis(80);

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the
    // controller task.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let client = WorkflowClient::new(&args.server)?;

    // TUI runs in a dedicated thread to keep all blocking I/O out of the
    // Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(client, event_tx, cmd_rx).await;

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
    mut event_rx: UnboundedReceiver<UiEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        theme: config::load_theme(),
        server: args.server.clone(),
        input: args.text.clone().unwrap_or_default(),
        ..Default::default()
    };
    if args.auto && !state.input.is_empty() {
        state.pending_auto_run = Some(Instant::now() + AUTO_RUN_DELAY);
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if let Some(text) = take_due_auto_run(&mut state, Instant::now()) {
            let _ = cmd_tx.send(UiCommand::Submit { text });
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(outcome) = handle_key(&mut state, &cmd_tx, k.modifiers, k.code) {
                    break outcome;
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// One-shot: the prefilled input runs once the delay elapses, with whatever
/// the input holds at that moment.
fn take_due_auto_run(state: &mut UiState, now: Instant) -> Option<String> {
    let deadline = state.pending_auto_run?;
    if now < deadline {
        return None;
    }
    state.pending_auto_run = None;
    Some(state.input.clone())
}

/// Apply one key press. Returns the loop outcome when the key quits the UI.
fn handle_key(
    state: &mut UiState,
    cmd_tx: &UnboundedSender<UiCommand>,
    modifiers: KeyModifiers,
    code: KeyCode,
) -> Option<Result<()>> {
    // The confirmation overlay swallows everything except its own answers.
    if state.confirm_clear {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                state.confirm_clear = false;
                let _ = cmd_tx.send(UiCommand::ClearStore {
                    on_dashboard: state.tab == 1,
                    include_done: state.include_done,
                });
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.confirm_clear = false;
            }
            _ => {}
        }
        return None;
    }

    match (modifiers, code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            let _ = cmd_tx.send(UiCommand::Quit);
            return Some(Ok(()));
        }
        (KeyModifiers::CONTROL, KeyCode::Char('l')) => {
            if state.tab == 0 && state.controls_enabled() {
                let _ = cmd_tx.send(UiCommand::ClearInput);
            }
        }
        (KeyModifiers::CONTROL, KeyCode::Char('k')) => {
            // The controller only ever sees a confirmed request.
            if state.tab < 2 && state.controls_enabled() {
                state.confirm_clear = true;
            }
        }
        (KeyModifiers::CONTROL, KeyCode::Char('y')) => {
            if state.tab == 0 {
                copy_selected(state);
            }
        }
        (_, KeyCode::Tab) => {
            state.tab = (state.tab + 1) % 3;
            if state.tab == 1 && !state.dashboard_loaded {
                let _ = cmd_tx.send(UiCommand::RefreshDashboard {
                    include_done: state.include_done,
                });
            }
        }
        (_, KeyCode::Esc) => {
            let _ = cmd_tx.send(UiCommand::Quit);
            return Some(Ok(()));
        }
        (_, KeyCode::Enter) => {
            if state.tab == 0 && state.controls_enabled() {
                let _ = cmd_tx.send(UiCommand::Submit {
                    text: state.input.clone(),
                });
            }
        }
        (_, KeyCode::Up) => move_selection(state, true),
        (_, KeyCode::Down) => move_selection(state, false),
        (_, KeyCode::Backspace) => {
            if state.tab == 0 {
                state.input.pop();
            }
        }
        (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => {
            if state.tab == 0 {
                state.input.push(c);
            } else {
                match c {
                    'q' => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        return Some(Ok(()));
                    }
                    'r' => {
                        if state.tab == 1 && state.controls_enabled() {
                            let _ = cmd_tx.send(UiCommand::RefreshDashboard {
                                include_done: state.include_done,
                            });
                        }
                    }
                    't' => {
                        if state.tab == 1 && state.controls_enabled() {
                            state.include_done = !state.include_done;
                            let _ = cmd_tx.send(UiCommand::RefreshDashboard {
                                include_done: state.include_done,
                            });
                        }
                    }
                    'd' => {
                        if state.tab == 1 && state.controls_enabled() {
                            mark_selected_done(state, cmd_tx);
                        }
                    }
                    'j' => {
                        if state.tab == 1 {
                            move_selection(state, false);
                        }
                    }
                    'k' => {
                        if state.tab == 1 {
                            move_selection(state, true);
                        }
                    }
                    '?' => state.tab = 2,
                    _ => {}
                }
            }
        }
        _ => {}
    }
    None
}

fn move_selection(state: &mut UiState, up: bool) {
    let count = if state.tab == 1 {
        state.dashboard.tasks.len()
    } else {
        state.export_count()
    };
    if count == 0 {
        return;
    }
    let selected = if state.tab == 1 {
        &mut state.dashboard_selected
    } else {
        &mut state.selected_export
    };
    if up {
        if *selected > 0 {
            *selected -= 1;
        }
    } else if *selected < count - 1 {
        *selected += 1;
    }
}

fn copy_selected(state: &mut UiState) {
    let record = state
        .results
        .as_ref()
        .and_then(|view| view.export_at(state.selected_export));
    match record {
        Some(record) => match export::copy_json(record) {
            Ok(()) => state.info = "Copied JSON to clipboard".into(),
            Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
        },
        None => state.info = "Nothing to copy yet.".into(),
    }
}

fn mark_selected_done(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) {
    let task = state.dashboard.tasks.get(state.dashboard_selected);
    match task.and_then(|t| t.id.clone()) {
        Some(task_id) => {
            let _ = cmd_tx.send(UiCommand::MarkTaskDone {
                task_id,
                include_done: state.include_done,
            });
        }
        None => state.info = "No task selected.".into(),
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let pal = palette(state.theme);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Workflow"),
        Line::from("Dashboard"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(pal.border))
            .title("workflowgenie-cli"),
    )
    .highlight_style(Style::default().fg(pal.accent));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_workflow(chunks[1], f, state),
        1 => draw_dashboard(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }

    if state.confirm_clear {
        draw_confirm(area, f, state);
    }
}

fn draw_workflow(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let pal = palette(state.theme);
    let mut constraints = vec![Constraint::Length(3), Constraint::Length(3)];
    if state.error.is_some() {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let input_title = if state.phase == UiPhase::Loading {
        "Instructions (running…)"
    } else {
        "Instructions"
    };
    let input = Paragraph::new(Line::from(vec![
        Span::raw(state.input.clone()),
        Span::styled("▌", Style::default().fg(pal.accent)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(pal.border))
            .title(input_title),
    );
    f.render_widget(input, chunks[0]);

    let status = Paragraph::new(Line::from(vec![
        Span::styled("Phase: ", Style::default().fg(pal.label)),
        Span::raw(format!("{:?}", state.phase)),
        Span::raw("   "),
        Span::styled("Server: ", Style::default().fg(pal.label)),
        Span::raw(state.server.clone()),
        Span::raw("   "),
        Span::raw(state.info.clone()),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(pal.border))
            .title("Status"),
    );
    f.render_widget(status, chunks[1]);

    let mut next = 2;
    if let Some(error) = state.error.as_deref() {
        let p = Paragraph::new(Span::styled(
            error.to_string(),
            Style::default().fg(pal.error),
        ))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(pal.error))
                .title("Error"),
        );
        f.render_widget(p, chunks[next]);
        next += 1;
    }

    let results = Paragraph::new(results_lines(state, &pal))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(pal.border))
                .title("Results"),
        );
    f.render_widget(results, chunks[next]);

    let hint = Paragraph::new(Line::from(Span::styled(
        "Enter run | Ctrl-L clear input | Ctrl-K clear DB | Ctrl-Y copy JSON | Tab tabs | Esc quit",
        Style::default().fg(pal.label),
    )));
    f.render_widget(hint, chunks[next + 1]);
}

fn results_lines(state: &UiState, pal: &Palette) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let view = match state.results.as_ref() {
        Some(view) => view,
        None => return lines,
    };
    match view {
        ResultsView::Notice(msg) => {
            lines.push(Line::from(Span::styled(
                msg.clone(),
                Style::default().fg(pal.label),
            )));
        }
        ResultsView::Sections(sections) => {
            let mut export_idx = 0usize;
            for section in sections {
                lines.push(Line::from(Span::styled(
                    section.title,
                    Style::default().fg(pal.accent),
                )));
                match &section.body {
                    SectionBody::Empty(msg) => {
                        lines.push(Line::from(vec![
                            Span::raw("  "),
                            Span::styled((*msg).to_string(), Style::default().fg(pal.label)),
                        ]));
                    }
                    SectionBody::Rows(rows) => {
                        for row in rows {
                            lines.push(row_line(row, export_idx == state.selected_export, pal));
                            if !row.meta.is_empty() {
                                lines.push(Line::from(vec![
                                    Span::raw("    "),
                                    Span::styled(row.meta.clone(), Style::default().fg(pal.label)),
                                ]));
                            }
                            export_idx += 1;
                        }
                    }
                    SectionBody::Report(report) => {
                        let selected = export_idx == state.selected_export;
                        let marker = if selected { "> " } else { "  " };
                        let style = if selected {
                            Style::default()
                                .fg(pal.accent)
                                .add_modifier(Modifier::REVERSED)
                        } else {
                            Style::default()
                        };
                        let head = if report.summary.is_empty() {
                            report.counts.clone()
                        } else {
                            report.summary.clone()
                        };
                        lines.push(Line::from(vec![
                            Span::styled(marker, style),
                            Span::styled(head, style),
                        ]));
                        if !report.summary.is_empty() {
                            lines.push(Line::from(vec![
                                Span::raw("    "),
                                Span::styled(report.counts.clone(), Style::default().fg(pal.label)),
                            ]));
                        }
                        for action in &report.top_actions {
                            lines.push(Line::from(format!("    - {action}")));
                        }
                        export_idx += 1;
                    }
                }
                lines.push(Line::from(""));
            }
        }
    }
    lines
}

fn row_line(row: &Row, selected: bool, pal: &Palette) -> Line<'static> {
    let marker = if selected { "> " } else { "  " };
    let style = if selected {
        Style::default()
            .fg(pal.accent)
            .add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(marker, style),
        Span::styled(row.primary.clone(), style),
    ])
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let pal = palette(state.theme);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(34),
                Constraint::Percentage(33),
                Constraint::Percentage(33),
            ]
            .as_ref(),
        )
        .split(chunks[0]);

    let mut task_lines: Vec<Line> = Vec::new();
    if !state.dashboard_loaded {
        task_lines.push(Line::from("Loading…"));
    } else if state.dashboard.tasks.is_empty() {
        task_lines.push(Line::from(Span::styled(
            "No tasks added",
            Style::default().fg(pal.label),
        )));
    } else {
        for (idx, task) in state.dashboard.tasks.iter().enumerate() {
            let row = render::dashboard_task_row(task);
            task_lines.push(row_line(&row, idx == state.dashboard_selected, &pal));
            if !row.meta.is_empty() {
                task_lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(row.meta.clone(), Style::default().fg(pal.label)),
                ]));
            }
        }
    }
    let tasks_title = if state.include_done {
        "Stored Tasks (incl. done)"
    } else {
        "Stored Tasks"
    };
    let tasks = Paragraph::new(task_lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(pal.border))
            .title(tasks_title),
    );
    f.render_widget(tasks, cols[0]);

    let events = column_lines(
        state.dashboard_loaded,
        state.dashboard.events.iter().map(render::event_row),
        "No events planned",
        &pal,
    );
    let events = Paragraph::new(events).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(pal.border))
            .title("Planned Events"),
    );
    f.render_widget(events, cols[1]);

    let reminders = column_lines(
        state.dashboard_loaded,
        state.dashboard.reminders.iter().map(render::reminder_row),
        "No reminders",
        &pal,
    );
    let reminders = Paragraph::new(reminders).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(pal.border))
            .title("Reminders"),
    );
    f.render_widget(reminders, cols[2]);

    let status = Paragraph::new(Line::from(vec![
        Span::raw(state.info.clone()),
        Span::raw("   "),
        Span::styled(
            "r refresh | t toggle done | ↑/↓ select | d mark done | Ctrl-K clear DB | q quit",
            Style::default().fg(pal.label),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(pal.border))
            .title("Status"),
    );
    f.render_widget(status, chunks[1]);
}

fn column_lines(
    loaded: bool,
    rows: impl Iterator<Item = Row>,
    empty: &'static str,
    pal: &Palette,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if !loaded {
        lines.push(Line::from("Loading…"));
        return lines;
    }
    for row in rows {
        lines.push(Line::from(format!("  {}", row.primary)));
        if !row.meta.is_empty() {
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(row.meta, Style::default().fg(pal.label)),
            ]));
        }
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            empty,
            Style::default().fg(pal.label),
        )));
    }
    lines
}

fn draw_confirm(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let pal = palette(state.theme);
    let width = area.width.min(58);
    let height = 5u16;
    let rect = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, rect);
    let p = Paragraph::new(vec![
        Line::from("Clear the local DB? This will remove stored tasks."),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Magenta)),
            Span::raw(" confirm    "),
            Span::styled("n", Style::default().fg(Color::Magenta)),
            Span::raw(" cancel"),
        ]),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(pal.accent))
            .title("Confirm"),
    );
    f.render_widget(p, rect);
}
