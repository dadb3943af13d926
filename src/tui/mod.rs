mod clipboard;
mod help;
mod state;

use crate::cli::{build_config, ensure_accepted_document, Cli};
use crate::model::{is_accepted_document, RiskSeverity, Role, WorkflowEvent};
use crate::orchestrator::{self, UiCommand, WorkflowController};
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
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{InputMode, UiState, TAB_COUNT, TAB_DATES, TAB_HELP, TAB_QA, TAB_RISKS, TAB_SUMMARY};
use std::path::PathBuf;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const ACCENT: Color = Color::Rgb(0x2B, 0x56, 0x72);

pub async fn run(args: Cli) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // Checked before the terminal is taken over so the error stays readable.
    if let Some(path) = args.file.as_deref() {
        ensure_accepted_document(path)?;
    }

    let controller = WorkflowController::new(&build_config(&args))?;

    if let Some(path) = args.file.clone() {
        let _ = cmd_tx.send(UiCommand::Analyze(path));
    }

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(controller, event_tx, cmd_rx).await;

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
fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<WorkflowEvent>,
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
        signers: args.signers.clone(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
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
                if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
                if state.input_mode != InputMode::Normal {
                    handle_input_key(&mut state, &cmd_tx, k.code);
                    continue;
                }
                match k.code {
                    KeyCode::Char('q') => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyCode::Tab => state.tab = (state.tab + 1) % TAB_COUNT,
                    KeyCode::BackTab => state.tab = (state.tab + TAB_COUNT - 1) % TAB_COUNT,
                    KeyCode::Char('?') => state.tab = TAB_HELP,
                    KeyCode::Char('o') => {
                        if state.analysis_in_progress {
                            state.info = "Analysis already in progress".into();
                        } else {
                            state.input_mode = InputMode::FilePath;
                            state.input.clear();
                        }
                    }
                    KeyCode::Char('a') | KeyCode::Char('i') => {
                        if state.can_ask() {
                            state.tab = TAB_QA;
                            state.input_mode = InputMode::Question;
                            state.input.clear();
                        } else if state.analysis.is_none() {
                            state.info = "Open a contract first".into();
                        }
                    }
                    KeyCode::Char('s') => request_signature(&mut state, &cmd_tx),
                    KeyCode::Up | KeyCode::Char('k') => match state.tab {
                        TAB_DATES => state.select_prev_date(),
                        TAB_QA => {
                            state.conversation_scroll = state.conversation_scroll.saturating_add(1)
                        }
                        _ => {}
                    },
                    KeyCode::Down | KeyCode::Char('j') => match state.tab {
                        TAB_DATES => state.select_next_date(),
                        TAB_QA => {
                            state.conversation_scroll = state.conversation_scroll.saturating_sub(1)
                        }
                        _ => {}
                    },
                    KeyCode::Enter | KeyCode::Char('c') if state.tab == TAB_DATES => {
                        copy_calendar_link(&mut state);
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

fn handle_input_key(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            state.input_mode = InputMode::Normal;
            state.input.clear();
        }
        KeyCode::Backspace => {
            state.input.pop();
        }
        KeyCode::Char(c) => state.input.push(c),
        KeyCode::Enter => {
            let mode = state.input_mode;
            let input = std::mem::take(&mut state.input);
            state.input_mode = InputMode::Normal;
            match mode {
                InputMode::FilePath => submit_file(state, cmd_tx, input.trim()),
                InputMode::Question => {
                    if !input.trim().is_empty() && state.can_ask() {
                        let _ = cmd_tx.send(UiCommand::Ask(input));
                        state.conversation_scroll = 0;
                    }
                }
                InputMode::Normal => {}
            }
        }
        _ => {}
    }
}

fn submit_file(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>, raw: &str) {
    if raw.is_empty() {
        return;
    }
    let path = PathBuf::from(raw);
    if !is_accepted_document(&path) {
        state.info = "Only .pdf, .doc and .docx files are supported".into();
        return;
    }
    let _ = cmd_tx.send(UiCommand::Analyze(path));
}

fn request_signature(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) {
    if !state.can_sign() {
        if state.file_name.is_none() {
            state.info = "Open a contract first".into();
        }
        return;
    }
    if state.signers.is_empty() {
        state.info = "No signers configured (start with --signer \"Name <email>\")".into();
        return;
    }
    let _ = cmd_tx.send(UiCommand::Sign(state.signers.clone()));
}

fn copy_calendar_link(state: &mut UiState) {
    let Some(link) = state.selected_date().and_then(crate::calendar::calendar_link) else {
        return;
    };
    match clipboard::copy_to_clipboard(&link) {
        Ok(_) => state.info = "✓ Calendar link copied to clipboard".into(),
        Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
    }
    state.last_calendar_link = Some(link);
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(4),
            ]
            .as_ref(),
        )
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Summary"),
        Line::from("Risks"),
        Line::from("Key Dates"),
        Line::from("Q&A"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Contract Analyzer"),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    if state.analysis.is_none() && state.tab != TAB_HELP {
        draw_empty(chunks[1], f, state);
    } else {
        match state.tab {
            TAB_SUMMARY => draw_summary(chunks[1], f, state),
            TAB_RISKS => draw_risks(chunks[1], f, state),
            TAB_DATES => draw_dates(chunks[1], f, state),
            TAB_QA => draw_qa(chunks[1], f, state),
            _ => help::draw_help(chunks[1], f),
        }
    }

    draw_input(chunks[2], f, state);
    draw_status(chunks[3], f, state);
}

fn draw_empty(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let msg = if let Some(name) = state.pending_file.as_deref() {
        format!("Analyzing {name}…")
    } else {
        "No contract loaded. Press 'o' and enter a path to a .pdf, .doc or .docx file.".into()
    };
    let p = Paragraph::new(msg)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Upload Contract"));
    f.render_widget(p, area);
}

fn draw_summary(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let Some(analysis) = state.analysis.as_ref() else {
        return;
    };
    let mut lines = vec![Line::from(analysis.summary.clone())];
    if let Some(parties) = analysis.parties.as_ref().filter(|p| !p.is_empty()) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Parties",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for p in parties {
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", p.role), Style::default().fg(Color::Gray)),
                Span::raw(p.name.clone()),
            ]));
        }
    }
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Summary"));
    f.render_widget(p, area);
}

fn severity_color(severity: RiskSeverity) -> Color {
    match severity {
        RiskSeverity::High => Color::Red,
        RiskSeverity::Medium => Color::Yellow,
        RiskSeverity::Low => Color::Green,
    }
}

fn draw_risks(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let Some(analysis) = state.analysis.as_ref() else {
        return;
    };
    let mut lines = Vec::new();
    for r in &analysis.risks {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<6} ", r.severity.as_str().to_uppercase()),
                Style::default()
                    .fg(severity_color(r.severity))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(r.description.clone()),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from("No risks identified."));
    }
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Risk Assessment"));
    f.render_widget(p, area);
}

fn draw_dates(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let dates = state.exportable_dates();
    let mut lines = Vec::new();
    for (idx, d) in dates.iter().enumerate() {
        let selected = idx == state.date_selected;
        let marker = if selected { "› " } else { "  " };
        let style = if selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(marker, style),
            Span::styled(format!("{:<28}", d.kind), style),
            Span::raw(d.date.clone()),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from("No key dates found."));
    }
    if let Some(link) = state.last_calendar_link.as_deref() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            link.to_string(),
            Style::default().fg(Color::Cyan),
        )));
    }
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Key Dates (enter: add to calendar)"),
        );
    f.render_widget(p, area);
}

fn draw_qa(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = Vec::new();
    for m in &state.conversation {
        let (who, style) = match m.role {
            Role::User => ("You", Style::default().fg(Color::White).bg(ACCENT)),
            Role::Assistant => ("Assistant", Style::default().fg(Color::Gray)),
        };
        lines.push(Line::from(Span::styled(
            format!("{who}:"),
            style.add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(m.content.clone()));
        lines.push(Line::from(""));
    }
    if state.question_in_progress {
        lines.push(Line::from(Span::styled(
            "…",
            Style::default().fg(Color::DarkGray),
        )));
    }
    if lines.is_empty() {
        lines.push(Line::from("Press 'a' to ask a question about the contract."));
    }

    // Keep the newest messages visible; scroll moves back in history.
    let visible = area.height.saturating_sub(2) as usize;
    let bottom = lines.len().saturating_sub(state.conversation_scroll);
    let top = bottom.saturating_sub(visible);
    let shown: Vec<Line> = lines[top..bottom].to_vec();

    let p = Paragraph::new(shown)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Contract Q&A"));
    f.render_widget(p, area);
}

fn draw_input(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let (title, body) = match state.input_mode {
        InputMode::FilePath => ("Open contract (path)", format!("{}▏", state.input)),
        InputMode::Question => ("Ask a question", format!("{}▏", state.input)),
        InputMode::Normal => (
            "Input",
            "o: open  a: ask  s: sign  tab: switch  ?: help  q: quit".to_string(),
        ),
    };
    let style = if state.input_mode == InputMode::Normal {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let p = Paragraph::new(Span::styled(body, style))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let flag = |on: bool, label: &'static str| {
        if on {
            Span::styled(label, Style::default().fg(Color::Yellow))
        } else {
            Span::raw("")
        }
    };
    let lines = vec![
        Line::from(vec![
            Span::styled("File: ", Style::default().fg(Color::Gray)),
            Span::raw(state.file_name.clone().unwrap_or_else(|| "-".into())),
            Span::raw("  "),
            Span::styled("Signers: ", Style::default().fg(Color::Gray)),
            Span::raw(state.signers.len().to_string()),
            Span::raw("  "),
            flag(state.analysis_in_progress, "[analyzing] "),
            flag(state.question_in_progress, "[asking] "),
            flag(state.signing_in_progress, "[sending] "),
        ]),
        Line::from(state.info.clone()),
    ];
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}
