//! Main chat event loop and UI rendering
//!
//! This module contains the event loop that polls terminal input, drains
//! the generation channel, and redraws the interface. All terminal state
//! lives here; the application state in [`crate::core::app`] stays
//! toolkit-free.

use std::error::Error;
use std::io;
use std::time::Duration;

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEventKind,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tui_textarea::TextArea;

use crate::api::GenerateRequest;
use crate::auth::{CredentialStore, Provider};
use crate::core::app::{App, Role};
use crate::core::config::Config;
use crate::core::models::find_builtin_model;
use crate::core::stream::{GenerationParams, GenerationService};
use crate::utils::url::generate_stream_url;

const MAX_TOKENS_STEP: i64 = 16;
const TEMPERATURE_STEP: f64 = 0.05;
/// Input box rows including its borders.
const INPUT_HEIGHT: u16 = 4;
const STATUS_HEIGHT: u16 = 1;

/// Everything the loop needs that is resolved once at startup. Credentials
/// are loaded here and never re-read mid-session.
struct ChatSession {
    client: reqwest::Client,
    endpoint: String,
    telnyx_key: Option<String>,
    openai_key: Option<String>,
}

pub async fn run_chat(model_arg: String) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let model = resolve_model(&model_arg, &config)?;

    let credentials = CredentialStore::new();
    let session = ChatSession {
        client: reqwest::Client::new(),
        endpoint: generate_stream_url(),
        telnyx_key: credentials.get(Provider::Telnyx)?,
        openai_key: credentials.get(Provider::Openai)?,
    };

    let mut app = App::new(model, config.gen_params());
    if session.telnyx_key.is_some() {
        app.push_notice("Telnyx API key loaded.".to_string());
    } else {
        app.push_notice("No Telnyx API key configured; run `parley auth`.".to_string());
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut app, &session).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn resolve_model(model_arg: &str, config: &Config) -> Result<String, Box<dyn Error>> {
    if model_arg == "default" {
        if let Some(model) = &config.default_model {
            return Ok(model.clone());
        }
        return Ok(crate::core::models::default_model().id);
    }

    match find_builtin_model(model_arg) {
        Some(model) => Ok(model.id),
        None => Err(format!(
            "Unknown model '{model_arg}'. Run `parley -m` to list available models."
        )
        .into()),
    }
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    session: &ChatSession,
) -> Result<(), Box<dyn Error>> {
    let (service, mut rx) = GenerationService::new();

    let mut textarea = TextArea::default();
    textarea.set_cursor_line_style(Style::default());

    loop {
        let chat_height = chat_area_height(terminal.size()?.height);
        app.follow_tail(chat_height);
        decorate_input(&mut textarea, app.session.is_active());
        terminal.draw(|f| ui(f, app, &textarea))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        break;
                    }
                    KeyCode::Esc => {
                        app.request_stop();
                    }
                    KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
                        textarea.insert_newline();
                    }
                    KeyCode::Enter => {
                        handle_send(app, session, &service, &mut textarea);
                    }
                    KeyCode::F(2) => {
                        app.cycle_model();
                    }
                    KeyCode::F(3) => {
                        app.params.nudge_max_tokens(-MAX_TOKENS_STEP);
                    }
                    KeyCode::F(4) => {
                        app.params.nudge_max_tokens(MAX_TOKENS_STEP);
                    }
                    KeyCode::F(5) => {
                        app.params.nudge_temperature(-TEMPERATURE_STEP);
                    }
                    KeyCode::F(6) => {
                        app.params.nudge_temperature(TEMPERATURE_STEP);
                    }
                    KeyCode::Up => {
                        app.scroll_up(1);
                    }
                    KeyCode::Down => {
                        app.scroll_down(1, chat_height);
                    }
                    KeyCode::PageUp => {
                        app.scroll_up(chat_height.max(1));
                    }
                    KeyCode::PageDown => {
                        app.scroll_down(chat_height.max(1), chat_height);
                    }
                    _ => {
                        textarea.input(key);
                    }
                },
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => app.scroll_up(3),
                    MouseEventKind::ScrollDown => app.scroll_down(3, chat_height),
                    _ => {}
                },
                _ => {}
            }
        }

        // Drain everything the generation task produced since the last
        // tick; rendering happens on this task only.
        while let Ok((stream_event, stream_id)) = rx.try_recv() {
            app.apply_event(stream_event, stream_id);
        }
    }

    // Leaving the loop with a stream still open: cancel it so the task
    // stops reading.
    app.request_stop();
    Ok(())
}

fn handle_send(
    app: &mut App,
    session: &ChatSession,
    service: &GenerationService,
    textarea: &mut TextArea<'_>,
) {
    let prompt = textarea.lines().join("\n").trim().to_string();
    if prompt.is_empty() {
        app.push_notice("Enter a message to send.".to_string());
        return;
    }

    match app.try_send(prompt, session.telnyx_key.is_some()) {
        Ok(pending) => {
            *textarea = TextArea::default();
            textarea.set_cursor_line_style(Style::default());

            let request = GenerateRequest::new(
                pending.prompt,
                app.model.clone(),
                app.params.max_tokens,
                app.params.temperature,
                session.openai_key.clone(),
            );
            let api_key = session
                .telnyx_key
                .clone()
                .unwrap_or_default();

            service.spawn_generation(GenerationParams {
                client: session.client.clone(),
                endpoint: session.endpoint.clone(),
                api_key,
                request,
                cancel_token: pending.cancel_token,
                stream_id: pending.stream_id,
            });
        }
        Err(e) => app.push_notice(e.to_string()),
    }
}

fn chat_area_height(terminal_height: u16) -> u16 {
    terminal_height
        .saturating_sub(INPUT_HEIGHT)
        .saturating_sub(STATUS_HEIGHT)
}

fn ui(f: &mut Frame, app: &App, textarea: &TextArea<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(f.area());

    render_messages(f, app, chunks[0]);
    render_input(f, textarea, chunks[1]);
    render_status(f, app, chunks[2]);
}

fn build_display_lines(app: &App) -> Vec<Line<'_>> {
    let mut lines = Vec::new();

    for msg in &app.messages {
        match msg.role {
            Role::User => {
                // Prompts can be multiline (Alt+Enter); only the first
                // line carries the prefix.
                for (index, content_line) in msg.content.lines().enumerate() {
                    if index == 0 {
                        lines.push(Line::from(vec![
                            Span::styled(
                                "You: ",
                                Style::default()
                                    .fg(Color::Cyan)
                                    .add_modifier(Modifier::BOLD),
                            ),
                            Span::styled(content_line, Style::default().fg(Color::Cyan)),
                        ]));
                    } else {
                        lines.push(Line::from(Span::styled(
                            content_line,
                            Style::default().fg(Color::Cyan),
                        )));
                    }
                }
                lines.push(Line::from(""));
            }
            Role::Assistant => {
                if msg.content.is_empty() {
                    lines.push(Line::from(""));
                } else {
                    for content_line in msg.content.lines() {
                        lines.push(Line::from(Span::styled(
                            content_line,
                            Style::default().fg(Color::White),
                        )));
                    }
                    lines.push(Line::from(""));
                }
            }
            Role::Notice => {
                lines.push(Line::from(Span::styled(
                    &msg.content,
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::from(""));
            }
        }
    }

    lines
}

fn render_messages(f: &mut Frame, app: &App, area: Rect) {
    let lines = build_display_lines(app);
    let total_lines = lines.len() as u16;
    let max_offset = total_lines.saturating_sub(area.height);
    let scroll_offset = app.scroll_offset.min(max_offset);

    let messages = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .scroll((scroll_offset, 0));

    f.render_widget(messages, area);
}

fn decorate_input(textarea: &mut TextArea<'_>, streaming: bool) {
    let title = if streaming {
        "Streaming… (Esc to stop)"
    } else {
        "Message (Enter sends, Alt+Enter for newline, Ctrl+C quits)"
    };
    let border_style = if streaming {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );
}

fn render_input(f: &mut Frame, textarea: &TextArea<'_>, area: Rect) {
    f.render_widget(textarea, area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let streaming = if app.session.is_active() { "streaming" } else { "idle" };
    let status = Line::from(vec![
        Span::styled(
            format!(" {} ", app.model),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(format!(
            "| max_tokens {} (F3/F4) | temperature {:.2} (F5/F6) | model F2 | {streaming}",
            app.params.max_tokens, app.params.temperature
        )),
    ]);
    f.render_widget(Paragraph::new(status), area);
}
