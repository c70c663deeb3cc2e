mod commands;
pub mod refresh;

use crate::api::ApiClient;
use crate::config::Config;
use crate::state::{Message, Sender, SessionContext, TranscriptManager, TranscriptUpdate};
use crate::terminal::{self, TerminalType};
use crate::ui::input_metrics::clamp_to_char_boundary_left;
use crate::ui::{layout, render};
use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use refresh::ScheduledRefresh;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task;
use tokio_util::sync::CancellationToken;

const TUI_TICK_INTERVAL: Duration = Duration::from_millis(120);
const DOUBLE_INTERRUPT_EXIT_WINDOW: Duration = Duration::from_millis(900);
const SCROLL_STEP: usize = 3;

/// What the chat page shows when a turn dies; the reduction never writes
/// error text into the transcript itself.
const FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble responding right now. Please try again.";

/// Everything the background tasks can tell the UI loop.
pub enum UiUpdate {
    TranscriptAppend(Message),
    TranscriptReplace(String),
    StreamStatus(String),
    TurnComplete { thread_id: Option<String> },
    TurnFailed(String),
    Notice(String),
    CommandFailed(String),
    SessionChanged(SessionContext),
}

struct TurnRequest {
    query: String,
    thread_id: String,
    cancel: CancellationToken,
}

/// The trailing assistant message while its turn streams: which history
/// lines it occupies and the timestamp replacement must keep.
struct ActiveAssistant {
    line_start: usize,
    line_count: usize,
    timestamp: DateTime<Utc>,
}

pub struct App {
    config: Config,
    client: ApiClient,
    update_rx: mpsc::UnboundedReceiver<UiUpdate>,
    update_tx: mpsc::UnboundedSender<UiUpdate>,
    turn_tx: mpsc::UnboundedSender<TurnRequest>,
    transcript: Arc<Mutex<TranscriptManager>>,
    session: SessionContext,
    watch: Option<ScheduledRefresh>,
    terminal: Option<TerminalType>,
    should_quit: bool,
    turn_in_progress: bool,
    active_turn_cancel: Option<CancellationToken>,
    stream_status: Option<String>,
    history_lines: Vec<String>,
    active_assistant: Option<ActiveAssistant>,
    follow_tail: bool,
    scroll_offset: usize,
    input_buffer: String,
    cursor_byte: usize,
    last_interrupt_at: Option<Instant>,
    last_thread_id: Option<String>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
            anyhow::bail!("nchat needs an interactive terminal");
        }

        let client = ApiClient::new(&config)?;
        let transcript = Arc::new(Mutex::new(TranscriptManager::new(client.clone())));

        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (turn_tx, turn_rx) = mpsc::unbounded_channel();
        spawn_turn_runner(Arc::clone(&transcript), turn_rx, update_tx.clone());

        let terminal = terminal::setup()?;

        Ok(Self {
            config,
            client,
            update_rx,
            update_tx,
            turn_tx,
            transcript,
            session: SessionContext::guest(),
            watch: None,
            terminal: Some(terminal),
            should_quit: false,
            turn_in_progress: false,
            active_turn_cancel: None,
            stream_status: None,
            history_lines: Vec::new(),
            active_assistant: None,
            follow_tail: true,
            scroll_offset: 0,
            input_buffer: String::new(),
            cursor_byte: 0,
            last_interrupt_at: None,
            last_thread_id: None,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.push_notice("* Neutral Chat");
        self.push_notice("  └ /commands lists shortcuts; plain text starts a turn");
        self.push_notice("");

        let mut tick = tokio::time::interval(TUI_TICK_INTERVAL);
        while !self.should_quit {
            self.draw_frame()?;
            self.process_terminal_events()?;
            self.drain_updates_nonblocking();

            tokio::select! {
                _ = tick.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    if self.handle_interrupt() {
                        break;
                    }
                }
                update = self.update_rx.recv() => {
                    self.handle_update(update);
                }
            }
        }

        self.watch = None;
        if self.terminal.take().is_some() {
            let _ = terminal::restore();
        }
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        let status_line = self.status_line_text();
        let input = self.input_buffer.clone();
        let cursor_byte = self.cursor_byte;
        let lines = self.history_lines.clone();
        let follow_tail = self.follow_tail;
        let scroll_offset = self.scroll_offset;

        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(());
        };

        terminal.draw(|frame| {
            let area = frame.area();
            let input_width = area.width.saturating_sub(2).max(1) as usize;
            let input_rows = render::input_visual_rows(&input, input_width) as u16;
            let panes = layout::split_chat_layout(area, input_rows);

            let viewport = panes.history.height as usize;
            let max_scroll = lines.len().saturating_sub(viewport);
            let scroll = if follow_tail {
                max_scroll
            } else {
                scroll_offset.min(max_scroll)
            };

            render::render_history(frame, panes.history, &lines, scroll);
            render::render_status_line(frame, panes.status, &status_line);
            render::render_input(frame, panes.input, &input, cursor_byte);
        })?;

        Ok(())
    }

    fn status_line_text(&self) -> String {
        let mut parts = vec![self.session.describe()];
        if self.turn_in_progress {
            match &self.stream_status {
                Some(status) => parts.push(format!("typing… ({status})")),
                None => parts.push("typing…".to_string()),
            }
        } else {
            parts.push("ready".to_string());
        }
        if self.watch.is_some() {
            parts.push("watch:on".to_string());
        }
        if let Some(thread_id) = &self.last_thread_id {
            parts.push(format!("thread:{thread_id}"));
        }
        parts.push(self.client.base_url().to_string());
        parts.join(" │ ")
    }

    // --- update handling ---

    fn drain_updates_nonblocking(&mut self) {
        while let Ok(update) = self.update_rx.try_recv() {
            self.apply_update(update);
        }
    }

    fn handle_update(&mut self, update: Option<UiUpdate>) {
        match update {
            Some(update) => self.apply_update(update),
            None => self.should_quit = true,
        }
    }

    fn apply_update(&mut self, update: UiUpdate) {
        match update {
            UiUpdate::TranscriptAppend(message) => {
                let line_start = self.history_lines.len();
                let lines = render::format_message_lines(&message);
                let line_count = lines.len();
                self.history_lines.extend(lines);

                if message.sender == Sender::Assistant && self.turn_in_progress {
                    self.active_assistant = Some(ActiveAssistant {
                        line_start,
                        line_count,
                        timestamp: message.timestamp,
                    });
                }
            }
            UiUpdate::TranscriptReplace(text) => {
                if let Some(active) = &mut self.active_assistant {
                    let message = Message {
                        text,
                        sender: Sender::Assistant,
                        timestamp: active.timestamp,
                    };
                    let lines = render::format_message_lines(&message);
                    let end = (active.line_start + active.line_count)
                        .min(self.history_lines.len());
                    self.history_lines
                        .splice(active.line_start..end, lines.iter().cloned());
                    active.line_count = lines.len();
                }
            }
            UiUpdate::StreamStatus(status) => {
                self.stream_status = Some(status);
            }
            UiUpdate::TurnComplete { thread_id } => {
                if thread_id.is_some() {
                    self.last_thread_id = thread_id;
                }
                self.end_turn_ui();
            }
            UiUpdate::TurnFailed(message) => {
                self.push_error(&message);
                self.end_turn_ui();
            }
            UiUpdate::Notice(text) => {
                for line in text.split('\n') {
                    self.push_notice(line);
                }
            }
            UiUpdate::CommandFailed(text) => self.push_error(&text),
            UiUpdate::SessionChanged(session) => {
                // A changed identity invalidates any admin watch.
                if session != self.session {
                    self.watch = None;
                }
                self.session = session;
            }
        }
    }

    fn end_turn_ui(&mut self) {
        self.turn_in_progress = false;
        self.active_turn_cancel = None;
        self.active_assistant = None;
        self.stream_status = None;
    }

    fn push_notice(&mut self, line: &str) {
        self.history_lines.push(line.to_string());
    }

    fn push_error(&mut self, text: &str) {
        for line in text.split('\n') {
            self.history_lines.push(format!("[error] {line}"));
        }
    }

    // --- terminal input ---

    fn process_terminal_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Paste(text) => {
                    if !self.turn_in_progress && !text.is_empty() {
                        self.insert_str(&text);
                    }
                }
                Event::Key(key)
                    if key.kind == KeyEventKind::Press || key.kind == KeyEventKind::Repeat =>
                {
                    self.handle_key_event(key);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.handle_interrupt() {
                    self.should_quit = true;
                }
                return;
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.input_buffer.is_empty() {
                    self.should_quit = true;
                }
                return;
            }
            KeyCode::PageUp => {
                self.follow_tail = false;
                self.scroll_offset = self.scroll_offset.saturating_sub(SCROLL_STEP);
                return;
            }
            KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_add(SCROLL_STEP);
                if self.scroll_offset >= self.history_lines.len() {
                    self.follow_tail = true;
                }
                return;
            }
            KeyCode::Esc => {
                if self.turn_in_progress {
                    self.cancel_active_turn();
                } else {
                    self.input_buffer.clear();
                    self.cursor_byte = 0;
                }
                return;
            }
            _ => {}
        }

        // Input is disabled while the assistant is typing, the same policy
        // the chat page enforces on its input box.
        if self.turn_in_progress {
            return;
        }

        match key.code {
            KeyCode::Enter => {
                if let Some(content) = self.take_submission() {
                    self.submit_input(content);
                }
            }
            KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_str("\n");
            }
            KeyCode::Left => self.cursor_byte = self.prev_char_boundary(self.cursor_byte),
            KeyCode::Right => self.cursor_byte = self.next_char_boundary(self.cursor_byte),
            KeyCode::Home => self.cursor_byte = 0,
            KeyCode::End => self.cursor_byte = self.input_buffer.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Char(ch)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                self.insert_str(&ch.to_string());
            }
            _ => {}
        }
    }

    fn handle_interrupt(&mut self) -> bool {
        if self.turn_in_progress {
            self.cancel_active_turn();
            return false;
        }

        let now = Instant::now();
        if let Some(last) = self.last_interrupt_at {
            if now.duration_since(last) <= DOUBLE_INTERRUPT_EXIT_WINDOW {
                return true;
            }
        }
        self.last_interrupt_at = Some(now);
        self.push_notice("* press ctrl-c again to quit");
        false
    }

    fn cancel_active_turn(&mut self) {
        if let Some(cancel) = &self.active_turn_cancel {
            cancel.cancel();
            self.push_notice("* turn cancelled");
        }
    }

    fn take_submission(&mut self) -> Option<String> {
        let value = self.input_buffer.trim().to_string();
        self.input_buffer.clear();
        self.cursor_byte = 0;
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    fn submit_input(&mut self, content: String) {
        self.last_interrupt_at = None;
        if content.starts_with('/') {
            self.handle_command(&content);
        } else {
            self.start_turn(content);
        }
    }

    fn start_turn(&mut self, query: String) {
        let cancel = CancellationToken::new();
        self.active_turn_cancel = Some(cancel.clone());
        self.turn_in_progress = true;
        self.stream_status = None;
        self.follow_tail = true;

        let request = TurnRequest {
            query,
            thread_id: self.session.thread_id(),
            cancel,
        };
        if self.turn_tx.send(request).is_err() {
            self.push_error("turn runner is gone; restart the client");
            self.end_turn_ui();
        }
    }

    // --- slash commands ---

    fn handle_command(&mut self, input: &str) {
        let mut tokens = input.split_whitespace();
        let command = tokens.next().unwrap_or_default();
        let args: Vec<&str> = tokens.collect();

        match command {
            "/quit" | "/q" | "/exit" => self.should_quit = true,
            "/help" | "/commands" => {
                let _ = self
                    .update_tx
                    .send(UiUpdate::Notice(commands::COMMANDS_HELP.to_string()));
            }
            "/new" => self.reset_conversation(),
            "/logout" => {
                self.session.clear();
                self.watch = None;
                self.push_notice("* signed out");
            }
            "/login" => match args.as_slice() {
                [email, password] => self.spawn_command(commands::run_login(
                    self.client.clone(),
                    self.update_tx.clone(),
                    email.to_string(),
                    password.to_string(),
                )),
                _ => self.push_error("usage: /login <email> <password>"),
            },
            "/register" => match args.as_slice() {
                [email, password] => self.spawn_command(commands::run_register(
                    self.client.clone(),
                    self.update_tx.clone(),
                    email.to_string(),
                    password.to_string(),
                )),
                _ => self.push_error("usage: /register <email> <password>"),
            },
            "/verify" => match args.as_slice() {
                [email, code] => self.spawn_command(commands::run_verify(
                    self.client.clone(),
                    self.update_tx.clone(),
                    email.to_string(),
                    code.to_string(),
                )),
                _ => self.push_error("usage: /verify <email> <code>"),
            },
            "/resend" => match args.as_slice() {
                [email] => self.spawn_command(commands::run_resend(
                    self.client.clone(),
                    self.update_tx.clone(),
                    email.to_string(),
                )),
                _ => self.push_error("usage: /resend <email>"),
            },
            "/reset-request" => match args.as_slice() {
                [email] => self.spawn_command(commands::run_reset_request(
                    self.client.clone(),
                    self.update_tx.clone(),
                    email.to_string(),
                )),
                _ => self.push_error("usage: /reset-request <email>"),
            },
            "/reset" => match args.as_slice() {
                [email, code, new_password] => self.spawn_command(commands::run_reset(
                    self.client.clone(),
                    self.update_tx.clone(),
                    email.to_string(),
                    code.to_string(),
                    new_password.to_string(),
                )),
                _ => self.push_error("usage: /reset <email> <code> <new-password>"),
            },
            "/prompt" => match args.as_slice() {
                [] => self.spawn_command(commands::run_prompt_show(
                    self.client.clone(),
                    self.update_tx.clone(),
                )),
                ["set", ..] => {
                    let prompt = input
                        .trim_start_matches("/prompt")
                        .trim_start()
                        .trim_start_matches("set")
                        .trim_start()
                        .to_string();
                    if prompt.is_empty() {
                        self.push_error("usage: /prompt set <text>");
                    } else {
                        self.spawn_command(commands::run_prompt_set(
                            self.client.clone(),
                            self.update_tx.clone(),
                            prompt,
                        ));
                    }
                }
                _ => self.push_error("usage: /prompt [set <text>]"),
            },
            "/uploads" => match args.as_slice() {
                [] => self.spawn_command(commands::run_uploads(
                    self.client.clone(),
                    self.update_tx.clone(),
                    crate::api::client::DEFAULT_UPLOAD_HISTORY_LIMIT,
                )),
                [limit] if limit.parse::<usize>().is_ok() => {
                    let limit = limit.parse().unwrap_or(1).max(1);
                    self.spawn_command(commands::run_uploads(
                        self.client.clone(),
                        self.update_tx.clone(),
                        limit,
                    ));
                }
                ["delete", id] if id.parse::<i64>().is_ok() => {
                    self.spawn_command(commands::run_upload_delete(
                        self.client.clone(),
                        self.update_tx.clone(),
                        id.parse().unwrap_or_default(),
                    ));
                }
                _ => self.push_error("usage: /uploads [limit] | /uploads delete <id>"),
            },
            "/admins" => match args.as_slice() {
                [] => self.spawn_command(commands::run_admins(
                    self.client.clone(),
                    self.update_tx.clone(),
                    self.session.clone(),
                )),
                ["toggle", id] if id.parse::<i64>().is_ok() => {
                    self.spawn_command(commands::run_admin_toggle(
                        self.client.clone(),
                        self.update_tx.clone(),
                        self.session.clone(),
                        id.parse().unwrap_or_default(),
                    ));
                }
                _ => self.push_error("usage: /admins [toggle <id>]"),
            },
            "/watch" => self.start_watch(),
            "/unwatch" => {
                if self.watch.take().is_some() {
                    self.push_notice("* watch stopped");
                } else {
                    self.push_notice("* watch is not running");
                }
            }
            "/health" => self.spawn_command(commands::run_health(
                self.client.clone(),
                self.update_tx.clone(),
            )),
            _ => self.push_error(&format!("unknown command {command}; try /commands")),
        }
    }

    fn spawn_command<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        task::spawn(future);
    }

    fn start_watch(&mut self) {
        if self.watch.is_some() {
            self.push_notice("* watch already running");
            return;
        }

        let client = self.client.clone();
        let update_tx = self.update_tx.clone();
        let session = self.session.clone();
        let period = self.config.refresh_interval;

        self.watch = Some(ScheduledRefresh::spawn(period, move || {
            let client = client.clone();
            let update_tx = update_tx.clone();
            let session = session.clone();
            async move {
                commands::run_watch_pass(
                    client,
                    update_tx,
                    session,
                    crate::api::client::DEFAULT_UPLOAD_HISTORY_LIMIT,
                )
                .await;
            }
        }));
        self.push_notice(&format!(
            "* watch started (every {}s)",
            period.as_secs()
        ));
    }

    fn reset_conversation(&mut self) {
        if self.turn_in_progress {
            self.push_error("cannot start a new chat while a turn is streaming");
            return;
        }
        let locked = match self.transcript.try_lock() {
            Ok(mut manager) => {
                manager.reset();
                true
            }
            Err(_) => false,
        };
        if locked {
            self.history_lines.clear();
            self.active_assistant = None;
            self.scroll_offset = 0;
            self.follow_tail = true;
            self.push_notice("* new conversation");
        } else {
            self.push_error("transcript is busy; try again");
        }
    }

    // --- input editing ---

    fn insert_str(&mut self, value: &str) {
        let cursor = clamp_to_char_boundary_left(&self.input_buffer, self.cursor_byte);
        self.input_buffer.insert_str(cursor, value);
        self.cursor_byte = cursor + value.len();
    }

    fn prev_char_boundary(&self, idx: usize) -> usize {
        let i = clamp_to_char_boundary_left(&self.input_buffer, idx);
        if i == 0 {
            return 0;
        }
        let mut j = i - 1;
        while j > 0 && !self.input_buffer.is_char_boundary(j) {
            j -= 1;
        }
        j
    }

    fn next_char_boundary(&self, idx: usize) -> usize {
        let i = clamp_to_char_boundary_left(&self.input_buffer, idx);
        match self.input_buffer[i..].chars().next() {
            Some(ch) => i + ch.len_utf8(),
            None => self.input_buffer.len(),
        }
    }

    fn backspace(&mut self) {
        let end = clamp_to_char_boundary_left(&self.input_buffer, self.cursor_byte);
        if end == 0 {
            return;
        }
        let start = self.prev_char_boundary(end);
        self.input_buffer.replace_range(start..end, "");
        self.cursor_byte = start;
    }

    fn delete_forward(&mut self) {
        let start = clamp_to_char_boundary_left(&self.input_buffer, self.cursor_byte);
        if start >= self.input_buffer.len() {
            return;
        }
        let end = self.next_char_boundary(start);
        self.input_buffer.replace_range(start..end, "");
        self.cursor_byte = start;
    }
}

/// One background task owns the transcript and runs turns serially; the UI
/// loop only ever sees `UiUpdate`s.
fn spawn_turn_runner(
    transcript: Arc<Mutex<TranscriptManager>>,
    mut turn_rx: mpsc::UnboundedReceiver<TurnRequest>,
    update_tx: mpsc::UnboundedSender<UiUpdate>,
) {
    task::spawn(async move {
        while let Some(request) = turn_rx.recv().await {
            let mut manager = transcript.lock().await;

            let (delta_tx, mut delta_rx) = mpsc::unbounded_channel::<TranscriptUpdate>();
            let forward_tx = update_tx.clone();
            let forwarder = task::spawn(async move {
                while let Some(update) = delta_rx.recv().await {
                    let ui_update = match update {
                        TranscriptUpdate::Append(message) => {
                            UiUpdate::TranscriptAppend(message)
                        }
                        TranscriptUpdate::Replace(text) => UiUpdate::TranscriptReplace(text),
                        TranscriptUpdate::Status(status) => UiUpdate::StreamStatus(status),
                        // The terminal TurnComplete below carries the id.
                        TranscriptUpdate::Complete(_) => continue,
                    };
                    let _ = forward_tx.send(ui_update);
                }
            });

            let result = manager
                .send_message(
                    request.query,
                    request.thread_id,
                    request.cancel,
                    Some(&delta_tx),
                )
                .await;

            if result.is_err() {
                manager.append_fallback_assistant(FALLBACK_REPLY, Some(&delta_tx));
            }

            drop(manager);
            drop(delta_tx);
            if let Err(join_error) = forwarder.await {
                let _ = update_tx.send(UiUpdate::TurnFailed(format!(
                    "stream forwarding failed: {join_error}"
                )));
                continue;
            }

            match result {
                Ok(thread_id) => {
                    let _ = update_tx.send(UiUpdate::TurnComplete { thread_id });
                }
                Err(error) => {
                    let _ = update_tx.send(UiUpdate::TurnFailed(error.to_string()));
                }
            }
        }
    });
}
