use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gdchat_core::{
    format_bot_text, role_label, ChatController, ChatTransport, ConfirmFn, ExportWriter,
    GeminiClient, HistoryStore, JsonFileStore, Message, Renderer, Role, Settings,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::theme::Theme;

const TYPING_TEXT: &str = "GDCHAT está digitando...";
const CONFIRM_PROMPT: &str = "Tem certeza que deseja limpar todo o histórico? (s/n)";

fn now_str() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

// ── Display-surface plumbing ────────────────────────────────────────────

/// Ops the controller pushes at the display surface; the draw loop applies
/// them to the visual unit list.
enum RenderOp {
    Message(Message),
    Typing,
    ClearTyping,
    Transient(String),
    Reset,
    ConfirmClear,
}

/// Renderer that forwards every op into the TUI draw loop.
struct ChannelRenderer {
    tx: mpsc::UnboundedSender<RenderOp>,
}

impl Renderer for ChannelRenderer {
    fn message(&mut self, message: &Message) {
        let _ = self.tx.send(RenderOp::Message(message.clone()));
    }

    fn typing(&mut self) {
        let _ = self.tx.send(RenderOp::Typing);
    }

    fn clear_typing(&mut self) {
        let _ = self.tx.send(RenderOp::ClearTyping);
    }

    fn transient(&mut self, text: &str) {
        let _ = self.tx.send(RenderOp::Transient(text.to_string()));
    }

    fn reset(&mut self) {
        let _ = self.tx.send(RenderOp::Reset);
    }
}

// ── Single-prompt mode ──────────────────────────────────────────────────

/// Prints bot replies to stdout, notices to stderr. Muted until `live` is
/// set so the history replay from `init` stays silent.
struct StdoutRenderer {
    live: Arc<AtomicBool>,
}

impl Renderer for StdoutRenderer {
    fn message(&mut self, message: &Message) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }
        match message.role {
            Role::User => {}
            Role::Bot => println!("{}", format_bot_text(&message.content)),
            Role::System => eprintln!("{}", message.content),
        }
    }

    fn typing(&mut self) {}

    fn clear_typing(&mut self) {}

    fn transient(&mut self, text: &str) {
        eprintln!("{text}");
    }

    fn reset(&mut self) {}
}

pub async fn run_single_prompt(settings: &Settings, prompt: &str) -> Result<()> {
    let transport: Arc<dyn ChatTransport> = Arc::new(settings.build_transport()?);
    let live = Arc::new(AtomicBool::new(false));

    let mut controller = ChatController::new(
        transport,
        history_store(settings),
        Box::new(StdoutRenderer { live: live.clone() }),
        export_writer(settings),
    )
    .with_cooldown(Duration::from_secs(settings.chat.cooldown_secs));

    controller.init();
    live.store(true, Ordering::SeqCst);

    controller.submit(prompt).await;
    Ok(())
}

// ── Interactive TUI ─────────────────────────────────────────────────────

#[derive(Clone)]
struct ChatUnit {
    role: Role,
    content: String,
    /// None for system lines; they render without a timestamp.
    timestamp: Option<String>,
}

#[derive(Clone)]
enum UiUnit {
    Message(ChatUnit),
    Typing,
}

struct AppState {
    // Input
    input: String,
    cursor_pos: usize,
    input_history: Vec<String>,
    history_pos: Option<usize>,

    // Chat
    units: Vec<UiUnit>,
    scroll_offset: usize,
    total_content_lines: usize,
    viewport_height: usize,
    user_scrolled_up: bool,

    // Processing state
    is_waiting: bool,
    pending_confirm: bool,

    // Status
    model_name: String,
    quick_replies: Vec<String>,
    quick_reply_pos: Option<usize>,

    should_quit: bool,
    theme: Theme,

    /// Oneshot sender used to respond to a pending clear confirmation.
    /// When the user presses s/n, we send true/false through this channel.
    confirm_tx: Arc<Mutex<Option<oneshot::Sender<bool>>>>,
}

impl AppState {
    fn new(settings: &Settings, theme_name: &str) -> Self {
        Self {
            input: String::new(),
            cursor_pos: 0,
            input_history: Vec::new(),
            history_pos: None,

            units: Vec::new(),
            scroll_offset: 0,
            total_content_lines: 0,
            viewport_height: 0,
            user_scrolled_up: false,

            is_waiting: false,
            pending_confirm: false,

            model_name: settings.llm.model.clone(),
            quick_replies: settings.chat.quick_replies.clone(),
            quick_reply_pos: None,

            should_quit: false,
            theme: Theme::by_name(theme_name),

            confirm_tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Pin the view to the newest unit unless the viewer scrolled away.
    /// Forced scrolls (bot messages) also reset the scrolled-away flag.
    fn smart_scroll(&mut self, force: bool) {
        if force || !self.user_scrolled_up {
            // Resolved to the bottom on the next draw.
            self.scroll_offset = usize::MAX;
            self.user_scrolled_up = false;
        }
    }

    fn bottom_offset(&self) -> usize {
        self.total_content_lines.saturating_sub(self.viewport_height)
    }

    fn scroll_up(&mut self, lines: usize) {
        let current = self.scroll_offset.min(self.bottom_offset());
        self.scroll_offset = current.saturating_sub(lines);
        self.user_scrolled_up = self.scroll_offset < self.bottom_offset();
    }

    fn scroll_down(&mut self, lines: usize) {
        let bottom = self.bottom_offset();
        let current = self.scroll_offset.min(bottom);
        self.scroll_offset = (current + lines).min(bottom);
        if self.scroll_offset >= bottom {
            self.user_scrolled_up = false;
        }
    }

    fn push_history(&mut self, input: String) {
        if !input.is_empty() && self.input_history.last() != Some(&input) {
            self.input_history.push(input);
        }
        self.history_pos = None;
    }

    fn history_prev(&mut self) {
        if self.input_history.is_empty() {
            return;
        }
        let pos = match self.history_pos {
            None => self.input_history.len().saturating_sub(1),
            Some(0) => 0,
            Some(p) => p - 1,
        };
        self.history_pos = Some(pos);
        self.set_input(self.input_history[pos].clone());
    }

    fn history_next(&mut self) {
        match self.history_pos {
            None => {}
            Some(pos) => {
                if pos + 1 >= self.input_history.len() {
                    self.history_pos = None;
                    self.set_input(String::new());
                } else {
                    self.history_pos = Some(pos + 1);
                    self.set_input(self.input_history[pos + 1].clone());
                }
            }
        }
    }

    fn cycle_quick_reply(&mut self) {
        if self.quick_replies.is_empty() {
            return;
        }
        let pos = match self.quick_reply_pos {
            Some(p) => (p + 1) % self.quick_replies.len(),
            None => 0,
        };
        self.quick_reply_pos = Some(pos);
        self.set_input(self.quick_replies[pos].clone());
    }

    fn set_input(&mut self, input: String) {
        self.cursor_pos = input.chars().count();
        self.input = input;
    }

    fn insert_char(&mut self, c: char) {
        let byte_idx = self
            .input
            .char_indices()
            .nth(self.cursor_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len());
        self.input.insert(byte_idx, c);
        self.cursor_pos += 1;
    }

    fn delete_before_cursor(&mut self) {
        if self.cursor_pos == 0 {
            return;
        }
        let byte_idx = self
            .input
            .char_indices()
            .nth(self.cursor_pos - 1)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len());
        self.input.remove(byte_idx);
        self.cursor_pos -= 1;
    }
}

fn apply_render_op(state: &mut AppState, op: RenderOp) {
    match op {
        RenderOp::Message(message) => {
            // A real message displaces the typing placeholder.
            state.units.retain(|u| !matches!(u, UiUnit::Typing));
            state.is_waiting = false;

            let force = message.role == Role::Bot;
            let content = match message.role {
                Role::Bot => format_bot_text(&message.content),
                _ => message.content.clone(),
            };
            let timestamp = (message.role != Role::System).then(now_str);

            state.units.push(UiUnit::Message(ChatUnit {
                role: message.role,
                content,
                timestamp,
            }));
            state.smart_scroll(force);
        }
        RenderOp::Typing => {
            state.units.retain(|u| !matches!(u, UiUnit::Typing));
            state.units.push(UiUnit::Typing);
            state.is_waiting = true;
            state.smart_scroll(false);
        }
        RenderOp::ClearTyping => {
            state.units.retain(|u| !matches!(u, UiUnit::Typing));
            state.is_waiting = false;
        }
        RenderOp::Transient(text) => {
            state.units.push(UiUnit::Message(ChatUnit {
                role: Role::System,
                content: text,
                timestamp: None,
            }));
            state.smart_scroll(false);
        }
        RenderOp::Reset => {
            state.units.clear();
            state.scroll_offset = 0;
            state.user_scrolled_up = false;
        }
        RenderOp::ConfirmClear => {
            state.pending_confirm = true;
        }
    }
}

fn history_store(settings: &Settings) -> Box<dyn HistoryStore> {
    match settings.chat.history_path.clone() {
        Some(path) => Box::new(JsonFileStore::with_path(path)),
        None => Box::new(JsonFileStore::new()),
    }
}

fn export_writer(settings: &Settings) -> ExportWriter {
    match settings.chat.export_dir.clone() {
        Some(dir) => ExportWriter::new(dir),
        None => ExportWriter::default(),
    }
}

fn build_controller(
    settings: &Settings,
    op_tx: mpsc::UnboundedSender<RenderOp>,
    confirm_slot: Arc<Mutex<Option<oneshot::Sender<bool>>>>,
) -> ChatController {
    let transport: Arc<dyn ChatTransport> = match settings.build_transport() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            let _ = op_tx.send(RenderOp::Transient(format!(
                "{e}. As mensagens para o modelo vão falhar."
            )));
            Arc::new(GeminiClient::new("").with_model(&settings.llm.model))
        }
    };

    // Block until the UI answers through the oneshot channel.
    let confirm_op_tx = op_tx.clone();
    let confirm: ConfirmFn = Box::new(move || {
        let slot = confirm_slot.clone();
        let op_tx = confirm_op_tx.clone();
        Box::pin(async move {
            let (tx, rx) = oneshot::channel::<bool>();
            {
                let mut pending = slot.lock().unwrap_or_else(|e| e.into_inner());
                *pending = Some(tx);
            }
            let _ = op_tx.send(RenderOp::ConfirmClear);
            rx.await.unwrap_or(false)
        })
    });

    ChatController::new(
        transport,
        history_store(settings),
        Box::new(ChannelRenderer { tx: op_tx }),
        export_writer(settings),
    )
    .with_cooldown(Duration::from_secs(settings.chat.cooldown_secs))
    .with_confirm(confirm)
}

pub async fn run_tui(settings: Settings, theme_name: &str) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = AppState::new(&settings, theme_name);

    let (op_tx, mut op_rx) = mpsc::unbounded_channel::<RenderOp>();
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Controller worker task: one submission at a time, in order.
    let confirm_slot = state.confirm_tx.clone();
    let worker = tokio::spawn(async move {
        let mut controller = build_controller(&settings, op_tx, confirm_slot);
        controller.init();
        while let Some(input) = input_rx.recv().await {
            controller.submit(&input).await;
        }
    });

    loop {
        terminal.draw(|f| draw_ui(f, &mut state))?;

        // Apply render ops (non-blocking)
        while let Ok(op) = op_rx.try_recv() {
            apply_render_op(&mut state, op);
        }

        // Handle keyboard input with timeout
        if event::poll(Duration::from_millis(33))? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut state, key, &input_tx);
            }
        }

        if state.should_quit {
            break;
        }
    }

    worker.abort();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

fn handle_key(state: &mut AppState, key: KeyEvent, input_tx: &mpsc::UnboundedSender<String>) {
    if state.pending_confirm {
        let answer = match key.code {
            KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char('y') => Some(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(false),
            _ => None,
        };
        if let Some(answer) = answer {
            state.pending_confirm = false;
            let mut slot = state.confirm_tx.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(tx) = slot.take() {
                let _ = tx.send(answer);
            }
        }
        return;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => state.should_quit = true,
        (KeyCode::Esc, _) => state.should_quit = true,
        (KeyCode::Enter, _) => {
            let input = std::mem::take(&mut state.input);
            state.cursor_pos = 0;
            state.quick_reply_pos = None;
            let trimmed = input.trim().to_string();
            if trimmed.is_empty() {
                return;
            }
            state.push_history(trimmed.clone());
            if input_tx.send(trimmed).is_err() {
                tracing::warn!("controller worker is gone, dropping input");
            }
        }
        (KeyCode::Backspace, _) => state.delete_before_cursor(),
        (KeyCode::Left, _) => state.cursor_pos = state.cursor_pos.saturating_sub(1),
        (KeyCode::Right, _) => {
            state.cursor_pos = (state.cursor_pos + 1).min(state.input.chars().count())
        }
        (KeyCode::Up, _) => state.history_prev(),
        (KeyCode::Down, _) => state.history_next(),
        (KeyCode::Tab, _) => state.cycle_quick_reply(),
        (KeyCode::PageUp, _) => state.scroll_up(10),
        (KeyCode::PageDown, _) => state.scroll_down(10),
        (KeyCode::End, _) => state.smart_scroll(true),
        (KeyCode::Char(c), _) => state.insert_char(c),
        _ => {}
    }
}

// ── Drawing ─────────────────────────────────────────────────────────────

fn draw_ui(f: &mut Frame, state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_chat(f, state, chunks[0]);
    draw_input(f, state, chunks[1]);
    draw_status(f, state, chunks[2]);
}

fn unit_lines<'a>(unit: &'a UiUnit, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    match unit {
        UiUnit::Message(m) => {
            match m.role {
                Role::System => {
                    for line in m.content.lines() {
                        lines.push(Line::from(Span::styled(
                            line,
                            Style::default()
                                .fg(theme.system_color)
                                .add_modifier(Modifier::ITALIC),
                        )));
                    }
                }
                Role::User | Role::Bot => {
                    let (label_style, label) = match m.role {
                        Role::User => (
                            Style::default()
                                .fg(theme.user_color)
                                .add_modifier(Modifier::BOLD),
                            role_label(Role::User),
                        ),
                        _ => (
                            Style::default()
                                .fg(theme.bot_color)
                                .add_modifier(Modifier::BOLD),
                            role_label(Role::Bot),
                        ),
                    };

                    for (i, line) in m.content.lines().enumerate() {
                        if i == 0 {
                            lines.push(Line::from(vec![
                                Span::styled(format!("{label}: "), label_style),
                                Span::styled(line, Style::default().fg(theme.fg)),
                            ]));
                        } else {
                            lines.push(Line::from(Span::styled(
                                line,
                                Style::default().fg(theme.fg),
                            )));
                        }
                    }
                    if m.content.is_empty() {
                        lines.push(Line::from(Span::styled(
                            format!("{label}: "),
                            label_style,
                        )));
                    }
                    if let Some(ref timestamp) = m.timestamp {
                        lines.push(Line::from(Span::styled(
                            timestamp.clone(),
                            Style::default().fg(theme.muted),
                        )));
                    }
                }
            }
        }
        UiUnit::Typing => {
            lines.push(Line::from(Span::styled(
                TYPING_TEXT,
                Style::default()
                    .fg(theme.muted)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
    }

    lines.push(Line::from(""));
    lines
}

fn draw_chat(f: &mut Frame, state: &mut AppState, area: Rect) {
    let theme = state.theme.clone();
    let mut lines: Vec<Line> = Vec::new();
    for unit in &state.units {
        lines.extend(unit_lines(unit, &theme));
    }

    state.total_content_lines = lines.len();
    state.viewport_height = area.height.saturating_sub(2) as usize;

    let bottom = state.bottom_offset();
    if state.scroll_offset > bottom {
        state.scroll_offset = bottom;
    }

    let chat = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .title(" GDCHAT "),
        )
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset as u16, 0));

    f.render_widget(chat, area);
}

fn draw_input(f: &mut Frame, state: &AppState, area: Rect) {
    let theme = &state.theme;

    let (title, title_style) = if state.pending_confirm {
        (
            format!(" {CONFIRM_PROMPT} "),
            Style::default()
                .fg(theme.warning)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (" Mensagem ".to_string(), Style::default().fg(theme.muted))
    };

    let input = Paragraph::new(state.input.as_str())
        .style(Style::default().fg(theme.fg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .title(Span::styled(title, title_style)),
        );

    f.render_widget(input, area);

    if !state.pending_confirm {
        let cursor_x = area.x + 1 + state.cursor_pos.min(area.width.saturating_sub(2) as usize) as u16;
        f.set_cursor_position((cursor_x, area.y + 1));
    }
}

fn draw_status(f: &mut Frame, state: &AppState, area: Rect) {
    let theme = &state.theme;

    let status = if state.is_waiting {
        TYPING_TEXT.to_string()
    } else {
        "Pronto".to_string()
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", state.model_name),
            Style::default().fg(theme.user_color),
        ),
        Span::styled("| ", Style::default().fg(theme.muted)),
        Span::styled(status, Style::default().fg(theme.fg)),
        Span::styled(
            "  Tab: sugestões | /ajuda: comandos | Ctrl+C: sair",
            Style::default().fg(theme.muted),
        ),
    ]);

    f.render_widget(Paragraph::new(line), area);
}
