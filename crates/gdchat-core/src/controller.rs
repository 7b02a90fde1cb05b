use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::command::{interpret, Action};
use crate::export::ExportWriter;
use crate::gemini::ChatTransport;
use crate::message::{ConversationHistory, Message};
use crate::store::HistoryStore;

/// Render-surface seam. Implementations append/replace/remove visual units;
/// nothing here touches persisted state.
pub trait Renderer: Send {
    /// Append a visual unit for a persisted message.
    fn message(&mut self, message: &Message);
    /// Show the typing placeholder, replacing any existing one.
    fn typing(&mut self);
    /// Remove the typing placeholder if present.
    fn clear_typing(&mut self);
    /// Show a notice that is never persisted (cooldown warnings).
    fn transient(&mut self, text: &str);
    /// Drop every visual unit after a destructive clear.
    fn reset(&mut self);
}

/// Callback invoked before a destructive clear. Returns true to proceed.
/// Without one configured, the clear proceeds unprompted.
pub type ConfirmFn =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

const FAREWELL: &str = "> Chat encerrado. Até mais!";
const CLEARED: &str = "> Histórico limpo. Conversa reiniciada.";

const HELP_LINES: [&str; 4] = [
    "Comandos disponíveis:",
    "/limpar - Reinicia a conversa",
    "/exportar - Salva o histórico",
    "/ajuda - Mostra esta mensagem",
];

const WELCOME_LINES: [&str; 6] = [
    "=== Bem-vindo ao GDCHAT ===",
    "Comandos especiais:",
    "- 'sair', 'fim' ou 'exit' para encerrar",
    "- '/limpar' reinicia a conversa",
    "- '/exportar' guarda o histórico em arquivo",
    "- Digite /ajuda para ver comandos extras",
];

/// Minimum interval between accepted submissions. Only an accepted
/// submission stamps the window; rejected ones leave it untouched.
pub struct Cooldown {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn ready(&self) -> bool {
        match self.last_accepted {
            Some(last) => last.elapsed() >= self.window,
            None => true,
        }
    }

    fn stamp(&mut self) {
        self.last_accepted = Some(Instant::now());
    }
}

/// Owns the conversation state and orchestrates one submission at a time:
/// cooldown gate, command dispatch, request/response mapping, persistence,
/// and error surfacing. Collaborators are injected so the controller runs
/// without a real display or network.
pub struct ChatController {
    history: ConversationHistory,
    store: Box<dyn HistoryStore>,
    transport: Arc<dyn ChatTransport>,
    renderer: Box<dyn Renderer>,
    exporter: ExportWriter,
    cooldown: Cooldown,
    confirm_clear: Option<ConfirmFn>,
}

impl ChatController {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: Box<dyn HistoryStore>,
        renderer: Box<dyn Renderer>,
        exporter: ExportWriter,
    ) -> Self {
        Self {
            history: ConversationHistory::new(),
            store,
            transport,
            renderer,
            exporter,
            cooldown: Cooldown::new(Duration::from_secs(15)),
            confirm_clear: None,
        }
    }

    pub fn with_cooldown(mut self, window: Duration) -> Self {
        self.cooldown = Cooldown::new(window);
        self
    }

    pub fn with_confirm(mut self, f: ConfirmFn) -> Self {
        self.confirm_clear = Some(f);
        self
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Load persisted history and replay it onto the render surface. A fresh
    /// (empty) history gets the welcome banner instead.
    pub fn init(&mut self) {
        self.history = self.store.load();

        if self.history.is_empty() {
            for line in WELCOME_LINES {
                self.push_system(line);
            }
        } else {
            for message in self.history.messages() {
                self.renderer.message(message);
            }
        }
    }

    /// Handle one piece of raw user input to completion.
    pub async fn submit(&mut self, raw: &str) {
        let action = interpret(raw);

        // Terminal words and empty input never reach the flood gate; the
        // original resolves them before its send path runs.
        match action {
            Action::Ignore => return,
            Action::Terminate => {
                self.push_system(FAREWELL);
                return;
            }
            _ => {}
        }

        // The flood gate sits in front of command dispatch, so local
        // commands share the cooldown with model-bound text.
        if !self.cooldown.ready() {
            let warning = format!(
                "Aguarde {} segundos entre mensagens",
                self.cooldown.window().as_secs()
            );
            self.renderer.transient(&warning);
            return;
        }
        self.cooldown.stamp();

        match action {
            Action::Send(text) => self.send_to_model(text).await,
            Action::ShowHelp => self.show_help(),
            Action::ClearHistory => self.clear_history().await,
            Action::ExportHistory => self.export_history(),
            Action::Terminate | Action::Ignore => {}
        }
    }

    async fn send_to_model(&mut self, text: String) {
        let user = Message::user(text);
        self.renderer.message(&user);
        self.history.push(user);
        self.persist();

        self.renderer.typing();

        let result = self.transport.generate(&self.history).await;
        match result {
            Ok(reply) => {
                self.renderer.clear_typing();
                let bot = Message::bot(reply);
                self.renderer.message(&bot);
                self.history.push(bot);
                self.persist();
            }
            Err(e) => {
                self.renderer.clear_typing();
                self.push_system(&format!("Erro: {e}"));
            }
        }
    }

    fn show_help(&mut self) {
        for line in HELP_LINES {
            self.push_system(line);
        }
    }

    async fn clear_history(&mut self) {
        if let Some(confirm) = &self.confirm_clear {
            if !confirm().await {
                return;
            }
        }

        self.history.clear();
        if let Err(e) = self.store.clear() {
            tracing::warn!("failed to clear stored history: {e}");
        }
        self.renderer.reset();
        // Rendered only: a cleared store must load back as empty.
        self.renderer.message(&Message::system(CLEARED));
    }

    fn export_history(&mut self) {
        let result = self.exporter.export(&self.history);
        match result {
            Ok(filename) => self.push_system(&format!("Conversa salva como {filename}")),
            Err(e) => self.push_system(&format!("Erro ao salvar: {e}")),
        }
    }

    fn push_system(&mut self, text: &str) {
        let message = Message::system(text);
        self.renderer.message(&message);
        self.history.push(message);
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.history) {
            tracing::warn!("failed to persist history: {e}");
        }
    }
}
