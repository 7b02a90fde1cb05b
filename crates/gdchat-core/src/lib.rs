pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod format;
pub mod gemini;
pub mod message;
pub mod store;

// Re-export key types
pub use command::{interpret, Action};
pub use config::Settings;
pub use controller::{ChatController, ConfirmFn, Renderer};
pub use error::ChatError;
pub use export::{role_label, ExportWriter};
pub use format::format_bot_text;
pub use gemini::{ChatTransport, GeminiClient};
pub use message::{ConversationHistory, Message, Role};
pub use store::{HistoryStore, JsonFileStore, MemoryStore};
