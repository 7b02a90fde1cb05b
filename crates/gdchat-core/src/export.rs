use std::fs;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};

use crate::error::{ChatError, Result};
use crate::message::{ConversationHistory, Role};

/// Label shown in front of a message in transcripts and on screen.
pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "Você",
        Role::Bot => "GDCHAT",
        Role::System => "Sistema",
    }
}

/// Writes the full transcript (system notices included) to a timestamped
/// text file and reports the generated filename.
pub struct ExportWriter {
    dir: PathBuf,
}

impl ExportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_dir() -> PathBuf {
        dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn export(&self, history: &ConversationHistory) -> Result<String> {
        let timestamp = Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let filename = format!("chat_history_{timestamp}.txt");

        fs::create_dir_all(&self.dir).map_err(|e| ChatError::Export(e.to_string()))?;
        fs::write(self.dir.join(&filename), render_transcript(history))
            .map_err(|e| ChatError::Export(e.to_string()))?;

        Ok(filename)
    }
}

impl Default for ExportWriter {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

fn render_transcript(history: &ConversationHistory) -> String {
    let mut out = String::new();
    for message in history.messages() {
        out.push_str(role_label(message.role));
        out.push_str(": ");
        out.push_str(&message.content);
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use tempfile::TempDir;

    fn sample_history() -> ConversationHistory {
        ConversationHistory::from_messages(vec![
            Message::user("hi"),
            Message::bot("hello"),
            Message::system("> Histórico limpo."),
        ])
    }

    #[test]
    fn transcript_uses_localized_labels_in_order() {
        let transcript = render_transcript(&sample_history());

        assert_eq!(
            transcript,
            "Você: hi\n\nGDCHAT: hello\n\nSistema: > Histórico limpo.\n\n"
        );
        let user_at = transcript.find("Você: hi").unwrap();
        let bot_at = transcript.find("GDCHAT: hello").unwrap();
        assert!(user_at < bot_at);
    }

    #[test]
    fn export_writes_a_timestamped_file() {
        let dir = TempDir::new().unwrap();
        let writer = ExportWriter::new(dir.path());

        let filename = writer.export(&sample_history()).unwrap();

        assert!(filename.starts_with("chat_history_"));
        assert!(filename.ends_with(".txt"));
        // ISO timestamp with ':' and '.' replaced by '-'
        let stem = filename
            .trim_start_matches("chat_history_")
            .trim_end_matches(".txt");
        assert!(!stem.contains(':'));
        assert!(!stem.contains('.'));

        let contents = std::fs::read_to_string(dir.path().join(&filename)).unwrap();
        assert!(contents.contains("Você: hi\n\n"));
        assert!(contents.contains("GDCHAT: hello\n\n"));
    }

    #[test]
    fn export_to_unwritable_dir_fails() {
        let writer = ExportWriter::new("/proc/gdchat-nope");
        let err = writer.export(&sample_history()).unwrap_err();
        assert!(matches!(err, ChatError::Export(_)));
    }

    #[test]
    fn empty_history_exports_an_empty_file() {
        let dir = TempDir::new().unwrap();
        let writer = ExportWriter::new(dir.path());

        let filename = writer.export(&ConversationHistory::new()).unwrap();
        let contents = std::fs::read_to_string(dir.path().join(&filename)).unwrap();
        assert!(contents.is_empty());
    }
}
