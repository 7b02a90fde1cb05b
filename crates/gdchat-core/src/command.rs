/// Local action resolved from raw user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Forward the text to the model.
    Send(String),
    /// Print the command reference.
    ShowHelp,
    /// Wipe the conversation (after confirmation).
    ClearHistory,
    /// Write the transcript to a file.
    ExportHistory,
    /// Say goodbye. Display only — nothing actually closes.
    Terminate,
    /// Empty input.
    Ignore,
}

const TERMINAL_WORDS: [&str; 3] = ["sair", "exit", "fim"];

/// Resolve raw input to an action. Matching is case-insensitive over the
/// whole trimmed input, so `/ajuda extra` is not a command and goes to the
/// model as literal text, same as any unknown `/subcommand`.
pub fn interpret(raw: &str) -> Action {
    let input = raw.trim();
    if input.is_empty() {
        return Action::Ignore;
    }

    let lowered = input.to_lowercase();
    if TERMINAL_WORDS.contains(&lowered.as_str()) {
        return Action::Terminate;
    }

    if input.starts_with('/') {
        match lowered.as_str() {
            "/ajuda" => return Action::ShowHelp,
            "/limpar" => return Action::ClearHistory,
            "/exportar" => return Action::ExportHistory,
            _ => {}
        }
    }

    Action::Send(input.to_string())
}
