use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ChatError, Result};
use crate::gemini::{GeminiClient, DEFAULT_MODEL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LlmSettings,
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub model: String,
    /// Literal key in config.toml; takes precedence over the environment.
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub cooldown_secs: u64,
    /// Override for the history blob location.
    pub history_path: Option<PathBuf>,
    /// Override for where transcripts are exported.
    pub export_dir: Option<PathBuf>,
    #[serde(default)]
    pub quick_replies: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmSettings {
                model: DEFAULT_MODEL.to_string(),
                api_key: None,
                api_key_env: "GEMINI_API_KEY".to_string(),
                base_url: None,
            },
            chat: ChatSettings {
                cooldown_secs: 15,
                history_path: None,
                export_dir: None,
                quick_replies: vec![
                    "Corrigir textos ortograficamente:".to_string(),
                    "Em que você pode me ajudar?".to_string(),
                ],
            },
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gdchat")
            .join("config.toml")
    }

    pub fn load() -> Self {
        let config_path = Self::config_path();
        if config_path.exists() {
            if let Ok(content) = std::fs::read_to_string(&config_path) {
                if let Ok(config) = toml::from_str(&content) {
                    return config;
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ChatError::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Resolve the API key: config literal first, then the environment
    /// variable named in `api_key_env`.
    pub fn api_key(&self) -> Option<String> {
        self.llm
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.llm.api_key_env).ok())
    }

    /// Build the Gemini transport from the current settings.
    pub fn build_transport(&self) -> Result<GeminiClient> {
        let api_key = self.api_key().ok_or_else(|| {
            ChatError::Config(format!(
                "no API key: set llm.api_key in config.toml or export {}",
                self.llm.api_key_env
            ))
        })?;

        let mut client = GeminiClient::new(api_key).with_model(&self.llm.model);
        if let Some(ref base_url) = self.llm.base_url {
            client = client.with_base_url(base_url);
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();

        assert_eq!(settings.llm.model, "gemini-2.0-flash");
        assert!(settings.llm.api_key.is_none());
        assert_eq!(settings.llm.api_key_env, "GEMINI_API_KEY");
        assert!(settings.llm.base_url.is_none());
        assert_eq!(settings.chat.cooldown_secs, 15);
        assert_eq!(settings.chat.quick_replies.len(), 2);
    }

    #[test]
    fn toml_round_trip() {
        let mut settings = Settings::default();
        settings.llm.model = "gemini-test".to_string();
        settings.chat.cooldown_secs = 5;

        let content = toml::to_string_pretty(&settings).unwrap();
        let loaded: Settings = toml::from_str(&content).unwrap();

        assert_eq!(loaded.llm.model, "gemini-test");
        assert_eq!(loaded.chat.cooldown_secs, 5);
    }

    #[test]
    fn config_literal_beats_environment() {
        std::env::set_var("GDCHAT_TEST_KEY", "from-env");

        let mut settings = Settings::default();
        settings.llm.api_key_env = "GDCHAT_TEST_KEY".to_string();
        assert_eq!(settings.api_key(), Some("from-env".to_string()));

        settings.llm.api_key = Some("from-config".to_string());
        assert_eq!(settings.api_key(), Some("from-config".to_string()));

        std::env::remove_var("GDCHAT_TEST_KEY");
    }

    #[test]
    fn build_transport_requires_a_key() {
        let mut settings = Settings::default();
        settings.llm.api_key_env = "GDCHAT_TEST_MISSING_KEY".to_string();

        assert!(matches!(
            settings.build_transport(),
            Err(ChatError::Config(_))
        ));

        settings.llm.api_key = Some("k".to_string());
        let client = settings.build_transport().unwrap();
        assert_eq!(client.model(), "gemini-2.0-flash");
    }
}
