use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Language model settings for the ask feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Telegram bot credentials for the relay feature.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub relay: RelaySettings,
    pub ai: AiSettings,
}

/// Resolve the per-user settings directory (~/.mappa/).
pub fn mappa_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mappa")
}

fn settings_path() -> PathBuf {
    mappa_dir().join("settings.json")
}

/// Read settings from ~/.mappa/settings.json, then let environment variables
/// override individual fields. A missing or unreadable file yields defaults.
pub fn read_settings() -> Settings {
    let path = settings_path();
    let from_file = if path.exists() {
        match fs::read_to_string(&path).map(|s| serde_json::from_str::<Settings>(&s)) {
            Ok(Ok(settings)) => settings,
            Ok(Err(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings file");
                Settings::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read settings file");
                Settings::default()
            }
        }
    } else {
        Settings::default()
    };
    from_file.with_overrides(|key| std::env::var(key).ok())
}

impl Settings {
    /// Apply `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`, `OPENAI_API_KEY`,
    /// `MAPPA_AI_PROVIDER` and `MAPPA_AI_MODEL` from `lookup`. Blank values
    /// are treated as unset.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.relay.bot_token = v;
        }
        if let Some(v) = get("TELEGRAM_CHAT_ID") {
            self.relay.chat_id = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Some(v) = get("MAPPA_AI_PROVIDER") {
            self.ai.provider = v;
        }
        if let Some(v) = get("MAPPA_AI_MODEL") {
            self.ai.model = v;
        }
        self
    }

    pub fn relay_configured(&self) -> bool {
        !self.relay.bot_token.is_empty() && !self.relay.chat_id.is_empty()
    }

    pub fn ai_configured(&self) -> bool {
        ai_configured(&self.ai)
    }
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}

/// Remediation text shown when the relay is not configured.
pub const RELAY_SETUP_HINT: &str = "Set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID in the environment \
(or a .env file) to enable sending. Create a bot with @BotFather and look up your chat id with @userinfobot.";

/// Remediation text shown when the ask feature is not configured.
pub const AI_SETUP_HINT: &str =
    "Set OPENAI_API_KEY in the environment (or a .env file) to enable questions to the AI.";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_disable_both_features() {
        let settings = Settings::default();
        assert!(!settings.relay_configured());
        assert!(!settings.ai_configured());
        assert_eq!(settings.ai.provider, "openai");
        assert_eq!(settings.ai.model, "gpt-4.1-mini");
    }

    #[test]
    fn environment_overrides_file_values() {
        let from_file = Settings {
            relay: RelaySettings {
                bot_token: "file-token".into(),
                chat_id: "1".into(),
            },
            ai: AiSettings::default(),
        };
        let settings = from_file.with_overrides(env(&[
            ("TELEGRAM_BOT_TOKEN", "env-token"),
            ("OPENAI_API_KEY", "sk-test"),
        ]));
        assert_eq!(settings.relay.bot_token, "env-token");
        assert_eq!(settings.relay.chat_id, "1");
        assert!(settings.relay_configured());
        assert!(settings.ai_configured());
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let settings = Settings::default().with_overrides(env(&[
            ("TELEGRAM_BOT_TOKEN", "  "),
            ("TELEGRAM_CHAT_ID", "42"),
        ]));
        assert_eq!(settings.relay.bot_token, "");
        assert!(!settings.relay_configured());
    }

    #[test]
    fn ollama_needs_no_key() {
        let settings = Settings::default().with_overrides(env(&[
            ("MAPPA_AI_PROVIDER", "ollama"),
            ("MAPPA_AI_MODEL", "llama3"),
        ]));
        assert!(settings.ai_configured());
    }

    #[test]
    fn settings_file_fields_are_optional() {
        let settings: Settings =
            serde_json::from_str(r#"{"relay": {"chatId": "7"}}"#).unwrap();
        assert_eq!(settings.relay.chat_id, "7");
        assert_eq!(settings.ai, AiSettings::default());
    }
}
