//! Per-chat key/value settings behind `/config`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};

use crate::{domain::ChatId, interaction::error::InteractionError};

pub const MAX_KEY_LEN: usize = 64;
pub const MAX_VALUE_LEN: usize = 512;

/// In-memory settings; lost on restart.
#[derive(Debug, Default)]
pub struct ConfigStore {
    chats: Mutex<HashMap<ChatId, BTreeMap<String, String>>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, chat: ChatId, key: &str, value: &str) -> Result<String, InteractionError> {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || key.chars().count() > MAX_KEY_LEN {
            return Err(InteractionError::new(format!(
                "❌ Keys must be 1 to {MAX_KEY_LEN} characters."
            )));
        }
        if value.is_empty() || value.chars().count() > MAX_VALUE_LEN {
            return Err(InteractionError::new(format!(
                "❌ Values must be 1 to {MAX_VALUE_LEN} characters."
            )));
        }

        self.lock()
            .entry(chat)
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(format!("Configuration updated: `{key}` set to `{value}`."))
    }

    /// Removing a key that is not set is not an error.
    pub fn delete(&self, chat: ChatId, key: &str) -> String {
        let key = key.trim();
        let mut chats = self.lock();
        if let Some(values) = chats.get_mut(&chat) {
            values.remove(key);
            if values.is_empty() {
                chats.remove(&chat);
            }
        }
        format!("Configuration key `{key}` removed.")
    }

    pub fn clear(&self, chat: ChatId) -> String {
        self.lock().remove(&chat);
        "All configuration values have been cleared.".to_string()
    }

    /// Pretty JSON of the chat's settings. Empty settings are reported as a user error.
    pub fn view(&self, chat: ChatId) -> Result<String, InteractionError> {
        let chats = self.lock();
        let values = chats
            .get(&chat)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                InteractionError::new(
                    "The configuration is empty. Set your first key using `/config set <key> <value>`.",
                )
                .with_internal(format!("config view on empty store for chat {}", chat.0))
            })?;

        let json = serde_json::to_string_pretty(values).map_err(|e| {
            InteractionError::new("❌ Could not render the configuration.")
                .with_internal(format!("config serialization failed: {e}"))
        })?;
        Ok(format!("Current configuration:\n```json\n{json}\n```"))
    }

    pub fn get(&self, chat: ChatId, key: &str) -> Option<String> {
        self.lock().get(&chat).and_then(|m| m.get(key).cloned())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ChatId, BTreeMap<String, String>>> {
        self.chats.lock().unwrap_or_else(|e| e.into_inner())
    }
}
