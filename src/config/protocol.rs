//! Protocol-surface configuration: room codes and player/chat validation limits.

use super::defaults::{
    default_allow_leading_trailing_whitespace, default_allow_spaces_in_player_names,
    default_allow_unicode_player_names, default_allowed_player_name_symbols,
    default_max_chat_message_length, default_max_player_name_length, default_room_code_length,
};
use serde::{Deserialize, Serialize};

/// Protocol-level limits enforced by the validation layer (C1).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    /// Length of generated/accepted room codes (spec: 6).
    #[serde(default = "default_room_code_length")]
    pub room_code_length: usize,
    /// Maximum player display-name length.
    #[serde(default = "default_max_player_name_length")]
    pub max_player_name_length: usize,
    /// Maximum chat message length (spec: `content ∈ [1,500]`).
    #[serde(default = "default_max_chat_message_length")]
    pub max_chat_message_length: usize,
    /// Player display-name validation rules.
    #[serde(default)]
    pub player_name: PlayerNameValidationConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            room_code_length: default_room_code_length(),
            max_player_name_length: default_max_player_name_length(),
            max_chat_message_length: default_max_chat_message_length(),
            player_name: PlayerNameValidationConfig::default(),
        }
    }
}

/// Validation rules for player display names.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerNameValidationConfig {
    #[serde(default = "default_allow_unicode_player_names")]
    pub allow_unicode: bool,
    #[serde(default = "default_allow_spaces_in_player_names")]
    pub allow_spaces: bool,
    #[serde(default = "default_allow_leading_trailing_whitespace")]
    pub allow_leading_trailing_whitespace: bool,
    #[serde(default = "default_allowed_player_name_symbols")]
    pub allowed_symbols: Vec<char>,
    /// Extra characters accepted beyond `allowed_symbols`, supplied at runtime.
    #[serde(default)]
    pub additional_allowed_characters: Option<String>,
}

impl Default for PlayerNameValidationConfig {
    fn default() -> Self {
        Self {
            allow_unicode: default_allow_unicode_player_names(),
            allow_spaces: default_allow_spaces_in_player_names(),
            allow_leading_trailing_whitespace: default_allow_leading_trailing_whitespace(),
            allowed_symbols: default_allowed_player_name_symbols(),
            additional_allowed_characters: None,
        }
    }
}

impl PlayerNameValidationConfig {
    /// Whether `ch` is an accepted non-alphanumeric symbol in a display name.
    pub fn is_allowed_symbol(&self, ch: char) -> bool {
        if self.allowed_symbols.contains(&ch) {
            return true;
        }
        self.additional_allowed_characters
            .as_deref()
            .is_some_and(|extra| extra.contains(ch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_name_validation_config_allowed_symbols() {
        let config = PlayerNameValidationConfig::default();
        assert!(config.is_allowed_symbol('-'));
        assert!(config.is_allowed_symbol('_'));
        assert!(!config.is_allowed_symbol('@'));

        let config_with_extra = PlayerNameValidationConfig {
            additional_allowed_characters: Some("@#".to_string()),
            ..Default::default()
        };
        assert!(config_with_extra.is_allowed_symbol('@'));
        assert!(config_with_extra.is_allowed_symbol('#'));
        assert!(!config_with_extra.is_allowed_symbol('!'));
    }
}
