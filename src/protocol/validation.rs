//! Player-name and chat-message validation (spec §4.1, §6).

use crate::config::ProtocolConfig;

use super::error_codes::ErrorCode;

/// Validates a player display name against `config.protocol.player_name`.
pub fn validate_player_name(name: &str, config: &ProtocolConfig) -> Result<(), ErrorCode> {
    if name.is_empty() || name.chars().count() > config.max_player_name_length {
        return Err(ErrorCode::InvalidPayload);
    }

    let rules = &config.player_name;
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ErrorCode::InvalidPayload);
    }
    if !rules.allow_leading_trailing_whitespace && trimmed.len() != name.len() {
        return Err(ErrorCode::InvalidPayload);
    }

    for ch in name.chars() {
        if ch == ' ' {
            if rules.allow_spaces {
                continue;
            }
            return Err(ErrorCode::InvalidPayload);
        }
        if ch.is_whitespace() {
            return Err(ErrorCode::InvalidPayload);
        }

        let is_alphanumeric = if rules.allow_unicode {
            ch.is_alphanumeric()
        } else {
            ch.is_ascii_alphanumeric()
        };

        if is_alphanumeric || rules.is_allowed_symbol(ch) {
            continue;
        }

        return Err(ErrorCode::InvalidPayload);
    }

    Ok(())
}

/// Validates a chat message body against `config.protocol.max_chat_message_length`
/// (spec §6: `content ∈ [1,500]`).
pub fn validate_chat_message(content: &str, config: &ProtocolConfig) -> Result<(), ErrorCode> {
    let trimmed = content.trim();
    if trimmed.is_empty() || content.chars().count() > config.max_chat_message_length {
        return Err(ErrorCode::InvalidPayload);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProtocolConfig {
        ProtocolConfig::default()
    }

    #[test]
    fn accepts_ordinary_names() {
        assert!(validate_player_name("Alex", &config()).is_ok());
        assert!(validate_player_name("Jo Anne", &config()).is_ok());
        assert!(validate_player_name("Player-One_2", &config()).is_ok());
    }

    #[test]
    fn rejects_empty_and_blank_names() {
        assert!(validate_player_name("", &config()).is_err());
        assert!(validate_player_name("   ", &config()).is_err());
    }

    #[test]
    fn rejects_disallowed_symbols() {
        assert!(validate_player_name("User@123", &config()).is_err());
        assert!(validate_player_name("Player\tOne", &config()).is_err());
    }

    #[test]
    fn rejects_over_length_names() {
        let too_long = "a".repeat(config().max_player_name_length + 1);
        assert!(validate_player_name(&too_long, &config()).is_err());
    }

    #[test]
    fn chat_message_rejects_empty_and_over_length() {
        assert!(validate_chat_message("", &config()).is_err());
        assert!(validate_chat_message("  ", &config()).is_err());
        let too_long = "x".repeat(config().max_chat_message_length + 1);
        assert!(validate_chat_message(&too_long, &config()).is_err());
    }

    #[test]
    fn chat_message_accepts_ordinary_text() {
        assert!(validate_chat_message("gg everyone", &config()).is_ok());
    }
}
