//! Room code generation and validation (spec §4.1, §6).
//!
//! Alphabet `A-HJ-NP-Z2-9`: excludes `0, 1, I, L, O` to avoid glyph ambiguity. 31 symbols,
//! length 6, `^[A-HJ-NP-Z2-9]{6}$` after upper-case normalisation.

use crate::config::ProtocolConfig;
use rand::RngExt;

use super::types::RoomCode;

/// `A-H`, `J-N`, `P-Z`, `2-9` — ambiguous glyphs `0,1,I,L,O` excluded.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate a random room code of `config.room_code_length` characters using a
/// cryptographically strong RNG, per spec §4.1 ("generator uses a cryptographically
/// strong source").
pub fn generate_room_code(config: &ProtocolConfig) -> RoomCode {
    generate_room_code_of_length(config.room_code_length)
}

pub fn generate_room_code_of_length(length: usize) -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..length)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect();
    RoomCode(code)
}

/// Normalise (upper-case, trim) and validate a client-supplied room code against the
/// alphabet and length. Equivalent to `^[A-HJ-NP-Z2-9]{6}$` after normalisation, expressed
/// as a direct character-class check rather than a `regex` dependency.
pub fn normalize_and_validate(raw: &str, config: &ProtocolConfig) -> Option<RoomCode> {
    let normalized = raw.trim().to_ascii_uppercase();
    if normalized.len() != config.room_code_length {
        return None;
    }
    if !normalized.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)) {
        return None;
    }
    Some(RoomCode(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProtocolConfig {
        ProtocolConfig::default()
    }

    #[test]
    fn generated_codes_use_only_alphabet_glyphs() {
        for _ in 0..200 {
            let code = generate_room_code(&config());
            assert_eq!(code.as_str().len(), 6);
            assert!(code
                .as_str()
                .bytes()
                .all(|b| ROOM_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn alphabet_excludes_ambiguous_glyphs() {
        for ambiguous in ['0', '1', 'I', 'L', 'O'] {
            assert!(!ROOM_CODE_ALPHABET.contains(&(ambiguous as u8)));
        }
    }

    #[test]
    fn normalize_and_validate_accepts_lowercase_and_trims() {
        let code = normalize_and_validate("  ab2cde ", &config()).unwrap();
        assert_eq!(code.as_str(), "AB2CDE");
    }

    #[test]
    fn normalize_and_validate_rejects_wrong_length() {
        assert!(normalize_and_validate("AB2C", &config()).is_none());
    }

    #[test]
    fn normalize_and_validate_rejects_ambiguous_glyphs() {
        assert!(normalize_and_validate("AB2C1D", &config()).is_none());
        assert!(normalize_and_validate("AB2CID", &config()).is_none());
        assert!(normalize_and_validate("AB2CLD", &config()).is_none());
        assert!(normalize_and_validate("AB2COD", &config()).is_none());
    }

    #[test]
    fn generated_codes_always_validate() {
        for _ in 0..50 {
            let code = generate_room_code(&config());
            assert!(normalize_and_validate(code.as_str(), &config()).is_some());
        }
    }
}
