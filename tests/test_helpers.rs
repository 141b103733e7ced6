use dicee_server::config::Config;

/// A config tuned for fast, deterministic tests: no turn timer, websocket auth
/// disabled so `AppState::new` builds an anonymous-accepting `AuthMiddleware`.
#[allow(dead_code)]
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.room.default_turn_timeout_secs = 0;
    config.security.require_websocket_auth = false;
    config
}

/// Signs a minimal JWT the way an external auth provider would (spec §4.8 Claims),
/// for exercising `AuthMiddleware` end to end without reaching into its private fields.
#[allow(dead_code)]
pub fn sign_token(secret: &str, sub: &str, exp_offset_secs: i64, iss: Option<&str>) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        #[serde(rename = "displayName")]
        display_name: &'a str,
        #[serde(rename = "avatarSeed")]
        avatar_seed: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<&'a str>,
        exp: i64,
    }

    let claims = Claims {
        sub,
        display_name: "Dicey",
        avatar_seed: "seed-1",
        iss,
        exp: chrono::Utc::now().timestamp() + exp_offset_secs,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
