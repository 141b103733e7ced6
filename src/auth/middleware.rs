//! Bearer JWT verification (spec §1, §4.8): the auth *provider* that issues tokens is an
//! external collaborator, this crate only verifies tokens handed to it on a WebSocket
//! upgrade and turns them into an identity the rest of the system can use.
//!
//! Grounded in the teacher's `AuthMiddleware` shape (`apps: HashMap<..>` lookup gated by
//! an `auth_enabled` flag, a single `validate_*` entry point) — the lookup table is gone
//! since there's one shared signing secret, not per-app credentials, but the
//! enabled/disabled posture and the single validation entry point are kept.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::security::JwtConfig;
use crate::protocol::types::PlayerId;

use super::error::AuthError;

/// Claims this server trusts from a verified token (spec §4.8 "Claims").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the stable player identifier, a UUID string.
    pub sub: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, rename = "avatarSeed")]
    pub avatar_seed: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    pub exp: i64,
}

/// The identity a verified (or anonymous-fallback) connection authenticates as.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub player_id: PlayerId,
    pub display_name: String,
    pub avatar_seed: String,
}

/// Verifies bearer tokens against a single shared HMAC secret, per [`JwtConfig`].
#[derive(Debug, Clone)]
pub struct AuthMiddleware {
    config: JwtConfig,
}

impl AuthMiddleware {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn disabled() -> Self {
        Self {
            config: JwtConfig {
                hmac_secret: None,
                allow_anonymous: true,
                leeway_secs: 0,
                required_issuer: None,
            },
        }
    }

    /// Verifies `token` (the raw bearer value, no `Bearer ` prefix) and returns the
    /// identity to attach the connection under. `token` of `None` is only accepted when
    /// `allow_anonymous` is set, in which case a fresh random identity is minted.
    pub fn authenticate(&self, token: Option<&str>) -> Result<AuthenticatedIdentity, AuthError> {
        match token {
            Some(raw) if !raw.is_empty() => self.verify(raw),
            _ if self.config.allow_anonymous => Ok(Self::anonymous_identity()),
            _ => Err(AuthError::MissingToken),
        }
    }

    fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let secret = self
            .config
            .hmac_secret
            .as_ref()
            .ok_or(AuthError::NotConfigured)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.config.leeway_secs;
        validation.validate_exp = true;
        if let Some(issuer) = &self.config.required_issuer {
            validation.set_issuer(&[issuer.clone()]);
        }

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|err| match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
            _ => AuthError::InvalidToken,
        })?;

        let player_uuid =
            uuid::Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthenticatedIdentity {
            player_id: PlayerId(player_uuid),
            display_name: data
                .claims
                .display_name
                .unwrap_or_else(|| "Player".to_string()),
            avatar_seed: data
                .claims
                .avatar_seed
                .unwrap_or_else(|| data.claims.sub.clone()),
        })
    }

    fn anonymous_identity() -> AuthenticatedIdentity {
        let player_id = PlayerId::new();
        AuthenticatedIdentity {
            display_name: format!("Guest-{}", &player_id.to_string()[..4]),
            avatar_seed: player_id.to_string(),
            player_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn make_token(secret: &str, sub: &str, exp_offset_secs: i64, iss: Option<&str>) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            display_name: Some("Dicey".to_string()),
            avatar_seed: Some("seed-1".to_string()),
            iss: iss.map(str::to_string),
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn config(secret: &str, allow_anonymous: bool) -> JwtConfig {
        JwtConfig {
            hmac_secret: Some(secret.to_string()),
            allow_anonymous,
            leeway_secs: 5,
            required_issuer: None,
        }
    }

    #[test]
    fn verifies_valid_token() {
        let auth = AuthMiddleware::new(config("secret", false));
        let sub = uuid::Uuid::new_v4().to_string();
        let token = make_token("secret", &sub, 3600, None);
        let identity = auth.authenticate(Some(&token)).unwrap();
        assert_eq!(identity.player_id.0.to_string(), sub);
        assert_eq!(identity.display_name, "Dicey");
    }

    #[test]
    fn rejects_wrong_secret() {
        let auth = AuthMiddleware::new(config("secret", false));
        let sub = uuid::Uuid::new_v4().to_string();
        let token = make_token("wrong-secret", &sub, 3600, None);
        assert!(matches!(
            auth.authenticate(Some(&token)),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let auth = AuthMiddleware::new(config("secret", false));
        let sub = uuid::Uuid::new_v4().to_string();
        let token = make_token("secret", &sub, -3600, None);
        assert!(matches!(
            auth.authenticate(Some(&token)),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn missing_token_rejected_without_anonymous() {
        let auth = AuthMiddleware::new(config("secret", false));
        assert!(matches!(
            auth.authenticate(None),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn missing_token_falls_back_to_anonymous() {
        let auth = AuthMiddleware::new(config("secret", true));
        let identity = auth.authenticate(None).unwrap();
        assert!(identity.display_name.starts_with("Guest-"));
    }

    #[test]
    fn enforces_required_issuer() {
        let mut cfg = config("secret", false);
        cfg.required_issuer = Some("dicee-auth".to_string());
        let auth = AuthMiddleware::new(cfg);
        let sub = uuid::Uuid::new_v4().to_string();
        let token = make_token("secret", &sub, 3600, Some("someone-else"));
        assert!(matches!(
            auth.authenticate(Some(&token)),
            Err(AuthError::IssuerMismatch)
        ));
    }

    #[test]
    fn disabled_middleware_allows_anonymous() {
        let auth = AuthMiddleware::disabled();
        assert!(auth.authenticate(None).is_ok());
    }
}
