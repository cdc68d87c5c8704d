use anyhow::{Context, Result};
use chrono::Utc;
use contracts::system::auth::TokenClaims;
use jsonwebtoken::{decode, encode, Header, Validation};
use rand::Rng;
use uuid::Uuid;

use crate::shared::config::Config;
use crate::shared::state::JwtKeys;

const ACCESS_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Issue an HS256 access token. Tokens are normally issued upstream; this is
/// used by tooling and tests.
pub fn generate_access_token(
    keys: &JwtKeys,
    user_id: Uuid,
    username: &str,
    is_admin: bool,
) -> Result<String> {
    let now = Utc::now();
    let exp = (now + chrono::Duration::hours(ACCESS_TOKEN_LIFETIME_HOURS)).timestamp() as usize;
    let iat = now.timestamp() as usize;

    let claims = TokenClaims {
        sub: user_id.to_string(),
        username: username.to_string(),
        is_admin,
        exp,
        iat,
    };

    encode(&Header::default(), &claims, &keys.encoding).context("Failed to encode JWT token")
}

/// Validate a token and extract its claims
pub fn validate_token(keys: &JwtKeys, token: &str) -> Result<TokenClaims> {
    let token_data = decode::<TokenClaims>(token, &keys.decoding, &Validation::default())
        .context("Failed to decode JWT token")?;
    Ok(token_data.claims)
}

/// The configured secret, or a freshly generated one when none is set
pub fn resolve_secret(config: &Config) -> String {
    let configured = config.auth.jwt_secret.trim();
    if configured.is_empty() {
        tracing::warn!(
            "auth.jwt_secret is not configured; generated a random secret, tokens will not survive a restart"
        );
        generate_jwt_secret()
    } else {
        configured.to_string()
    }
}

/// Generate a cryptographically secure JWT secret (256 bits)
fn generate_jwt_secret() -> String {
    use base64::{engine::general_purpose, Engine as _};
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen::<u8>()).collect();
    general_purpose::STANDARD.encode(&random_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let keys = JwtKeys::from_secret(b"test-secret");
        let user = Uuid::new_v4();
        let token = generate_access_token(&keys, user, "rep01", false).unwrap();
        let claims = validate_token(&keys, &token).unwrap();
        assert_eq!(claims.sub, user.to_string());
        assert_eq!(claims.username, "rep01");
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = JwtKeys::from_secret(b"issuer-secret");
        let verifier = JwtKeys::from_secret(b"other-secret");
        let token = generate_access_token(&issuer, Uuid::new_v4(), "rep01", false).unwrap();
        assert!(validate_token(&verifier, &token).is_err());
    }

    #[test]
    fn test_generated_secret_is_256_bits() {
        use base64::{engine::general_purpose, Engine as _};
        let secret = generate_jwt_secret();
        assert_eq!(general_purpose::STANDARD.decode(secret).unwrap().len(), 32);
    }
}
