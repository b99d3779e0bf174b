// 🎫 Access tokens - HS256 JWTs issued by /api/auth/login

use crate::config::UserAccount;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id; becomes RequestContext.user_id
    pub sub: String,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn for_user(user: &UserAccount, ttl_secs: u64) -> Self {
        let now = Utc::now().timestamp();
        Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
        }
    }
}

#[derive(Error, Debug)]
#[error("access token rejected: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

pub fn issue(secret: &str, claims: &Claims) -> Result<String, TokenError> {
    Ok(encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Signature and expiry are both checked
pub fn verify(secret: &str, token: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn officer() -> UserAccount {
        UserAccount {
            id: "U001".to_string(),
            username: "officer".to_string(),
            password_hash: String::new(),
            role: "loan_officer".to_string(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let claims = Claims::for_user(&officer(), 600);
        let token = issue("secret", &claims).unwrap();

        let verified = verify("secret", &token).unwrap();
        assert_eq!(verified, claims);
        assert_eq!(verified.exp - verified.iat, 600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue("secret", &Claims::for_user(&officer(), 600)).unwrap();
        assert!(verify("other", &token).is_err());
    }

    #[test]
    fn test_expired_rejected() {
        let mut claims = Claims::for_user(&officer(), 600);
        claims.iat -= 7200;
        claims.exp = claims.iat + 600;
        let token = issue("secret", &claims).unwrap();

        assert!(verify("secret", &token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(verify("secret", "not-a-jwt").is_err());
    }
}
