//! Bearer-token identity. Tokens are HS256 JWTs; requests without a valid
//! token act as the shared anonymous user rather than being rejected, since
//! the chat surface works without an account.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{AppError, AppResult};

pub const ANONYMOUS_USER: &str = "default-user";

const TOKEN_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn anonymous() -> Self {
        Self { user_id: ANONYMOUS_USER.to_string(), email: None }
    }
}

pub fn issue_token(user_id: &str, email: &str, secret: &str) -> AppResult<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (Utc::now() + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::Auth(e.to_string()))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<UserIdentity> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Auth(e.to_string()))?;

    Ok(UserIdentity {
        user_id: data.claims.sub,
        email: Some(data.claims.email),
    })
}

/// Resolve the caller's identity from an Authorization header. Missing,
/// malformed, or invalid tokens resolve to the anonymous user.
pub fn identity_from_header(header: Option<&str>, secret: &str) -> UserIdentity {
    let Some(token) = header.and_then(|h| h.strip_prefix("Bearer ")) else {
        return UserIdentity::anonymous();
    };
    match verify_token(token, secret) {
        Ok(identity) => identity,
        Err(e) => {
            debug!(error = %e, "Token rejected, continuing as anonymous");
            UserIdentity::anonymous()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_token_round_trips() {
        let token = issue_token("user-42", "a@b.test", SECRET).unwrap();
        let identity = verify_token(&token, SECRET).unwrap();
        assert_eq!(identity.user_id, "user-42");
        assert_eq!(identity.email.as_deref(), Some("a@b.test"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("user-42", "a@b.test", SECRET).unwrap();
        assert!(matches!(verify_token(&token, "other"), Err(AppError::Auth(_))));
    }

    #[test]
    fn header_fallbacks_resolve_to_anonymous() {
        assert_eq!(identity_from_header(None, SECRET).user_id, ANONYMOUS_USER);
        assert_eq!(identity_from_header(Some("garbage"), SECRET).user_id, ANONYMOUS_USER);
        assert_eq!(
            identity_from_header(Some("Bearer not-a-jwt"), SECRET).user_id,
            ANONYMOUS_USER
        );

        let token = issue_token("user-42", "a@b.test", SECRET).unwrap();
        let header = format!("Bearer {token}");
        assert_eq!(identity_from_header(Some(&header), SECRET).user_id, "user-42");
    }
}
