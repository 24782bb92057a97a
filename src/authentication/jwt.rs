use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::{Error, HttpError};
use crate::schema::{Id, User};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: Id,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl Claims {
    pub fn new(user: &User, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: user.id,
            email: user.email.to_owned(),
            iat,
            exp,
        }
    }
}

/// Signing key and lifetime for session tokens.
#[derive(Clone)]
pub struct TokenKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, Error> {
        let key = Hmac::new_from_slice(secret).map_err(|e| {
            log::error!("Invalid signing key: {e}");
            HttpError::Internal.default()
        })?;

        Ok(Self { key, lifetime })
    }

    pub fn sign(&self, user: &User) -> Result<String, Error> {
        Claims::new(user, self.lifetime)
            .sign_with_key(&self.key)
            .map_err(|e| {
                log::error!("Failed to sign token: {e}");
                HttpError::Internal.default()
            })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let claims: Claims = token
            .verify_with_key(&self.key)
            .map_err(|_| HttpError::InvalidSession.default())?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(HttpError::InvalidSession.new("Token expired."));
        }

        Ok(claims)
    }
}
