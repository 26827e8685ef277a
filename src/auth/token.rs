use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, User};
use crate::utils::error::AppError;

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id as string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        self.issue_at(user.id, user.role, Utc::now())
    }

    /// Issues a token as if it had been created at `issued_at`.
    pub fn issue_at(
        &self,
        user_id: Uuid,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: Some(user_id.to_string()),
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::InternalFailure(format!("token signing failed: {e}")))
    }

    /// Verifies signature and expiry; the subject is not resolved here.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(secret, Duration::days(7))
    }

    #[test]
    fn issued_token_carries_subject_and_role() {
        let tokens = service("test_secret_key");
        let user_id = Uuid::new_v4();
        let token = tokens
            .issue_at(user_id, Role::Organizer, Utc::now())
            .unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, Some(user_id.to_string()));
        assert_eq!(claims.role, Role::Organizer);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn garbage_is_invalid() {
        let tokens = service("test_secret_key");
        assert!(matches!(
            tokens.verify("invalid_token"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let signer = service("secret1");
        let verifier = service("secret2");
        let token = signer.issue_at(Uuid::new_v4(), Role::User, Utc::now()).unwrap();

        assert!(matches!(verifier.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let tokens = service("test_secret_key");
        let token = tokens
            .issue_at(Uuid::new_v4(), Role::User, Utc::now() - Duration::days(8))
            .unwrap();

        assert!(matches!(tokens.verify(&token), Err(AppError::TokenExpired)));
    }

    #[test]
    fn unsigned_token_is_rejected() {
        let tokens = service("test_secret_key");
        let token = tokens.issue_at(Uuid::new_v4(), Role::User, Utc::now()).unwrap();
        let mut parts = token.split('.');
        let header = parts.next().unwrap();
        let payload = parts.next().unwrap();
        let stripped = format!("{header}.{payload}.");

        assert!(matches!(tokens.verify(&stripped), Err(AppError::InvalidToken)));
    }

    #[test]
    fn token_without_subject_still_decodes() {
        let tokens = service("test_secret_key");
        let now = Utc::now();
        let token = tokens
            .sign(&Claims {
                sub: None,
                role: Role::User,
                iat: now.timestamp(),
                exp: (now + Duration::hours(1)).timestamp(),
            })
            .unwrap();

        assert_eq!(tokens.verify(&token).unwrap().sub, None);
    }
}
