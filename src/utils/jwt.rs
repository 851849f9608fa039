use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // back-office user id
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
        }
    }

    pub fn generate_access_token(&self, subject: &str, role: &str) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expires_in);

        let claims = Claims {
            sub: subject.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_admin_token(&self, token: &str) -> AppResult<Claims> {
        let claims = self.verify_token(token)?;

        if claims.role != ADMIN_ROLE {
            return Err(AppError::AuthError("Admin role required".to_string()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_token_round_trip() {
        let jwt = JwtService::new("test-secret", 60);
        let token = jwt.generate_access_token("7", ADMIN_ROLE).unwrap();
        let claims = jwt.verify_admin_token(&token).unwrap();
        assert_eq!(claims.sub, "7");
    }

    #[test]
    fn test_non_admin_role_rejected() {
        let jwt = JwtService::new("test-secret", 60);
        let token = jwt.generate_access_token("7", "seller").unwrap();
        assert!(matches!(
            jwt.verify_admin_token(&token),
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issuer = JwtService::new("one", 60);
        let verifier = JwtService::new("two", 60);
        let token = issuer.generate_access_token("7", ADMIN_ROLE).unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }
}
